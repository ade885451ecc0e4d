//! Compiler and validator performance benchmarks.
//!
//! Measures finalization, compilation and validation over corpora of
//! increasing size.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use corpusmill::{Corpus, CorpusSchema, CorpusValidator, LayerId, ValidatorOptions};

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog", "l'homme",
];

const TAGS: &[&str] = &["DET", "ADJ", "ADJ", "NOUN", "VERB", "ADP", "DET", "ADJ", "NOUN", "NOUN"];

/// Build a corpus of `sentences` ten-token segments in one document.
fn build(sentences: usize) -> (Corpus, LayerId) {
    let mut corpus = Corpus::new("bench");
    let document = corpus.new_layer("Document").unwrap();
    for _ in 0..sentences {
        let segment = corpus.new_layer("Segment").unwrap();
        for (word, tag) in WORDS.iter().zip(TAGS) {
            let token = corpus.new_token(word).unwrap();
            corpus.set_attribute(token, "upos", *tag).unwrap();
            corpus.add_child(segment, token).unwrap();
        }
        corpus.add_child(document, segment).unwrap();
    }
    (corpus, document)
}

/// Benchmark building and finalizing the layer graph.
fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");

    for sentences in [10, 100, 1000] {
        group.throughput(Throughput::Elements((sentences * WORDS.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sentences), &sentences, |b, &n| {
            b.iter(|| {
                let (mut corpus, document) = build(n);
                corpus.finalize(document).unwrap();
                black_box(corpus.cursor())
            })
        });
    }

    group.finish();
}

/// Benchmark the compile pass, writing into a temporary directory.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    group.sample_size(20);

    for sentences in [10, 100, 1000] {
        group.throughput(Throughput::Elements((sentences * WORDS.len()) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sentences), &sentences, |b, &n| {
            b.iter(|| {
                let dir = tempfile::tempdir().unwrap();
                let report = build(n).0.compile(dir.path()).unwrap();
                black_box(report.files.len())
            })
        });
    }

    group.finish();
}

/// Benchmark full and header-only validation of a compiled directory.
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let dir = tempfile::tempdir().unwrap();
    let schema: CorpusSchema = build(1000).0.compile(dir.path()).unwrap().schema;

    let full = CorpusValidator::new(ValidatorOptions::default());
    group.bench_function("full_scan", |b| {
        b.iter(|| black_box(full.validate(dir.path(), &schema).unwrap()))
    });

    let quick = CorpusValidator::new(ValidatorOptions {
        full_scan: false,
        ..ValidatorOptions::default()
    });
    group.bench_function("headers_only", |b| {
        b.iter(|| black_box(quick.validate(dir.path(), &schema).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_finalize, bench_compile, bench_validate);
criterion_main!(benches);
