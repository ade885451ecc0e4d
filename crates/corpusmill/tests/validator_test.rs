//! Validator tests against compiled corpora that were tampered with.

use std::fs;
use std::path::Path;

use serde_json::json;
use tempfile::TempDir;

use corpusmill::{
    Corpus, CorpusError, CorpusSchema, CorpusValidator, ValidationReport, ValidatorOptions,
    ViolationKind,
};

/// Compile a small but complete corpus: two sentences, a categorical and a
/// labels attribute, a speaker reference and an audio slot.
fn compiled() -> (TempDir, CorpusSchema) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut corpus = Corpus::new("tampered");
    let speaker = corpus
        .global_attribute("speaker", json!({"name": "Jane"}))
        .unwrap();
    let document = corpus.new_layer("Document").unwrap();
    corpus.set_media(document, "audio", "jane.wav").unwrap();
    for sentence in [["hello", "world"], ["good", "bye"]] {
        let segment = corpus.new_layer("Segment").unwrap();
        corpus.set_attribute(segment, "speaker", &speaker).unwrap();
        for (i, word) in sentence.iter().enumerate() {
            let token = corpus.new_token(word).unwrap();
            let upos = if i == 0 { "INTJ" } else { "NOUN" };
            corpus.set_attribute(token, "upos", upos).unwrap();
            corpus.set_attribute(token, "tags", vec![*word, "greeting"]).unwrap();
            corpus.add_child(segment, token).unwrap();
        }
        corpus.add_child(document, segment).unwrap();
    }
    let report = corpus.compile(dir.path()).expect("Compile failed");
    (dir, report.schema)
}

fn check(dir: &Path, schema: &CorpusSchema) -> ValidationReport {
    CorpusValidator::new(ValidatorOptions::default())
        .validate(dir, schema)
        .expect("Validation failed to run")
}

/// Replace the first occurrence of `from` in a compiled file.
fn tamper(dir: &Path, file: &str, from: &str, to: &str) {
    let path = dir.join(file);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains(from), "{} does not contain {:?}", file, from);
    fs::write(&path, content.replacen(from, to, 1)).unwrap();
}

/// Rewrite one line (1-based, header included) of a compiled file.
fn edit_line(dir: &Path, file: &str, line: usize, edit: impl FnOnce(&str) -> String) {
    let path = dir.join(file);
    let content = fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(String::from).collect();
    lines[line - 1] = edit(&lines[line - 1]);
    fs::write(&path, format!("{}\n", lines.join("\n"))).unwrap();
}

#[test]
fn test_fresh_output_is_valid() {
    let (dir, schema) = compiled();
    let report = check(dir.path(), &schema);
    assert!(report.is_valid(), "{:#?}", report.violations);
    assert!(report.files_checked >= 7);
    corpusmill::validate(dir.path(), &schema, true).expect("Round trip failed");
}

#[test]
fn test_missing_lookup_table() {
    let (dir, schema) = compiled();
    fs::remove_file(dir.path().join("token_form.csv")).unwrap();

    let report = check(dir.path(), &schema);
    let missing: Vec<_> = report.of_kind(ViolationKind::MissingFile).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].file, "token_form.csv");
}

#[test]
fn test_missing_global_table() {
    let (dir, schema) = compiled();
    fs::remove_file(dir.path().join("global_attribute_speaker.csv")).unwrap();

    let result = corpusmill::validate(dir.path(), &schema, false);
    match result {
        Err(CorpusError::Format(violation)) => {
            assert_eq!(violation.kind, ViolationKind::MissingFile);
            assert_eq!(violation.file, "global_attribute_speaker.csv");
        }
        other => panic!("expected a missing file, got {:?}", other),
    }
}

#[test]
fn test_inverted_range() {
    let (dir, schema) = compiled();
    tamper(dir.path(), "token.csv", "\"[0,6)\"", "\"[6,0)\"");

    let report = check(dir.path(), &schema);
    let violation = report.of_kind(ViolationKind::CellType).next().expect("no cell violation");
    assert_eq!(violation.file, "token.csv");
    assert_eq!(violation.line, Some(2));
    assert_eq!(violation.column.as_deref(), Some("char_range"));
    assert!(violation.to_string().starts_with("token.csv:2:char_range: "));
}

#[test]
fn test_quick_scan_skips_cells() {
    let (dir, schema) = compiled();
    tamper(dir.path(), "token.csv", "\"[0,6)\"", "\"[6,0)\"");

    corpusmill::validate(dir.path(), &schema, false).expect("Quick scan should pass");
    assert!(corpusmill::validate(dir.path(), &schema, true).is_err());
}

#[test]
fn test_unknown_file_and_column() {
    let (dir, schema) = compiled();
    fs::write(dir.path().join("notes.csv"), "note\nhello\n").unwrap();
    fs::write(dir.path().join("README.txt"), "not a table").unwrap();
    let segment = fs::read_to_string(dir.path().join("segment.csv")).unwrap();
    let (header, rest) = segment.split_once('\n').unwrap();
    let rows: Vec<String> = rest.lines().map(|line| format!("{},x", line)).collect();
    fs::write(
        dir.path().join("segment.csv"),
        format!("{},extra\n{}\n", header, rows.join("\n")),
    )
    .unwrap();

    let report = check(dir.path(), &schema);
    let unknown_files: Vec<_> = report.of_kind(ViolationKind::UnknownFile).collect();
    assert_eq!(unknown_files.len(), 1);
    assert_eq!(unknown_files[0].file, "notes.csv");
    let unknown_columns: Vec<_> = report.of_kind(ViolationKind::UnknownColumn).collect();
    assert_eq!(unknown_columns.len(), 1);
    assert_eq!(unknown_columns[0].column.as_deref(), Some("extra"));
}

#[test]
fn test_missing_column() {
    let (dir, schema) = compiled();
    tamper(dir.path(), "token.csv", "upos", "pos");

    let report = check(dir.path(), &schema);
    let missing: Vec<_> = report.of_kind(ViolationKind::MissingColumn).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].column.as_deref(), Some("upos"));
    assert_eq!(report.of_kind(ViolationKind::UnknownColumn).count(), 1);
}

#[test]
fn test_dangling_lookup_id() {
    let (dir, schema) = compiled();
    fs::write(
        dir.path().join("token_form.csv"),
        "form_id,form\n1,hello\n2,world\n3,good\n",
    )
    .unwrap();

    let report = check(dir.path(), &schema);
    let dangling: Vec<_> = report.of_kind(ViolationKind::DanglingReference).collect();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].file, "token.csv");
    assert_eq!(dangling[0].column.as_deref(), Some("form_id"));
    assert_eq!(dangling[0].line, Some(5));
}

#[test]
fn test_undeclared_categorical_value() {
    let (dir, schema) = compiled();
    tamper(dir.path(), "token.csv", "INTJ", "ADJ");

    let report = check(dir.path(), &schema);
    let violation = report.of_kind(ViolationKind::CellType).next().expect("no cell violation");
    assert_eq!(violation.column.as_deref(), Some("upos"));
    assert!(violation.message.contains("ADJ"));
}

#[test]
fn test_label_width() {
    let (dir, schema) = compiled();
    let width = schema.layer["Token"].attributes["tags"].nlabels.unwrap();
    assert_eq!(width, 5);
    edit_line(dir.path(), "token.csv", 2, |line| {
        assert!(line.ends_with(",00011"), "{}", line);
        line.replacen(",00011", ",0011", 1)
    });

    let report = check(dir.path(), &schema);
    let violation = report.of_kind(ViolationKind::CellType).next().expect("no cell violation");
    assert_eq!(violation.column.as_deref(), Some("tags"));
}

#[test]
fn test_ragged_row() {
    let (dir, schema) = compiled();
    let path = dir.path().join("token_form.csv");
    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, format!("{}9\n", content)).unwrap();

    let report = check(dir.path(), &schema);
    let ragged: Vec<_> = report.of_kind(ViolationKind::RowLength).collect();
    assert_eq!(ragged.len(), 1);
    assert_eq!(ragged[0].line, Some(6));
}

#[test]
fn test_empty_cell_in_required_column() {
    let (dir, schema) = compiled();
    edit_line(dir.path(), "token.csv", 2, |line| line.replacen("1,", ",", 1));

    let report = check(dir.path(), &schema);
    let null: Vec<_> = report.of_kind(ViolationKind::NullValue).collect();
    assert_eq!(null.len(), 1);
    assert_eq!(null[0].column.as_deref(), Some("token_id"));
}

#[test]
fn test_bad_segment_uuid() {
    let (dir, schema) = compiled();
    let segment = fs::read_to_string(dir.path().join("segment.csv")).unwrap();
    let first_id = segment.lines().nth(1).unwrap().split(',').next().unwrap().to_string();
    let nil = uuid::Uuid::nil().to_string();
    tamper(dir.path(), "segment.csv", &first_id, &nil);

    let report = check(dir.path(), &schema);
    assert_eq!(report.of_kind(ViolationKind::CellType).count(), 1);
    // Tokens and the vector table still point at the original id
    assert_eq!(report.of_kind(ViolationKind::DanglingReference).count(), 3);
}

#[test]
fn test_config_inconsistency() {
    let (dir, mut schema) = compiled();
    schema.first_class.token = "Word".to_string();

    let report = check(dir.path(), &schema);
    assert_eq!(report.of_kind(ViolationKind::InvalidConfig).count(), 1);
    assert_eq!(report.violations[0].file, "config.json");

    match corpusmill::validate(dir.path(), &schema, false) {
        Err(CorpusError::Config(message)) => assert!(message.contains("'Word'"), "{}", message),
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn test_malformed_fts_vector() {
    let (dir, schema) = compiled();
    tamper(dir.path(), "fts_vector.csv", "'1hello':1", "'1hel'lo':1");

    let report = check(dir.path(), &schema);
    let violation = report.of_kind(ViolationKind::CellType).next().expect("no cell violation");
    assert_eq!(violation.file, "fts_vector.csv");
    assert_eq!(violation.column.as_deref(), Some("vector"));
}
