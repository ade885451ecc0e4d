//! Compilation of a finalized corpus into tables and `config.json`.

mod compiler;
mod output;
mod rewrite;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::Corpus;
use crate::schema::CorpusSchema;

pub use compiler::CorpusCompiler;

/// Name of the table holding segment full-text-search vectors.
pub const FTS_VECTOR_FILE: &str = "fts_vector.csv";

/// Thresholds of the compile pass.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Text attributes with at most this many distinct values become categorical.
    pub max_categorical_values: usize,
    /// Every value of a categorical attribute must be shorter than this, in bytes.
    pub max_categorical_length: usize,
    /// Token attributes that always keep their lookup table.
    pub literal_token_attributes: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_categorical_values: 50,
            max_categorical_length: 63,
            literal_token_attributes: vec!["form".to_string(), "lemma".to_string()],
        }
    }
}

/// One file written by the compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedFile {
    /// File name inside the destination directory.
    pub file: String,
    /// Number of data rows, excluding the header.
    pub rows: usize,
    /// SHA-256 of the file contents.
    pub hash: String,
}

/// Result of compiling a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileReport {
    pub destination: PathBuf,
    pub files: Vec<EmittedFile>,
    /// The configuration written to `config.json`.
    pub schema: CorpusSchema,
    pub compiled_at: DateTime<Utc>,
}

impl CompileReport {
    /// Look up an emitted file by name.
    pub fn file(&self, name: &str) -> Option<&EmittedFile> {
        self.files.iter().find(|f| f.file == name)
    }
}

impl Corpus {
    /// Compile the corpus into `destination` with default options.
    ///
    /// Root layers that were never finalized are finalized first, in creation
    /// order. The corpus is consumed: no layer can be added once its buffers
    /// have been rewritten.
    pub fn compile(self, destination: impl AsRef<Path>) -> Result<CompileReport> {
        CorpusCompiler::new().compile(self, destination)
    }
}
