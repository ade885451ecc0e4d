//! Corpusmill: compiler and validator for dictionary-encoded linguistic corpora.
//!
//! A corpus is built as a graph of layers (documents, segments, tokens and any
//! user-defined span), finalized into per-type row buffers, then compiled into a
//! directory of CSV tables plus a `config.json` schema. The validator re-reads
//! such a directory and certifies it against its schema.
//!
//! # Core Principles
//!
//! - **Stream order is truth**: character offsets come from a single cursor
//!   advanced in finalization order
//! - **Dictionary encoding**: text, structured and label values live in side
//!   tables addressed by dense 1-based ids
//! - **Self-checking output**: every compiled directory passes the validator
//!
//! # Example
//!
//! ```no_run
//! use corpusmill::{Corpus, ValidatorOptions, CorpusValidator};
//!
//! # fn main() -> corpusmill::Result<()> {
//! let mut corpus = Corpus::new("my corpus");
//! let hello = corpus.new_token("hello")?;
//! let world = corpus.new_token("world")?;
//! let segment = corpus.new_layer("Segment")?;
//! corpus.add_children(segment, &[hello, world])?;
//! corpus.finalize(segment)?;
//!
//! let report = corpus.compile("out")?;
//! let validation = CorpusValidator::new(ValidatorOptions::default())
//!     .validate("out", &report.schema)?;
//! assert!(validation.is_valid());
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod dictionary;
pub mod error;
pub mod graph;
pub mod schema;
pub mod table;
pub mod validation;
pub mod value;

pub use compile::{CompileOptions, CompileReport, CorpusCompiler, EmittedFile};
pub use dictionary::LookupDictionary;
pub use error::{CorpusError, Result, SchemaViolation};
pub use graph::{Anchors, Corpus, CorpusConfig, Interval, LayerId, LayerKey, XyBox};
pub use schema::{
    AttributeConfig, AttributeType, CorpusSchema, Dimension, KeySchema, LayerConfig, LayerType,
};
pub use validation::{
    CorpusValidator, FormatViolation, ValidationReport, ValidatorOptions, ViolationKind, validate,
};
pub use value::{AttributeValue, GlobalRef, Number};
