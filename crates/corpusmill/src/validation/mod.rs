//! Validation of compiled corpus directories.
//!
//! The validator re-derives every expected table and column from a
//! `config.json` and checks a directory against it:
//!
//! - the configuration is self-consistent
//! - required tables and columns are present
//! - every table and column maps to something declared (full scan)
//! - every cell has the syntax of its column and every id resolves (full scan)
//!
//! Violations are accumulated into a [`ValidationReport`]; the free
//! [`validate`] function turns the first one into an error instead.

mod cells;
mod checks;
mod layout;
mod validator;
mod violation;

use std::path::Path;

use crate::error::Result;
use crate::schema::CorpusSchema;

pub use validator::CorpusValidator;
pub use violation::{FormatViolation, ValidationReport, ViolationKind};

/// Options of the validator.
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Read every row of every table, not only the headers.
    pub full_scan: bool,
    /// Field delimiter of `.csv` tables. `.tsv` tables always use tabs.
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            full_scan: true,
            delimiter: b',',
            quote: b'"',
        }
    }
}

/// Validate `directory` against `config`, failing on the first violation.
pub fn validate(directory: impl AsRef<Path>, config: &CorpusSchema, full_scan: bool) -> Result<()> {
    let options = ValidatorOptions {
        full_scan,
        ..ValidatorOptions::default()
    };
    CorpusValidator::new(options)
        .validate(directory, config)?
        .into_result()
}
