//! Format violations found in a compiled corpus directory.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};
use crate::schema::CONFIG_FILE;

/// Category of a format violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The configuration itself is inconsistent.
    InvalidConfig,
    /// An attribute name that cannot be mapped onto file or column names.
    InvalidName,
    /// A table the configuration requires is absent.
    MissingFile,
    /// A required column is absent from a table header.
    MissingColumn,
    /// A table that maps to nothing in the configuration.
    UnknownFile,
    /// A column that maps to nothing in the configuration.
    UnknownColumn,
    /// A table that could not be parsed.
    Unreadable,
    /// A data line with a different number of cells than the header.
    RowLength,
    /// A cell whose syntax does not match its column type.
    CellType,
    /// An empty cell in a column that does not allow it.
    NullValue,
    /// An id that does not exist in the table it points to.
    DanglingReference,
}

impl ViolationKind {
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::InvalidConfig => "invalid config",
            ViolationKind::InvalidName => "invalid name",
            ViolationKind::MissingFile => "missing file",
            ViolationKind::MissingColumn => "missing column",
            ViolationKind::UnknownFile => "unknown file",
            ViolationKind::UnknownColumn => "unknown column",
            ViolationKind::Unreadable => "unreadable",
            ViolationKind::RowLength => "row length",
            ViolationKind::CellType => "cell type",
            ViolationKind::NullValue => "null value",
            ViolationKind::DanglingReference => "dangling reference",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One broken contract, located by file, line and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatViolation {
    pub kind: ViolationKind,
    /// File name inside the corpus directory.
    pub file: String,
    /// 1-based line number, the header being line 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl FormatViolation {
    pub fn new(kind: ViolationKind, file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.into(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    /// Set the line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the column name.
    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for FormatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        if let Some(column) = &self.column {
            write!(f, ":{}", column)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for FormatViolation {}

/// Outcome of validating a corpus directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<FormatViolation>,
    /// Number of tables opened.
    pub files_checked: usize,
    /// Number of data lines scanned.
    pub rows_checked: usize,
}

impl ValidationReport {
    /// Returns true if no contract was broken.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations of one kind.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &FormatViolation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Turn the report into an error carrying its first violation.
    ///
    /// A violation located in `config.json` is a configuration error; any
    /// other one is a format error.
    pub fn into_result(self) -> Result<()> {
        match self.violations.into_iter().next() {
            Some(violation) if violation.file == CONFIG_FILE => {
                Err(CorpusError::Config(violation.to_string()))
            }
            Some(violation) => Err(CorpusError::Format(violation)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_full_location() {
        let violation = FormatViolation::new(ViolationKind::CellType, "token.csv", "expected an integer, got 'x'")
            .at_line(3)
            .in_column("lemma_id");
        assert_eq!(violation.to_string(), "token.csv:3:lemma_id: expected an integer, got 'x'");
    }

    #[test]
    fn test_display_without_line() {
        let violation = FormatViolation::new(ViolationKind::MissingColumn, "segment.csv", "missing column")
            .in_column("char_range");
        assert_eq!(violation.to_string(), "segment.csv:char_range: missing column");

        let violation = FormatViolation::new(ViolationKind::MissingFile, "token.csv", "not found");
        assert_eq!(violation.to_string(), "token.csv: not found");
    }

    #[test]
    fn test_into_result_returns_first_violation() {
        assert!(ValidationReport::default().into_result().is_ok());

        let report = ValidationReport {
            violations: vec![
                FormatViolation::new(ViolationKind::MissingFile, "a.csv", "first"),
                FormatViolation::new(ViolationKind::MissingFile, "b.csv", "second"),
            ],
            files_checked: 0,
            rows_checked: 0,
        };
        assert_eq!(report.of_kind(ViolationKind::MissingFile).count(), 2);
        match report.into_result() {
            Err(CorpusError::Format(violation)) => assert_eq!(violation.file, "a.csv"),
            other => panic!("expected a format violation, got {:?}", other),
        }
    }

    #[test]
    fn test_into_result_reports_config_errors() {
        let report = ValidationReport {
            violations: vec![
                FormatViolation::new(ViolationKind::InvalidConfig, CONFIG_FILE, "layer must declare 'Word'"),
                FormatViolation::new(ViolationKind::MissingFile, "word.csv", "not found"),
            ],
            files_checked: 0,
            rows_checked: 0,
        };
        match report.into_result() {
            Err(CorpusError::Config(message)) => {
                assert_eq!(message, "config.json: layer must declare 'Word'")
            }
            other => panic!("expected a configuration error, got {:?}", other),
        }
    }
}
