//! Validation engine that scans a directory and runs every check.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{CorpusError, Result};
use crate::schema::CorpusSchema;
use crate::table::{Table, file_name};

use super::ValidatorOptions;
use super::checks::{CellCheck, Check, ConfigCheck, CoverageCheck, LayoutCheck, Scan};
use super::layout::{Layout, delimiter_for, locate, table_stem};
use super::violation::{FormatViolation, ValidationReport, ViolationKind};

/// Certifies a compiled corpus directory against its configuration.
pub struct CorpusValidator {
    options: ValidatorOptions,
    checks: Vec<Box<dyn Check>>,
}

impl CorpusValidator {
    /// Create a validator with every check.
    pub fn new(options: ValidatorOptions) -> Self {
        Self {
            options,
            checks: vec![
                Box::new(ConfigCheck),
                Box::new(LayoutCheck),
                Box::new(CoverageCheck),
                Box::new(CellCheck),
            ],
        }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate `directory` against `schema`, collecting every violation.
    ///
    /// Without a full scan only the configuration and the table headers are
    /// checked. Fails only when the directory itself cannot be listed.
    pub fn validate(
        &self,
        directory: impl AsRef<Path>,
        schema: &CorpusSchema,
    ) -> Result<ValidationReport> {
        let directory = directory.as_ref();
        let layout = Layout::derive(schema);
        let mut violations = Vec::new();

        let paths = if self.options.full_scan {
            list_tables(directory)?
        } else {
            if !directory.is_dir() {
                return Err(CorpusError::io(
                    directory,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
                ));
            }
            layout
                .files()
                .filter_map(|spec| locate(directory, &spec.stem).map(|p| (spec.stem.clone(), p)))
                .collect()
        };

        let mut tables = IndexMap::new();
        for (stem, path) in paths {
            match self.read(&path) {
                Ok(table) => {
                    tables.insert(stem, table);
                }
                Err(error) => violations.push(FormatViolation::new(
                    ViolationKind::Unreadable,
                    file_name(&path),
                    error.to_string(),
                )),
            }
        }

        let scan = Scan {
            schema,
            layout,
            directory,
            tables,
        };
        for check in &self.checks {
            if check.needs_rows() && !self.options.full_scan {
                continue;
            }
            let found = check.run(&scan);
            debug!(check = check.name(), violations = found.len(), "ran check");
            violations.extend(found);
        }

        let report = ValidationReport {
            violations,
            files_checked: scan.tables.len(),
            rows_checked: scan.tables.values().map(Table::row_count).sum(),
        };
        info!(
            directory = %directory.display(),
            full_scan = self.options.full_scan,
            files = report.files_checked,
            rows = report.rows_checked,
            violations = report.violations.len(),
            "validated corpus"
        );
        Ok(report)
    }

    fn read(&self, path: &Path) -> Result<Table> {
        let delimiter = delimiter_for(path, self.options.delimiter);
        if self.options.full_scan {
            Table::read(path, delimiter, self.options.quote)
        } else {
            let headers = Table::read_headers(path, delimiter, self.options.quote)?;
            Ok(Table {
                file: file_name(path),
                path: path.to_path_buf(),
                headers,
                rows: Vec::new(),
            })
        }
    }
}

impl Default for CorpusValidator {
    fn default() -> Self {
        Self::new(ValidatorOptions::default())
    }
}

/// Every table file of a directory by stem, in name order.
///
/// When a stem exists as both `.csv` and `.tsv`, the `.csv` file wins and the
/// other one is reported as an unknown file under its full name.
fn list_tables(directory: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(directory).map_err(|e| CorpusError::io(directory, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CorpusError::io(directory, e))?.path();
        if path.is_file() && table_stem(&path).is_some() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut tables: Vec<(String, PathBuf)> = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = table_stem(&path) else {
            continue;
        };
        if tables.iter().any(|(s, _)| *s == stem) {
            tables.push((file_name(&path), path));
        } else {
            tables.push((stem, path));
        }
    }
    Ok(tables)
}
