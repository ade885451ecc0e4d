//! Individual checks run over a scanned corpus directory.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use indexmap::IndexMap;

use crate::schema::{CONFIG_FILE, CorpusSchema};
use crate::table::Table;

use super::layout::{FileSpec, Layout};
use super::violation::{FormatViolation, ViolationKind};

/// A corpus directory read into memory.
pub(crate) struct Scan<'a> {
    pub schema: &'a CorpusSchema,
    pub layout: Layout,
    pub directory: &'a Path,
    /// Tables found in the directory, by stem. Rows are only loaded by a full scan.
    pub tables: IndexMap<String, Table>,
}

impl Scan<'_> {
    /// Values of a column, for reference lookups.
    fn id_set(&self, stem: &str, column: &str) -> Option<HashSet<&str>> {
        let table = self.tables.get(stem)?;
        table.column_index(column)?;
        Some(table.column(column).collect())
    }
}

/// A check over a scanned corpus directory.
pub(crate) trait Check {
    /// Name of this check, for logging.
    fn name(&self) -> &'static str;

    /// Returns true if the check needs every row of every table.
    fn needs_rows(&self) -> bool {
        false
    }

    fn run(&self, scan: &Scan<'_>) -> Vec<FormatViolation>;
}

/// Structural consistency of the configuration itself.
pub(crate) struct ConfigCheck;

impl Check for ConfigCheck {
    fn name(&self) -> &'static str {
        "config"
    }

    fn run(&self, scan: &Scan<'_>) -> Vec<FormatViolation> {
        let schema = scan.schema;
        let mut violations = Vec::new();
        let invalid = |message: String| FormatViolation::new(ViolationKind::InvalidConfig, CONFIG_FILE, message);

        let first_class = [
            ("document", &schema.first_class.document),
            ("segment", &schema.first_class.segment),
            ("token", &schema.first_class.token),
        ];
        for (role, name) in first_class {
            if !schema.layer.contains_key(name.as_str()) {
                violations.push(invalid(format!(
                    "layer must declare '{}', the first-class {} type",
                    name, role
                )));
            }
        }

        for (layer, config) in &schema.layer {
            if let Some(contains) = &config.contains {
                if !schema.layer.contains_key(contains) {
                    violations.push(invalid(format!(
                        "layer '{}' contains undeclared layer '{}'",
                        layer, contains
                    )));
                }
            }
            for dimension in &config.partial_anchoring {
                if !schema.is_anchored(layer, *dimension) {
                    violations.push(invalid(format!(
                        "layer '{}' lists {} as partial but is not anchored on it",
                        layer, dimension
                    )));
                }
            }
            for (attribute, attribute_config) in &config.attributes {
                if let Some(message) = attribute_name_problem(attribute) {
                    violations.push(
                        FormatViolation::new(
                            ViolationKind::InvalidName,
                            CONFIG_FILE,
                            format!("attribute '{}' of layer '{}' {}", attribute, layer, message),
                        )
                        .in_column(attribute.as_str()),
                    );
                }
                if let Some(target) = &attribute_config.reference {
                    if !schema.global_attributes.contains_key(target) {
                        violations.push(invalid(format!(
                            "attribute '{}' of layer '{}' references undeclared global attribute '{}'",
                            attribute, layer, target
                        )));
                    }
                }
            }
        }
        violations
    }
}

fn attribute_name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("has an empty name")
    } else if name != name.to_lowercase() {
        Some("cannot contain uppercase characters")
    } else if name.chars().any(char::is_whitespace) {
        Some("cannot contain whitespace characters")
    } else if name.contains('\'') {
        Some("cannot contain single-quote characters")
    } else {
        None
    }
}

/// Every required table is present with its required columns.
pub(crate) struct LayoutCheck;

impl Check for LayoutCheck {
    fn name(&self) -> &'static str {
        "layout"
    }

    fn run(&self, scan: &Scan<'_>) -> Vec<FormatViolation> {
        let mut violations = Vec::new();
        for spec in scan.layout.files() {
            let Some(table) = scan.tables.get(&spec.stem) else {
                if spec.required {
                    violations.push(FormatViolation::new(
                        ViolationKind::MissingFile,
                        spec.file_name(),
                        format!(
                            "no table found for {} in {}",
                            spec.describes,
                            scan.directory.display()
                        ),
                    ));
                }
                continue;
            };
            for column in &spec.columns {
                if table.column_index(&column.name).is_none() {
                    violations.push(
                        FormatViolation::new(
                            ViolationKind::MissingColumn,
                            table.file.as_str(),
                            format!("column '{}' is required for {}", column.name, spec.describes),
                        )
                        .in_column(column.name.as_str()),
                    );
                }
            }
        }
        violations
    }
}

/// Every table and column maps to something declared in the configuration.
pub(crate) struct CoverageCheck;

impl Check for CoverageCheck {
    fn name(&self) -> &'static str {
        "coverage"
    }

    fn needs_rows(&self) -> bool {
        true
    }

    fn run(&self, scan: &Scan<'_>) -> Vec<FormatViolation> {
        let mut violations = Vec::new();
        for (stem, table) in &scan.tables {
            let Some(spec) = scan.layout.get(stem) else {
                violations.push(FormatViolation::new(
                    ViolationKind::UnknownFile,
                    table.file.as_str(),
                    "no layer, attribute or global attribute of the configuration maps to this table",
                ));
                continue;
            };
            for header in &table.headers {
                if spec.column(header).is_none() {
                    violations.push(
                        FormatViolation::new(
                            ViolationKind::UnknownColumn,
                            table.file.as_str(),
                            format!("unexpected column '{}' for {}", header, spec.describes),
                        )
                        .in_column(header.as_str()),
                    );
                }
            }
        }
        violations
    }
}

/// Row lengths, cell syntax and references of every data line.
pub(crate) struct CellCheck;

impl Check for CellCheck {
    fn name(&self) -> &'static str {
        "cells"
    }

    fn needs_rows(&self) -> bool {
        true
    }

    fn run(&self, scan: &Scan<'_>) -> Vec<FormatViolation> {
        let mut targets: HashMap<(&str, &str), Option<HashSet<&str>>> = HashMap::new();
        for column in scan.layout.files().flat_map(|f| f.columns.iter()) {
            if let Some((stem, id)) = &column.target {
                targets
                    .entry((stem.as_str(), id.as_str()))
                    .or_insert_with(|| scan.id_set(stem, id));
            }
        }

        let mut violations = Vec::new();
        for (stem, table) in &scan.tables {
            if let Some(spec) = scan.layout.get(stem) {
                check_rows(table, spec, &targets, &mut violations);
            }
        }
        violations
    }
}

type Targets<'a> = HashMap<(&'a str, &'a str), Option<HashSet<&'a str>>>;

fn check_rows(table: &Table, spec: &FileSpec, targets: &Targets<'_>, violations: &mut Vec<FormatViolation>) {
    let columns: Vec<_> = table.headers.iter().map(|h| spec.column(h)).collect();
    for record in &table.rows {
        if record.cells.len() != table.headers.len() {
            violations.push(
                FormatViolation::new(
                    ViolationKind::RowLength,
                    table.file.as_str(),
                    format!(
                        "found {} values, expected {}",
                        record.cells.len(),
                        table.headers.len()
                    ),
                )
                .at_line(record.line),
            );
            continue;
        }

        for (value, column) in record.cells.iter().zip(&columns) {
            let Some(column) = column else {
                continue;
            };
            let located = |kind, message: String| {
                FormatViolation::new(kind, table.file.as_str(), message)
                    .at_line(record.line)
                    .in_column(column.name.as_str())
            };

            if value.is_empty() {
                if !column.nullable && !column.format.accepts_empty() {
                    violations.push(located(
                        ViolationKind::NullValue,
                        "empty value in a column that is not nullable".to_string(),
                    ));
                }
                continue;
            }
            if let Err(message) = column.format.check(value) {
                violations.push(located(ViolationKind::CellType, message));
                continue;
            }
            let Some((stem, id)) = &column.target else {
                continue;
            };
            let known = targets
                .get(&(stem.as_str(), id.as_str()))
                .and_then(Option::as_ref);
            if let Some(known) = known {
                if !known.contains(value.as_str()) {
                    violations.push(located(
                        ViolationKind::DanglingReference,
                        format!("'{}' does not exist in column '{}' of '{}'", value, id, stem),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Dimension;
    use crate::table::Record;

    fn schema() -> CorpusSchema {
        serde_json::from_str(
            r#"{
                "meta": {"name": "test"},
                "firstClass": {"document": "Document", "segment": "Segment", "token": "Token"},
                "layer": {
                    "Document": {"layerType": "span", "contains": "Segment"},
                    "Segment": {"layerType": "span", "contains": "Token"},
                    "Token": {
                        "anchoring": {"stream": true},
                        "attributes": {"form": {"type": "text"}, "upos": {"type": "categorical", "values": ["NOUN"]}}
                    }
                }
            }"#,
        )
        .unwrap()
    }

    fn table(file: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            file: file.to_string(),
            path: Path::new(file).to_path_buf(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| Record {
                    line: i + 2,
                    cells: cells.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn scan<'a>(schema: &'a CorpusSchema, tables: Vec<Table>) -> Scan<'a> {
        Scan {
            schema,
            layout: Layout::derive(schema),
            directory: Path::new("corpus"),
            tables: tables
                .into_iter()
                .map(|t| (t.file.trim_end_matches(".csv").to_string(), t))
                .collect(),
        }
    }

    #[test]
    fn test_config_check_flags_undeclared_first_class() {
        let mut schema = schema();
        schema.first_class.token = "Word".to_string();
        schema
            .layer
            .get_mut("Token")
            .unwrap()
            .attributes
            .insert("Upper Case".to_string(), serde_json::from_str(r#"{"type": "number"}"#).unwrap());
        let violations = ConfigCheck.run(&scan(&schema, vec![]));
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].kind, ViolationKind::InvalidConfig);
        assert!(violations[0].message.contains("'Word'"));
        assert_eq!(violations[1].kind, ViolationKind::InvalidName);
    }

    #[test]
    fn test_config_check_flags_partial_unanchored_dimension() {
        let mut schema = schema();
        let segment = schema.layer.get_mut("Segment").unwrap();
        segment.partial_anchoring = vec![Dimension::Stream, Dimension::Time];

        let violations = ConfigCheck.run(&scan(&schema, vec![]));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::InvalidConfig);
        assert!(violations[0].message.contains("time"));
    }

    #[test]
    fn test_attribute_name_rules() {
        assert!(attribute_name_problem("lemma").is_none());
        assert!(attribute_name_problem("Lemma").is_some());
        assert!(attribute_name_problem("my lemma").is_some());
        assert!(attribute_name_problem("it's").is_some());
    }

    #[test]
    fn test_layout_check_reports_missing_files_and_columns() {
        let schema = schema();
        let tables = vec![
            table("token.csv", &["token_id", "segment_id", "form_id", "upos"], &[]),
            table("segment.csv", &["segment_id", "char_range"], &[]),
        ];
        let violations = LayoutCheck.run(&scan(&schema, tables));
        let missing_files: Vec<&str> = violations
            .iter()
            .filter(|v| v.kind == ViolationKind::MissingFile)
            .map(|v| v.file.as_str())
            .collect();
        assert_eq!(missing_files, vec!["document.csv", "token_form.csv"]);
        let missing_column = violations
            .iter()
            .find(|v| v.kind == ViolationKind::MissingColumn)
            .unwrap();
        assert_eq!(missing_column.file, "token.csv");
        assert_eq!(missing_column.column.as_deref(), Some("char_range"));
    }

    #[test]
    fn test_coverage_check_reports_unknown_files_and_columns() {
        let schema = schema();
        let tables = vec![
            table("segment.csv", &["segment_id", "char_range", "extra"], &[]),
            table("token_upos.csv", &["upos_id", "upos"], &[]),
        ];
        let violations = CoverageCheck.run(&scan(&schema, tables));
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].kind, ViolationKind::UnknownColumn);
        assert_eq!(violations[0].column.as_deref(), Some("extra"));
        assert_eq!(violations[1].kind, ViolationKind::UnknownFile);
        assert_eq!(violations[1].file, "token_upos.csv");
    }

    #[test]
    fn test_cell_check() {
        let schema = schema();
        let segment = uuid::Uuid::new_v4().to_string();
        let stranger = uuid::Uuid::new_v4().to_string();
        let tables = vec![
            table("segment.csv", &["segment_id", "char_range"], &[&[&segment, "[0,12)"]]),
            table("token_form.csv", &["form_id", "form"], &[&["1", "hello"]]),
            table(
                "token.csv",
                &["token_id", "segment_id", "char_range", "form_id", "upos"],
                &[
                    &["1", &segment, "[0,6)", "1", "NOUN"],
                    &["2", &stranger, "[6,6)", "7", ""],
                    &["3", &segment, "[12,18)"],
                ],
            ),
        ];
        let violations = CellCheck.run(&scan(&schema, tables));
        let kinds: Vec<(ViolationKind, usize, Option<&str>)> = violations
            .iter()
            .map(|v| (v.kind, v.line.unwrap(), v.column.as_deref()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ViolationKind::DanglingReference, 3, Some("segment_id")),
                (ViolationKind::CellType, 3, Some("char_range")),
                (ViolationKind::DanglingReference, 3, Some("form_id")),
                (ViolationKind::NullValue, 3, Some("upos")),
                (ViolationKind::RowLength, 4, None),
            ]
        );
    }
}
