//! Tables and columns a configuration calls for.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::compile::FTS_VECTOR_FILE;
use crate::schema::{
    AttributeConfig, AttributeType, CorpusSchema, Dimension, GLOBAL_FILE_PREFIX, id_column,
};

use super::cells::CellFormat;

/// Extensions a corpus table may carry, in order of preference.
pub(crate) const EXTENSIONS: [&str; 2] = ["csv", "tsv"];

/// A column a table must carry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnSpec {
    pub name: String,
    pub format: CellFormat,
    pub nullable: bool,
    /// Table stem and column every non-empty value must appear in.
    pub target: Option<(String, String)>,
}

impl ColumnSpec {
    fn new(name: impl Into<String>, format: CellFormat) -> Self {
        Self {
            name: name.into(),
            format,
            nullable: false,
            target: None,
        }
    }

    fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    fn pointing_at(mut self, stem: impl Into<String>, column: impl Into<String>) -> Self {
        self.target = Some((stem.into(), column.into()));
        self
    }
}

/// A table the configuration calls for.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FileSpec {
    /// File name without extension.
    pub stem: String,
    /// What the table holds, for messages.
    pub describes: String,
    /// Whether the table must be present.
    pub required: bool,
    pub columns: Vec<ColumnSpec>,
}

impl FileSpec {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Default file name, used when the table is absent.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, EXTENSIONS[0])
    }
}

/// Every table of a corpus directory, keyed by stem.
#[derive(Debug, Clone, Default)]
pub(crate) struct Layout {
    files: IndexMap<String, FileSpec>,
}

impl Layout {
    /// Derive the expected tables from a configuration.
    pub fn derive(schema: &CorpusSchema) -> Self {
        let mut layout = Self::default();
        for layer in schema.layer.keys() {
            layout.add_layer(schema, layer);
        }
        for name in schema.global_attributes.keys() {
            let id = id_column(name);
            layout.insert(FileSpec {
                stem: format!("{}{}", GLOBAL_FILE_PREFIX, name.to_lowercase()),
                describes: format!("global attribute '{}'", name),
                required: true,
                columns: vec![
                    ColumnSpec::new(id, CellFormat::Int),
                    ColumnSpec::new(name.to_lowercase(), CellFormat::Object),
                ],
            });
        }

        let segment = &schema.first_class.segment;
        let segment_id = id_column(segment);
        layout.insert(FileSpec {
            stem: stem_of(FTS_VECTOR_FILE),
            describes: "full-text-search vectors".to_string(),
            required: false,
            columns: vec![
                ColumnSpec::new(segment_id.clone(), CellFormat::Uuid)
                    .pointing_at(segment.to_lowercase(), segment_id),
                ColumnSpec::new("vector", CellFormat::FtsVector),
            ],
        });
        layout
    }

    fn add_layer(&mut self, schema: &CorpusSchema, layer: &str) {
        let Some(config) = schema.layer.get(layer) else {
            return;
        };
        let stem = layer.to_lowercase();
        let first_class = &schema.first_class;

        let id_format = if layer == first_class.segment {
            CellFormat::Uuid
        } else {
            CellFormat::Int
        };
        let mut columns = vec![ColumnSpec::new(id_column(layer), id_format)];
        if schema.has_media_columns(layer) {
            columns.push(ColumnSpec::new("name", CellFormat::Text).nullable(true));
            columns.push(ColumnSpec::new("media", CellFormat::Object));
        }
        if layer == first_class.token {
            let segment_id = id_column(&first_class.segment);
            columns.push(
                ColumnSpec::new(segment_id.clone(), CellFormat::Uuid)
                    .pointing_at(first_class.segment.to_lowercase(), segment_id),
            );
        }
        for dimension in schema.anchored_dimensions(layer) {
            let format = match dimension {
                Dimension::Stream | Dimension::Time => CellFormat::Range,
                Dimension::Location => CellFormat::XyBox,
            };
            columns.push(
                ColumnSpec::new(dimension.column_name(), format)
                    .nullable(config.is_partially_anchored(dimension)),
            );
        }
        for (attribute, attribute_config) in &config.attributes {
            columns.push(self.add_attribute(&stem, layer, attribute, attribute_config));
        }

        self.insert(FileSpec {
            stem,
            describes: format!("layer '{}'", layer),
            required: true,
            columns,
        });
    }

    /// Register the companion table of an attribute and return its main-table column.
    fn add_attribute(
        &mut self,
        layer_stem: &str,
        layer: &str,
        attribute: &str,
        config: &AttributeConfig,
    ) -> ColumnSpec {
        let kind = config.kind();
        let column = config.column_name(attribute);
        let companion = format!("{}_{}", layer_stem, attribute);
        let describes = format!("{} attribute '{}' of layer '{}'", kind, attribute, layer);

        let spec = match kind {
            AttributeType::Text | AttributeType::Dict => {
                let value_format = if kind == AttributeType::Dict {
                    CellFormat::Object
                } else {
                    CellFormat::Text
                };
                let id = format!("{}_id", attribute);
                self.insert(FileSpec {
                    stem: companion.clone(),
                    describes,
                    required: true,
                    columns: vec![
                        ColumnSpec::new(id.clone(), CellFormat::Int),
                        ColumnSpec::new(attribute, value_format),
                    ],
                });
                ColumnSpec::new(column, CellFormat::Int).pointing_at(companion, id)
            }
            AttributeType::Labels => {
                self.insert(FileSpec {
                    stem: companion,
                    describes,
                    required: true,
                    columns: vec![
                        ColumnSpec::new("bit", CellFormat::Int),
                        ColumnSpec::new("label", CellFormat::Text),
                    ],
                });
                ColumnSpec::new(column, CellFormat::Bits(config.nlabels))
            }
            AttributeType::Ref => {
                let target = config.reference.as_deref().unwrap_or(attribute);
                ColumnSpec::new(column, CellFormat::Int).pointing_at(
                    format!("{}{}", GLOBAL_FILE_PREFIX, target.to_lowercase()),
                    id_column(target),
                )
            }
            AttributeType::Categorical => ColumnSpec::new(
                column,
                CellFormat::Categorical(config.values.clone().unwrap_or_default()),
            ),
            AttributeType::Number => ColumnSpec::new(column, CellFormat::Number),
        };
        spec.nullable(config.nullable)
    }

    fn insert(&mut self, file: FileSpec) {
        self.files.insert(file.stem.clone(), file);
    }

    pub fn get(&self, stem: &str) -> Option<&FileSpec> {
        self.files.get(stem)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileSpec> {
        self.files.values()
    }

    /// Returns true if any column points at this table column.
    pub fn is_target(&self, stem: &str, column: &str) -> bool {
        self.files
            .values()
            .flat_map(|file| file.columns.iter())
            .filter_map(|c| c.target.as_ref())
            .any(|(s, c)| s == stem && c == column)
    }
}

/// Stem of a table file name, if it carries a table extension.
pub(crate) fn table_stem(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?;
    if !EXTENSIONS.contains(&extension) {
        return None;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(String::from)
}

fn stem_of(file: &str) -> String {
    table_stem(Path::new(file)).unwrap_or_else(|| file.to_string())
}

/// Find the file holding a table, preferring `.csv` over `.tsv`.
pub(crate) fn locate(directory: &Path, stem: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{}.{}", stem, extension)))
        .find(|path| path.is_file())
}

/// Field delimiter of a table file.
pub(crate) fn delimiter_for(path: &Path, default: u8) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") => b'\t',
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> CorpusSchema {
        serde_json::from_str(json).unwrap()
    }

    fn sample() -> CorpusSchema {
        config(
            r#"{
                "meta": {"name": "test", "mediaSlots": {"audio": {"mediaType": "audio"}}},
                "firstClass": {"document": "Document", "segment": "Segment", "token": "Token"},
                "layer": {
                    "Document": {"layerType": "span", "contains": "Segment"},
                    "Segment": {"layerType": "span", "contains": "Token"},
                    "Token": {
                        "anchoring": {"stream": true},
                        "attributes": {
                            "form": {"type": "text"},
                            "upos": {"type": "categorical", "values": ["NOUN"]},
                            "speaker": {"ref": "speaker", "nullable": true},
                            "keywords": {"type": "labels", "nlabels": 2},
                            "misc": {"type": "dict"}
                        }
                    }
                },
                "globalAttributes": {"speaker": {"keys": {}}}
            }"#,
        )
    }

    #[test]
    fn test_layer_tables() {
        let layout = Layout::derive(&sample());
        let token = layout.get("token").unwrap();
        let names: Vec<&str> = token.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["token_id", "segment_id", "char_range", "form_id", "upos", "speaker_id", "keywords", "misc_id"]
        );
        assert_eq!(
            token.column("segment_id").unwrap().target,
            Some(("segment".to_string(), "segment_id".to_string()))
        );
        assert!(token.column("speaker_id").unwrap().nullable);
        assert_eq!(token.column("keywords").unwrap().format, CellFormat::Bits(Some(2)));

        let document = layout.get("document").unwrap();
        assert!(document.column("media").is_some());
        assert!(document.column("char_range").is_some());
        assert_eq!(layout.get("segment").unwrap().columns[0].format, CellFormat::Uuid);
    }

    #[test]
    fn test_partial_anchoring_is_nullable() {
        let mut schema = sample();
        let segment = schema.layer.get_mut("Segment").unwrap();
        segment.anchoring.time = true;
        segment.partial_anchoring = vec![Dimension::Time];

        let layout = Layout::derive(&schema);
        let segment = layout.get("segment").unwrap();
        assert!(segment.column("frame_range").unwrap().nullable);
        assert!(!segment.column("char_range").unwrap().nullable);
        // Inherited through contains but filled on every document
        assert!(!layout.get("document").unwrap().column("frame_range").unwrap().nullable);
    }

    #[test]
    fn test_companion_tables() {
        let layout = Layout::derive(&sample());
        assert!(layout.get("token_form").unwrap().required);
        assert_eq!(layout.get("token_misc").unwrap().columns[1].format, CellFormat::Object);
        assert_eq!(layout.get("token_keywords").unwrap().columns[0].name, "bit");
        assert!(layout.get("token_upos").is_none());
        assert!(layout.get("global_attribute_speaker").unwrap().required);
        assert!(!layout.get("fts_vector").unwrap().required);
        assert!(layout.is_target("token_form", "form_id"));
        assert!(layout.is_target("global_attribute_speaker", "speaker_id"));
        assert!(!layout.is_target("token", "token_id"));
    }

    #[test]
    fn test_locate_prefers_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token.tsv"), "token_id\n").unwrap();
        let found = locate(dir.path(), "token").unwrap();
        assert_eq!(delimiter_for(&found, b','), b'\t');

        std::fs::write(dir.path().join("token.csv"), "token_id\n").unwrap();
        let found = locate(dir.path(), "token").unwrap();
        assert_eq!(delimiter_for(&found, b','), b',');
        assert!(locate(dir.path(), "segment").is_none());
    }

    #[test]
    fn test_table_stem() {
        assert_eq!(table_stem(Path::new("token_form.csv")).as_deref(), Some("token_form"));
        assert_eq!(table_stem(Path::new("token.tsv")).as_deref(), Some("token"));
        assert_eq!(table_stem(Path::new("config.json")), None);
        assert_eq!(stem_of(FTS_VECTOR_FILE), "fts_vector");
    }
}
