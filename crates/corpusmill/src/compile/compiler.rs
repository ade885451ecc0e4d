//! The compile pass: rewrite buffered rows, derive `config.json`, emit files.

use std::path::Path;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::graph::Corpus;
use crate::schema::{
    Anchoring, AttributeConfig, AttributeType, CONFIG_FILE, Cell, CorpusSchema, Dimension,
    FirstClass, GlobalAttributeConfig, LayerConfig, LayerSchema, LayerType, MediaSlot, Meta,
    id_column,
};

use super::output::StagedOutput;
use super::{CompileOptions, CompileReport, FTS_VECTOR_FILE};

/// Compiles a corpus into its output directory.
#[derive(Debug, Clone, Default)]
pub struct CorpusCompiler {
    options: CompileOptions,
}

impl CorpusCompiler {
    /// Create a compiler with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler with custom thresholds.
    pub fn with_options(options: CompileOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Finalize pending roots, rewrite every buffer once, then write all
    /// tables and `config.json` into `destination`.
    ///
    /// Files are staged in a temporary directory inside `destination` and
    /// only moved into place once every one of them was written.
    pub fn compile(
        &self,
        mut corpus: Corpus,
        destination: impl AsRef<Path>,
    ) -> Result<CompileReport> {
        let destination = destination.as_ref();
        corpus.finalize_pending()?;

        let token = corpus.config.token.clone();
        for schema in corpus.schemas.values_mut() {
            schema.backfill();
            let exempt: &[String] = if schema.name() == token {
                &self.options.literal_token_attributes
            } else {
                &[]
            };
            let promoted = schema.promote_categorical(&self.options, exempt);
            if !promoted.is_empty() {
                debug!(layer_type = %schema.name(), ?promoted, "inlined categorical attributes");
            }
            schema.pad_labels();
        }

        let compiled_at = Utc::now();
        let config = build_config(&corpus, compiled_at);

        let mut output = StagedOutput::create(destination)?;
        for schema in corpus.schemas.values() {
            write_layer(&mut output, &config, schema)?;
            write_side_tables(&mut output, schema)?;
        }
        if let Some(segment) = corpus.schemas.get(&corpus.config.segment) {
            let headers = vec![id_column(segment.name()), "vector".to_string()];
            let rows = segment
                .vectors
                .iter()
                .map(|(key, vector)| vec![key.to_string(), vector.clone()]);
            output.write_table(FTS_VECTOR_FILE, &headers, rows)?;
        }
        for table in corpus.globals.values() {
            let headers = vec![id_column(table.name()), table.name().to_string()];
            let rows = table
                .records
                .iter()
                .map(|(id, record)| vec![id.to_string(), record.to_string()]);
            output.write_table(&format!("{}.csv", table.file_stem()), &headers, rows)?;
        }
        output.write_json(CONFIG_FILE, &config)?;
        let files = output.commit()?;

        info!(
            destination = %destination.display(),
            layers = config.layer.len(),
            files = files.len(),
            stream_length = corpus.cursor,
            "compiled corpus"
        );

        Ok(CompileReport {
            destination: destination.to_path_buf(),
            files,
            schema: config,
            compiled_at,
        })
    }
}

/// Derive the configuration from the accumulated schemas.
fn build_config(corpus: &Corpus, compiled_at: DateTime<Utc>) -> CorpusSchema {
    let settings = &corpus.config;
    let first_class = FirstClass {
        document: settings.document.clone(),
        segment: settings.segment.clone(),
        token: settings.token.clone(),
    };

    let media_slots = corpus
        .schemas
        .get(&settings.document)
        .map(|document| {
            document
                .media
                .iter()
                .map(|(slot, usage)| {
                    let slot_config = MediaSlot {
                        media_type: usage.media_type,
                        is_optional: usage.count < document.instance_count(),
                    };
                    (slot.clone(), slot_config)
                })
                .collect()
        })
        .unwrap_or_default();

    let layer = corpus
        .schemas
        .values()
        .map(|schema| (schema.name().to_string(), layer_config(schema, &first_class)))
        .collect();

    let global_attributes = corpus
        .globals
        .values()
        .map(|table| {
            let config = GlobalAttributeConfig {
                keys: table.keys().clone(),
            };
            (table.name().to_string(), config)
        })
        .collect();

    let mut config = CorpusSchema {
        meta: Meta {
            name: settings.name.clone(),
            author: settings.author.clone(),
            corpus_description: settings.description.clone(),
            date: compiled_at.format("%Y-%m-%d").to_string(),
            version: settings.version,
            media_slots,
        },
        first_class,
        layer,
        global_attributes,
    };
    mark_partial_anchoring(&mut config, corpus);
    config
}

/// Record, per layer type, the anchored dimensions some rows have no value on.
///
/// Anchoring is inherited through `contains` and remembered once a type
/// joins the stream, so a column can exist for rows that never got an anchor.
fn mark_partial_anchoring(config: &mut CorpusSchema, corpus: &Corpus) {
    for schema in corpus.schemas.values() {
        let partial: Vec<Dimension> = config
            .anchored_dimensions(schema.name())
            .into_iter()
            .filter(|&dimension| schema.rows.iter().any(|row| !row.anchors.has(dimension)))
            .collect();
        if partial.is_empty() {
            continue;
        }
        debug!(layer_type = %schema.name(), ?partial, "partially anchored layer type");
        if let Some(layer) = config.layer.get_mut(schema.name()) {
            layer.partial_anchoring = partial;
        }
    }
}

fn layer_config(schema: &LayerSchema, first_class: &FirstClass) -> LayerConfig {
    let first_class_names = [&first_class.document, &first_class.segment, &first_class.token];
    let contains = schema
        .contains
        .iter()
        .find(|child| first_class_names.contains(child))
        .or_else(|| schema.contains.first())
        .cloned();
    let layer_type = if contains.is_some() {
        LayerType::Span
    } else {
        LayerType::Unit
    };

    let attributes: IndexMap<String, AttributeConfig> = schema
        .attributes()
        .iter()
        .map(|(name, spec)| {
            let kind = spec.attribute_type;
            let config = AttributeConfig {
                attribute_type: Some(kind),
                nullable: spec.nullable,
                values: (kind == AttributeType::Categorical).then(|| {
                    spec.dictionary
                        .iter()
                        .flat_map(|d| d.values())
                        .map(String::from)
                        .collect()
                }),
                keys: (kind == AttributeType::Dict).then(|| spec.keys.clone().unwrap_or_default()),
                nlabels: (kind == AttributeType::Labels).then(|| spec.distinct_count()),
                reference: spec.reference.clone(),
            };
            (name.clone(), config)
        })
        .collect();

    LayerConfig {
        anchoring: Anchoring {
            stream: schema.is_anchored(Dimension::Stream),
            time: schema.is_anchored(Dimension::Time),
            location: schema.is_anchored(Dimension::Location),
        },
        layer_type,
        contains,
        attributes,
        partial_anchoring: Vec::new(),
    }
}

/// Write the main table of a layer type.
fn write_layer(output: &mut StagedOutput, config: &CorpusSchema, schema: &LayerSchema) -> Result<()> {
    let name = schema.name();
    let headers = config.main_columns(name);
    let dimensions = config.anchored_dimensions(name);
    let with_media = config.has_media_columns(name);
    let is_token = name == config.first_class.token;

    let mut rows = Vec::with_capacity(schema.rows.len());
    for row in &schema.rows {
        let mut cells = Vec::with_capacity(headers.len());
        cells.push(row.id.to_string());
        if with_media {
            cells.push(row.name.clone().unwrap_or_default());
            cells.push(serde_json::to_string(&row.media)?);
        }
        if is_token {
            cells.push(row.segment.map(|s| s.to_string()).unwrap_or_default());
        }
        for &dimension in &dimensions {
            cells.push(row.anchors.render(dimension).unwrap_or_default());
        }
        cells.extend(row.cells.iter().map(Cell::render));
        rows.push(cells);
    }

    output.write_table(&format!("{}.csv", schema.file_stem()), &headers, rows)
}

/// Write the lookup tables of text, dict and labels attributes.
fn write_side_tables(output: &mut StagedOutput, schema: &LayerSchema) -> Result<()> {
    for (attribute, spec) in schema.attributes() {
        let headers = match spec.attribute_type {
            AttributeType::Text | AttributeType::Dict => {
                vec![format!("{}_id", attribute), attribute.clone()]
            }
            AttributeType::Labels => vec!["bit".to_string(), "label".to_string()],
            AttributeType::Categorical | AttributeType::Number | AttributeType::Ref => continue,
        };
        let Some(dictionary) = spec.dictionary.as_ref() else {
            continue;
        };
        let rows = dictionary
            .iter()
            .map(|(id, value)| vec![id.to_string(), value.to_string()]);
        let file = format!("{}_{}.csv", schema.file_stem(), attribute);
        output.write_table(&file, &headers, rows)?;
    }
    Ok(())
}
