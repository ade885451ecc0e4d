//! Serde model of the `config.json` emitted next to the corpus tables.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, Result};

use super::types::{AttributeType, Dimension, LayerType, MediaType};

/// Name of the configuration file inside a corpus directory.
pub const CONFIG_FILE: &str = "config.json";

/// Name of the id column of a layer or global attribute table.
pub fn id_column(name: &str) -> String {
    format!("{}_id", name.to_lowercase())
}

/// The whole corpus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusSchema {
    pub meta: Meta,
    pub first_class: FirstClass,
    pub layer: IndexMap<String, LayerConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub global_attributes: IndexMap<String, GlobalAttributeConfig>,
}

/// Descriptive metadata about the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub corpus_description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub media_slots: IndexMap<String, MediaSlot>,
}

fn default_version() -> u32 {
    1
}

/// A media file slot carried by each document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSlot {
    pub media_type: MediaType,
    #[serde(default)]
    pub is_optional: bool,
}

/// Names of the three first-class layer types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstClass {
    pub document: String,
    pub segment: String,
    pub token: String,
}

/// Which dimensions a layer type is anchored on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchoring {
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub time: bool,
    #[serde(default)]
    pub location: bool,
}

/// Configuration of one layer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    #[serde(default)]
    pub anchoring: Anchoring,
    #[serde(default)]
    pub layer_type: LayerType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, AttributeConfig>,
    /// Anchored dimensions that some instances of the type have no value on.
    /// Their columns accept empty cells.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partial_anchoring: Vec<Dimension>,
}

impl LayerConfig {
    /// Returns true if the anchoring column of `dimension` may be empty.
    pub fn is_partially_anchored(&self, dimension: Dimension) -> bool {
        self.partial_anchoring.contains(&dimension)
    }
}

/// Configuration of one attribute of a layer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    #[serde(default)]
    pub nullable: bool,
    /// Allowed values of a categorical attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    /// Key schema of a dict attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<IndexMap<String, KeySchema>>,
    /// Bit-string width of a labels attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlabels: Option<usize>,
    /// Global attribute referenced by a ref attribute.
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl AttributeConfig {
    /// Effective type: a `ref` target wins over the declared type.
    pub fn kind(&self) -> AttributeType {
        if self.reference.is_some() {
            AttributeType::Ref
        } else {
            self.attribute_type.unwrap_or(AttributeType::Text)
        }
    }

    /// Name of the main-table column for this attribute.
    pub fn column_name(&self, attribute: &str) -> String {
        self.kind().column_name(attribute)
    }
}

/// Inferred type of one key of a structured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeySchema {
    #[serde(rename = "type")]
    pub key_type: AttributeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<IndexMap<String, KeySchema>>,
}

impl KeySchema {
    pub fn scalar(key_type: AttributeType) -> Self {
        Self {
            key_type,
            keys: None,
        }
    }
}

/// Configuration of one global attribute table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAttributeConfig {
    #[serde(default)]
    pub keys: IndexMap<String, KeySchema>,
}

impl CorpusSchema {
    /// Look up a layer configuration by its case-insensitive file stem.
    pub fn layer_by_stem(&self, stem: &str) -> Option<(&str, &LayerConfig)> {
        self.layer
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(stem))
            .map(|(name, config)| (name.as_str(), config))
    }

    /// Check whether a layer is anchored on a dimension, directly or through
    /// the chain of `contains` relationships.
    pub fn is_anchored(&self, layer: &str, dimension: Dimension) -> bool {
        let mut current = layer;
        let mut seen: Vec<&str> = Vec::new();
        while let Some(config) = self.layer.get(current) {
            let anchored = match dimension {
                Dimension::Stream => config.anchoring.stream,
                Dimension::Time => config.anchoring.time,
                Dimension::Location => config.anchoring.location,
            };
            if anchored {
                return true;
            }
            seen.push(current);
            match config.contains.as_deref() {
                Some(next) if !seen.contains(&next) => current = next,
                _ => return false,
            }
        }
        false
    }

    /// Dimensions a layer's table carries a column for, in column order.
    pub fn anchored_dimensions(&self, layer: &str) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.is_anchored(layer, *d))
            .collect()
    }

    /// Returns true if the layer's table carries the `name` and `media` columns.
    pub fn has_media_columns(&self, layer: &str) -> bool {
        layer == self.first_class.document && !self.meta.media_slots.is_empty()
    }

    /// Header of a layer's main table.
    pub fn main_columns(&self, layer: &str) -> Vec<String> {
        let mut columns = vec![id_column(layer)];
        if self.has_media_columns(layer) {
            columns.push("name".to_string());
            columns.push("media".to_string());
        }
        if layer == self.first_class.token {
            columns.push(id_column(&self.first_class.segment));
        }
        columns.extend(
            self.anchored_dimensions(layer)
                .iter()
                .map(|d| d.column_name().to_string()),
        );
        if let Some(config) = self.layer.get(layer) {
            columns.extend(
                config
                    .attributes
                    .iter()
                    .map(|(name, attribute)| attribute.column_name(name)),
            );
        }
        columns
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CorpusError::io(path, e))?;
        let schema = serde_json::from_reader(BufReader::new(file))?;
        Ok(schema)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CorpusError::io(path, e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
