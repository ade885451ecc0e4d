//! Core type definitions for schema representation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Encoding type of an attribute column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// Free text, dictionary-encoded in a side table.
    Text,
    /// Low-cardinality text inlined into the main table.
    Categorical,
    /// Integer or floating-point scalar.
    Number,
    /// Set of label names, encoded as a bit-string.
    Labels,
    /// Structured key/value record, dictionary-encoded as canonical JSON.
    Dict,
    /// Id of a record in a global attribute table.
    Ref,
}

impl AttributeType {
    /// Returns true if values of this type are interned in a per-attribute dictionary.
    pub fn needs_dictionary(&self) -> bool {
        matches!(
            self,
            AttributeType::Text | AttributeType::Dict | AttributeType::Labels
        )
    }

    /// Returns true if the main-table column holds an id instead of a literal.
    pub fn is_lookup_column(&self) -> bool {
        matches!(
            self,
            AttributeType::Text | AttributeType::Dict | AttributeType::Ref
        )
    }

    /// Name of the main-table column for an attribute of this type.
    pub fn column_name(&self, attribute: &str) -> String {
        if self.is_lookup_column() {
            format!("{}_id", attribute)
        } else {
            attribute.to_string()
        }
    }

    /// Lowercase label, as written in `config.json`.
    pub fn label(&self) -> &'static str {
        match self {
            AttributeType::Text => "text",
            AttributeType::Categorical => "categorical",
            AttributeType::Number => "number",
            AttributeType::Labels => "labels",
            AttributeType::Dict => "dict",
            AttributeType::Ref => "ref",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An anchoring dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Character offsets in the corpus stream.
    Stream,
    /// Time interval, typically frames of a media file.
    Time,
    /// Bounding box on a page or image.
    Location,
}

impl Dimension {
    /// All dimensions, in column order.
    pub const ALL: [Dimension; 3] = [Dimension::Stream, Dimension::Time, Dimension::Location];

    /// Name of the table column holding this dimension.
    pub fn column_name(&self) -> &'static str {
        match self {
            Dimension::Stream => "char_range",
            Dimension::Time => "frame_range",
            Dimension::Location => "xy_box",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Dimension::Stream => "stream",
            Dimension::Time => "time",
            Dimension::Location => "location",
        };
        f.write_str(label)
    }
}

/// Structural role of a layer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    /// A leaf that contains no other layers.
    #[default]
    Unit,
    /// A layer that contains other layers.
    Span,
    /// A layer relating other layers. Not produced by the compiler.
    Relation,
}

/// Kind of media a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    const AUDIO_EXTENSIONS: &'static [&'static str] = &["mp3", "wav", "ogg", "oga", "flac", "m4a", "aac", "opus"];

    /// Infer the media type from a file name's extension.
    pub fn from_file_name(file: &str) -> Self {
        let extension = file
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if Self::AUDIO_EXTENSIONS.contains(&extension.as_str()) {
            MediaType::Audio
        } else {
            MediaType::Video
        }
    }
}
