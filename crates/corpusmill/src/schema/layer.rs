//! Per layer-type accumulator of attribute definitions and output rows.

use indexmap::{IndexMap, IndexSet};

use crate::dictionary::LookupDictionary;
use crate::graph::LayerKey;
use crate::value::empty_structured;

use super::config::KeySchema;
use super::row::{Cell, Row};
use super::types::{AttributeType, Dimension, MediaType};

/// Definition of one attribute, accumulated over every instance of a layer type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    /// Encoding type, fixed by the first occurrence.
    pub attribute_type: AttributeType,
    /// Whether some row lacks a value for this attribute.
    pub nullable: bool,
    /// Side-table dictionary for text, dict and labels attributes.
    pub dictionary: Option<LookupDictionary>,
    /// Accreted key schema of a dict attribute.
    pub keys: Option<IndexMap<String, KeySchema>>,
    /// Global attribute targeted by a ref attribute.
    pub reference: Option<String>,
}

impl AttributeSpec {
    /// Create a definition for a newly seen attribute.
    pub fn new(attribute_type: AttributeType, nullable: bool) -> Self {
        Self {
            attribute_type,
            nullable,
            dictionary: attribute_type
                .needs_dictionary()
                .then(LookupDictionary::new),
            keys: (attribute_type == AttributeType::Dict).then(IndexMap::new),
            reference: None,
        }
    }

    /// Dictionary of this attribute, created on first use.
    pub(crate) fn dictionary_mut(&mut self) -> &mut LookupDictionary {
        self.dictionary.get_or_insert_with(LookupDictionary::new)
    }

    /// Number of distinct values (or labels) interned so far.
    pub fn distinct_count(&self) -> usize {
        self.dictionary.as_ref().map_or(0, LookupDictionary::len)
    }

    /// Cell standing in for a value this row does not carry.
    ///
    /// Lookup-typed attributes intern an empty placeholder so the row still
    /// gets a real id; labels get an all-zero bit-string.
    pub(crate) fn placeholder(&mut self) -> Cell {
        self.nullable = true;
        match self.attribute_type {
            AttributeType::Text | AttributeType::Categorical => {
                Cell::Lookup(self.dictionary_mut().intern(""))
            }
            AttributeType::Dict => Cell::Lookup(self.dictionary_mut().intern(&empty_structured())),
            AttributeType::Labels => Cell::Bits("0".repeat(self.distinct_count())),
            AttributeType::Number | AttributeType::Ref => Cell::Empty,
        }
    }
}

/// How often a media slot is filled across the instances of a layer type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUsage {
    pub media_type: MediaType,
    pub count: u64,
}

/// Everything known about one layer type.
#[derive(Debug, Clone)]
pub struct LayerSchema {
    name: String,
    pub(crate) attributes: IndexMap<String, AttributeSpec>,
    pub(crate) contains: IndexSet<String>,
    pub(crate) anchorings: IndexSet<Dimension>,
    pub(crate) counter: u64,
    /// Memo of the stream-participation probe. Never reset once set.
    pub(crate) in_stream: bool,
    pub(crate) media: IndexMap<String, MediaUsage>,
    pub(crate) rows: Vec<Row>,
    pub(crate) vectors: Vec<(LayerKey, String)>,
}

impl LayerSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            contains: IndexSet::new(),
            anchorings: IndexSet::new(),
            counter: 0,
            in_stream: false,
            media: IndexMap::new(),
            rows: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Layer type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercased name used for file and column names.
    pub fn file_stem(&self) -> String {
        self.name.to_lowercase()
    }

    /// Attribute definitions, in column order.
    pub fn attributes(&self) -> &IndexMap<String, AttributeSpec> {
        &self.attributes
    }

    /// Get an attribute definition by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    /// Child layer types ever contained, in first-seen order.
    pub fn contains(&self) -> impl Iterator<Item = &str> {
        self.contains.iter().map(String::as_str)
    }

    /// Returns true if any instance was ever anchored on the dimension.
    pub fn is_anchored(&self, dimension: Dimension) -> bool {
        self.anchorings.contains(&dimension)
    }

    /// Anchoring dimensions in use, in column order.
    pub fn dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.anchorings.contains(d))
            .collect()
    }

    /// Number of finalized instances.
    pub fn instance_count(&self) -> u64 {
        self.counter
    }

    /// Number of buffered rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Buffered rows, in finalization order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns true if some instance carries media.
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}
