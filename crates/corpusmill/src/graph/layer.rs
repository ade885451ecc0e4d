//! Layer instances stored in the corpus arena.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::schema::Dimension;
use crate::value::AttributeValue;

use super::anchor::Anchors;

/// Stable index of a layer in its corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    /// Position of the layer in creation order.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier written to the id column of a layer's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKey {
    /// Sequential per-type id, starting at 1.
    Seq(u64),
    /// Random id of a segment, fixed at creation.
    Uuid(Uuid),
}

impl LayerKey {
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            LayerKey::Uuid(uuid) => Some(*uuid),
            LayerKey::Seq(_) => None,
        }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKey::Seq(id) => write!(f, "{}", id),
            LayerKey::Uuid(uuid) => write!(f, "{}", uuid),
        }
    }
}

/// One layer instance.
#[derive(Debug, Clone)]
pub(crate) struct Layer {
    pub layer_type: String,
    /// Set at creation for segments, at finalization for everything else.
    pub key: Option<LayerKey>,
    pub attributes: IndexMap<String, AttributeValue>,
    pub children: Vec<LayerId>,
    pub parents: Vec<LayerId>,
    pub anchors: Anchors,
    /// Dimensions set by hand, which finalization must not overwrite.
    pub pinned: BTreeSet<Dimension>,
    pub name: Option<String>,
    pub media: BTreeMap<String, String>,
    pub finalized: bool,
}

impl Layer {
    pub fn new(layer_type: impl Into<String>, key: Option<LayerKey>) -> Self {
        Self {
            layer_type: layer_type.into(),
            key,
            attributes: IndexMap::new(),
            children: Vec::new(),
            parents: Vec::new(),
            anchors: Anchors::default(),
            pinned: BTreeSet::new(),
            name: None,
            media: BTreeMap::new(),
            finalized: false,
        }
    }
}
