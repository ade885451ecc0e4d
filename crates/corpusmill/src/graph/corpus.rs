//! The corpus arena and its graph-building API.

use std::collections::HashSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, SchemaViolation};
use crate::schema::{Dimension, GlobalAttributeTable, LayerSchema};
use crate::value::{AttributeValue, GlobalRef};

use super::anchor::{Anchors, Interval, XyBox};
use super::layer::{Layer, LayerId, LayerKey};

/// Attribute holding the surface form of a token.
pub const FORM: &str = "form";

/// Attribute names reserved on the document type for the media columns.
const DOCUMENT_RESERVED: [&str; 2] = ["name", "media"];

static LAYER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid regex"));

static ATTRIBUTE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*$").expect("valid regex"));

/// Configuration for a new corpus.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Corpus name, written to `meta.name`.
    pub name: String,
    /// Name of the document layer type.
    pub document: String,
    /// Name of the segment layer type.
    pub segment: String,
    /// Name of the token layer type.
    pub token: String,
    pub author: String,
    pub description: String,
    pub version: u32,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            name: "corpus".to_string(),
            document: "Document".to_string(),
            segment: "Segment".to_string(),
            token: "Token".to_string(),
            author: String::new(),
            description: String::new(),
            version: 1,
        }
    }
}

/// A corpus under construction.
///
/// Layers live in an arena and are addressed by [`LayerId`]. Parent and child
/// links are ids, so multi-containment (a named entity spanning tokens that
/// already belong to a segment) needs no shared ownership.
#[derive(Debug)]
pub struct Corpus {
    pub(crate) config: CorpusConfig,
    pub(crate) layers: Vec<Layer>,
    pub(crate) schemas: IndexMap<String, LayerSchema>,
    pub(crate) globals: IndexMap<String, GlobalAttributeTable>,
    /// Next free offset in the character stream. Only ever increases.
    pub(crate) cursor: i64,
}

impl Corpus {
    /// Create a corpus with the default first-class type names.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(CorpusConfig {
            name: name.into(),
            ..CorpusConfig::default()
        })
    }

    /// Create a corpus with custom configuration.
    pub fn with_config(config: CorpusConfig) -> Self {
        let mut schemas = IndexMap::new();
        for name in [&config.document, &config.segment, &config.token] {
            schemas
                .entry(name.clone())
                .or_insert_with(|| LayerSchema::new(name.clone()));
        }
        // Token rows always carry a char_range column
        if let Some(token) = schemas.get_mut(&config.token) {
            token.anchorings.insert(Dimension::Stream);
        }

        Self {
            config,
            layers: Vec::new(),
            schemas,
            globals: IndexMap::new(),
            cursor: 0,
        }
    }

    pub fn config(&self) -> &CorpusConfig {
        &self.config
    }

    /// Create a layer of the given type.
    pub fn new_layer(&mut self, layer_type: &str) -> Result<LayerId> {
        self.register_type(layer_type)?;
        let key = (layer_type == self.config.segment).then(|| LayerKey::Uuid(Uuid::new_v4()));
        let id = LayerId(self.layers.len());
        self.layers.push(Layer::new(layer_type, key));
        Ok(id)
    }

    /// Create a token with the given form.
    pub fn new_token(&mut self, form: &str) -> Result<LayerId> {
        let token_type = self.config.token.clone();
        let id = self.new_layer(&token_type)?;
        self.set_attribute(id, FORM, form)?;
        Ok(id)
    }

    /// Set an attribute, replacing any previous value of the same name.
    pub fn set_attribute(
        &mut self,
        id: LayerId,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Result<()> {
        let value = value.into();
        let layer_type = self.layer(id)?.layer_type.clone();
        self.check_attribute_name(&layer_type, name)?;
        if let AttributeValue::Reference(reference) = &value {
            self.check_reference(reference)?;
        }
        self.layer_mut(id)?
            .attributes
            .insert(name.to_string(), value);
        Ok(())
    }

    /// Append a child layer.
    ///
    /// All children of one layer must share a type, and containment must
    /// stay acyclic. Adding the same child twice is a no-op.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) -> Result<()> {
        let child_type = self.layer(child)?.layer_type.clone();
        let parent_layer = self.layer_mut(parent)?;
        if parent_layer.children.contains(&child) {
            return Ok(());
        }
        let parent_type = parent_layer.layer_type.clone();
        if let Some(&first) = parent_layer.children.first() {
            let expected = &self.layers[first.0].layer_type;
            if *expected != child_type {
                return Err(SchemaViolation::MixedChildTypes {
                    parent: parent_type,
                    expected: expected.clone(),
                    found: child_type,
                }
                .into());
            }
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SchemaViolation::ContainmentCycle {
                parent: parent_type,
                child: child_type,
            }
            .into());
        }

        self.layers[parent.0].children.push(child);
        let child_layer = &mut self.layers[child.0];
        if !child_layer.parents.contains(&parent) {
            child_layer.parents.push(parent);
        }
        Ok(())
    }

    /// Append several children, in order.
    pub fn add_children(&mut self, parent: LayerId, children: &[LayerId]) -> Result<()> {
        children
            .iter()
            .try_for_each(|&child| self.add_child(parent, child))
    }

    /// Anchor a layer on a time interval.
    pub fn set_time(&mut self, id: LayerId, lo: i64, hi: i64) -> Result<()> {
        let interval = Interval::new(lo, hi).ok_or(SchemaViolation::InvalidRange {
            dimension: Dimension::Time,
        })?;
        let layer = self.layer_mut(id)?;
        layer.anchors.time = Some(interval);
        layer.pinned.insert(Dimension::Time);
        Ok(())
    }

    /// Anchor a layer on a character range. Token ranges are always allocated
    /// by the corpus and cannot be set.
    pub fn set_char(&mut self, id: LayerId, lo: i64, hi: i64) -> Result<()> {
        self.reject_token_stream(id)?;
        let interval = Interval::new(lo, hi).ok_or(SchemaViolation::InvalidRange {
            dimension: Dimension::Stream,
        })?;
        let layer = self.layer_mut(id)?;
        layer.anchors.stream = Some(interval);
        layer.pinned.insert(Dimension::Stream);
        Ok(())
    }

    /// Anchor a layer on a bounding box.
    pub fn set_xy(&mut self, id: LayerId, x1: i64, y1: i64, x2: i64, y2: i64) -> Result<()> {
        let xy = XyBox::new(x1, y1, x2, y2).ok_or(SchemaViolation::InvalidRange {
            dimension: Dimension::Location,
        })?;
        let layer = self.layer_mut(id)?;
        layer.anchors.location = Some(xy);
        layer.pinned.insert(Dimension::Location);
        Ok(())
    }

    /// Remove a hand-set anchor, letting finalization derive it again.
    pub fn clear_anchor(&mut self, id: LayerId, dimension: Dimension) -> Result<()> {
        if dimension == Dimension::Stream {
            self.reject_token_stream(id)?;
        }
        let layer = self.layer_mut(id)?;
        layer.anchors.clear(dimension);
        layer.pinned.remove(&dimension);
        Ok(())
    }

    /// Attach a media file to a document.
    pub fn set_media(&mut self, id: LayerId, slot: &str, file: &str) -> Result<()> {
        self.check_document(id)?;
        if !ATTRIBUTE_NAME.is_match(slot) {
            return Err(SchemaViolation::InvalidName {
                kind: "media slot",
                name: slot.to_string(),
            }
            .into());
        }
        self.layer_mut(id)?
            .media
            .insert(slot.to_string(), file.to_string());
        Ok(())
    }

    /// Set the display name of a document.
    ///
    /// Names are written next to the media column, so the document must
    /// already carry a media file.
    pub fn set_name(&mut self, id: LayerId, name: &str) -> Result<()> {
        self.check_document(id)?;
        let layer = self.layer_mut(id)?;
        if layer.media.is_empty() {
            return Err(SchemaViolation::NameWithoutMedia {
                layer_type: layer.layer_type.clone(),
            }
            .into());
        }
        layer.name = Some(name.to_string());
        Ok(())
    }

    /// Store a record in a global attribute table and return a handle that can
    /// be set as an attribute value. Equal records share one id.
    pub fn global_attribute(&mut self, name: &str, record: Value) -> Result<GlobalRef> {
        let name = name.to_lowercase();
        if !ATTRIBUTE_NAME.is_match(&name) {
            return Err(SchemaViolation::InvalidName {
                kind: "global attribute",
                name,
            }
            .into());
        }
        let Value::Object(record) = record else {
            return Err(SchemaViolation::NotAnObject { name }.into());
        };
        let table = self
            .globals
            .entry(name.clone())
            .or_insert_with(|| GlobalAttributeTable::new(name.clone()));
        let id = table.insert(record);
        Ok(GlobalRef { name, id })
    }

    /// Identifier of a layer. Segments have one from creation, other layers
    /// once finalized.
    pub fn key(&self, id: LayerId) -> Option<LayerKey> {
        self.layers.get(id.0).and_then(|layer| layer.key)
    }

    /// Anchoring state of a layer.
    pub fn anchors(&self, id: LayerId) -> Option<&Anchors> {
        self.layers.get(id.0).map(|layer| &layer.anchors)
    }

    pub fn layer_type(&self, id: LayerId) -> Option<&str> {
        self.layers.get(id.0).map(|layer| layer.layer_type.as_str())
    }

    pub fn attribute(&self, id: LayerId, name: &str) -> Option<&AttributeValue> {
        self.layers.get(id.0)?.attributes.get(name)
    }

    pub fn is_finalized(&self, id: LayerId) -> bool {
        self.layers.get(id.0).is_some_and(|layer| layer.finalized)
    }

    /// Schema accumulated for a layer type.
    pub fn schema(&self, layer_type: &str) -> Option<&LayerSchema> {
        self.schemas.get(layer_type)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &LayerSchema> {
        self.schemas.values()
    }

    pub fn global(&self, name: &str) -> Option<&GlobalAttributeTable> {
        self.globals.get(name)
    }

    /// Current position of the stream cursor.
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Number of layers created so far.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub(crate) fn layer(&self, id: LayerId) -> Result<&Layer> {
        self.layers
            .get(id.0)
            .ok_or_else(|| SchemaViolation::UnknownLayer(id.0).into())
    }

    /// Mutable access to a layer that is not finalized yet.
    fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer> {
        let layer = self
            .layers
            .get_mut(id.0)
            .ok_or(SchemaViolation::UnknownLayer(id.0))?;
        if layer.finalized {
            return Err(SchemaViolation::Finalized {
                layer_type: layer.layer_type.clone(),
            }
            .into());
        }
        Ok(layer)
    }

    fn register_type(&mut self, layer_type: &str) -> Result<()> {
        if self.schemas.contains_key(layer_type) {
            return Ok(());
        }
        if !LAYER_NAME.is_match(layer_type) || layer_type.eq_ignore_ascii_case("fts") {
            return Err(SchemaViolation::InvalidName {
                kind: "layer type",
                name: layer_type.to_string(),
            }
            .into());
        }
        if let Some(existing) = self
            .schemas
            .keys()
            .find(|name| name.eq_ignore_ascii_case(layer_type))
        {
            return Err(SchemaViolation::NameCollision {
                name: layer_type.to_string(),
                existing: existing.clone(),
            }
            .into());
        }
        self.schemas
            .insert(layer_type.to_string(), LayerSchema::new(layer_type));
        Ok(())
    }

    fn check_attribute_name(&self, layer_type: &str, name: &str) -> Result<()> {
        if !ATTRIBUTE_NAME.is_match(name) {
            return Err(SchemaViolation::InvalidName {
                kind: "attribute",
                name: name.to_string(),
            }
            .into());
        }
        // A lookup column `<name>_id` would clash with the id columns
        let clashes_with_id = name.eq_ignore_ascii_case(layer_type)
            || (layer_type == self.config.token && name.eq_ignore_ascii_case(&self.config.segment));
        let reserved_on_document =
            layer_type == self.config.document && DOCUMENT_RESERVED.contains(&name);
        if clashes_with_id || reserved_on_document {
            return Err(SchemaViolation::ReservedAttribute {
                layer_type: layer_type.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn check_reference(&self, reference: &GlobalRef) -> Result<()> {
        let known = self
            .globals
            .get(&reference.name)
            .is_some_and(|table| table.contains(reference.id));
        if !known {
            return Err(SchemaViolation::UnknownReference {
                name: reference.name.clone(),
                id: reference.id,
            }
            .into());
        }
        Ok(())
    }

    fn check_document(&self, id: LayerId) -> Result<()> {
        let layer = self.layer(id)?;
        if layer.layer_type != self.config.document {
            return Err(SchemaViolation::MediaNotAllowed {
                document: self.config.document.clone(),
                layer_type: layer.layer_type.clone(),
            }
            .into());
        }
        Ok(())
    }

    fn reject_token_stream(&self, id: LayerId) -> Result<()> {
        if self.layer(id)?.layer_type == self.config.token {
            return Err(SchemaViolation::TokenStreamOverride.into());
        }
        Ok(())
    }

    /// Returns true if `candidate` is `id` or one of its ancestors.
    fn is_ancestor(&self, candidate: LayerId, id: LayerId) -> bool {
        let mut stack = vec![id];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == candidate {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.layers[current.0].parents.iter().copied());
            }
        }
        false
    }
}
