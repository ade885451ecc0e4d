//! Finalization: postorder resolution of anchors, ids and rows.
//!
//! Finalizing a layer finalizes its children first (in insertion order), then
//! derives the layer's own anchoring from theirs and appends one row to its
//! type's buffer. Tokens and placeholders advance the shared stream cursor, so
//! the order of `finalize` calls is the order of the character stream.

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SchemaViolation};
use crate::schema::{
    AttributeSpec, AttributeType, Cell, Dimension, LayerSchema, MediaType, MediaUsage, Row,
    label_bits,
};
use crate::value::{AttributeValue, accrete_keys, canonical_json, canonicalize, escape_fts};

use super::anchor::{Anchors, Interval};
use super::corpus::{Corpus, FORM};
use super::layer::{LayerId, LayerKey};

impl Corpus {
    /// Finalize a layer and everything it contains.
    ///
    /// Finalizing an already finalized layer is a no-op. After this call the
    /// layer and its descendants are immutable.
    pub fn finalize(&mut self, id: LayerId) -> Result<()> {
        if self.layer(id)?.finalized {
            return Ok(());
        }
        let start = self.cursor;
        self.finalize_layer(id)?;
        debug!(
            layer = %id,
            layer_type = %self.layers[id.0].layer_type,
            stream_start = start,
            stream_end = self.cursor,
            "finalized layer tree"
        );
        Ok(())
    }

    /// Finalize every root layer that is still pending, in creation order.
    pub(crate) fn finalize_pending(&mut self) -> Result<()> {
        let pending: Vec<LayerId> = self
            .layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.parents.is_empty() && !layer.finalized)
            .map(|(index, _)| LayerId(index))
            .collect();
        pending.into_iter().try_for_each(|id| self.finalize(id))
    }

    fn finalize_layer(&mut self, id: LayerId) -> Result<()> {
        let layer = &self.layers[id.0];
        if layer.finalized {
            return Ok(());
        }
        let layer_type = layer.layer_type.clone();
        let is_token = layer_type == self.config.token;
        let is_segment = layer_type == self.config.segment;
        let children = layer.children.clone();

        let counter = {
            let schema = self.schema_mut(&layer_type);
            schema.counter += 1;
            schema.counter
        };

        let mut segment = None;
        let mut vector = None;
        if is_token {
            let length = token_length(self.layers[id.0].attributes.get(FORM))?;
            segment = Some(self.find_segment(id).ok_or_else(|| {
                SchemaViolation::MissingSegment {
                    segment: self.config.segment.clone(),
                }
            })?);
            let interval = self.allocate(length + 1);
            self.layers[id.0].anchors.stream = Some(interval);
        } else if !children.is_empty() {
            for &child in &children {
                self.finalize_layer(child)?;
            }
            let mut derived = Anchors::default();
            for &child in &children {
                derived.absorb(&self.layers[child.0].anchors);
            }
            let child_type = self.layers[children[0].0].layer_type.clone();
            self.schema_mut(&layer_type).contains.insert(child_type);

            let layer = &mut self.layers[id.0];
            let pinned = layer.pinned.clone();
            layer.anchors.fill_from(&derived, &pinned);

            if is_segment {
                vector = self.fts_vector(&children);
                if self.layers[id.0].anchors.stream.is_none() {
                    let interval = self.allocate(1);
                    self.layers[id.0].anchors.stream = Some(interval);
                }
            }
        } else if self.layers[id.0].anchors.stream.is_none()
            && (is_segment || self.participates_in_stream(id, &layer_type))
        {
            let interval = self.allocate(1);
            self.layers[id.0].anchors.stream = Some(interval);
        }

        let key = self.layers[id.0]
            .key
            .unwrap_or(LayerKey::Seq(counter));
        self.layers[id.0].key = Some(key);

        self.register_attributes(id, &layer_type, counter)?;
        let cells = self.encode_cells(id, &layer_type);

        let layer = &self.layers[id.0];
        let row = Row {
            id: key,
            segment,
            name: layer.name.clone(),
            media: layer.media.clone(),
            anchors: layer.anchors,
            cells,
        };
        let dimensions: Vec<_> = layer.anchors.dimensions().collect();
        let media: Vec<(String, MediaType)> = layer
            .media
            .iter()
            .map(|(slot, file)| (slot.clone(), MediaType::from_file_name(file)))
            .collect();

        let schema = self.schema_mut(&layer_type);
        schema.anchorings.extend(dimensions);
        for (slot, media_type) in media {
            schema
                .media
                .entry(slot)
                .or_insert(MediaUsage {
                    media_type,
                    count: 0,
                })
                .count += 1;
        }
        if let Some(vector) = vector {
            schema.vectors.push((key, vector));
        }
        schema.rows.push(row);

        self.layers[id.0].finalized = true;
        Ok(())
    }

    /// Reserve `length` characters of the stream.
    fn allocate(&mut self, length: i64) -> Interval {
        let lo = self.cursor;
        self.cursor += length;
        Interval { lo, hi: self.cursor }
    }

    /// Nearest segment ancestor: direct parents first, then depth-first
    /// through each parent's own ancestors.
    fn find_segment(&self, id: LayerId) -> Option<Uuid> {
        let mut visited = HashSet::new();
        self.find_segment_from(id, &mut visited)
    }

    fn find_segment_from(&self, id: LayerId, visited: &mut HashSet<LayerId>) -> Option<Uuid> {
        let parents = &self.layers[id.0].parents;
        if let Some(segment) = parents
            .iter()
            .map(|parent| &self.layers[parent.0])
            .find(|parent| parent.layer_type == self.config.segment)
        {
            return segment.key.and_then(|key| key.as_uuid());
        }
        for &parent in parents {
            if visited.insert(parent) {
                if let Some(found) = self.find_segment_from(parent, visited) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Whether a childless layer of this type takes a place in the stream.
    ///
    /// It does when some other layer type contained by one of its ancestors is
    /// stream-anchored. A positive answer is remembered for the whole type.
    fn participates_in_stream(&mut self, id: LayerId, layer_type: &str) -> bool {
        if self.schemas.get(layer_type).is_some_and(|s| s.in_stream) {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack: Vec<LayerId> = self.layers[id.0].parents.clone();
        let mut found = false;
        while let Some(ancestor) = stack.pop() {
            if !visited.insert(ancestor) {
                continue;
            }
            let ancestor = &self.layers[ancestor.0];
            found = ancestor.children.iter().any(|child| {
                let child_type = &self.layers[child.0].layer_type;
                child_type != layer_type && self.is_stream_type(child_type)
            });
            if found {
                break;
            }
            stack.extend(ancestor.parents.iter().copied());
        }
        if found {
            self.schema_mut(layer_type).in_stream = true;
        }
        found
    }

    fn is_stream_type(&self, layer_type: &str) -> bool {
        layer_type == self.config.token
            || layer_type == self.config.segment
            || self
                .schemas
                .get(layer_type)
                .is_some_and(|s| s.in_stream || s.is_anchored(Dimension::Stream))
    }

    /// Full-text-search vector of a segment: one `'<index><value>':<position>`
    /// token per text attribute of each child.
    fn fts_vector(&self, children: &[LayerId]) -> Option<String> {
        let mut tokens = Vec::new();
        for (position, child) in children.iter().enumerate() {
            let child = &self.layers[child.0];
            let Some(schema) = self.schemas.get(&child.layer_type) else {
                continue;
            };
            for (index, (name, spec)) in schema.attributes.iter().enumerate() {
                if !matches!(
                    spec.attribute_type,
                    AttributeType::Text | AttributeType::Categorical
                ) {
                    continue;
                }
                if let Some(AttributeValue::Text(value)) = child.attributes.get(name) {
                    tokens.push(format!(
                        "'{}{}':{}",
                        index + 1,
                        escape_fts(value),
                        position + 1
                    ));
                }
            }
        }
        (!tokens.is_empty()).then(|| tokens.join(" "))
    }

    /// Add attributes seen for the first time to the type schema and check
    /// the others still encode under their established type.
    fn register_attributes(&mut self, id: LayerId, layer_type: &str, counter: u64) -> Result<()> {
        let attributes = self.layers[id.0].attributes.clone();
        let schema = self.schema_mut(layer_type);
        for (name, value) in &attributes {
            let found = value.attribute_type();
            let reference = match value {
                AttributeValue::Reference(r) => Some(r.name.clone()),
                _ => None,
            };
            let Some(spec) = schema.attributes.get(name) else {
                let mut spec = AttributeSpec::new(found, counter > 1);
                spec.reference = reference;
                schema.attributes.insert(name.clone(), spec);
                continue;
            };
            if spec.attribute_type != found {
                return Err(SchemaViolation::TypeMismatch {
                    layer_type: layer_type.to_string(),
                    attribute: name.clone(),
                    expected: spec.attribute_type,
                    found,
                }
                .into());
            }
            if let (Some(expected), Some(found)) = (&spec.reference, reference) {
                if *expected != found {
                    return Err(SchemaViolation::ReferenceMismatch {
                        layer_type: layer_type.to_string(),
                        attribute: name.clone(),
                        expected: expected.clone(),
                        found,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Encode one cell per known attribute, in schema order.
    fn encode_cells(&mut self, id: LayerId, layer_type: &str) -> Vec<Cell> {
        let attributes = std::mem::take(&mut self.layers[id.0].attributes);
        let schema = self.schema_mut(layer_type);
        let mut cells = Vec::with_capacity(schema.attributes.len());
        for (name, spec) in schema.attributes.iter_mut() {
            let cell = match attributes.get(name) {
                None => spec.placeholder(),
                Some(value) => encode(spec, value),
            };
            cells.push(cell);
        }
        // Attributes stay readable through the corpus after finalization
        self.layers[id.0].attributes = attributes;
        cells
    }

    fn schema_mut(&mut self, layer_type: &str) -> &mut LayerSchema {
        self.schemas
            .entry(layer_type.to_string())
            .or_insert_with(|| LayerSchema::new(layer_type))
    }
}

/// Character length of a token form.
fn token_length(form: Option<&AttributeValue>) -> Result<i64> {
    match form {
        Some(AttributeValue::Text(form)) if !form.is_empty() => {
            Ok(i64::try_from(form.chars().count()).unwrap_or(i64::MAX))
        }
        Some(AttributeValue::Text(_)) | None => Err(SchemaViolation::EmptyTokenForm.into()),
        Some(other) => Err(SchemaViolation::TokenFormNotText {
            found: other.attribute_type(),
        }
        .into()),
    }
}

fn encode(spec: &mut AttributeSpec, value: &AttributeValue) -> Cell {
    match value {
        AttributeValue::Text(text) => {
            if text.is_empty() {
                spec.nullable = true;
            }
            Cell::Lookup(spec.dictionary_mut().intern(text))
        }
        AttributeValue::Number(number) => Cell::Literal(number.to_string()),
        AttributeValue::Labels(labels) => {
            let dictionary = spec.dictionary_mut();
            let ids: Vec<u32> = labels.iter().map(|label| dictionary.intern(label)).collect();
            Cell::Bits(label_bits(&ids, dictionary.len()))
        }
        AttributeValue::Structured(map) => {
            let canonical = canonicalize(map.clone());
            accrete_keys(spec.keys.get_or_insert_with(Default::default), &canonical);
            Cell::Lookup(spec.dictionary_mut().intern(&canonical_json(&canonical)))
        }
        AttributeValue::Reference(reference) => Cell::Lookup(reference.id),
    }
}
