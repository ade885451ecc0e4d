//! Whole-buffer rewrites that need every instance of a type to be known.

use tracing::debug;

use crate::schema::{AttributeType, Cell, LayerSchema, pad_bits};

use super::CompileOptions;

impl LayerSchema {
    /// Extend rows written before an attribute first appeared.
    pub(crate) fn backfill(&mut self) {
        let width = self.attributes.len();
        for row in &mut self.rows {
            while row.cells.len() < width {
                let Some((_, spec)) = self.attributes.get_index_mut(row.cells.len()) else {
                    break;
                };
                row.cells.push(spec.placeholder());
            }
        }
    }

    /// Turn small text attributes into categorical ones, inlining the value
    /// in place of the dictionary id. Returns the promoted attribute names.
    pub(crate) fn promote_categorical(
        &mut self,
        options: &CompileOptions,
        exempt: &[String],
    ) -> Vec<String> {
        let layer_type = self.name().to_string();
        let mut promoted = Vec::new();
        for (index, (name, spec)) in self.attributes.iter_mut().enumerate() {
            if spec.attribute_type != AttributeType::Text || exempt.contains(name) {
                continue;
            }
            let Some(dictionary) = spec.dictionary.as_ref() else {
                continue;
            };
            let eligible = dictionary.len() <= options.max_categorical_values
                && dictionary
                    .values()
                    .all(|value| value.len() < options.max_categorical_length);
            debug!(
                layer_type = %layer_type,
                attribute = %name,
                distinct = dictionary.len(),
                categorical = eligible,
                "categorical decision"
            );
            if !eligible {
                continue;
            }
            for row in &mut self.rows {
                if let Some(cell) = row.cells.get_mut(index) {
                    if let Cell::Lookup(id) = *cell {
                        *cell = Cell::Literal(dictionary.get(id).unwrap_or_default().to_string());
                    }
                }
            }
            spec.attribute_type = AttributeType::Categorical;
            promoted.push(name.clone());
        }
        promoted
    }

    /// Left-pad every label bit-string to the final label count.
    pub(crate) fn pad_labels(&mut self) {
        for (index, spec) in self.attributes.values().enumerate() {
            if spec.attribute_type != AttributeType::Labels {
                continue;
            }
            let width = spec.distinct_count();
            for row in &mut self.rows {
                if let Some(Cell::Bits(bits)) = row.cells.get_mut(index) {
                    *bits = pad_bits(bits, width);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Corpus;
    use crate::schema::{AttributeType, Cell};

    use super::CompileOptions;

    fn segment_corpus(values: &[&str]) -> Corpus {
        let mut corpus = Corpus::new("test");
        for value in values {
            let segment = corpus.new_layer("Segment").unwrap();
            corpus.set_attribute(segment, "genre", *value).unwrap();
            corpus.finalize(segment).unwrap();
        }
        corpus
    }

    #[test]
    fn test_backfill_pads_short_rows() {
        let mut corpus = Corpus::new("test");
        let first = corpus.new_layer("Segment").unwrap();
        corpus.finalize(first).unwrap();
        let second = corpus.new_layer("Segment").unwrap();
        corpus.set_attribute(second, "original", "text").unwrap();
        corpus.set_attribute(second, "score", 0.5).unwrap();
        corpus.finalize(second).unwrap();

        let schema = corpus.schemas.get_mut("Segment").unwrap();
        schema.backfill();
        assert!(schema.rows.iter().all(|row| row.cells.len() == 2));
        assert_eq!(schema.rows[0].cells, vec![Cell::Lookup(2), Cell::Empty]);
        assert!(schema.attributes["original"].nullable);
        assert!(schema.attributes["score"].nullable);
    }

    #[test]
    fn test_small_text_attribute_is_promoted() {
        let mut corpus = segment_corpus(&["news", "fiction", "news"]);
        let schema = corpus.schemas.get_mut("Segment").unwrap();
        let promoted = schema.promote_categorical(&CompileOptions::default(), &[]);

        assert_eq!(promoted, vec!["genre"]);
        assert_eq!(schema.attributes["genre"].attribute_type, AttributeType::Categorical);
        assert_eq!(schema.rows[1].cells[0], Cell::Literal("fiction".into()));
    }

    #[test]
    fn test_promotion_thresholds() {
        let long = "x".repeat(63);
        let mut corpus = segment_corpus(&["short", long.as_str()]);
        let schema = corpus.schemas.get_mut("Segment").unwrap();
        assert!(schema.promote_categorical(&CompileOptions::default(), &[]).is_empty());

        let values: Vec<String> = (0..51).map(|i| format!("v{}", i)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let mut corpus = segment_corpus(&refs);
        let schema = corpus.schemas.get_mut("Segment").unwrap();
        assert!(schema.promote_categorical(&CompileOptions::default(), &[]).is_empty());

        let mut corpus = segment_corpus(&["a"]);
        let schema = corpus.schemas.get_mut("Segment").unwrap();
        let exempt = vec!["genre".to_string()];
        assert!(schema.promote_categorical(&CompileOptions::default(), &exempt).is_empty());
    }

    #[test]
    fn test_pad_labels_to_final_width() {
        let mut corpus = Corpus::new("test");
        for labels in [vec!["a"], vec!["a", "b"], vec!["c"]] {
            let segment = corpus.new_layer("Segment").unwrap();
            corpus.set_attribute(segment, "keywords", labels).unwrap();
            corpus.finalize(segment).unwrap();
        }
        let schema = corpus.schemas.get_mut("Segment").unwrap();
        schema.pad_labels();
        let bits: Vec<_> = schema.rows.iter().map(|row| row.cells[0].render()).collect();
        assert_eq!(bits, vec!["001", "011", "100"]);
    }
}
