//! Intermediate row representation buffered between finalize and compile.
//!
//! Rows keep structured cells rather than rendered text so the compile pass
//! can inline categorical values and re-pad label bit-strings without
//! re-parsing anything.

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::graph::{Anchors, LayerKey};

/// One attribute cell of a buffered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// No value.
    Empty,
    /// A value written as-is.
    Literal(String),
    /// A dictionary or global attribute id.
    Lookup(u32),
    /// A labels bit-string, most significant bit first.
    Bits(String),
}

impl Cell {
    /// Render the cell as it appears in the output table.
    pub fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Literal(value) | Cell::Bits(value) => value.clone(),
            Cell::Lookup(id) => id.to_string(),
        }
    }
}

/// A finalized layer instance, waiting for the compile pass.
#[derive(Debug, Clone)]
pub struct Row {
    pub id: LayerKey,
    /// Parent segment of a token.
    pub segment: Option<Uuid>,
    pub name: Option<String>,
    pub media: BTreeMap<String, String>,
    pub anchors: Anchors,
    /// Attribute cells in schema order. May be shorter than the final header.
    pub cells: Vec<Cell>,
}

/// Left-extend a bit-string with zeros up to `width`.
pub fn pad_bits(bits: &str, width: usize) -> String {
    let missing = width.saturating_sub(bits.len());
    format!("{}{}", "0".repeat(missing), bits)
}

/// Build the bit-string of a label set, given the ids of its labels.
///
/// Bit `k` (1-based, counted from the right) is set iff label id `k` is present.
pub fn label_bits(ids: &[u32], width: usize) -> String {
    let mut bits = vec!['0'; width];
    for &id in ids {
        let Ok(position) = usize::try_from(id) else {
            continue;
        };
        if position == 0 {
            continue;
        }
        if bits.len() < position {
            bits.resize(position, '0');
        }
        bits[position - 1] = '1';
    }
    bits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_bits_low_to_high() {
        assert_eq!(label_bits(&[1], 1), "1");
        assert_eq!(label_bits(&[1, 2], 2), "11");
        assert_eq!(label_bits(&[2], 3), "010");
        assert_eq!(label_bits(&[], 2), "00");
    }

    #[test]
    fn test_pad_bits() {
        assert_eq!(pad_bits("1", 2), "01");
        assert_eq!(pad_bits("", 3), "000");
        assert_eq!(pad_bits("101", 3), "101");
    }

    #[test]
    fn test_render_cells() {
        assert_eq!(Cell::Empty.render(), "");
        assert_eq!(Cell::Lookup(7).render(), "7");
        assert_eq!(Cell::Literal("NOUN".into()).render(), "NOUN");
    }
}
