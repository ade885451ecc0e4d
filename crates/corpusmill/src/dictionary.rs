//! Append-only lookup dictionaries.
//!
//! Each dictionary maps values to sequential ids. Ids are 1-based and dense:
//! the first distinct value gets id 1, the next id 2, and so on. Interning an
//! equal value again returns the existing id.

use indexmap::IndexSet;

/// Value → id map backing one side table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupDictionary {
    /// Distinct values in first-seen order (index 0 = id 1).
    entries: IndexSet<String>,
}

impl LookupDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value and return its id (>= 1). Deduplicates.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(index) = self.entries.get_index_of(value) {
            return to_id(index);
        }
        let (index, _) = self.entries.insert_full(value.to_string());
        to_id(index)
    }

    /// Id of a value already in the dictionary.
    pub fn id_of(&self, value: &str) -> Option<u32> {
        self.entries.get_index_of(value).map(to_id)
    }

    /// Value stored under an id. Id 0 is never assigned.
    pub fn get(&self, id: u32) -> Option<&str> {
        let index = usize::try_from(id).ok()?.checked_sub(1)?;
        self.entries.get_index(index).map(String::as_str)
    }

    /// Number of distinct values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries as `(id, value)` pairs, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, value)| (to_id(index), value.as_str()))
    }

    /// Distinct values, in id order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

fn to_id(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
