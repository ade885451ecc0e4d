//! Deduplicated corpus-wide record tables.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::dictionary::LookupDictionary;
use crate::value::{accrete_keys, canonical_json, canonicalize};

use super::config::KeySchema;

/// Prefix of the file holding a global attribute table.
pub const GLOBAL_FILE_PREFIX: &str = "global_attribute_";

/// A table of structured records shared by every layer that references it.
#[derive(Debug, Clone)]
pub struct GlobalAttributeTable {
    name: String,
    pub(crate) records: LookupDictionary,
    pub(crate) keys: IndexMap<String, KeySchema>,
}

impl GlobalAttributeTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: LookupDictionary::new(),
            keys: IndexMap::new(),
        }
    }

    /// Store a record and return its id. Equal records share one id.
    pub fn insert(&mut self, record: Map<String, Value>) -> u32 {
        let record = canonicalize(record);
        accrete_keys(&mut self.keys, &record);
        self.records.intern(&canonical_json(&record))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if a record with this id exists.
    pub fn contains(&self, id: u32) -> bool {
        self.records.get(id).is_some()
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Key schema accreted over every record.
    pub fn keys(&self) -> &IndexMap<String, KeySchema> {
        &self.keys
    }

    /// File stem of the emitted table.
    pub fn file_stem(&self) -> String {
        format!("{}{}", GLOBAL_FILE_PREFIX, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeType;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equal_records_share_an_id() {
        let mut table = GlobalAttributeTable::new("speaker");
        let jane = table.insert(record(json!({"firstname": "Jane", "age": "35"})));
        let john = table.insert(record(json!({"firstname": "John", "age": "35"})));
        let jane_again = table.insert(record(json!({"age": "35", "firstname": "Jane"})));

        assert_eq!(jane, 1);
        assert_eq!(john, 2);
        assert_eq!(jane_again, jane);
        assert_eq!(table.len(), 2);
        assert!(table.contains(2));
        assert!(!table.contains(3));
    }

    #[test]
    fn test_keys_accrete_across_records() {
        let mut table = GlobalAttributeTable::new("speaker");
        table.insert(record(json!({"firstname": "Jane"})));
        table.insert(record(json!({"gender": "m", "age": 35})));
        let keys: Vec<_> = table.keys().keys().cloned().collect();
        assert_eq!(keys, vec!["firstname", "age", "gender"]);
        assert_eq!(table.keys()["age"].key_type, AttributeType::Number);
        assert_eq!(table.file_stem(), "global_attribute_speaker");
    }
}
