//! The `Record` type: both the property bag handed to `addVertex`/`addEdge`/
//! `update`, and the decoded shape handed back by every read operation,
//! carrying the four pseudo-properties (§3) alongside the schema-declared
//! ones.

use nogdb_api::{pseudo, RecordId, Value, VersionId};
use std::collections::HashMap;

/// A vertex or edge's properties, keyed by name.
///
/// Pseudo-property names (`@className`, `@recordId`, `@depth`, `@version`)
/// are never stored in the property map itself — `get` synthesizes them
/// from the record's own fields, and a pseudo name passed to `set` or
/// present on a record submitted to `update` is silently ignored, matching
/// the original engine's basic-info handling.
#[derive(Debug, Clone, Default)]
pub struct Record {
    properties: HashMap<String, Value>,
    pub class_name: String,
    pub record_id: RecordId,
    pub depth: u32,
    pub version: VersionId,
}

fn is_pseudo(key: &str) -> bool {
    matches!(
        key,
        pseudo::CLASS_NAME | pseudo::RECORD_ID | pseudo::DEPTH | pseudo::VERSION
    )
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    /// Sets a property value. Pseudo-property names are ignored.
    pub fn set(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !is_pseudo(&key) {
            self.properties.insert(key, value);
        }
        self
    }

    /// Reads a property, falling back to the pseudo-properties for the
    /// four reserved names.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            pseudo::CLASS_NAME => Some(Value::Text(self.class_name.clone())),
            pseudo::RECORD_ID => Some(Value::Text(self.record_id.to_string())),
            pseudo::DEPTH => Some(Value::UnsignedInteger(self.depth)),
            pseudo::VERSION => Some(Value::UnsignedBigInt(self.version)),
            _ => self.properties.get(key).cloned(),
        }
    }

    /// The schema-declared properties only — excludes the four pseudo ones.
    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pseudo_properties_are_synthesized_not_stored() {
        let mut r = Record::new().set("name", Value::Text("Koh Chang".into()));
        r.class_name = "islands".to_string();
        r.record_id = RecordId::new(1, 5);
        r.depth = 2;
        r.version = 9;

        assert_eq!(r.get(pseudo::CLASS_NAME), Some(Value::Text("islands".into())));
        assert_eq!(r.get(pseudo::RECORD_ID), Some(Value::Text("1:5".into())));
        assert_eq!(r.get(pseudo::DEPTH), Some(Value::UnsignedInteger(2)));
        assert_eq!(r.get(pseudo::VERSION), Some(Value::UnsignedBigInt(9)));
        assert!(!r.properties().contains_key(pseudo::CLASS_NAME));
    }

    #[test]
    fn setting_a_pseudo_name_is_a_no_op() {
        let r = Record::new().set(pseudo::CLASS_NAME, Value::Text("ignored".into()));
        assert!(r.properties().is_empty());
    }
}
