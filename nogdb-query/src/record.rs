//! The decoded-record representation the filter engine and traversal
//! machinery operate over, plus the `GraphReader` trait that lets
//! `nogdb-query` walk adjacency and fetch records without depending on the
//! facade crate that assembles the catalog + relation index + data store
//! into a live transaction.

use nogdb_api::{Bytes, ClassId, PropertyId, PropertyType, RecordId, Result, Value, VersionId};
use std::collections::HashMap;

/// A decoded vertex or edge record: raw per-property bytes plus the four
/// pseudo-properties supplied by the read path rather than stored as
/// property-id blocks.
#[derive(Debug, Clone, Default)]
pub struct DecodedRecord {
    raw: HashMap<PropertyId, Bytes>,
    pub class_name: String,
    pub record_id: RecordId,
    pub depth: u32,
    pub version: VersionId,
}

impl DecodedRecord {
    pub fn new() -> Self {
        DecodedRecord::default()
    }

    pub fn set_raw(&mut self, id: PropertyId, bytes: Bytes) {
        self.raw.insert(id, bytes);
    }

    pub fn raw(&self) -> &HashMap<PropertyId, Bytes> {
        &self.raw
    }

    /// Decodes the value for `id` as `ty`, if the property was present in
    /// the record's blob. Absence here means "schema knows this property,
    /// the record just never set it" — distinct from the property being
    /// entirely missing from the schema, which the filter engine treats as
    /// a separate short-circuit case one layer up.
    pub fn decode_property(&self, id: PropertyId, ty: PropertyType) -> Result<Option<Value>> {
        match self.raw.get(&id) {
            Some(bytes) if !bytes.is_empty() => Ok(Some(Value::decode(ty, bytes)?)),
            _ => Ok(None),
        }
    }
}

/// Read-only access to decoded records and adjacency, the surface the
/// filter/traversal engine needs from whatever assembled the catalog,
/// relation index, and data-record store into a live transaction.
pub trait GraphReader {
    fn fetch_decoded(&self, rid: RecordId) -> Result<DecodedRecord>;
    fn class_name_of(&self, class_id: ClassId) -> Result<String>;
    fn out_edges(&self, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>>;
    fn in_edges(&self, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>>;
    fn property_types(&self, class_id: ClassId) -> Result<crate::condition::PropertyTypeMap>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_property_distinguishes_absent_from_empty() {
        let mut r = DecodedRecord::new();
        r.set_raw(1, Bytes::from_int(5));
        assert_eq!(
            r.decode_property(1, PropertyType::Integer).unwrap(),
            Some(Value::Integer(5))
        );
        assert_eq!(r.decode_property(2, PropertyType::Integer).unwrap(), None);
    }
}
