//! `Transaction`: the facade's single read/write handle. Wraps a live
//! `nogdb_storage` KV transaction together with the schema catalog and
//! relation index opened against it, and implements [`GraphReader`] so the
//! query engine's filter and traversal code can run directly against it.
//!
//! `GraphReader`'s methods take `&self`, but committing, rolling back, and
//! every mutation in §4.9 want `&mut self` ergonomics. Both sides route
//! through the same `RefCell<Option<StorageTxn>>` — there's no real
//! exclusivity at runtime, the `&mut self` signatures just keep the public
//! mutation API looking like normal Rust rather than exposing the RefCell.

use crate::error::{Error, Result};
use crate::record::Record;
use nogdb_api::{
    Bytes, ClassId, ClassType, IndexId, PropertyId, PropertyType, RecordId, Value, VersionId,
};
use nogdb_query::{
    traverse, walk_edges, DecodedRecord, Direction, GraphFilter, GraphReader, PropertyTypeMap,
    Strategy, TraversalSpec,
};
use nogdb_storage::catalog::{Catalog, ClassDef, IndexDef, PropertyDef};
use nogdb_storage::datastore::{self, ClassStore};
use nogdb_storage::engine::{Environment, Txn as StorageTxn};
use nogdb_storage::record as codec;
use nogdb_storage::relation::{self, RelationStores};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;

fn encode_value(value: &Value) -> Vec<u8> {
    match value {
        Value::TinyInt(v) => Bytes::from_tiny_int(*v).into_raw(),
        Value::UnsignedTinyInt(v) => Bytes::from_tiny_int_u(*v).into_raw(),
        Value::SmallInt(v) => Bytes::from_small_int(*v).into_raw(),
        Value::UnsignedSmallInt(v) => Bytes::from_small_int_u(*v).into_raw(),
        Value::Integer(v) => Bytes::from_int(*v).into_raw(),
        Value::UnsignedInteger(v) => Bytes::from_int_u(*v).into_raw(),
        Value::BigInt(v) => Bytes::from_bigint(*v).into_raw(),
        Value::UnsignedBigInt(v) => Bytes::from_bigint_u(*v).into_raw(),
        Value::Real(v) => Bytes::from_real(*v).into_raw(),
        Value::Text(v) => Bytes::from_text(v).into_raw(),
        Value::Blob(v) => Bytes::from_blob(v).into_raw(),
    }
}

/// A builder for `find*`/`traverse*` queries, collected eagerly by `get()`
/// rather than streamed — the filter engine is a full scan per record (§4.7
/// leaves secondary-index acceleration out of scope).
pub struct FindBuilder<'t, 'a> {
    txn: &'t Transaction<'a>,
    class_id: ClassId,
    include_subclasses: bool,
    filter: GraphFilter,
}

impl<'t, 'a> FindBuilder<'t, 'a> {
    pub fn where_condition(mut self, filter: GraphFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn get(self) -> Result<Vec<Record>> {
        let class_ids = if self.include_subclasses {
            self.txn
                .read(|txn| self.txn.catalog.subclass_closure(txn, self.class_id))?
        } else {
            vec![self.class_id]
        };
        let mut out = Vec::new();
        for class_id in class_ids {
            let class = self.txn.class_def(class_id)?;
            let store = self.txn.class_store(class_id)?;
            let rows = self.txn.read(|txn| datastore::scan_class(txn, &store))?;
            let types = self.txn.property_types(class_id)?;
            for (rid, blob) in rows {
                let decoded = self.txn.decode_blob(rid, &class, &blob)?;
                if self.filter.matches(&decoded, &types)? {
                    out.push(self.txn.to_record(&decoded, &types)?);
                }
            }
        }
        Ok(out)
    }

    /// Same result set as [`FindBuilder::get`], wrapped in a
    /// [`crate::ResultSetCursor`] for forward/backward/indexed walking.
    pub fn get_cursor(self) -> Result<crate::ResultSetCursor> {
        Ok(crate::ResultSetCursor::new(self.get()?))
    }
}

/// A builder for `traverseIn`/`traverseOut`/`traverse`, mirroring the
/// original engine's fluent `TraverseClass` chain.
pub struct TraverseBuilder<'t, 'a> {
    txn: &'t Transaction<'a>,
    sources: Vec<RecordId>,
    spec: TraversalSpec,
}

impl<'t, 'a> TraverseBuilder<'t, 'a> {
    pub fn add_source(mut self, rid: RecordId) -> Self {
        self.sources.push(rid);
        self
    }

    pub fn min_depth(mut self, depth: u32) -> Self {
        self.spec.min_depth = depth;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.spec.max_depth = depth;
        self
    }

    pub fn where_edge(mut self, filter: GraphFilter) -> Self {
        self.spec.edge_filter = filter;
        self
    }

    pub fn where_vertex(mut self, filter: GraphFilter) -> Self {
        self.spec.vertex_filter = filter;
        self
    }

    pub fn get(self) -> Result<Vec<Record>> {
        let decoded = traverse(self.txn, &self.sources, &self.spec)?;
        decoded
            .iter()
            .map(|d| {
                let types = self.txn.property_types(d.record_id.class_id)?;
                self.txn.to_record(d, &types)
            })
            .collect()
    }

    pub fn get_cursor(self) -> Result<crate::ResultSetCursor> {
        Ok(crate::ResultSetCursor::new(self.get()?))
    }
}

/// A read-write or read-only transaction over one [`crate::db::Database`].
///
/// Dropped without calling [`Transaction::commit`] or [`Transaction::rollback`],
/// a write transaction rolls back implicitly (`Drop` on the underlying
/// storage transaction discards its working copy).
pub struct Transaction<'a> {
    #[allow(dead_code)]
    env: &'a Environment,
    inner: RefCell<Option<StorageTxn>>,
    catalog: Catalog,
    relations: RelationStores,
    class_stores: RefCell<HashMap<ClassId, ClassStore>>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(env: &'a Environment, mut inner: StorageTxn) -> Result<Self> {
        let catalog = Catalog::open(&mut inner)?;
        let relations = RelationStores::open(&mut inner)?;
        Ok(Transaction {
            env,
            inner: RefCell::new(Some(inner)),
            catalog,
            relations,
            class_stores: RefCell::new(HashMap::new()),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&StorageTxn) -> Result<T>) -> Result<T> {
        let guard = self.inner.borrow();
        let txn = guard.as_ref().ok_or(Error::TxnCompleted)?;
        f(txn)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StorageTxn) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.borrow_mut();
        let txn = guard.as_mut().ok_or(Error::TxnCompleted)?;
        f(txn)
    }

    fn class_store(&self, class_id: ClassId) -> Result<ClassStore> {
        if let Some(store) = self.class_stores.borrow().get(&class_id) {
            return Ok(*store);
        }
        let store = self.write(|txn| ClassStore::open(txn, class_id))?;
        self.class_stores.borrow_mut().insert(class_id, store);
        Ok(store)
    }

    fn class_def(&self, class_id: ClassId) -> Result<ClassDef> {
        self.read(|txn| self.catalog.get_class(txn, class_id))?
            .ok_or_else(|| Error::UnknownClass(class_id.to_string()))
    }

    fn require_class(&self, name: &str, expected: ClassType) -> Result<ClassDef> {
        let def = self
            .read(|txn| self.catalog.find_class_by_name(txn, name))?
            .ok_or_else(|| Error::UnknownClass(name.to_string()))?;
        if def.class_type != expected {
            return Err(Error::InvalidClassType);
        }
        Ok(def)
    }

    /// The record blob must itself exist at `rid` and be of type `expected`.
    fn require_vertex(&self, rid: RecordId) -> Result<ClassDef> {
        let def = self.class_def(rid.class_id)?;
        if def.class_type != ClassType::Vertex {
            return Err(Error::InvalidClassType);
        }
        let store = self.class_store(rid.class_id)?;
        self.read(|txn| datastore::get_record(txn, &store, rid.position_id))?
            .ok_or_else(|| Error::NoExistVertex(rid.to_string()))?;
        Ok(def)
    }

    fn encode_input_properties(
        &self,
        class_id: ClassId,
        record: &Record,
    ) -> Result<codec::PropertyList> {
        let types = self.read(|txn| self.catalog.property_type_map(txn, class_id))?;
        let mut out = Vec::with_capacity(record.properties().len());
        for (name, value) in record.properties() {
            let (id, declared_ty) = types
                .get(name)
                .ok_or_else(|| Error::UnknownProperty(name.clone()))?;
            if value.property_type() != *declared_ty {
                return Err(Error::InvalidPropertyType);
            }
            out.push((*id, encode_value(value)));
        }
        Ok(out)
    }

    fn decode_blob(&self, rid: RecordId, class: &ClassDef, blob: &[u8]) -> Result<DecodedRecord> {
        let is_edge = class.class_type == ClassType::Edge;
        let version = codec::get_version(blob, true).unwrap_or(0);
        let payload_off = codec::payload_offset(true, is_edge);
        let plist = codec::decode_property_list(&blob[payload_off..])?;
        let mut decoded = DecodedRecord::new();
        decoded.record_id = rid;
        decoded.class_name = class.name.clone();
        decoded.version = version;
        for (id, bytes) in plist {
            decoded.set_raw(id, Bytes::from_raw(bytes));
        }
        Ok(decoded)
    }

    fn to_record(&self, decoded: &DecodedRecord, types: &PropertyTypeMap) -> Result<Record> {
        let mut record = Record::new();
        record.class_name = decoded.class_name.clone();
        record.record_id = decoded.record_id;
        record.depth = decoded.depth;
        record.version = decoded.version;
        for (name, (id, ty)) in types {
            if let Some(value) = decoded.decode_property(*id, *ty)? {
                record = record.set(name.clone(), value);
            }
        }
        Ok(record)
    }

    fn pending_version(&self) -> VersionId {
        self.read(|txn| Ok(txn.pending_version()))
            .unwrap_or_default()
    }

    // --- §4.4 schema catalog ---

    pub fn add_class(&mut self, name: &str, class_type: ClassType) -> Result<ClassId> {
        let def = self.write(|txn| self.catalog.add_class(txn, name, class_type, None))?;
        debug!(class = name, class_id = def.id, "added class");
        Ok(def.id)
    }

    pub fn add_subclass_of(&mut self, super_name: &str, new_name: &str) -> Result<ClassId> {
        let super_def = self
            .read(|txn| self.catalog.find_class_by_name(txn, super_name))?
            .ok_or_else(|| Error::UnknownClass(super_name.to_string()))?;
        let def = self.write(|txn| {
            self.catalog
                .add_class(txn, new_name, super_def.class_type, Some(super_def.id))
        })?;
        Ok(def.id)
    }

    pub fn rename_class(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, old_name))?
            .ok_or_else(|| Error::UnknownClass(old_name.to_string()))?;
        self.write(|txn| self.catalog.rename_class(txn, class.id, new_name))
    }

    /// Cascades per §4.4: adjacency + data records, then indexes, then
    /// properties, then re-parents subclasses, finally the class entry.
    pub fn drop_class(&mut self, name: &str) -> Result<()> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, name))?
            .ok_or_else(|| Error::UnknownClass(name.to_string()))?;
        let store = self.class_store(class.id)?;
        let rows = self.read(|txn| datastore::scan_class(txn, &store))?;
        for (rid, _) in rows {
            self.remove(rid)?;
        }
        self.write(|txn| self.catalog.drop_class_properties_and_indexes(txn, class.id))?;
        self.write(|txn| self.catalog.drop_class(txn, class.id))?;
        self.class_stores.borrow_mut().remove(&class.id);
        debug!(class = name, "dropped class");
        Ok(())
    }

    pub fn add_property(
        &mut self,
        class_name: &str,
        prop_name: &str,
        property_type: PropertyType,
    ) -> Result<PropertyId> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        let def =
            self.write(|txn| self.catalog.add_property(txn, class.id, prop_name, property_type))?;
        Ok(def.id)
    }

    pub fn rename_property(
        &mut self,
        class_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<()> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        self.write(|txn| self.catalog.rename_property(txn, class.id, old_name, new_name))
    }

    pub fn drop_property(&mut self, class_name: &str, prop_name: &str) -> Result<()> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        self.write(|txn| self.catalog.drop_property(txn, class.id, prop_name))?;
        Ok(())
    }

    pub fn add_index(&mut self, class_name: &str, prop_name: &str, unique: bool) -> Result<IndexId> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        let prop = self
            .read(|txn| self.catalog.properties_of_class(txn, class.id))?
            .into_iter()
            .find(|p| p.name == prop_name)
            .ok_or_else(|| Error::UnknownProperty(prop_name.to_string()))?;
        let def = self.write(|txn| self.catalog.add_index(txn, prop.id, unique))?;
        Ok(def.id)
    }

    pub fn drop_index(&mut self, index_id: IndexId) -> Result<()> {
        self.write(|txn| self.catalog.drop_index(txn, index_id))?;
        Ok(())
    }

    pub fn get_class(&self, name: &str) -> Result<ClassDef> {
        self.read(|txn| self.catalog.find_class_by_name(txn, name))?
            .ok_or_else(|| Error::UnknownClass(name.to_string()))
    }

    pub fn get_properties(&self, class_name: &str) -> Result<Vec<PropertyDef>> {
        let class = self.get_class(class_name)?;
        self.read(|txn| self.catalog.get_properties(txn, class.id))
    }

    pub fn get_subclass_ids(&self, class_name: &str) -> Result<Vec<ClassId>> {
        let class = self.get_class(class_name)?;
        self.read(|txn| self.catalog.subclass_ids(txn, class.id))
    }

    pub fn get_superclass_id(&self, class_name: &str) -> Result<Option<ClassId>> {
        Ok(self.get_class(class_name)?.super_id)
    }

    // --- §4.9 graph query API ---

    pub fn add_vertex(&mut self, class_name: &str, record: Record) -> Result<RecordId> {
        let class = self.require_class(class_name, ClassType::Vertex)?;
        let properties = self.encode_input_properties(class.id, &record)?;
        let version = self.pending_version();
        let blob = codec::encode_vertex(Some(version), &properties)?;
        let store = self.class_store(class.id)?;
        let position_id = self.write(|txn| {
            datastore::allocate_position(txn, self.catalog.stores.dbinfo, class.id)
        })?;
        self.write(|txn| datastore::put_record(txn, &store, position_id, blob.as_bytes()))?;
        let rid = RecordId::new(class.id, position_id);
        debug!(record_id = %rid, class = class_name, "added vertex");
        Ok(rid)
    }

    pub fn add_edge(
        &mut self,
        class_name: &str,
        src: RecordId,
        dst: RecordId,
        record: Record,
    ) -> Result<RecordId> {
        self.require_vertex(src)
            .map_err(|_| Error::NoExistSrc(src.to_string()))?;
        self.require_vertex(dst)
            .map_err(|_| Error::NoExistDst(dst.to_string()))?;
        let class = self.require_class(class_name, ClassType::Edge)?;
        let properties = self.encode_input_properties(class.id, &record)?;
        let version = self.pending_version();
        let blob = codec::encode_edge(Some(version), src, dst, &properties)?;
        let store = self.class_store(class.id)?;
        let position_id = self.write(|txn| {
            datastore::allocate_position(txn, self.catalog.stores.dbinfo, class.id)
        })?;
        self.write(|txn| datastore::put_record(txn, &store, position_id, blob.as_bytes()))?;
        let rid = RecordId::new(class.id, position_id);
        self.write(|txn| relation::add_relation(txn, &self.relations, rid, src, dst))?;
        debug!(record_id = %rid, class = class_name, "added edge");
        Ok(rid)
    }

    /// Replaces every schema-declared property of `rid` with those carried
    /// by `record`. Pseudo-properties on `record` (if any survived `set`,
    /// which already drops them) are ignored; `@version` always becomes the
    /// enclosing transaction's new version, never the caller's.
    pub fn update(&mut self, rid: RecordId, record: Record) -> Result<()> {
        let class = self.class_def(rid.class_id)?;
        let store = self.class_store(rid.class_id)?;
        let existing = self
            .read(|txn| datastore::get_record(txn, &store, rid.position_id))?
            .ok_or_else(|| Error::NoExistRecord(rid.to_string()))?;
        let properties = self.encode_input_properties(class.id, &record)?;
        let version = self.pending_version();
        let is_edge = class.class_type == ClassType::Edge;
        let new_payload = codec::encode_property_list(&properties)?;
        let rewritten = codec::set_payload(&existing, true, is_edge, &new_payload);
        let rewritten = codec::set_version(&rewritten, true, version);
        self.write(|txn| datastore::put_record(txn, &store, rid.position_id, &rewritten))?;
        Ok(())
    }

    pub fn update_src(&mut self, edge_rid: RecordId, new_src: RecordId) -> Result<()> {
        self.require_vertex(new_src)
            .map_err(|_| Error::NoExistSrc(new_src.to_string()))?;
        let class = self.class_def(edge_rid.class_id)?;
        if class.class_type != ClassType::Edge {
            return Err(Error::InvalidClassType);
        }
        let store = self.class_store(edge_rid.class_id)?;
        let existing = self
            .read(|txn| datastore::get_record(txn, &store, edge_rid.position_id))?
            .ok_or_else(|| Error::NoExistEdge(edge_rid.to_string()))?;
        let old_src = codec::get_src(&existing, true);
        let dst = codec::get_dst(&existing, true);
        let rewritten = codec::set_src(&existing, true, new_src);
        self.write(|txn| datastore::put_record(txn, &store, edge_rid.position_id, &rewritten))?;
        self.write(|txn| relation::remove_relation(txn, &self.relations, edge_rid, old_src, dst))?;
        self.write(|txn| relation::add_relation(txn, &self.relations, edge_rid, new_src, dst))?;
        Ok(())
    }

    pub fn update_dst(&mut self, edge_rid: RecordId, new_dst: RecordId) -> Result<()> {
        self.require_vertex(new_dst)
            .map_err(|_| Error::NoExistDst(new_dst.to_string()))?;
        let class = self.class_def(edge_rid.class_id)?;
        if class.class_type != ClassType::Edge {
            return Err(Error::InvalidClassType);
        }
        let store = self.class_store(edge_rid.class_id)?;
        let existing = self
            .read(|txn| datastore::get_record(txn, &store, edge_rid.position_id))?
            .ok_or_else(|| Error::NoExistEdge(edge_rid.to_string()))?;
        let src = codec::get_src(&existing, true);
        let old_dst = codec::get_dst(&existing, true);
        let rewritten = codec::set_dst(&existing, true, new_dst);
        self.write(|txn| datastore::put_record(txn, &store, edge_rid.position_id, &rewritten))?;
        self.write(|txn| relation::remove_relation(txn, &self.relations, edge_rid, src, old_dst))?;
        self.write(|txn| relation::add_relation(txn, &self.relations, edge_rid, src, new_dst))?;
        Ok(())
    }

    /// Removes `rid`. Vertex removal cascades: every incident edge's
    /// adjacency entry and data record is removed too (§3).
    pub fn remove(&mut self, rid: RecordId) -> Result<()> {
        let class = self.class_def(rid.class_id)?;
        let store = self.class_store(rid.class_id)?;
        match class.class_type {
            ClassType::Vertex => {
                let incident =
                    self.write(|txn| relation::remove_all_incident(txn, &self.relations, rid))?;
                for edge_rid in incident {
                    self.delete_record_only(edge_rid)?;
                }
            }
            ClassType::Edge => {
                let blob = self
                    .read(|txn| datastore::get_record(txn, &store, rid.position_id))?
                    .ok_or_else(|| Error::NoExistEdge(rid.to_string()))?;
                let src = codec::get_src(&blob, true);
                let dst = codec::get_dst(&blob, true);
                self.write(|txn| relation::remove_relation(txn, &self.relations, rid, src, dst))?;
            }
        }
        self.delete_record_only(rid)
    }

    fn delete_record_only(&mut self, rid: RecordId) -> Result<()> {
        let store = self.class_store(rid.class_id)?;
        self.write(|txn| datastore::delete_record(txn, &store, rid.position_id))
    }

    pub fn remove_all(&mut self, class_name: &str) -> Result<()> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        let store = self.class_store(class.id)?;
        let rows = self.read(|txn| datastore::scan_class(txn, &store))?;
        for (rid, _) in rows {
            self.remove(rid)?;
        }
        Ok(())
    }

    pub fn fetch_record(&self, rid: RecordId) -> Result<Record> {
        let decoded = self.fetch_decoded(rid)?;
        let types = self.property_types(rid.class_id)?;
        self.to_record(&decoded, &types)
    }

    pub fn fetch_src(&self, edge_rid: RecordId) -> Result<Record> {
        let store = self.class_store(edge_rid.class_id)?;
        let blob = self
            .read(|txn| datastore::get_record(txn, &store, edge_rid.position_id))?
            .ok_or_else(|| Error::NoExistEdge(edge_rid.to_string()))?;
        self.fetch_record(codec::get_src(&blob, true))
    }

    pub fn fetch_dst(&self, edge_rid: RecordId) -> Result<Record> {
        let store = self.class_store(edge_rid.class_id)?;
        let blob = self
            .read(|txn| datastore::get_record(txn, &store, edge_rid.position_id))?
            .ok_or_else(|| Error::NoExistEdge(edge_rid.to_string()))?;
        self.fetch_record(codec::get_dst(&blob, true))
    }

    pub fn fetch_src_dst(&self, edge_rid: RecordId) -> Result<(Record, Record)> {
        Ok((self.fetch_src(edge_rid)?, self.fetch_dst(edge_rid)?))
    }

    /// Finds records of `class_name` — vertex or edge, either is a valid
    /// scan target for `find`; only the directional edge lookups below are
    /// restricted to one kind.
    pub fn find(&self, class_name: &str) -> Result<FindBuilder<'_, 'a>> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        Ok(FindBuilder {
            txn: self,
            class_id: class.id,
            include_subclasses: false,
            filter: GraphFilter::new(),
        })
    }

    pub fn find_subclass_of(&self, class_name: &str) -> Result<FindBuilder<'_, 'a>> {
        let class = self
            .read(|txn| self.catalog.find_class_by_name(txn, class_name))?
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))?;
        Ok(FindBuilder {
            txn: self,
            class_id: class.id,
            include_subclasses: true,
            filter: GraphFilter::new(),
        })
    }

    pub fn find_in_edge(&self, vertex: RecordId, filter: GraphFilter) -> Result<Vec<Record>> {
        self.find_edge_dir(vertex, Direction::In, filter)
    }

    pub fn find_out_edge(&self, vertex: RecordId, filter: GraphFilter) -> Result<Vec<Record>> {
        self.find_edge_dir(vertex, Direction::Out, filter)
    }

    pub fn find_edge(&self, vertex: RecordId, filter: GraphFilter) -> Result<Vec<Record>> {
        self.find_edge_dir(vertex, Direction::All, filter)
    }

    fn find_edge_dir(
        &self,
        vertex: RecordId,
        direction: Direction,
        filter: GraphFilter,
    ) -> Result<Vec<Record>> {
        let decoded = walk_edges(self, vertex, direction, &filter)?;
        decoded
            .iter()
            .map(|d| {
                let types = self.property_types(d.record_id.class_id)?;
                self.to_record(d, &types)
            })
            .collect()
    }

    pub fn traverse_in(&self, source: RecordId) -> TraverseBuilder<'_, 'a> {
        TraverseBuilder {
            txn: self,
            sources: vec![source],
            spec: TraversalSpec {
                direction: Direction::In,
                ..TraversalSpec::default()
            },
        }
    }

    pub fn traverse_out(&self, source: RecordId) -> TraverseBuilder<'_, 'a> {
        TraverseBuilder {
            txn: self,
            sources: vec![source],
            spec: TraversalSpec {
                direction: Direction::Out,
                ..TraversalSpec::default()
            },
        }
    }

    pub fn traverse(&self, source: RecordId) -> TraverseBuilder<'_, 'a> {
        TraverseBuilder {
            txn: self,
            sources: vec![source],
            spec: TraversalSpec {
                direction: Direction::All,
                ..TraversalSpec::default()
            },
        }
    }

    pub fn bfs(&self, source: RecordId) -> TraverseBuilder<'_, 'a> {
        let mut builder = self.traverse(source);
        builder.spec.strategy = Strategy::Bfs;
        builder
    }

    pub fn dfs(&self, source: RecordId) -> TraverseBuilder<'_, 'a> {
        let mut builder = self.traverse(source);
        builder.spec.strategy = Strategy::Dfs;
        builder
    }

    pub fn commit(self) -> Result<()> {
        let txn = self
            .inner
            .borrow_mut()
            .take()
            .ok_or(Error::TxnCompleted)?;
        let txn_id = txn.txn_id();
        txn.commit()?;
        debug!(txn_id, "committed transaction");
        Ok(())
    }

    pub fn rollback(self) {
        if let Some(txn) = self.inner.borrow_mut().take() {
            let txn_id = txn.txn_id();
            txn.rollback();
            debug!(txn_id, "rolled back transaction");
        }
    }
}

impl GraphReader for Transaction<'_> {
    fn fetch_decoded(&self, rid: RecordId) -> Result<DecodedRecord> {
        let class = self.class_def(rid.class_id)?;
        let store = self.class_store(rid.class_id)?;
        let blob = self
            .read(|txn| datastore::get_record(txn, &store, rid.position_id))?
            .ok_or_else(|| Error::NoExistRecord(rid.to_string()))?;
        self.decode_blob(rid, &class, &blob)
    }

    fn class_name_of(&self, class_id: ClassId) -> Result<String> {
        Ok(self.class_def(class_id)?.name)
    }

    fn out_edges(&self, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
        self.read(|txn| relation::out_edges(txn, &self.relations, vertex))
    }

    fn in_edges(&self, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
        self.read(|txn| relation::in_edges(txn, &self.relations, vertex))
    }

    fn property_types(&self, class_id: ClassId) -> Result<PropertyTypeMap> {
        self.read(|txn| self.catalog.property_type_map(txn, class_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use nogdb_api::{pseudo, PropertyType};

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path()).unwrap();
        (dir, db)
    }

    fn setup_schema(db: &Database) {
        let mut txn = db.begin_write().unwrap();
        let island = txn
            .write(|t| txn.catalog.add_class(t, "island", ClassType::Vertex, None))
            .unwrap();
        txn.write(|t| {
            txn.catalog
                .add_property(t, island.id, "name", PropertyType::Text)
        })
        .unwrap();
        txn.write(|t| txn.catalog.add_class(t, "bridge", ClassType::Edge, None))
            .unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn add_vertex_fetch_round_trips_properties() {
        let (_dir, db) = open_db();
        setup_schema(&db);
        let mut txn = db.begin_write().unwrap();
        let record = Record::new().set("name", Value::Text("Koh Chang".into()));
        let rid = txn.add_vertex("island", record).unwrap();
        let fetched = txn.fetch_record(rid).unwrap();
        assert_eq!(fetched.get("name"), Some(Value::Text("Koh Chang".into())));
        assert_eq!(fetched.get(pseudo::CLASS_NAME), Some(Value::Text("island".into())));
        txn.commit().unwrap();
    }

    #[test]
    fn add_edge_requires_existing_endpoints() {
        let (_dir, db) = open_db();
        setup_schema(&db);
        let mut txn = db.begin_write().unwrap();
        let bogus = RecordId::new(1, 99);
        let err = txn
            .add_edge("bridge", bogus, bogus, Record::new())
            .unwrap_err();
        assert!(matches!(err, Error::NoExistSrc(_)));
    }

    #[test]
    fn remove_vertex_cascades_to_incident_edges() {
        let (_dir, db) = open_db();
        setup_schema(&db);
        let mut txn = db.begin_write().unwrap();
        let v1 = txn
            .add_vertex("island", Record::new().set("name", Value::Text("a".into())))
            .unwrap();
        let v2 = txn
            .add_vertex("island", Record::new().set("name", Value::Text("b".into())))
            .unwrap();
        let edge = txn.add_edge("bridge", v1, v2, Record::new()).unwrap();
        txn.remove(v1).unwrap();
        assert!(matches!(
            txn.fetch_record(edge).unwrap_err(),
            Error::NoExistRecord(_)
        ));
        txn.commit().unwrap();
    }

    #[test]
    fn traverse_out_from_a_chain_of_vertices() {
        let (_dir, db) = open_db();
        setup_schema(&db);
        let mut txn = db.begin_write().unwrap();
        let v1 = txn
            .add_vertex("island", Record::new().set("name", Value::Text("a".into())))
            .unwrap();
        let v2 = txn
            .add_vertex("island", Record::new().set("name", Value::Text("b".into())))
            .unwrap();
        let v3 = txn
            .add_vertex("island", Record::new().set("name", Value::Text("c".into())))
            .unwrap();
        txn.add_edge("bridge", v1, v2, Record::new()).unwrap();
        txn.add_edge("bridge", v2, v3, Record::new()).unwrap();

        let result = txn.traverse_out(v1).get().unwrap();
        assert_eq!(result.len(), 3);
        txn.commit().unwrap();
    }
}
