//! Relation (adjacency) index: two sub-stores, `relations-in` and
//! `relations-out`, each duplicate-key, keyed by the textual vertex
//! RecordId `"classId:positionId"` and valued by a 12-byte
//! `(edgeId, neighborId)` blob — `edgeId(ClassId:2,PositionId:4) ++
//! neighborId(ClassId:2,PositionId:4)`, matching the original engine's
//! `relation_adapter.hpp::convertToBlob` layout exactly.
//!
//! The textual key form is deliberate: the KV engine's duplicate-value
//! ordering is defined over the byte-lex comparator, and the string form
//! gives a stable, inspectable key rather than a packed numeric one.

use nogdb_api::{ClassId, KvTxn, PositionId, RecordId, Result, StoreFlags, StoreHandle};

pub const STORE_RELATIONS_IN: &str = ".relations#in";
pub const STORE_RELATIONS_OUT: &str = ".relations#out";

fn key_for(vertex: RecordId) -> Vec<u8> {
    vertex.to_string().into_bytes()
}

fn encode_pair(edge: RecordId, neighbor: RecordId) -> [u8; 12] {
    let mut out = [0u8; 12];
    out[0..2].copy_from_slice(&edge.class_id.to_ne_bytes());
    out[2..6].copy_from_slice(&edge.position_id.to_ne_bytes());
    out[6..8].copy_from_slice(&neighbor.class_id.to_ne_bytes());
    out[8..12].copy_from_slice(&neighbor.position_id.to_ne_bytes());
    out
}

fn decode_pair(bytes: &[u8]) -> (RecordId, RecordId) {
    let edge = RecordId::new(
        ClassId::from_ne_bytes(bytes[0..2].try_into().unwrap()),
        PositionId::from_ne_bytes(bytes[2..6].try_into().unwrap()),
    );
    let neighbor = RecordId::new(
        ClassId::from_ne_bytes(bytes[6..8].try_into().unwrap()),
        PositionId::from_ne_bytes(bytes[8..12].try_into().unwrap()),
    );
    (edge, neighbor)
}

#[derive(Debug, Clone, Copy)]
pub struct RelationStores {
    pub in_edges: StoreHandle,
    pub out_edges: StoreHandle,
}

impl RelationStores {
    pub fn open<T: KvTxn>(txn: &mut T) -> Result<Self> {
        Ok(RelationStores {
            in_edges: txn.open_store(STORE_RELATIONS_IN, StoreFlags::duplicate_bytes())?,
            out_edges: txn.open_store(STORE_RELATIONS_OUT, StoreFlags::duplicate_bytes())?,
        })
    }
}

/// Adds both halves of the adjacency entry for an edge `E: src -> dst`.
pub fn add_relation<T: KvTxn>(
    txn: &mut T,
    stores: &RelationStores,
    edge: RecordId,
    src: RecordId,
    dst: RecordId,
) -> Result<()> {
    txn.put(stores.out_edges, &key_for(src), &encode_pair(edge, dst))?;
    txn.put(stores.in_edges, &key_for(dst), &encode_pair(edge, src))?;
    Ok(())
}

/// Removes both halves of the adjacency entry for an edge `E: src -> dst`,
/// by cursor-walking to the exact `(key, value)` duplicate rather than a
/// duplicate-unaware delete — the original engine's `remove(RelationAccessInfo)`
/// is marked non-functional; this mirrors its `removeByCursor` substitute.
pub fn remove_relation<T: KvTxn>(
    txn: &mut T,
    stores: &RelationStores,
    edge: RecordId,
    src: RecordId,
    dst: RecordId,
) -> Result<()> {
    txn.del_exact(stores.out_edges, &key_for(src), &encode_pair(edge, dst))?;
    txn.del_exact(stores.in_edges, &key_for(dst), &encode_pair(edge, src))?;
    Ok(())
}

fn walk<T: KvTxn>(txn: &T, store: StoreHandle, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
    let key = key_for(vertex);
    let mut out = Vec::new();
    let mut cursor = txn.cursor(store)?;
    let mut entry = cursor.find(&key)?;
    while let Some((k, v)) = entry {
        if k != key {
            break;
        }
        out.push(decode_pair(&v));
        entry = cursor.next()?;
    }
    Ok(out)
}

/// Out-edges of `vertex`: `(edgeId, neighborId)` pairs.
pub fn out_edges<T: KvTxn>(txn: &T, stores: &RelationStores, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
    walk(txn, stores.out_edges, vertex)
}

/// In-edges of `vertex`: `(edgeId, neighborId)` pairs.
pub fn in_edges<T: KvTxn>(txn: &T, stores: &RelationStores, vertex: RecordId) -> Result<Vec<(RecordId, RecordId)>> {
    walk(txn, stores.in_edges, vertex)
}

/// Edges directly connecting `v1 -> v2`, i.e. `outEdges(v1)` filtered by
/// neighbor `== v2`.
pub fn edges_between<T: KvTxn>(
    txn: &T,
    stores: &RelationStores,
    v1: RecordId,
    v2: RecordId,
) -> Result<Vec<RecordId>> {
    Ok(out_edges(txn, stores, v1)?
        .into_iter()
        .filter(|(_, neighbor)| *neighbor == v2)
        .map(|(edge, _)| edge)
        .collect())
}

/// Removes every adjacency entry that mentions `vertex` as either
/// endpoint — the "cascade" half of vertex deletion. Returns the edges
/// that were removed so the caller can also drop their data records.
pub fn remove_all_incident<T: KvTxn>(
    txn: &mut T,
    stores: &RelationStores,
    vertex: RecordId,
) -> Result<Vec<RecordId>> {
    let mut removed = Vec::new();
    for (edge, dst) in out_edges(txn, stores, vertex)? {
        remove_relation(txn, stores, edge, vertex, dst)?;
        removed.push(edge);
    }
    for (edge, src) in in_edges(txn, stores, vertex)? {
        remove_relation(txn, stores, edge, src, vertex)?;
        removed.push(edge);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Environment;
    use nogdb_api::{KvEngine, TxnMode};

    fn open_env() -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();
        (dir, env)
    }

    #[test]
    fn adjacency_entries_mirror_each_other() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let stores = RelationStores::open(&mut txn).unwrap();

        let v1 = RecordId::new(1, 1);
        let v2 = RecordId::new(1, 2);
        let v3 = RecordId::new(1, 3);
        let e1 = RecordId::new(2, 1);
        let e2 = RecordId::new(2, 2);

        add_relation(&mut txn, &stores, e1, v1, v2).unwrap();
        add_relation(&mut txn, &stores, e2, v2, v3).unwrap();

        assert_eq!(out_edges(&txn, &stores, v1).unwrap(), vec![(e1, v2)]);
        assert_eq!(in_edges(&txn, &stores, v2).unwrap(), vec![(e1, v1)]);
        assert_eq!(out_edges(&txn, &stores, v2).unwrap(), vec![(e2, v3)]);
        assert_eq!(in_edges(&txn, &stores, v3).unwrap(), vec![(e2, v2)]);
    }

    #[test]
    fn removing_vertex_cascades_both_directions() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let stores = RelationStores::open(&mut txn).unwrap();

        let v1 = RecordId::new(1, 1);
        let v2 = RecordId::new(1, 2);
        let v3 = RecordId::new(1, 3);
        let e1 = RecordId::new(2, 1);
        let e2 = RecordId::new(2, 2);
        add_relation(&mut txn, &stores, e1, v1, v2).unwrap();
        add_relation(&mut txn, &stores, e2, v2, v3).unwrap();

        let removed = remove_all_incident(&mut txn, &stores, v2).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(out_edges(&txn, &stores, v1).unwrap().is_empty());
        assert!(in_edges(&txn, &stores, v3).unwrap().is_empty());
    }

    #[test]
    fn edges_between_filters_by_neighbor() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let stores = RelationStores::open(&mut txn).unwrap();

        let v1 = RecordId::new(1, 1);
        let v2 = RecordId::new(1, 2);
        let v3 = RecordId::new(1, 3);
        let e1 = RecordId::new(2, 1);
        add_relation(&mut txn, &stores, e1, v1, v2).unwrap();

        assert_eq!(edges_between(&txn, &stores, v1, v2).unwrap(), vec![e1]);
        assert!(edges_between(&txn, &stores, v1, v3).unwrap().is_empty());
    }
}
