//! Data-record store: one sub-store per class, named `.index_<classId>`,
//! keyed by `PositionId` (numeric), valued by the record blob. Position
//! allocation is monotonic per class; deleted positions are never reused,
//! tombstones are implicit in the absence of the key.

use nogdb_api::kv::encode_u32_key;
use nogdb_api::{ClassId, Error, KvTxn, PositionId, RecordId, Result, StoreFlags, StoreHandle};

fn store_name(class_id: ClassId) -> String {
    format!(".index_{class_id}")
}

/// Handle to one class's data sub-store, plus its position-allocation
/// counter key inside the shared `.dbinfo` store.
#[derive(Debug, Clone, Copy)]
pub struct ClassStore {
    pub class_id: ClassId,
    pub handle: StoreHandle,
}

impl ClassStore {
    pub fn open<T: KvTxn>(txn: &mut T, class_id: ClassId) -> Result<Self> {
        let handle = txn.open_store(&store_name(class_id), StoreFlags::unique_numeric())?;
        Ok(ClassStore { class_id, handle })
    }
}

fn position_counter_key(class_id: ClassId) -> Vec<u8> {
    format!("?max_position_id:{class_id}").into_bytes()
}

/// Allocates the next `PositionId` for `class_id` by bumping its counter,
/// stored in the shared `.dbinfo` sub-store so it survives across the
/// class's own data sub-store being reopened.
pub fn allocate_position<T: KvTxn>(
    txn: &mut T,
    dbinfo: StoreHandle,
    class_id: ClassId,
) -> Result<PositionId> {
    let key = position_counter_key(class_id);
    let current = txn
        .get(dbinfo, &key)?
        .map(|v| PositionId::from_ne_bytes(v.try_into().unwrap()))
        .unwrap_or(0);
    let next = current
        .checked_add(1)
        .ok_or(Error::MaxRecordNum)?;
    txn.put(dbinfo, &key, &next.to_ne_bytes())?;
    Ok(next)
}

pub fn put_record<T: KvTxn>(
    txn: &mut T,
    store: &ClassStore,
    position_id: PositionId,
    blob: &[u8],
) -> Result<()> {
    txn.put(store.handle, &encode_u32_key(position_id), blob)
}

pub fn get_record<T: KvTxn>(
    txn: &T,
    store: &ClassStore,
    position_id: PositionId,
) -> Result<Option<Vec<u8>>> {
    txn.get(store.handle, &encode_u32_key(position_id))
}

pub fn delete_record<T: KvTxn>(
    txn: &mut T,
    store: &ClassStore,
    position_id: PositionId,
) -> Result<()> {
    txn.del(store.handle, &encode_u32_key(position_id))
}

/// All `(RecordId, blob)` pairs currently stored for this class, in
/// ascending `PositionId` order — the substrate `find`/`removeAll` scan.
pub fn scan_class<T: KvTxn>(txn: &T, store: &ClassStore) -> Result<Vec<(RecordId, Vec<u8>)>> {
    let mut out = Vec::new();
    let mut cursor = txn.cursor(store.handle)?;
    let mut entry = cursor.find_range(&[])?;
    while let Some((key, val)) = entry {
        let position_id = u32::from_be_bytes(key[0..4].try_into().unwrap());
        out.push((RecordId::new(store.class_id, position_id), val));
        entry = cursor.next()?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStores;
    use crate::engine::Environment;
    use nogdb_api::{KvEngine, TxnMode};

    fn open_env() -> (tempfile::TempDir, Environment) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();
        (dir, env)
    }

    #[test]
    fn position_ids_are_monotonic_and_not_reused() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let stores = CatalogStores::open(&mut txn).unwrap();
        let class_store = ClassStore::open(&mut txn, 1).unwrap();

        let p1 = allocate_position(&mut txn, stores.dbinfo, 1).unwrap();
        let p2 = allocate_position(&mut txn, stores.dbinfo, 1).unwrap();
        assert_eq!((p1, p2), (1, 2));

        put_record(&mut txn, &class_store, p1, b"a").unwrap();
        delete_record(&mut txn, &class_store, p1).unwrap();
        let p3 = allocate_position(&mut txn, stores.dbinfo, 1).unwrap();
        assert_eq!(p3, 3);
        assert!(get_record(&txn, &class_store, p1).unwrap().is_none());
    }

    #[test]
    fn scan_returns_records_in_position_order() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let stores = CatalogStores::open(&mut txn).unwrap();
        let class_store = ClassStore::open(&mut txn, 7).unwrap();
        for body in [b"one".as_slice(), b"two", b"three"] {
            let p = allocate_position(&mut txn, stores.dbinfo, 7).unwrap();
            put_record(&mut txn, &class_store, p, body).unwrap();
        }
        let rows = scan_class(&txn, &class_store).unwrap();
        let positions: Vec<PositionId> = rows.iter().map(|(rid, _)| rid.position_id).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    /// A byte-lex comparator would sort position 256 (`[0,1,0,0]` native-endian)
    /// before position 1 (`[1,0,0,0]`); this would only show up once a
    /// position id crosses the first key byte, so positions 1-3 alone don't
    /// exercise it.
    #[test]
    fn scan_orders_positions_crossing_the_first_key_byte() {
        let (_dir, env) = open_env();
        let mut txn = env.begin(TxnMode::ReadWrite).unwrap();
        let stores = CatalogStores::open(&mut txn).unwrap();
        let class_store = ClassStore::open(&mut txn, 9).unwrap();
        for _ in 0..299 {
            allocate_position(&mut txn, stores.dbinfo, 9).unwrap();
        }
        put_record(&mut txn, &class_store, 300, b"three-hundred").unwrap();
        put_record(&mut txn, &class_store, 1, b"one").unwrap();
        put_record(&mut txn, &class_store, 255, b"two-fifty-five").unwrap();

        let rows = scan_class(&txn, &class_store).unwrap();
        let positions: Vec<PositionId> = rows.iter().map(|(rid, _)| rid.position_id).collect();
        assert_eq!(positions, vec![1, 255, 300]);
    }
}
