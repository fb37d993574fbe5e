//! The concrete KV engine this workspace runs on top of: the "equivalent
//! ordered KV engine" the spec allows substituting in for the real external
//! store. Durability is a write-ahead log of per-operation records; the
//! committed state itself is one in-memory structure that gets rewritten
//! atomically on every commit and checkpointed to disk the same way the
//! teacher's index catalog rewrites its single page atomically — scaled up
//! from one catalog page to the whole committed store map.
//!
//! MVCC is the direct consequence of that design: `begin` clones the
//! current committed map into the new transaction, which then reads (and,
//! for a writer, mutates) its own private copy until commit swaps it in.

use crate::error::{Result, StorageError};
use crate::pager::{self, Meta, PAGE_SIZE, VERSION};
use crate::wal::{self, WalRecord, WriteAheadLog};
use nogdb_api::{
    Error as ApiError, KvCursor, KvEngine, KvTxn, Result as ApiResult, StoreFlags, StoreHandle,
    TxnId, TxnMode, VersionId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, RwLock};

/// Content of one named sub-store. Unique and duplicate-allowed stores
/// share a representation: a unique store simply never lets a key's value
/// set grow past one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreData {
    pub entries: BTreeMap<Vec<u8>, BTreeSet<Vec<u8>>>,
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub version: VersionId,
    pub stores: HashMap<StoreHandle, StoreData>,
    pub store_flags: HashMap<StoreHandle, StoreFlags>,
    pub store_names: HashMap<String, StoreHandle>,
    pub next_store_id: u32,
}

impl Snapshot {
    fn store_mut(&mut self, handle: StoreHandle) -> Result<&mut StoreData> {
        self.stores
            .get_mut(&handle)
            .ok_or(StorageError::UnknownStore(handle))
    }

    fn store(&self, handle: StoreHandle) -> Result<&StoreData> {
        self.stores
            .get(&handle)
            .ok_or(StorageError::UnknownStore(handle))
    }
}

fn encode_checkpoint(snap: &Snapshot) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend((snap.stores.len() as u32).to_ne_bytes());
    let mut names: Vec<(&String, &StoreHandle)> = snap.store_names.iter().collect();
    names.sort_by_key(|(_, h)| h.0);
    for (name, handle) in names {
        let flags = snap.store_flags[handle];
        let data = &snap.stores[handle];
        out.extend((name.len() as u32).to_ne_bytes());
        out.extend(name.as_bytes());
        out.extend(handle.0.to_ne_bytes());
        out.push(flags.numeric_key as u8);
        out.push(flags.unique as u8);
        out.extend((data.entries.len() as u32).to_ne_bytes());
        for (key, values) in &data.entries {
            out.extend((key.len() as u32).to_ne_bytes());
            out.extend(key);
            out.extend((values.len() as u32).to_ne_bytes());
            for v in values {
                out.extend((v.len() as u32).to_ne_bytes());
                out.extend(v);
            }
        }
    }
    out.extend(snap.next_store_id.to_ne_bytes());
    out
}

fn decode_checkpoint(version: VersionId, bytes: &[u8]) -> Result<Snapshot> {
    let mut snap = Snapshot {
        version,
        ..Default::default()
    };
    let mut off = 0usize;
    macro_rules! take_u32 {
        () => {{
            let v = u32::from_ne_bytes(bytes[off..off + 4].try_into().unwrap());
            off += 4;
            v
        }};
    }
    let store_count = take_u32!();
    for _ in 0..store_count {
        let name_len = take_u32!() as usize;
        let name = String::from_utf8(bytes[off..off + name_len].to_vec())
            .map_err(|_| StorageError::Corrupted("store name not utf8".to_string()))?;
        off += name_len;
        let handle = StoreHandle(take_u32!());
        let numeric_key = bytes[off] != 0;
        off += 1;
        let unique = bytes[off] != 0;
        off += 1;
        let entry_count = take_u32!();
        let mut entries = BTreeMap::new();
        for _ in 0..entry_count {
            let key_len = take_u32!() as usize;
            let key = bytes[off..off + key_len].to_vec();
            off += key_len;
            let value_count = take_u32!();
            let mut values = BTreeSet::new();
            for _ in 0..value_count {
                let value_len = take_u32!() as usize;
                values.insert(bytes[off..off + value_len].to_vec());
                off += value_len;
            }
            entries.insert(key, values);
        }
        snap.store_names.insert(name, handle);
        snap.store_flags.insert(handle, StoreFlags { numeric_key, unique });
        snap.stores.insert(handle, StoreData { entries });
    }
    snap.next_store_id = u32::from_ne_bytes(bytes[off..off + 4].try_into().unwrap());
    Ok(snap)
}

struct WriterLock {
    locked: Mutex<bool>,
    cv: Condvar,
}

impl WriterLock {
    fn new() -> Self {
        WriterLock {
            locked: Mutex::new(false),
            cv: Condvar::new(),
        }
    }
}

pub(crate) struct EnvInner {
    committed: RwLock<Snapshot>,
    wal: Mutex<WriteAheadLog>,
    writer_lock: WriterLock,
    next_txn_id: Mutex<TxnId>,
    dir: PathBuf,
}

/// Holds the process-wide single-writer permit; released on drop.
struct WriterGuard {
    inner: Arc<EnvInner>,
}

impl Drop for WriterGuard {
    fn drop(&mut self) {
        let mut locked = self.inner.writer_lock.locked.lock().unwrap();
        *locked = false;
        self.inner.writer_lock.cv.notify_one();
    }
}

impl EnvInner {
    fn acquire_writer(self: &Arc<Self>) -> WriterGuard {
        let mut locked = self.writer_lock.locked.lock().unwrap();
        while *locked {
            locked = self.writer_lock.cv.wait(locked).unwrap();
        }
        *locked = true;
        WriterGuard {
            inner: self.clone(),
        }
    }
}

/// The environment: the process-wide handle to one database directory.
/// Cheap to clone — it is a handle around an `Arc`.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

impl Environment {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let checkpoint = pager::read_meta_and_checkpoint(dir)?;
        let (version, mut snapshot, next_txn_id) = match checkpoint {
            Some((meta, bytes)) => (
                meta.next_version_id.saturating_sub(1),
                decode_checkpoint(meta.next_version_id.saturating_sub(1), &bytes)?,
                meta.next_txn_id,
            ),
            None => (0, Snapshot::default(), 1),
        };
        snapshot.version = version;

        let wal_path = dir.join(".wal");
        let records = wal::replay(&wal_path)?;
        apply_wal_records(&mut snapshot, &records);

        let inner = Arc::new(EnvInner {
            committed: RwLock::new(snapshot),
            wal: Mutex::new(WriteAheadLog::open(&wal_path)?),
            writer_lock: WriterLock::new(),
            next_txn_id: Mutex::new(next_txn_id),
            dir: dir.to_path_buf(),
        });
        Ok(Environment { inner })
    }

    fn alloc_txn_id(&self) -> TxnId {
        let mut id = self.inner.next_txn_id.lock().unwrap();
        let value = *id;
        *id += 1;
        value
    }
}

fn apply_wal_records(snap: &mut Snapshot, records: &[WalRecord]) {
    for record in records {
        match record {
            WalRecord::OpenStore { name, handle, flags } => {
                snap.store_names.insert(name.clone(), *handle);
                snap.store_flags.insert(*handle, *flags);
                snap.stores.entry(*handle).or_default();
                if handle.0 >= snap.next_store_id {
                    snap.next_store_id = handle.0 + 1;
                }
            }
            WalRecord::Put { store, key, val } => {
                if let Some(data) = snap.stores.get_mut(store) {
                    let unique = snap.store_flags.get(store).map(|f| f.unique).unwrap_or(true);
                    let set = data.entries.entry(key.clone()).or_default();
                    if unique {
                        set.clear();
                    }
                    set.insert(val.clone());
                }
            }
            WalRecord::Del { store, key } => {
                if let Some(data) = snap.stores.get_mut(store) {
                    data.entries.remove(key);
                }
            }
            WalRecord::DelExact { store, key, val } => {
                if let Some(data) = snap.stores.get_mut(store) {
                    if let Some(set) = data.entries.get_mut(key) {
                        set.remove(val);
                        if set.is_empty() {
                            data.entries.remove(key);
                        }
                    }
                }
            }
            WalRecord::CommitTx { version_id, .. } => {
                snap.version = *version_id;
            }
        }
    }
}

impl KvEngine for Environment {
    type Txn = Txn;

    fn begin(&self, mode: TxnMode) -> ApiResult<Txn> {
        let txn_id = self.alloc_txn_id();
        match mode {
            TxnMode::ReadOnly => {
                let snapshot = self.inner.committed.read().unwrap().clone();
                Ok(Txn::ReadOnly(ReadOnlyTxn { txn_id, snapshot }))
            }
            TxnMode::ReadWrite => {
                let guard = self.inner.acquire_writer();
                let base = self.inner.committed.read().unwrap().clone();
                Ok(Txn::ReadWrite(ReadWriteTxn {
                    txn_id,
                    base_version: base.version,
                    working: base,
                    pending: Vec::new(),
                    inner: self.inner.clone(),
                    _guard: guard,
                    completed: false,
                }))
            }
        }
    }
}

pub struct ReadOnlyTxn {
    txn_id: TxnId,
    snapshot: Snapshot,
}

pub struct ReadWriteTxn {
    txn_id: TxnId,
    base_version: VersionId,
    working: Snapshot,
    pending: Vec<WalRecord>,
    inner: Arc<EnvInner>,
    _guard: WriterGuard,
    completed: bool,
}

pub enum Txn {
    ReadOnly(ReadOnlyTxn),
    ReadWrite(ReadWriteTxn),
}

impl Txn {
    pub fn txn_id(&self) -> TxnId {
        match self {
            Txn::ReadOnly(t) => t.txn_id,
            Txn::ReadWrite(t) => t.txn_id,
        }
    }

    /// The versionId this transaction's writes are tagged with: the
    /// snapshot versionId for a reader, or the versionId that will become
    /// current when a writer commits (`base_version + 1`).
    pub fn pending_version(&self) -> VersionId {
        match self {
            Txn::ReadOnly(t) => t.snapshot.version,
            Txn::ReadWrite(t) => t.base_version.saturating_add(1),
        }
    }
}

impl ReadWriteTxn {
    fn open_store_mut(&mut self, name: &str, flags: StoreFlags) -> StoreHandle {
        if let Some(handle) = self.working.store_names.get(name) {
            return *handle;
        }
        let handle = StoreHandle(self.working.next_store_id);
        self.working.next_store_id += 1;
        self.working.store_names.insert(name.to_string(), handle);
        self.working.store_flags.insert(handle, flags);
        self.working.stores.insert(handle, StoreData::default());
        self.pending.push(WalRecord::OpenStore {
            name: name.to_string(),
            handle,
            flags,
        });
        handle
    }
}

impl KvTxn for Txn {
    fn mode(&self) -> TxnMode {
        match self {
            Txn::ReadOnly(_) => TxnMode::ReadOnly,
            Txn::ReadWrite(_) => TxnMode::ReadWrite,
        }
    }

    fn open_store(&mut self, name: &str, flags: StoreFlags) -> ApiResult<StoreHandle> {
        match self {
            Txn::ReadOnly(t) => t
                .snapshot
                .store_names
                .get(name)
                .copied()
                .ok_or_else(|| ApiError::Storage(format!("unknown store {name}"))),
            Txn::ReadWrite(t) => Ok(t.open_store_mut(name, flags)),
        }
    }

    fn put(&mut self, store: StoreHandle, key: &[u8], val: &[u8]) -> ApiResult<()> {
        let t = match self {
            Txn::ReadOnly(_) => return Err(ApiError::TxnInvalidMode),
            Txn::ReadWrite(t) => t,
        };
        let unique = t
            .working
            .store_flags
            .get(&store)
            .map(|f| f.unique)
            .unwrap_or(true);
        let data = t.working.store_mut(store).map_err(ApiError::from)?;
        let set = data.entries.entry(key.to_vec()).or_default();
        if unique {
            set.clear();
        }
        set.insert(val.to_vec());
        t.pending.push(WalRecord::Put {
            store,
            key: key.to_vec(),
            val: val.to_vec(),
        });
        Ok(())
    }

    fn get(&self, store: StoreHandle, key: &[u8]) -> ApiResult<Option<Vec<u8>>> {
        let snap = match self {
            Txn::ReadOnly(t) => &t.snapshot,
            Txn::ReadWrite(t) => &t.working,
        };
        let data = snap.store(store).map_err(ApiError::from)?;
        Ok(data.entries.get(key).and_then(|set| set.iter().next().cloned()))
    }

    fn del(&mut self, store: StoreHandle, key: &[u8]) -> ApiResult<()> {
        let t = match self {
            Txn::ReadOnly(_) => return Err(ApiError::TxnInvalidMode),
            Txn::ReadWrite(t) => t,
        };
        let data = t.working.store_mut(store).map_err(ApiError::from)?;
        data.entries.remove(key);
        t.pending.push(WalRecord::Del {
            store,
            key: key.to_vec(),
        });
        Ok(())
    }

    fn del_exact(&mut self, store: StoreHandle, key: &[u8], val: &[u8]) -> ApiResult<()> {
        let t = match self {
            Txn::ReadOnly(_) => return Err(ApiError::TxnInvalidMode),
            Txn::ReadWrite(t) => t,
        };
        let data = t.working.store_mut(store).map_err(ApiError::from)?;
        if let Some(set) = data.entries.get_mut(key) {
            set.remove(val);
            if set.is_empty() {
                data.entries.remove(key);
            }
        }
        t.pending.push(WalRecord::DelExact {
            store,
            key: key.to_vec(),
            val: val.to_vec(),
        });
        Ok(())
    }

    fn cursor<'t>(&'t self, store: StoreHandle) -> ApiResult<Box<dyn KvCursor + 't>> {
        let snap = match self {
            Txn::ReadOnly(t) => &t.snapshot,
            Txn::ReadWrite(t) => &t.working,
        };
        let data = snap.store(store).map_err(ApiError::from)?;
        let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
        for (key, values) in &data.entries {
            for v in values {
                pairs.push((key.clone(), v.clone()));
            }
        }
        Ok(Box::new(MapCursor { pairs, pos: None }))
    }

    fn commit(mut self) -> ApiResult<()> {
        match &mut self {
            Txn::ReadOnly(_) => Ok(()),
            Txn::ReadWrite(t) => {
                let new_version = t.base_version.checked_add(1).ok_or(ApiError::TxnVersionNoMem)?;
                t.working.version = new_version;

                let mut wal = t.inner.wal.lock().unwrap();
                for record in &t.pending {
                    wal.append(record).map_err(ApiError::from)?;
                }
                wal.append(&WalRecord::CommitTx {
                    txn_id: t.txn_id,
                    version_id: new_version,
                })
                .map_err(ApiError::from)?;
                wal.flush().map_err(ApiError::from)?;
                drop(wal);

                *t.inner.committed.write().unwrap() = t.working.clone();

                let checkpoint = encode_checkpoint(&t.working);
                let meta = Meta {
                    version: VERSION,
                    page_size: PAGE_SIZE as u32,
                    next_txn_id: *t.inner.next_txn_id.lock().unwrap(),
                    next_version_id: new_version + 1,
                    checkpoint_len: checkpoint.len() as u64,
                };
                pager::write_meta_and_checkpoint(&t.inner.dir, &meta, &checkpoint)
                    .map_err(ApiError::from)?;
                t.inner.wal.lock().unwrap().truncate().map_err(ApiError::from)?;

                t.completed = true;
                Ok(())
            }
        }
    }

    fn rollback(self) {
        // Dropping the working copy without committing discards every
        // pending write; the writer guard releases on drop.
    }
}

impl Drop for ReadWriteTxn {
    fn drop(&mut self) {
        // Destruction without an explicit commit is a rollback: the
        // working copy is simply discarded, `committed` is untouched.
        let _ = self.completed;
    }
}

struct MapCursor {
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
}

impl KvCursor for MapCursor {
    fn find(&mut self, key: &[u8]) -> ApiResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self.pairs.iter().position(|(k, _)| k.as_slice() == key) {
            Some(idx) => {
                self.pos = Some(idx);
                Ok(Some(self.pairs[idx].clone()))
            }
            None => {
                self.pos = None;
                Ok(None)
            }
        }
    }

    fn find_range(&mut self, key: &[u8]) -> ApiResult<Option<(Vec<u8>, Vec<u8>)>> {
        match self.pairs.iter().position(|(k, _)| k.as_slice() >= key) {
            Some(idx) => {
                self.pos = Some(idx);
                Ok(Some(self.pairs[idx].clone()))
            }
            None => {
                self.pos = None;
                Ok(None)
            }
        }
    }

    fn next(&mut self) -> ApiResult<Option<(Vec<u8>, Vec<u8>)>> {
        let next_idx = match self.pos {
            Some(idx) => idx + 1,
            None => 0,
        };
        if next_idx >= self.pairs.len() {
            self.pos = Some(self.pairs.len());
            return Ok(None);
        }
        self.pos = Some(next_idx);
        Ok(Some(self.pairs[next_idx].clone()))
    }

    fn prev(&mut self) -> ApiResult<Option<(Vec<u8>, Vec<u8>)>> {
        let prev_idx = match self.pos {
            Some(0) | None => return Ok(None),
            Some(idx) => idx - 1,
        };
        self.pos = Some(prev_idx);
        Ok(Some(self.pairs[prev_idx].clone()))
    }

    fn del(&mut self) -> ApiResult<()> {
        // Cursor-based delete acts on a point-in-time snapshot of the
        // store; callers that need the deletion to take effect on the
        // transaction's working copy issue `del_exact` against the same
        // (key, value) instead of relying on this cursor mutating storage.
        Err(ApiError::Internal(
            "cursor delete is not supported on this read snapshot; use Txn::del_exact".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nogdb_api::StoreFlags;

    #[test]
    fn write_then_read_committed_state_in_new_txn() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();

        let mut w = env.begin(TxnMode::ReadWrite).unwrap();
        let store = w.open_store("classes", StoreFlags::unique_numeric()).unwrap();
        w.put(store, b"1", b"islands").unwrap();
        w.commit().unwrap();

        let r = env.begin(TxnMode::ReadOnly).unwrap();
        let store = r.open_store("classes", StoreFlags::unique_numeric()).unwrap();
        assert_eq!(r.get(store, b"1").unwrap(), Some(b"islands".to_vec()));
    }

    #[test]
    fn reader_started_before_commit_does_not_see_it() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();

        let mut w = env.begin(TxnMode::ReadWrite).unwrap();
        let store = w.open_store("classes", StoreFlags::unique_numeric()).unwrap();

        let reader_before = env.begin(TxnMode::ReadOnly).unwrap();

        w.put(store, b"1", b"islands").unwrap();
        w.commit().unwrap();

        let reader_after = env.begin(TxnMode::ReadOnly).unwrap();
        let store_after = reader_after.open_store("classes", StoreFlags::unique_numeric()).unwrap();
        assert_eq!(reader_after.get(store_after, b"1").unwrap(), Some(b"islands".to_vec()));

        // reader_before opened the store before the writer created it, so
        // the store itself is not yet visible to that snapshot.
        assert!(reader_before.open_store("classes", StoreFlags::unique_numeric()).is_err());
    }

    #[test]
    fn rollback_discards_writes() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();

        let mut w = env.begin(TxnMode::ReadWrite).unwrap();
        let store = w.open_store("classes", StoreFlags::unique_numeric()).unwrap();
        w.put(store, b"1", b"islands").unwrap();
        w.rollback();

        let w2 = env.begin(TxnMode::ReadWrite).unwrap();
        assert!(w2.get(StoreHandle(0), b"1").is_err());
    }

    #[test]
    fn duplicate_store_keeps_all_values_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path()).unwrap();

        let mut w = env.begin(TxnMode::ReadWrite).unwrap();
        let store = w.open_store("relations-out", StoreFlags::duplicate_bytes()).unwrap();
        w.put(store, b"1:1", b"edge-a").unwrap();
        w.put(store, b"1:1", b"edge-b").unwrap();
        w.commit().unwrap();

        let r = env.begin(TxnMode::ReadOnly).unwrap();
        let store = r.open_store("relations-out", StoreFlags::duplicate_bytes()).unwrap();
        let mut cursor = r.cursor(store).unwrap();
        let first = cursor.find(b"1:1").unwrap().unwrap();
        let second = cursor.next().unwrap().unwrap();
        assert_eq!(first.1, b"edge-a");
        assert_eq!(second.1, b"edge-b");
    }

    #[test]
    fn checkpoint_and_wal_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = Environment::open(dir.path()).unwrap();
            let mut w = env.begin(TxnMode::ReadWrite).unwrap();
            let store = w.open_store("classes", StoreFlags::unique_numeric()).unwrap();
            w.put(store, b"1", b"islands").unwrap();
            w.commit().unwrap();
        }
        let env = Environment::open(dir.path()).unwrap();
        let r = env.begin(TxnMode::ReadOnly).unwrap();
        let store = r.open_store("classes", StoreFlags::unique_numeric()).unwrap();
        assert_eq!(r.get(store, b"1").unwrap(), Some(b"islands".to_vec()));
    }
}
