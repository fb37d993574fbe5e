//! Write-ahead log: one record per mutating KV operation, fsynced on
//! commit, replayed on open. Grounded on the teacher's `WalRecord` enum and
//! crc32-checksummed framing, scaled down to this engine's operation set.

use crate::error::{Result, StorageError};
use nogdb_api::{StoreFlags, StoreHandle, TxnId, VersionId};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WalRecord {
    OpenStore {
        name: String,
        handle: StoreHandle,
        flags: StoreFlags,
    },
    Put {
        store: StoreHandle,
        key: Vec<u8>,
        val: Vec<u8>,
    },
    Del {
        store: StoreHandle,
        key: Vec<u8>,
    },
    DelExact {
        store: StoreHandle,
        key: Vec<u8>,
        val: Vec<u8>,
    },
    CommitTx {
        txn_id: TxnId,
        version_id: VersionId,
    },
}

pub struct WriteAheadLog {
    path: PathBuf,
    file: File,
}

impl WriteAheadLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;
        Ok(WriteAheadLog {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Appends a record: `[len:u32][crc32:u32][payload]`. Does not fsync —
    /// callers batch several appends per transaction and call `flush` once.
    pub fn append(&mut self, record: &WalRecord) -> Result<()> {
        let payload = serde_json::to_vec(record).map_err(|e| StorageError::Corrupted(e.to_string()))?;
        if payload.len() > u32::MAX as usize {
            return Err(StorageError::WalRecordTooLarge(u32::MAX));
        }
        let crc = crc32fast::hash(&payload);
        self.file.write_all(&(payload.len() as u32).to_ne_bytes())?;
        self.file.write_all(&crc.to_ne_bytes())?;
        self.file.write_all(&payload)?;
        Ok(())
    }

    /// Fsyncs the log; called once per committing write transaction.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Truncates the log to empty, used right after a checkpoint has
    /// durably absorbed every record in it.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&self.path)?;
        Ok(())
    }
}

/// Replays every well-formed record in the log, in order. Stops at the
/// first truncated or checksum-mismatched record rather than erroring,
/// since a crash mid-append leaves a partial trailing record by
/// construction — not corruption of anything already committed.
pub fn replay(path: &Path) -> Result<Vec<WalRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut file = File::open(path)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;

    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset + 8 <= buf.len() {
        let len = u32::from_ne_bytes(buf[offset..offset + 4].try_into().unwrap()) as usize;
        let crc = u32::from_ne_bytes(buf[offset + 4..offset + 8].try_into().unwrap());
        let payload_start = offset + 8;
        let payload_end = payload_start + len;
        if payload_end > buf.len() {
            break;
        }
        let payload = &buf[payload_start..payload_end];
        if crc32fast::hash(payload) != crc {
            break;
        }
        match serde_json::from_slice::<WalRecord>(payload) {
            Ok(record) => records.push(record),
            Err(_) => break,
        }
        offset = payload_end;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_replay_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let mut wal = WriteAheadLog::open(&path).unwrap();
            wal.append(&WalRecord::OpenStore {
                name: "classes".into(),
                handle: StoreHandle(1),
                flags: StoreFlags::unique_numeric(),
            })
            .unwrap();
            wal.append(&WalRecord::Put {
                store: StoreHandle(1),
                key: vec![0, 1],
                val: vec![9, 9, 9],
            })
            .unwrap();
            wal.append(&WalRecord::CommitTx {
                txn_id: 1,
                version_id: 1,
            })
            .unwrap();
            wal.flush().unwrap();
        }
        let records = replay(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[2],
            WalRecord::CommitTx {
                txn_id: 1,
                version_id: 1
            }
        );
    }

    #[test]
    fn replay_stops_at_truncated_trailing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal.log");
        {
            let mut wal = WriteAheadLog::open(&path).unwrap();
            wal.append(&WalRecord::CommitTx {
                txn_id: 1,
                version_id: 1,
            })
            .unwrap();
            wal.flush().unwrap();
        }
        // simulate a crash mid-append: corrupt trailing bytes
        let mut bytes = std::fs::read(&path).unwrap();
        bytes.push(0xFF);
        std::fs::write(&path, &bytes).unwrap();
        let records = replay(&path).unwrap();
        assert_eq!(records.len(), 1);
    }
}
