//! The ordered KV-store contract the core engine is built over.
//!
//! This is deliberately a thin sketch: open named sub-stores, put/get/del,
//! and cursor iteration. The core never depends on a specific KV engine,
//! only on these traits — `nogdb-storage` supplies the one concrete
//! implementation this workspace ships.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque handle to a named sub-store, scoped to the environment that opened it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreHandle(pub u32);

/// Flags a sub-store is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFlags {
    /// Keys are compared as fixed-width integers rather than byte-lex.
    pub numeric_key: bool,
    /// `false` allows duplicate keys, sorted by value (used by the relation index).
    pub unique: bool,
}

impl StoreFlags {
    pub const fn unique_bytes() -> Self {
        StoreFlags {
            numeric_key: false,
            unique: true,
        }
    }

    pub const fn unique_numeric() -> Self {
        StoreFlags {
            numeric_key: true,
            unique: true,
        }
    }

    pub const fn duplicate_bytes() -> Self {
        StoreFlags {
            numeric_key: false,
            unique: false,
        }
    }
}

/// An environment: the process-wide handle to one database directory.
pub trait KvEngine {
    type Txn: KvTxn;

    /// Opens a read-write or read-only transaction. At most one read-write
    /// transaction may be open across the process at a time; this call
    /// blocks until the writer lock is available.
    fn begin(&self, mode: TxnMode) -> Result<Self::Txn>;
}

/// A single KV transaction: either the lone read-write transaction or one
/// of many concurrent read-only snapshots.
pub trait KvTxn {
    fn mode(&self) -> TxnMode;

    /// Opens (creating if absent, write transactions only) a named sub-store.
    fn open_store(&mut self, name: &str, flags: StoreFlags) -> Result<StoreHandle>;

    fn put(&mut self, store: StoreHandle, key: &[u8], val: &[u8]) -> Result<()>;
    fn get(&self, store: StoreHandle, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn del(&mut self, store: StoreHandle, key: &[u8]) -> Result<()>;
    /// Duplicate-aware delete: removes only the `(key, val)` pair, leaving
    /// other values under the same key untouched.
    fn del_exact(&mut self, store: StoreHandle, key: &[u8], val: &[u8]) -> Result<()>;

    fn cursor<'t>(&'t self, store: StoreHandle) -> Result<Box<dyn KvCursor + 't>>;

    fn commit(self) -> Result<()>;
    fn rollback(self);
}

/// Cursor iteration over one sub-store.
pub trait KvCursor {
    /// Positions on the exact key; `None` if absent.
    fn find(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// Positions on the smallest key `>= key`.
    fn find_range(&mut self, key: &[u8]) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    fn next(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    fn prev(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>>;
    /// Deletes the entry the cursor currently points at.
    fn del(&mut self) -> Result<()>;
}

/// Encodes an unsigned integer as big-endian bytes so byte-lex cursor order
/// matches integer order.
pub fn encode_u16_key(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

pub fn encode_u32_key(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

pub fn encode_u64_key(v: u64) -> [u8; 8] {
    v.to_be_bytes()
}

/// Encodes a signed integer with the sign bit flipped so its big-endian byte
/// representation sorts the same way the signed value orders.
pub fn encode_i64_key(v: i64) -> [u8; 8] {
    ((v as u64) ^ (1u64 << 63)).to_be_bytes()
}

/// Encodes an `f64` so byte-lex order matches IEEE total order: flip the
/// sign bit for non-negative values, flip every bit for negative ones.
pub fn encode_f64_key(v: f64) -> [u8; 8] {
    let bits = v.to_bits();
    let mapped = if bits & (1u64 << 63) != 0 {
        !bits
    } else {
        bits | (1u64 << 63)
    };
    mapped.to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_key_preserves_order() {
        let mut values = [-3.5, -0.0, 0.0, 1.0, 2.5, 100.0];
        let mut keyed: Vec<([u8; 8], f64)> =
            values.iter().map(|&v| (encode_f64_key(v), v)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let sorted: Vec<f64> = keyed.into_iter().map(|(_, v)| v).collect();
        assert_eq!(sorted, values);
    }

    #[test]
    fn u16_key_preserves_order_across_the_first_byte() {
        let mut values = [0u16, 1, 255, 256, 300, u16::MAX];
        let mut keyed: Vec<([u8; 2], u16)> =
            values.iter().map(|&v| (encode_u16_key(v), v)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        values.sort();
        let sorted: Vec<u16> = keyed.into_iter().map(|(_, v)| v).collect();
        assert_eq!(sorted, values);
    }

    #[test]
    fn i64_key_preserves_order() {
        let mut values = [i64::MIN, -100, -1, 0, 1, 100, i64::MAX];
        let mut keyed: Vec<([u8; 8], i64)> =
            values.iter().map(|&v| (encode_i64_key(v), v)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        values.sort();
        let sorted: Vec<i64> = keyed.into_iter().map(|(_, v)| v).collect();
        assert_eq!(sorted, values);
    }
}
