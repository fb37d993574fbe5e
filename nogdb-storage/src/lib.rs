//! NogDB core storage: the blob codec, the concrete embedded KV engine
//! (pager + write-ahead log), the record codec, the schema catalog, the
//! relation (adjacency) index, and the per-class data-record store.
//!
//! Everything above [`blob`] and [`engine`] is written against the generic
//! `nogdb_api::{KvEngine, KvTxn}` contract, so it runs unmodified over any
//! conforming KV engine — `engine` is simply the one concrete implementation
//! this workspace ships to satisfy that contract end to end.

pub mod blob;
pub mod catalog;
pub mod datastore;
pub mod engine;
pub mod error;
pub mod pager;
pub mod record;
pub mod relation;
pub mod wal;

pub use blob::Blob;
pub use engine::Environment;
pub use error::StorageError;
