//! NogDB: an embeddable, single-file property-graph database with MVCC
//! snapshot isolation.
//!
//! ```rust,no_run
//! use nogdb::{Database, Record};
//! use nogdb_api::{ClassType, PropertyType, Value};
//!
//! fn main() -> nogdb::Result<()> {
//!     let db = Database::open("my_graph.ndb")?;
//!
//!     let mut txn = db.begin_write()?;
//!     txn.add_class("island", ClassType::Vertex)?;
//!     txn.add_property("island", "name", PropertyType::Text)?;
//!     let rid = txn.add_vertex("island", Record::new().set("name", Value::Text("Koh Chang".into())))?;
//!     txn.commit()?;
//!
//!     let mut txn = db.begin_read()?;
//!     let record = txn.fetch_record(rid)?;
//!     assert_eq!(record.get("name"), Some(Value::Text("Koh Chang".into())));
//!     txn.commit()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Core concepts
//!
//! - [`Database`]: the entry point. Opens (or creates) a directory of
//!   KV-engine files and hands out read/write transactions over it.
//! - [`Transaction`]: a single read or read-write handle. Read transactions
//!   see a frozen snapshot of the committed state; write transactions
//!   serialize through a single writer lock and either commit atomically or
//!   roll back.
//! - [`Record`]: the property bag passed to `add_vertex`/`add_edge`/`update`
//!   and returned by every read operation.
//! - `query`: the condition/filter and BFS/DFS traversal engine, re-exported
//!   from `nogdb-query` for callers building [`GraphFilter`] trees directly.

mod db;
mod error;
mod record;
mod result;
mod txn;

pub use db::{Database, Options};
pub use error::{Error, ErrorCode, Result};
pub use record::Record;
pub use result::{ResultSet, ResultSetCursor};
pub use txn::{FindBuilder, Transaction, TraverseBuilder};

pub use nogdb_query as query;
pub use nogdb_query::{Direction, GraphFilter, Strategy};
