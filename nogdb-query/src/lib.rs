//! NogDB core query engine: the property-condition filter tree and the
//! BFS/DFS graph traversal built on top of it.
//!
//! This crate is generic over [`GraphReader`] rather than depending on
//! `nogdb-storage` directly — it never opens a store or reads a page, it
//! only asks its reader for decoded records and adjacency pairs. The facade
//! crate wires a live transaction (catalog + relation index + data store)
//! into that trait.

pub mod condition;
pub mod filter;
pub mod record;
pub mod traverse;

pub use condition::{evaluate, Comparator, Condition, MultiCondition, Operand, PropertyTypeMap};
pub use filter::{Filter, GraphFilter};
pub use record::{DecodedRecord, GraphReader};
pub use traverse::{traverse, walk_edges, Direction, Strategy, TraversalSpec};
