//! The public error type: a re-export of the single error union shared by
//! every layer beneath the facade (§7). There is nothing left for the
//! facade to add — `nogdb_storage` and `nogdb_query` already convert their
//! own failures into this type at their boundary.

pub use nogdb_api::{Error, ErrorCode, Result};
