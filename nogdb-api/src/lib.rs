//! Shared identifiers, typed property values, and the embedded KV-engine
//! contract used by the rest of the NogDB workspace.

pub mod error;
pub mod ids;
pub mod kv;
pub mod value;

pub use error::{Error, ErrorCode, Result};
pub use ids::{
    ClassId, IndexId, PositionId, PropertyId, RecordId, TxnId, VersionId, MAX_CLASS_ID,
    MAX_POSITION_ID,
};
pub use kv::{KvCursor, KvEngine, KvTxn, StoreFlags, StoreHandle, TxnMode};
pub use value::{Bytes, PropertyType, Value};

/// Class kind: vertex or edge. Subclass type must match the superclass's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassType {
    Vertex,
    Edge,
}

impl ClassType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassType::Vertex => "VERTEX",
            ClassType::Edge => "EDGE",
        }
    }

    pub fn parse(s: &str) -> Option<ClassType> {
        match s {
            "VERTEX" => Some(ClassType::Vertex),
            "EDGE" => Some(ClassType::Edge),
            _ => None,
        }
    }
}

/// Names reserved for the four pseudo-properties: never persisted as
/// property-id blocks, always supplied by the read path.
pub mod pseudo {
    pub const CLASS_NAME: &str = "@className";
    pub const RECORD_ID: &str = "@recordId";
    pub const DEPTH: &str = "@depth";
    pub const VERSION: &str = "@version";
}

/// Validates a class or property name: `^[A-Za-z_][A-Za-z0-9_]*$`, <= 128 chars.
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 128 {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
