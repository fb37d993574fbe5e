//! The single typed error shared by every layer of the engine.
//!
//! Every operation signals failure through this one type: a numeric `code`
//! plus a human-readable message, grouped into the categories from the
//! error-handling design (context, graph, transaction, storage, internal).

use thiserror::Error;

/// Numeric error code, stable across versions, grouped by category:
/// 1xxx context, 2xxx graph, 3xxx transaction, 4xxx storage, 5xxx internal.
pub type ErrorCode = u32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // --- Context errors (user-caused, recoverable) ---
    #[error("class not found: {0}")]
    UnknownClass(String),
    #[error("property not found: {0}")]
    UnknownProperty(String),
    #[error("class already exists: {0}")]
    DuplicateClass(String),
    #[error("property already exists: {0}")]
    DuplicateProperty(String),
    #[error("subclass type does not match superclass type")]
    InvalidClassType,
    #[error("invalid property type")]
    InvalidPropertyType,
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("comparator is not valid for this property type")]
    InvalidComparator,
    #[error("counter upper bound reached: {0}")]
    CounterUpperBound(&'static str),
    #[error("invalid alter attribute: {0}")]
    InvalidAlterAttribute(String),
    #[error("index already exists on property")]
    DuplicateIndex,
    #[error("property value is not set")]
    EmptyPropertyValue,

    // --- Graph errors (data integrity, user-caused) ---
    #[error("source vertex does not exist: {0}")]
    NoExistSrc(String),
    #[error("destination vertex does not exist: {0}")]
    NoExistDst(String),
    #[error("edge does not exist: {0}")]
    NoExistEdge(String),
    #[error("vertex does not exist: {0}")]
    NoExistVertex(String),
    #[error("record does not exist: {0}")]
    NoExistRecord(String),

    // --- Transaction errors ---
    #[error("transaction already completed")]
    TxnCompleted,
    #[error("write operation attempted on a read-only transaction")]
    TxnInvalidMode,
    #[error("transaction version counter exhausted")]
    TxnVersionNoMem,
    #[error("maximum record position exhausted for this class")]
    MaxRecordNum,

    // --- Storage errors (fatal to the transaction) ---
    #[error("storage error: {0}")]
    Storage(String),

    // --- Internal errors (corruption) ---
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::UnknownClass(_) => 1001,
            Error::UnknownProperty(_) => 1002,
            Error::DuplicateClass(_) => 1003,
            Error::DuplicateProperty(_) => 1004,
            Error::InvalidClassType => 1005,
            Error::InvalidPropertyType => 1006,
            Error::InvalidName(_) => 1007,
            Error::InvalidComparator => 1008,
            Error::CounterUpperBound(_) => 1009,
            Error::InvalidAlterAttribute(_) => 1010,
            Error::DuplicateIndex => 1011,
            Error::EmptyPropertyValue => 1012,
            Error::NoExistSrc(_) => 2001,
            Error::NoExistDst(_) => 2002,
            Error::NoExistEdge(_) => 2003,
            Error::NoExistVertex(_) => 2004,
            Error::NoExistRecord(_) => 2005,
            Error::TxnCompleted => 3001,
            Error::TxnInvalidMode => 3002,
            Error::TxnVersionNoMem => 3003,
            Error::MaxRecordNum => 3004,
            Error::Storage(_) => 4001,
            Error::Internal(_) => 5001,
        }
    }

    /// Storage and internal errors poison the write transaction: the spec
    /// requires the transaction to remain usable after a context/graph/txn
    /// error but not after these.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Internal(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
