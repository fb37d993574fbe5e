//! Storage-layer error type. Converts into `nogdb_api::Error::Storage` or
//! `::Internal` at the boundary the rest of the engine depends on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad file magic")]
    BadMagic,
    #[error("unsupported page size {0}")]
    UnsupportedPageSize(u64),
    #[error("checksum mismatch in wal record at offset {offset}")]
    WalChecksumMismatch { offset: u64 },
    #[error("wal record too large: {0} bytes")]
    WalRecordTooLarge(u32),
    #[error("store not found: {0:?}")]
    UnknownStore(nogdb_api::StoreHandle),
    #[error("storage is corrupted: {0}")]
    Corrupted(String),
}

impl From<StorageError> for nogdb_api::Error {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Io(err) => nogdb_api::Error::Storage(err.to_string()),
            StorageError::BadMagic
            | StorageError::UnsupportedPageSize(_)
            | StorageError::WalChecksumMismatch { .. }
            | StorageError::WalRecordTooLarge(_)
            | StorageError::Corrupted(_) => nogdb_api::Error::Internal(e.to_string()),
            StorageError::UnknownStore(_) => nogdb_api::Error::Storage(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
