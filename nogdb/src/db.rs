//! `Database`: the entry point. Opens a directory of KV-engine files and
//! hands out read/write transactions over it.

use crate::error::Result;
use crate::txn::Transaction;
use nogdb_api::{KvEngine, TxnMode};
use nogdb_storage::Environment;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Database-wide limits enforced by the KV layer (§6).
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of named sub-stores the environment will open.
    pub max_stores: u32,
    /// Maximum on-disk size of the database, in bytes.
    pub max_db_size: u64,
    /// Maximum number of concurrent read-only transactions.
    pub max_readers: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_stores: 1024,
            max_db_size: 1 << 30,
            max_readers: 65536,
        }
    }
}

/// The main database handle. Cheap to clone — it wraps an `Arc`-backed
/// [`Environment`] internally and can be shared across threads; write
/// transactions still serialize through the environment's writer lock.
#[derive(Clone)]
pub struct Database {
    env: Environment,
    path: PathBuf,
    options: Options,
}

impl Database {
    /// Opens (or creates) a database directory with default [`Options`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    /// Opens (or creates) a database directory, replaying its write-ahead
    /// log if one exists.
    pub fn open_with_options(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!(path = %path.display(), "opening database");
        let env = Environment::open(&path)?;
        Ok(Database { env, path, options })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Begins a read-write transaction. Blocks until any other writer has
    /// committed or rolled back.
    pub fn begin_write(&self) -> Result<Transaction<'_>> {
        let inner = self.env.begin(TxnMode::ReadWrite)?;
        debug!(txn_id = inner.txn_id(), "begin write transaction");
        Transaction::new(&self.env, inner)
    }

    /// Begins a read-only transaction over the current committed snapshot.
    pub fn begin_read(&self) -> Result<Transaction<'_>> {
        let inner = self.env.begin(TxnMode::ReadOnly)?;
        debug!(txn_id = inner.txn_id(), "begin read transaction");
        Transaction::new(&self.env, inner)
    }
}
