//! Fixed-size page framing for the on-disk meta page and the checkpoint
//! file, grounded on the teacher's `Meta`/page-encode pattern but scaled
//! down: this engine does not page a B-tree, it pages the meta header and
//! the whole-store checkpoint blob that gets rewritten atomically on commit.

use crate::error::{Result, StorageError};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const PAGE_SIZE: usize = 4096;
pub const FILE_MAGIC: [u8; 8] = *b"NOGDBv1\0";
pub const VERSION: u32 = 1;

/// The fixed meta page: identifies the file format and records the
/// counters needed to resume allocation after a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub version: u32,
    pub page_size: u32,
    pub next_txn_id: u64,
    pub next_version_id: u64,
    pub checkpoint_len: u64,
}

impl Meta {
    pub fn encode(&self) -> [u8; PAGE_SIZE] {
        let mut page = [0u8; PAGE_SIZE];
        let mut offset = 0usize;
        macro_rules! put {
            ($bytes:expr) => {{
                let b = $bytes;
                page[offset..offset + b.len()].copy_from_slice(&b);
                offset += b.len();
            }};
        }
        put!(FILE_MAGIC);
        put!(self.version.to_ne_bytes());
        put!(self.page_size.to_ne_bytes());
        put!(self.next_txn_id.to_ne_bytes());
        put!(self.next_version_id.to_ne_bytes());
        put!(self.checkpoint_len.to_ne_bytes());
        page
    }

    pub fn decode(page: &[u8; PAGE_SIZE]) -> Result<Meta> {
        if page[0..8] != FILE_MAGIC {
            return Err(StorageError::BadMagic);
        }
        let mut offset = 8usize;
        macro_rules! take {
            ($ty:ty) => {{
                const N: usize = std::mem::size_of::<$ty>();
                let v = <$ty>::from_ne_bytes(page[offset..offset + N].try_into().unwrap());
                offset += N;
                v
            }};
        }
        let version: u32 = take!(u32);
        let page_size: u32 = take!(u32);
        if page_size as usize != PAGE_SIZE {
            return Err(StorageError::UnsupportedPageSize(page_size as u64));
        }
        let next_txn_id: u64 = take!(u64);
        let next_version_id: u64 = take!(u64);
        let checkpoint_len: u64 = take!(u64);
        Ok(Meta {
            version,
            page_size,
            next_txn_id,
            next_version_id,
            checkpoint_len,
        })
    }
}

/// Reads the meta page and checkpoint blob, if present.
pub fn read_meta_and_checkpoint(dir: &Path) -> Result<Option<(Meta, Vec<u8>)>> {
    let meta_path = dir.join(".meta");
    if !meta_path.exists() {
        return Ok(None);
    }
    let mut f = fs::File::open(&meta_path)?;
    let mut page = [0u8; PAGE_SIZE];
    f.read_exact(&mut page)?;
    let meta = Meta::decode(&page)?;
    let mut checkpoint = vec![0u8; meta.checkpoint_len as usize];
    f.read_exact(&mut checkpoint)?;
    Ok(Some((meta, checkpoint)))
}

/// Atomically rewrites the meta page + checkpoint blob: write to a temp
/// file in the same directory, fsync, then rename over the live file. This
/// is the "single structure rewritten atomically" pattern the catalog in
/// the teacher codebase uses, generalized from one catalog page to the
/// whole committed store snapshot.
pub fn write_meta_and_checkpoint(dir: &Path, meta: &Meta, checkpoint: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let tmp_path: PathBuf = dir.join(".meta.tmp");
    {
        let mut f = fs::File::create(&tmp_path)?;
        f.write_all(&meta.encode())?;
        f.write_all(checkpoint)?;
        f.sync_all()?;
    }
    fs::rename(&tmp_path, dir.join(".meta"))?;
    Ok(())
}
