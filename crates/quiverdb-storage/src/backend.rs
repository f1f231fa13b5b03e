// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Backend Adapter: a single interface over the B+-tree and LSM
//! stores, grounded on the small `put`/`delete`/`iterate`/snapshot trait
//! `kvdb` presents over RocksDB and LMDB in `paritytech/parity-common`.

use crate::error::StorageError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options accepted by [`Backend::open`].
#[derive(Clone, Debug)]
pub struct OpenOptions {
    /// Maximum memory-map size, in bytes. Only consulted by the B+-tree
    /// (LMDB) backend; ignored by the LSM (RocksDB) backend.
    pub map_size: usize,
    /// Delete any existing store at `path` before opening a fresh one.
    pub rebuild: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        // 1 GiB. LMDB reserves address space eagerly but commits pages
        // lazily, so a generous map_size costs nothing until it's used.
        OpenOptions { map_size: 1 << 30, rebuild: false }
    }
}

/// A read-only, point-in-time view over a backend's key space.
///
/// Obtained from [`Backend::new_snapshot`]; closing a snapshot is simply
/// dropping it — the borrow checker then makes any further use a compile
/// error rather than a runtime usage error.
pub trait Snapshot: Send {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Ordered, finite iteration over the whole key space as it stood when
    /// the snapshot was taken. Restartable only by taking a new snapshot.
    fn iter(&self) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError>;
}

/// An atomic batch of mutations, scoped to the call that created it.
///
/// Mutations accumulate locally and take effect only on [`Batch::commit`];
/// on any internal failure the batch must not be partially applied.
pub trait Batch<'a> {
    fn put(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
    fn commit(self: Box<Self>) -> Result<(), StorageError>;
}

/// A single store, presenting the B+-tree/LSM/remote engines behind one
/// shape. Implementations are `Send + Sync` so an `Arc<dyn Backend>` can be
/// shared between the Write-Buffer Engine's caller threads, flusher, and
/// watchdog.
pub trait Backend: Send + Sync {
    /// A fresh, owned, point-in-time view. Not tied to `&self`'s borrow —
    /// the Write-Buffer Engine holds this across many operations and
    /// rotates it only when a flush completes.
    fn new_snapshot(&self) -> Result<Box<dyn Snapshot>, StorageError>;

    fn begin_batch(&self) -> Result<Box<dyn Batch<'_> + '_>, StorageError>;

    /// Release resources without touching the data on disk.
    fn close(self: Box<Self>) -> Result<(), StorageError>;

    /// Physical removal of the store directory. Consumes the handle; no
    /// further calls against the same backend value are possible.
    fn destroy(self: Box<Self>) -> Result<(), StorageError>;

    fn path(&self) -> &Path;

    /// Close, physically remove, and reopen at the same location — what
    /// the write-buffer engine's `clear()` and the façade's `rebuild_db`
    /// need. Each backend knows its own path and kind, so this needs no
    /// extra arguments; the remote backend's implementation asks the
    /// server to rebuild instead of touching a local directory.
    fn rebuild(self: Box<Self>) -> Result<Box<dyn Backend>, StorageError>;
}

/// Which concrete [`Backend`] to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    BPlus,
    Lsm,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::BPlus => "bplus",
            Kind::Lsm => "lsm",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bplus" | "lmdb" | "btree" => Some(Kind::BPlus),
            "lsm" | "rocksdb" => Some(Kind::Lsm),
            _ => None,
        }
    }
}

/// Open a store of the given `kind`, creating `path` if it does not exist.
pub fn open(kind: Kind, path: &Path, options: &OpenOptions) -> Result<Box<dyn Backend>, StorageError> {
    if options.rebuild && path.exists() {
        debug!(path = %path.display(), "rebuild requested, removing existing store before opening");
        std::fs::remove_dir_all(path)?;
    }
    std::fs::create_dir_all(path)?;
    debug!(path = %path.display(), kind = kind.as_str(), "opening backend");
    match kind {
        Kind::BPlus => Ok(Box::new(crate::bplus::BPlusBackend::open(path, options)?)),
        Kind::Lsm => Ok(Box::new(crate::lsm::LsmBackend::open(path, options)?)),
    }
}

/// Physically remove the store at `path`, regardless of whether a handle
/// to it is currently open in this process.
pub fn destroy_path(path: &Path) -> Result<(), StorageError> {
    if path.exists() {
        debug!(path = %path.display(), "destroying store");
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// `close` + `destroy` + re-`open` a local (bplus/lsm) backend at `path`,
/// used by both concrete backends' [`Backend::rebuild`] implementations.
pub(crate) fn reopen_local(kind: Kind, path: &Path) -> Result<Box<dyn Backend>, StorageError> {
    let path: PathBuf = path.to_path_buf();
    open(kind, &path, &OpenOptions::default())
}
