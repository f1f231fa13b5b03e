// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The B+-tree backend: a memory-mapped LMDB environment via `heed`.

use crate::backend::{Backend, Batch, OpenOptions, Snapshot};
use crate::error::StorageError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct BPlusBackend {
    env: Arc<Env>,
    db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl BPlusBackend {
    pub fn open(path: &Path, options: &OpenOptions) -> Result<Self, StorageError> {
        // SAFETY: `path` is a directory this process controls exclusively
        // (the write-buffer engine assumes a single writer), and we never
        // memory-map a file that another process might resize concurrently.
        let env = unsafe {
            EnvOpenOptions::new().map_size(options.map_size).max_dbs(1).open(path)?
        };
        let mut wtxn = env.write_txn()?;
        let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("quiverdb"))?;
        wtxn.commit()?;
        Ok(BPlusBackend { env: Arc::new(env), db, path: path.to_path_buf() })
    }
}

impl Backend for BPlusBackend {
    fn new_snapshot(&self) -> Result<Box<dyn Snapshot>, StorageError> {
        Ok(Box::new(BPlusSnapshot::new(Arc::clone(&self.env), self.db)?))
    }

    fn begin_batch(&self) -> Result<Box<dyn Batch<'_> + '_>, StorageError> {
        let txn = self.env.write_txn()?;
        Ok(Box::new(BPlusBatch { txn: Some(txn), db: self.db }))
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }

    fn destroy(self: Box<Self>) -> Result<(), StorageError> {
        let path = self.path.clone();
        drop(self);
        crate::backend::destroy_path(&path)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn rebuild(self: Box<Self>) -> Result<Box<dyn Backend>, StorageError> {
        let path = self.path.clone();
        self.destroy()?;
        crate::backend::reopen_local(crate::backend::Kind::BPlus, &path)
    }
}

/// Bundles an `Arc<Env>` with a read transaction borrowed from it, erasing
/// the transaction's lifetime so the pair can live inside the Write-Buffer
/// Engine's long-lived state rather than only for the duration of one call.
///
/// Safety: `env` is kept alive by this struct's own `Arc` clone for at
/// least as long as `txn`. Field declaration order matters: `txn` is
/// dropped explicitly in `Drop::drop` before the auto-generated drop glue
/// releases `env`, so the environment the transaction borrowed from always
/// outlives it.
struct BPlusSnapshot {
    txn: ManuallyDrop<RoTxn<'static>>,
    db: Database<Bytes, Bytes>,
    env: Arc<Env>,
}

impl BPlusSnapshot {
    fn new(env: Arc<Env>, db: Database<Bytes, Bytes>) -> Result<Self, StorageError> {
        let txn = env.read_txn()?;
        // SAFETY: only the lifetime parameter changes; `RoTxn<'a>` and
        // `RoTxn<'static>` are identical in layout. The borrow is valid
        // because `env` (an `Arc` clone) is held in this same struct.
        let txn: RoTxn<'static> = unsafe { std::mem::transmute(txn) };
        Ok(BPlusSnapshot { txn: ManuallyDrop::new(txn), db, env })
    }
}

impl Drop for BPlusSnapshot {
    fn drop(&mut self) {
        // SAFETY: `txn` is never accessed again after this.
        unsafe { ManuallyDrop::drop(&mut self.txn) };
    }
}

impl Snapshot for BPlusSnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.db.get(&self.txn, key)?.map(|v| v.to_vec()))
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError> {
        let iter = self.db.iter(&self.txn)?;
        Ok(Box::new(iter.filter_map(|entry| {
            entry.ok().map(|(k, v)| (k.to_vec(), v.to_vec()))
        })))
    }
}

struct BPlusBatch<'a> {
    txn: Option<RwTxn<'a>>,
    db: Database<Bytes, Bytes>,
}

impl<'a> Batch<'a> for BPlusBatch<'a> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        if let Some(txn) = self.txn.as_mut() {
            // A failed individual put is surfaced only at `commit`, since
            // heed's `put` is fallible but the `Batch` trait's `put` is
            // not; the write-buffer engine always commits a batch whose
            // keys/values it has already validated via the Codec, so this
            // can only fail on an already-corrupt environment, which
            // `commit` below will also report.
            let _ = self.db.put(txn, key, value);
        }
    }

    fn delete(&mut self, key: &[u8]) {
        if let Some(txn) = self.txn.as_mut() {
            let _ = self.db.delete(txn, key);
        }
    }

    fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        match self.txn.take() {
            Some(txn) => Ok(txn.commit()?),
            None => Ok(()),
        }
    }
}
