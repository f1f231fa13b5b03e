// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The LSM backend: a `rocksdb` column family holding the whole store.

use crate::backend::{Backend, Batch, OpenOptions, Snapshot};
use crate::error::StorageError;
use rocksdb::{IteratorMode, Options, WriteBatch, DB};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct LsmBackend {
    db: Arc<DB>,
    path: PathBuf,
}

impl LsmBackend {
    pub fn open(path: &Path, _options: &OpenOptions) -> Result<Self, StorageError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        let db = DB::open(&options, path)?;
        Ok(LsmBackend { db: Arc::new(db), path: path.to_path_buf() })
    }
}

impl Backend for LsmBackend {
    fn new_snapshot(&self) -> Result<Box<dyn Snapshot>, StorageError> {
        Ok(Box::new(LsmSnapshot::new(Arc::clone(&self.db))))
    }

    fn begin_batch(&self) -> Result<Box<dyn Batch<'_> + '_>, StorageError> {
        Ok(Box::new(LsmBatch { db: &self.db, batch: WriteBatch::default() }))
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        Ok(())
    }

    fn destroy(self: Box<Self>) -> Result<(), StorageError> {
        let path = self.path.clone();
        drop(self);
        let options = Options::default();
        DB::destroy(&options, &path)?;
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn rebuild(self: Box<Self>) -> Result<Box<dyn Backend>, StorageError> {
        let path = self.path.clone();
        self.destroy()?;
        crate::backend::reopen_local(crate::backend::Kind::Lsm, &path)
    }
}

/// Bundles an `Arc<DB>` with a `rocksdb::Snapshot` borrowed from it. See
/// `bplus::BPlusSnapshot` for the same pattern and its safety argument;
/// `rocksdb::Snapshot<'a>` borrows `&'a DB` for exactly the same reason
/// `heed::RoTxn<'a>` borrows `&'a Env`.
struct LsmSnapshot {
    snapshot: ManuallyDrop<rocksdb::Snapshot<'static>>,
    db: Arc<DB>,
}

impl LsmSnapshot {
    fn new(db: Arc<DB>) -> Self {
        let snapshot = db.snapshot();
        // SAFETY: only the lifetime parameter changes; `db` (an `Arc`
        // clone) is held in this same struct for at least as long as
        // `snapshot`, and `snapshot` is dropped explicitly before `db` in
        // `Drop::drop`.
        let snapshot: rocksdb::Snapshot<'static> = unsafe { std::mem::transmute(snapshot) };
        LsmSnapshot { snapshot: ManuallyDrop::new(snapshot), db }
    }
}

impl Drop for LsmSnapshot {
    fn drop(&mut self) {
        // SAFETY: `snapshot` is never accessed again after this.
        unsafe { ManuallyDrop::drop(&mut self.snapshot) };
    }
}

impl Snapshot for LsmSnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.snapshot.get(key)?)
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError> {
        let iter = self.snapshot.iterator(IteratorMode::Start);
        Ok(Box::new(iter.filter_map(|entry| {
            entry.ok().map(|(k, v)| (k.to_vec(), v.to_vec()))
        })))
    }
}

struct LsmBatch<'a> {
    db: &'a DB,
    batch: WriteBatch,
}

impl<'a> Batch<'a> for LsmBatch<'a> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.batch.put(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.batch.delete(key);
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        Ok(self.db.write(self.batch)?)
    }
}
