// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use std::fmt::{self, Display, Formatter};

/// Failure from a [`crate::Backend`], a [`crate::Snapshot`], or a
/// [`crate::Batch`].
#[derive(Debug)]
pub enum StorageError {
    /// The underlying store (heed/LMDB or rocksdb) reported a failure.
    Backend(String),
    /// A filesystem operation (mkdir, remove_dir_all) failed.
    Io(std::io::Error),
    /// An operation was attempted on a closed or already-destroyed handle.
    Closed,
    /// `open` was asked for a backend string it doesn't recognize.
    UnknownBackend(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Backend(msg) => write!(f, "backend error: {msg}"),
            StorageError::Io(e) => write!(f, "io error: {e}"),
            StorageError::Closed => write!(f, "usage error: handle is closed"),
            StorageError::UnknownBackend(name) => write!(f, "unknown backend: {name}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl From<heed::Error> for StorageError {
    fn from(e: heed::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}
