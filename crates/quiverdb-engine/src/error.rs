// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use std::fmt::{self, Display, Formatter};

/// Failure from the write-buffer engine or the façade built on top of it.
#[derive(Debug)]
pub enum EngineError {
    /// Bracketed `delete`/`__getitem__`-style access of a missing key.
    NotFound,
    /// Operation on a closed handle, or a rebuild/clear requested while a
    /// snapshot from the current backend generation is still open.
    Usage(String),
    Codec(quiverdb_codec::DecodeError),
    Storage(quiverdb_storage::StorageError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotFound => write!(f, "key not found"),
            EngineError::Usage(msg) => write!(f, "usage error: {msg}"),
            EngineError::Codec(e) => write!(f, "{e}"),
            EngineError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<quiverdb_storage::StorageError> for EngineError {
    fn from(e: quiverdb_storage::StorageError) -> Self {
        EngineError::Storage(e)
    }
}

impl From<quiverdb_codec::DecodeError> for EngineError {
    fn from(e: quiverdb_codec::DecodeError) -> Self {
        EngineError::Codec(e)
    }
}

impl From<quiverdb_codec::EncodeError> for EngineError {
    fn from(e: quiverdb_codec::EncodeError) -> Self {
        EngineError::Usage(e.to_string())
    }
}
