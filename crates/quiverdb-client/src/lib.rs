// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Remote Transport: client side of the network-attached dictionary
//! backend. [`RemoteBackend`] implements `quiverdb_storage::Backend` so
//! the write-buffer engine can drive a server-hosted database exactly
//! like a local one.

mod backend;
mod error;
mod retry;
mod transport;

pub use backend::RemoteBackend;
pub use error::ClientError;
pub use transport::RemoteTransport;
