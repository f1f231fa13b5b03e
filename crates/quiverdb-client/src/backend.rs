// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! `RemoteBackend`: the remote adapter, mapping the synchronous `Backend`
//! trait onto the async [`crate::transport::RemoteTransport`]. Each
//! instance owns a single-threaded Tokio runtime that every trait method
//! blocks on, so the write-buffer engine can drive this backend exactly
//! like the local bplus/lsm ones.

use crate::transport::RemoteTransport;
use quiverdb_storage::{Backend, Batch, Snapshot, StorageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

pub struct RemoteBackend {
    transport: Arc<RemoteTransport>,
    runtime: Arc<Runtime>,
    /// Not a filesystem path; carried only to satisfy `Backend::path` and
    /// for log messages (`<base_url>/<db_name>`).
    path: PathBuf,
    base_url: String,
    db_name: String,
    kind_name: String,
}

impl RemoteBackend {
    pub fn connect(base_url: &str, db_name: &str, backend_kind: &str, rebuild: bool) -> Result<Self, StorageError> {
        let runtime = Runtime::new().map_err(|e| StorageError::Backend(e.to_string()))?;
        let transport = runtime
            .block_on(RemoteTransport::connect(base_url, db_name, backend_kind, rebuild))
            .map_err(StorageError::from)?;
        Ok(RemoteBackend {
            transport: Arc::new(transport),
            runtime: Arc::new(runtime),
            path: PathBuf::from(format!("{base_url}/{db_name}")),
            base_url: base_url.to_string(),
            db_name: db_name.to_string(),
            kind_name: backend_kind.to_string(),
        })
    }
}

impl Backend for RemoteBackend {
    fn new_snapshot(&self) -> Result<Box<dyn Snapshot>, StorageError> {
        Ok(Box::new(RemoteSnapshot { data: self.transport.mirror_snapshot() }))
    }

    fn begin_batch(&self) -> Result<Box<dyn Batch<'_> + '_>, StorageError> {
        Ok(Box::new(RemoteBatch { transport: &self.transport, runtime: &self.runtime, puts: Vec::new(), deletes: Vec::new() }))
    }

    fn close(self: Box<Self>) -> Result<(), StorageError> {
        let runtime = Arc::clone(&self.runtime);
        runtime.block_on(self.transport.disconnect()).map_err(StorageError::from)
    }

    fn destroy(self: Box<Self>) -> Result<(), StorageError> {
        // Physical removal of a server-hosted database is out of scope for
        // the client: the server owns that decision, and there is no
        // "destroy" RPC in the route table. Disconnect cleanly instead.
        self.close()
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn rebuild(self: Box<Self>) -> Result<Box<dyn Backend>, StorageError> {
        let RemoteBackend { transport, runtime, base_url, db_name, kind_name, .. } = *self;
        let _ = runtime.block_on(transport.disconnect());
        Ok(Box::new(RemoteBackend::connect(&base_url, &db_name, &kind_name, true)?))
    }
}

struct RemoteSnapshot {
    data: std::collections::HashMap<Vec<u8>, Vec<u8>>,
}

impl Snapshot for RemoteSnapshot {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.get(key).cloned())
    }

    fn iter(&self) -> Result<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>, StorageError> {
        Ok(Box::new(self.data.iter().map(|(k, v)| (k.clone(), v.clone()))))
    }
}

struct RemoteBatch<'a> {
    transport: &'a Arc<RemoteTransport>,
    runtime: &'a Arc<Runtime>,
    puts: Vec<(Vec<u8>, Vec<u8>)>,
    deletes: Vec<Vec<u8>>,
}

impl<'a> Batch<'a> for RemoteBatch<'a> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.puts.push((key.to_vec(), value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.deletes.push(key.to_vec());
    }

    fn commit(self: Box<Self>) -> Result<(), StorageError> {
        for (k, v) in self.puts {
            self.transport.put(k, v);
        }
        for k in self.deletes {
            self.transport.delete(k);
        }
        self.runtime.block_on(self.transport.flush()).map_err(StorageError::from)
    }
}
