// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Per-process server state: root directory, the database map, and the
//! subscriber table, both `dashmap`-backed like `quiverdb_engine::registry`.

use crate::error::ServerError;
use dashmap::DashMap;
use quiverdb_engine::{Dict, EngineError, EngineOptions, Kind};
use quiverdb_wire::{ClientId, Notification};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// One `/connect` subscriber: which database it follows, the queue its
/// deltas are enqueued on, and the signal that tears its stream down.
pub struct Subscriber {
    pub db_name: String,
    pub deltas: mpsc::UnboundedSender<Notification>,
    pub disconnect: Arc<Notify>,
}

/// Root directory, raw-mode database map, and subscriber table for one
/// server process. Mutated only through `&self` methods backed by
/// `DashMap`, so no external lock is needed around the state as a whole.
pub struct ServerState {
    root: PathBuf,
    databases: DashMap<String, Arc<Dict>>,
    subscribers: DashMap<ClientId, Subscriber>,
}

impl ServerState {
    pub fn new(root: PathBuf) -> Self {
        ServerState { root, databases: DashMap::new(), subscribers: DashMap::new() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database(&self, db_name: &str) -> Option<Arc<Dict>> {
        self.databases.get(db_name).map(|entry| Arc::clone(&entry))
    }

    pub fn has_database(&self, db_name: &str) -> bool {
        self.databases.contains_key(db_name)
    }

    /// Opens the named database, always raw-mode, or returns the
    /// already-open handle. `rebuild` tears down any existing handle and
    /// the on-disk store first.
    pub fn attach(&self, db_name: &str, backend: &str, rebuild: bool) -> Result<Arc<Dict>, EngineError> {
        let kind = Kind::from_str(backend).ok_or_else(|| EngineError::Usage(format!("unknown backend `{backend}`")))?;
        if rebuild {
            if let Some((_, existing)) = self.databases.remove(db_name) {
                existing.close(true, true)?;
            }
            quiverdb_storage::destroy_path(&Dict::store_path(&self.root, db_name, kind))?;
        } else if let Some(existing) = self.databases.get(db_name) {
            return Ok(Arc::clone(&existing));
        }
        let dict = Arc::new(Dict::open_raw(db_name, &self.root, kind, EngineOptions::default(), true)?);
        self.databases.insert(db_name.to_string(), Arc::clone(&dict));
        Ok(dict)
    }

    /// Removes a database from the map without destroying its on-disk
    /// store. A later `/connect` reopens it.
    pub fn detach(&self, db_name: &str) -> bool {
        match self.databases.remove(db_name) {
            Some((_, dict)) => {
                let _ = dict.close(true, false);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self, client_id: ClientId, db_name: String) -> (mpsc::UnboundedReceiver<Notification>, Arc<Notify>) {
        let (deltas, rx) = mpsc::unbounded_channel();
        let disconnect = Arc::new(Notify::new());
        self.subscribers.insert(client_id, Subscriber { db_name, deltas, disconnect: Arc::clone(&disconnect) });
        (rx, disconnect)
    }

    /// Removes the subscriber record and wakes its streaming handler.
    /// Returns whether a subscriber was actually present.
    pub fn unsubscribe(&self, client_id: ClientId) -> bool {
        match self.subscribers.remove(&client_id) {
            Some((_, subscriber)) => {
                subscriber.disconnect.notify_one();
                true
            }
            None => false,
        }
    }

    /// Validates that `client_id` is a current subscriber of `db_name`
    /// and returns the attached handle to apply the batch against.
    pub fn subscriber_database(&self, client_id: ClientId, db_name: &str) -> Result<Arc<Dict>, ServerError> {
        match self.subscribers.get(&client_id) {
            Some(subscriber) if subscriber.db_name == db_name => {}
            _ => return Err(ServerError::UnknownClient(client_id)),
        }
        self.database(db_name).ok_or_else(|| ServerError::DbNotFound(db_name.to_string()))
    }

    /// Enqueues `notification` on every subscriber of `db_name` other than
    /// `exclude` — the originating client never receives its own change.
    pub fn fan_out(&self, db_name: &str, exclude: ClientId, notification: Notification) {
        for entry in self.subscribers.iter() {
            if *entry.key() != exclude && entry.value().db_name == db_name {
                let _ = entry.value().deltas.send(notification.clone());
            }
        }
    }
}
