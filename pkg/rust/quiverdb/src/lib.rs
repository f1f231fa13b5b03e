// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Public Façade: a single entry point that routes to one of the
//! three engine specializations — B+-tree, LSM, or a server-hosted
//! remote database — by inspecting `location`. A local `location` is a
//! root directory and `backend` names `bplus`/`lsm` (or their aliases);
//! an `http(s)://` `location` opens the Remote Transport instead, and
//! `backend` names the backend the server should open or rebuild on its
//! side.
//!
//! Everything else — dictionary access with defaulting, iteration, `Debug`,
//! handle identity, and the flushing close on drop — lives on
//! [`Dict`] in `quiverdb-engine`, which this crate re-exports unchanged.

use quiverdb_client::RemoteBackend;
use quiverdb_engine::{Engine, EngineKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use quiverdb_engine::{Dict, EngineError, EngineOptions, Kind, OpenOptions, Stat};
pub use quiverdb_type::Value;

/// Opens (or attaches to) `name` at `location` using `backend`, returning
/// the process-wide handle — identity is per (name, root) for local
/// backends.
///
/// `location` is either a local root directory or an `http://`/`https://`
/// base URL. `backend` is one of `bplus`/`lmdb`/`btree`, `lsm`/`rocksdb`, or
/// — for a remote `location` — whatever backend name the server should
/// open the database as.
pub fn open(name: &str, location: &str, backend: &str, options: EngineOptions) -> Result<Arc<Dict>, EngineError> {
    open_with(name, location, backend, OpenOptions::default(), options)
}

/// As [`open`], but accepts the Backend Adapter's own open options — in
/// particular `rebuild`, which deletes any existing store before opening
/// (local) or asks the server to do the same (remote).
pub fn open_with(
    name: &str,
    location: &str,
    backend: &str,
    storage_options: OpenOptions,
    options: EngineOptions,
) -> Result<Arc<Dict>, EngineError> {
    if is_remote_location(location) {
        open_remote(name, location, backend, storage_options.rebuild, options)
    } else {
        open_local(name, location, backend, storage_options, options)
    }
}

fn is_remote_location(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn open_local(
    name: &str,
    root: &str,
    backend: &str,
    storage_options: OpenOptions,
    options: EngineOptions,
) -> Result<Arc<Dict>, EngineError> {
    let kind = Kind::from_str(backend).ok_or_else(|| EngineError::Usage(format!("unsupported backend `{backend}`")))?;
    let root_path = Path::new(root);
    quiverdb_engine::registry::get_or_open(name, root_path, || {
        Dict::open_with_storage_options(name, root_path, kind, storage_options, options, false)
    })
}

/// The remote branch skips the identity registry: a server base URL is
/// not a filesystem location, and each call opens its own client
/// connection rather than sharing one across callers in this process.
fn open_remote(name: &str, url: &str, backend: &str, rebuild: bool, options: EngineOptions) -> Result<Arc<Dict>, EngineError> {
    let remote = RemoteBackend::connect(url, name, backend, rebuild).map_err(EngineError::from)?;
    let engine = Engine::from_backend(EngineKind::Remote, PathBuf::from(url), Box::new(remote), options)?;
    Ok(Arc::new(Dict::from_engine(name, Path::new(url), false, engine)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_routes_a_plain_path_to_the_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let dict = open("demo", dir.path().to_str().unwrap(), "lsm", EngineOptions::default()).unwrap();
        dict.set(&Value::Text("a".into()), &Value::Int(1)).unwrap();
        assert_eq!(dict.get(&Value::Text("a".into()), Value::Undefined).unwrap(), Value::Int(1));
    }

    #[test]
    fn open_rejects_an_unknown_backend_name() {
        let dir = tempfile::tempdir().unwrap();
        let err = open("demo", dir.path().to_str().unwrap(), "postgres", EngineOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::Usage(_)));
    }

    #[test]
    fn open_returns_the_same_handle_for_the_same_name_and_root() {
        let dir = tempfile::tempdir().unwrap();
        let a = open("demo", dir.path().to_str().unwrap(), "lsm", EngineOptions::default()).unwrap();
        let b = open("demo", dir.path().to_str().unwrap(), "lsm", EngineOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
