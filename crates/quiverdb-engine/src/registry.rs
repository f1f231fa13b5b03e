// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Process-wide handle identity: two opens with the same (name, root) yield
//! the same [`crate::facade::Dict`] object. Entries are strongly held here
//! and removed on `destroy` or when the last external `Arc` drops.

use crate::facade::Dict;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct HandleKey {
    name: String,
    root: PathBuf,
}

static REGISTRY: Lazy<DashMap<HandleKey, Weak<Dict>>> = Lazy::new(DashMap::new);

/// Returns the already-open handle for (name, root) if one is live, or
/// calls `open` to create one and registers it.
pub fn get_or_open(
    name: &str,
    root: &std::path::Path,
    open: impl FnOnce() -> Result<Dict, crate::error::EngineError>,
) -> Result<Arc<Dict>, crate::error::EngineError> {
    let key = HandleKey { name: name.to_string(), root: root.to_path_buf() };
    if let Some(existing) = REGISTRY.get(&key).and_then(|w| w.upgrade()) {
        return Ok(existing);
    }
    let handle = Arc::new(open()?);
    REGISTRY.insert(key, Arc::downgrade(&handle));
    Ok(handle)
}

/// Remove the (name, root) entry so a subsequent open does not resurrect a
/// destroyed handle. Called by `Dict::destroy`.
pub fn forget(name: &str, root: &std::path::Path) {
    let key = HandleKey { name: name.to_string(), root: root.to_path_buf() };
    REGISTRY.remove(&key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EngineOptions;
    use quiverdb_storage::Kind;

    #[test]
    fn same_name_and_root_yield_the_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let opens = std::sync::atomic::AtomicU32::new(0);
        let make = || {
            opens.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default())
        };
        let a = get_or_open("demo", dir.path(), make).unwrap();
        let b = get_or_open("demo", dir.path(), || {
            opens.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Dict::open("demo", dir.path(), Kind::Lsm, EngineOptions::default())
        })
        .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(opens.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
