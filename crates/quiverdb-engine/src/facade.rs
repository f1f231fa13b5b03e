// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The public façade: a dictionary-style veneer over [`crate::engine::Engine`]
//! that runs values through the Codec (bypassed in raw mode), decodes
//! keys so tuple-shaped keys stay tuples, and registers a
//! flushing-close-on-drop so an unclean process exit still flushes.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::options::EngineOptions;
use quiverdb_storage::{Kind, OpenOptions as StorageOpenOptions};
use quiverdb_type::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Statistics backing the `stat` façade operation and the `/stat` route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stat {
    pub count: usize,
    pub buffer: usize,
    pub db: String,
    pub marked_delete: usize,
    pub backend: String,
}

/// One open database handle. Identity-cached per (name, root) by
/// [`crate::registry`]; `destroy()` removes it from that registry before
/// tearing the handle down so `Drop` does not try to flush a deleted store.
pub struct Dict {
    name: String,
    root: PathBuf,
    raw: bool,
    engine: Engine,
    destroyed: AtomicBool,
}

impl Dict {
    /// `<root>/<name>-<backend>/`.
    pub fn store_path(root: &Path, name: &str, kind: Kind) -> PathBuf {
        root.join(format!("{name}-{}", kind.as_str()))
    }

    pub fn open(name: &str, root: &Path, kind: Kind, options: EngineOptions) -> Result<Self, EngineError> {
        Self::open_raw(name, root, kind, options, false)
    }

    /// The server always opens its per-database engines this way: each
    /// wrapped in its own write-buffer engine, always raw-mode.
    pub fn open_raw(
        name: &str,
        root: &Path,
        kind: Kind,
        options: EngineOptions,
        raw: bool,
    ) -> Result<Self, EngineError> {
        Self::open_with_storage_options(name, root, kind, StorageOpenOptions::default(), options, raw)
    }

    /// Threads a caller-supplied [`StorageOpenOptions`] through to the
    /// Backend Adapter — in particular its `rebuild` flag, which deletes
    /// any existing store before opening a fresh one.
    pub fn open_with_storage_options(
        name: &str,
        root: &Path,
        kind: Kind,
        storage_options: StorageOpenOptions,
        options: EngineOptions,
        raw: bool,
    ) -> Result<Self, EngineError> {
        let path = Self::store_path(root, name, kind);
        let engine = Engine::open(kind, &path, &storage_options, options)?;
        Ok(Dict { name: name.to_string(), root: root.to_path_buf(), raw, engine, destroyed: AtomicBool::new(false) })
    }

    /// Wraps an already-running [`Engine`] — the remote variant of the
    /// façade's single constructor takes this path, since the remote
    /// backend has no `(name, root)` filesystem location to open by kind.
    /// `root` is the server base URL, carried only as the second half of
    /// the handle-identity key.
    pub fn from_engine(name: &str, root: &Path, raw: bool, engine: Engine) -> Self {
        Dict { name: name.to_string(), root: root.to_path_buf(), raw, engine, destroyed: AtomicBool::new(false) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    fn encode_key(&self, key: &Value) -> Result<Vec<u8>, EngineError> {
        if self.raw {
            match key {
                Value::Bytes(b) => Ok(b.clone()),
                other => Err(EngineError::Usage(format!("raw mode requires byte-string keys, got {}", other.kind()))),
            }
        } else {
            Ok(quiverdb_codec::encode(key)?)
        }
    }

    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, EngineError> {
        if self.raw {
            match value {
                Value::Bytes(b) => Ok(b.clone()),
                other => Err(EngineError::Usage(format!("raw mode requires byte-string values, got {}", other.kind()))),
            }
        } else {
            Ok(quiverdb_codec::encode(value)?)
        }
    }

    fn decode_value(&self, bytes: Vec<u8>) -> Result<Value, EngineError> {
        if self.raw {
            Ok(Value::Bytes(bytes))
        } else {
            Ok(quiverdb_codec::decode(&bytes)?)
        }
    }

    /// Keys are always run through `decode_key` on the way out, even in
    /// raw mode: raw mode skips the codec for storage, but still decodes
    /// keys for callers that asked for a decoded view.
    fn decode_key_view(&self, bytes: Vec<u8>) -> Result<Value, EngineError> {
        Ok(quiverdb_codec::decode_key(&bytes)?)
    }

    pub fn get(&self, key: &Value, default: Value) -> Result<Value, EngineError> {
        let encoded_key = self.encode_key(key)?;
        let encoded_default = self.encode_value(&default)?;
        let bytes = self.engine.get(&encoded_key, &encoded_default)?;
        self.decode_value(bytes)
    }

    pub fn get_batch(&self, keys: &[Value], default: Value) -> Result<Vec<Value>, EngineError> {
        let encoded_default = self.encode_value(&default)?;
        let encoded_keys = keys.iter().map(|k| self.encode_key(k)).collect::<Result<Vec<_>, _>>()?;
        let raw = self.engine.get_batch(&encoded_keys)?;
        raw.into_iter()
            .map(|v| match v {
                Some(b) => self.decode_value(b),
                None => self.decode_value(encoded_default.clone()),
            })
            .collect()
    }

    pub fn set(&self, key: &Value, value: &Value) -> Result<(), EngineError> {
        let encoded_key = self.encode_key(key)?;
        let encoded_value = self.encode_value(value)?;
        self.engine.set(encoded_key, encoded_value)
    }

    pub fn delete(&self, key: &Value) -> Result<(), EngineError> {
        let encoded_key = self.encode_key(key)?;
        self.engine.delete(&encoded_key)
    }

    pub fn pop(&self, key: &Value, default: Value) -> Result<Value, EngineError> {
        let encoded_key = self.encode_key(key)?;
        let encoded_default = self.encode_value(&default)?;
        let bytes = self.engine.pop(&encoded_key, &encoded_default)?;
        self.decode_value(bytes)
    }

    pub fn contains(&self, key: &Value) -> Result<bool, EngineError> {
        let encoded_key = self.encode_key(key)?;
        self.engine.contains(&encoded_key)
    }

    pub fn update(&self, entries: &[(Value, Value)]) -> Result<(), EngineError> {
        let encoded = entries
            .iter()
            .map(|(k, v)| Ok((self.encode_key(k)?, self.encode_value(v)?)))
            .collect::<Result<Vec<_>, EngineError>>()?;
        self.engine.update(encoded)
    }

    pub fn keys(&self) -> Result<Vec<Value>, EngineError> {
        self.engine.keys()?.into_iter().map(|k| self.decode_key_view(k)).collect()
    }

    pub fn values(&self) -> Result<Vec<Value>, EngineError> {
        self.engine.values()?.into_iter().map(|v| self.decode_value(v)).collect()
    }

    pub fn items(&self) -> Result<Vec<(Value, Value)>, EngineError> {
        self.engine
            .items()?
            .into_iter()
            .map(|(k, v)| Ok((self.decode_key_view(k)?, self.decode_value(v)?)))
            .collect()
    }

    pub fn len(&self) -> Result<usize, EngineError> {
        self.engine.len()
    }

    pub fn is_empty(&self) -> Result<bool, EngineError> {
        Ok(self.len()? == 0)
    }

    pub fn stat(&self) -> Result<Stat, EngineError> {
        let (count, buffer, marked_delete) = self.engine.stat()?;
        Ok(Stat { count, buffer, db: self.name.clone(), marked_delete, backend: self.engine.kind().as_str().to_string() })
    }

    pub fn write_immediately(&self, block: bool) -> Result<(), EngineError> {
        self.engine.write_immediately(block)
    }

    pub fn clear(&self) -> Result<(), EngineError> {
        self.engine.clear()
    }

    pub fn close(&self, write: bool, wait: bool) -> Result<(), EngineError> {
        self.engine.close(write, wait)
    }

    /// Remove this handle from the process-wide registry and tear down the
    /// backend without a final flush. Cancels the flushing-close-on-drop.
    pub fn destroy(&self) -> Result<(), EngineError> {
        self.destroyed.store(true, Ordering::SeqCst);
        crate::registry::forget(&self.name, &self.root);
        self.engine.clone().destroy()
    }
}

/// Rust's nearest equivalent of the Python original's `__repr__` (spec
/// §4.6 "presents the engine operations as dictionary access with
/// defaulting, iteration, and repr").
impl std::fmt::Debug for Dict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dict")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("raw", &self.raw)
            .field("backend", &self.engine.kind().as_str())
            .finish()
    }
}

impl Drop for Dict {
    /// The nearest idiomatic equivalent of the Python original's `atexit`
    /// flushing-close hook: run it when the last strong reference to this
    /// handle drops, unless `destroy()` already tore the store down.
    fn drop(&mut self) {
        if !self.destroyed.load(Ordering::SeqCst) {
            let _ = self.engine.close(true, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_dict(dir: &Path) -> Dict {
        Dict::open("demo", dir, Kind::Lsm, EngineOptions::default()).unwrap()
    }

    #[test]
    fn tuple_keys_round_trip_through_the_facade() {
        let dir = tempfile::tempdir().unwrap();
        let dict = open_dict(dir.path());
        let key = Value::tuple([Value::Int(1), Value::tuple([Value::Int(2), Value::Int(3)])]);
        let value = Value::Sequence(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        dict.set(&key, &value).unwrap();
        let keys = dict.keys().unwrap();
        assert_eq!(keys, vec![key.clone()]);
        assert_eq!(dict.get(&key, Value::Undefined).unwrap(), value);
    }

    #[test]
    fn raw_mode_passes_bytes_through_without_the_codec() {
        let dir = tempfile::tempdir().unwrap();
        let dict = Dict::open_raw("demo", dir.path(), Kind::Lsm, EngineOptions::default(), true).unwrap();
        dict.set(&Value::Bytes(b"k".to_vec()), &Value::Bytes(b"v".to_vec())).unwrap();
        assert_eq!(dict.get(&Value::Bytes(b"k".to_vec()), Value::Undefined).unwrap(), Value::Bytes(b"v".to_vec()));
        // Raw mode still decodes keys on the way out.
        let keys = dict.keys().unwrap();
        assert_eq!(keys, vec![Value::Bytes(b"k".to_vec())]);
    }

    #[test]
    fn destroy_cancels_the_flushing_close_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo-lsm");
        {
            let dict = open_dict(dir.path());
            dict.set(&Value::Int(1), &Value::Int(2)).unwrap();
            dict.destroy().unwrap();
        }
        assert!(!path.exists());
    }
}
