// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The `/stat` response shape: `{count, buffer, db, marked_delete, type}`.

use crate::error::WireError;
use crate::map::{self, entry};
use quiverdb_type::Value;

#[derive(Clone, Debug, PartialEq)]
pub struct Stat {
    /// Total observable key count (backend ∪ put-buffer, minus delete-buffer).
    pub count: u64,
    /// Number of keys currently in the put-buffer.
    pub buffer: u64,
    pub db: String,
    /// Number of keys currently in the delete-buffer.
    pub marked_delete: u64,
    pub backend: String,
}

impl Stat {
    pub fn to_value(&self) -> Value {
        Value::Map(vec![
            entry("count", Value::UInt(self.count)),
            entry("buffer", Value::UInt(self.buffer)),
            entry("db", Value::Text(self.db.clone())),
            entry("marked_delete", Value::UInt(self.marked_delete)),
            entry("type", Value::Text(self.backend.clone())),
        ])
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(WireError::MalformedPayload(format!("stat payload is not a map: {other:?}")))
            }
        };
        Ok(Stat {
            count: map::int_field(&entries, "count")? as u64,
            buffer: map::int_field(&entries, "buffer")? as u64,
            db: map::text_field(&entries, "db")?,
            marked_delete: map::int_field(&entries, "marked_delete")? as u64,
            backend: map::text_field(&entries, "type")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let stat = Stat { count: 10, buffer: 3, db: "demo".to_string(), marked_delete: 1, backend: "lsm".to_string() };
        let decoded = Stat::from_value(stat.to_value()).unwrap();
        assert_eq!(decoded, stat);
    }
}
