// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The `{data, client_id, time}` / `{keys, client_id, time}` envelopes used
//! by `/set_batch_stream` and `/delete_batch`, and by server-side fan-out
//! deltas, which carry the same shape without the request-specific
//! framing.

use crate::client_id::ClientId;
use crate::error::WireError;
use crate::map::{self, entry};
use quiverdb_type::Value;

/// A batch of already-encoded key/value pairs to put, as shipped by
/// `/set_batch_stream` or fanned out as a `put_dict` delta.
#[derive(Clone, Debug, PartialEq)]
pub struct PutBatch {
    pub data: Vec<(Vec<u8>, Vec<u8>)>,
    pub client_id: ClientId,
    pub time: i64,
}

impl PutBatch {
    pub fn to_value(&self) -> Value {
        let data = self
            .data
            .iter()
            .map(|(k, v)| (Value::Bytes(k.clone()), Value::Bytes(v.clone())))
            .collect();
        Value::Map(vec![
            entry("data", Value::Map(data)),
            entry("client_id", Value::Text(self.client_id.to_string())),
            entry("time", Value::Int(self.time)),
        ])
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(WireError::MalformedPayload(format!(
                    "put batch payload is not a map: {other:?}"
                )))
            }
        };
        let data = match map::field(&entries, "data")? {
            Value::Map(pairs) => pairs
                .iter()
                .map(|(k, v)| match (k, v) {
                    (Value::Bytes(k), Value::Bytes(v)) => Ok((k.clone(), v.clone())),
                    other => Err(WireError::MalformedPayload(format!(
                        "put batch entry is not bytes/bytes: {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(WireError::MalformedPayload(format!(
                    "put batch `data` is not a map: {other:?}"
                )))
            }
        };
        let client_id = ClientId::parse(&map::text_field(&entries, "client_id")?)
            .ok_or_else(|| WireError::MalformedPayload("bad client_id".to_string()))?;
        let time = map::int_field(&entries, "time")?;
        Ok(PutBatch { data, client_id, time })
    }
}

/// A batch of keys to delete, as shipped by `/delete_batch` or fanned out
/// as a `delete_keys` delta.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteBatch {
    pub keys: Vec<Vec<u8>>,
    pub client_id: ClientId,
    pub time: i64,
}

impl DeleteBatch {
    pub fn to_value(&self) -> Value {
        let keys = self.keys.iter().map(|k| Value::Bytes(k.clone())).collect();
        Value::Map(vec![
            entry("keys", Value::Sequence(keys)),
            entry("client_id", Value::Text(self.client_id.to_string())),
            entry("time", Value::Int(self.time)),
        ])
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(WireError::MalformedPayload(format!(
                    "delete batch payload is not a map: {other:?}"
                )))
            }
        };
        let keys = match map::field(&entries, "keys")? {
            Value::Sequence(items) | Value::Tuple(items) => items
                .iter()
                .map(|v| match v {
                    Value::Bytes(b) => Ok(b.clone()),
                    other => Err(WireError::MalformedPayload(format!(
                        "delete batch key is not bytes: {other:?}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(WireError::MalformedPayload(format!(
                    "delete batch `keys` is not a sequence: {other:?}"
                )))
            }
        };
        let client_id = ClientId::parse(&map::text_field(&entries, "client_id")?)
            .ok_or_else(|| WireError::MalformedPayload("bad client_id".to_string()))?;
        let time = map::int_field(&entries, "time")?;
        Ok(DeleteBatch { keys, client_id, time })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_batch_round_trips() {
        let batch = PutBatch {
            data: vec![(b"k".to_vec(), b"v".to_vec())],
            client_id: ClientId::new(),
            time: 42,
        };
        let value = batch.to_value();
        let decoded = PutBatch::from_value(value).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn delete_batch_round_trips() {
        let batch = DeleteBatch { keys: vec![b"k".to_vec()], client_id: ClientId::new(), time: 7 };
        let value = batch.to_value();
        let decoded = DeleteBatch::from_value(value).unwrap();
        assert_eq!(decoded, batch);
    }
}
