// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Framed `{type, data, time}` payloads delivered on the `/connect`
//! notification stream, one per delta, terminated by
//! [`crate::sentinel::FRAME_END`].

use crate::batch::{DeleteBatch, PutBatch};
use crate::error::WireError;
use crate::map::{self, entry};
use quiverdb_type::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// `type: "buffer_dict"` — a batch of puts to merge into the
    /// subscriber's cache-all mirror.
    BufferDict { data: Vec<(Vec<u8>, Vec<u8>)>, time: i64 },
    /// `type: "delete_keys"` — a batch of deletes to apply to the
    /// subscriber's cache-all mirror.
    DeleteKeys { keys: Vec<Vec<u8>>, time: i64 },
}

impl Notification {
    pub fn from_put_batch(batch: &PutBatch) -> Self {
        Notification::BufferDict { data: batch.data.clone(), time: batch.time }
    }

    pub fn from_delete_batch(batch: &DeleteBatch) -> Self {
        Notification::DeleteKeys { keys: batch.keys.clone(), time: batch.time }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Notification::BufferDict { data, time } => {
                let data = data
                    .iter()
                    .map(|(k, v)| (Value::Bytes(k.clone()), Value::Bytes(v.clone())))
                    .collect();
                Value::Map(vec![
                    entry("type", Value::Text("buffer_dict".to_string())),
                    entry("data", Value::Map(data)),
                    entry("time", Value::Int(*time)),
                ])
            }
            Notification::DeleteKeys { keys, time } => {
                let keys = keys.iter().map(|k| Value::Bytes(k.clone())).collect();
                Value::Map(vec![
                    entry("type", Value::Text("delete_keys".to_string())),
                    entry("data", Value::Sequence(keys)),
                    entry("time", Value::Int(*time)),
                ])
            }
        }
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => {
                return Err(WireError::MalformedPayload(format!(
                    "notification payload is not a map: {other:?}"
                )))
            }
        };
        let kind = map::text_field(&entries, "type")?;
        let time = map::int_field(&entries, "time")?;
        let data = map::field(&entries, "data")?.clone();
        match kind.as_str() {
            "buffer_dict" => match data {
                Value::Map(pairs) => {
                    let data = pairs
                        .into_iter()
                        .map(|(k, v)| match (k, v) {
                            (Value::Bytes(k), Value::Bytes(v)) => Ok((k, v)),
                            other => Err(WireError::MalformedPayload(format!(
                                "buffer_dict entry is not bytes/bytes: {other:?}"
                            ))),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Notification::BufferDict { data, time })
                }
                other => Err(WireError::MalformedPayload(format!(
                    "buffer_dict `data` is not a map: {other:?}"
                ))),
            },
            "delete_keys" => match data {
                Value::Sequence(items) | Value::Tuple(items) => {
                    let keys = items
                        .into_iter()
                        .map(|v| match v {
                            Value::Bytes(b) => Ok(b),
                            other => Err(WireError::MalformedPayload(format!(
                                "delete_keys entry is not bytes: {other:?}"
                            ))),
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Notification::DeleteKeys { keys, time })
                }
                other => Err(WireError::MalformedPayload(format!(
                    "delete_keys `data` is not a sequence: {other:?}"
                ))),
            },
            other => Err(WireError::MalformedPayload(format!("unknown notification type: {other}"))),
        }
    }

    /// Encode as a `data: end\n\n`-terminated frame, ready to append to a
    /// streaming response body.
    pub fn encode_framed(&self) -> Result<Vec<u8>, WireError> {
        let mut buf = quiverdb_codec::encode(&self.to_value())?;
        buf.extend_from_slice(crate::sentinel::FRAME_END);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_dict_round_trips() {
        let n = Notification::BufferDict { data: vec![(b"a".to_vec(), b"1".to_vec())], time: 10 };
        let decoded = Notification::from_value(n.to_value()).unwrap();
        assert_eq!(decoded, n);
    }

    #[test]
    fn delete_keys_round_trips() {
        let n = Notification::DeleteKeys { keys: vec![b"a".to_vec()], time: 10 };
        let decoded = Notification::from_value(n.to_value()).unwrap();
        assert_eq!(decoded, n);
    }

    #[test]
    fn encode_framed_ends_with_delimiter() {
        let n = Notification::DeleteKeys { keys: vec![], time: 0 };
        let framed = n.encode_framed().unwrap();
        assert!(framed.ends_with(crate::sentinel::FRAME_END));
    }
}
