// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Small helpers for building and reading the `Value::Map` shapes the wire
//! protocol uses as its envelope (`{type, data, time}`, `{keys, client_id,
//! time}`, ...). Every field is looked up by name rather than position, so
//! the map's key order on the wire is never significant.

use crate::error::WireError;
use quiverdb_type::Value;

pub fn field<'a>(entries: &'a [(Value, Value)], name: &str) -> Result<&'a Value, WireError> {
    entries
        .iter()
        .find(|(k, _)| matches!(k, Value::Text(s) if s == name))
        .map(|(_, v)| v)
        .ok_or_else(|| WireError::MalformedPayload(format!("missing field `{name}`")))
}

pub fn text_field(entries: &[(Value, Value)], name: &str) -> Result<String, WireError> {
    match field(entries, name)? {
        Value::Text(s) => Ok(s.clone()),
        other => Err(WireError::MalformedPayload(format!("field `{name}` is not text: {other:?}"))),
    }
}

pub fn int_field(entries: &[(Value, Value)], name: &str) -> Result<i64, WireError> {
    match field(entries, name)? {
        Value::Int(i) => Ok(*i),
        Value::UInt(u) => Ok(*u as i64),
        other => Err(WireError::MalformedPayload(format!("field `{name}` is not an int: {other:?}"))),
    }
}

pub fn bytes_field(entries: &[(Value, Value)], name: &str) -> Result<Vec<u8>, WireError> {
    match field(entries, name)? {
        Value::Bytes(b) => Ok(b.clone()),
        other => Err(WireError::MalformedPayload(format!("field `{name}` is not bytes: {other:?}"))),
    }
}

pub fn entry(name: &str, value: Value) -> (Value, Value) {
    (Value::Text(name.to_string()), value)
}
