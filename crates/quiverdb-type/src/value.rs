// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use crate::dtype::DType;
use crate::ordered_float::OrderedF64;
use std::fmt::{self, Display, Formatter};

/// The tag of a [`Value`], used for error messages and the `stat` façade
/// operation; carries no payload.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum ValueKind {
    Undefined,
    Bool,
    Int,
    UInt,
    Float,
    Text,
    Bytes,
    Sequence,
    Tuple,
    Map,
    Array,
    Frame,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::UInt => "uint",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Sequence => "sequence",
            ValueKind::Tuple => "tuple",
            ValueKind::Map => "map",
            ValueKind::Array => "array",
            ValueKind::Frame => "frame",
        };
        f.write_str(s)
    }
}

/// A dense n-dimensional numeric array: dtype, shape, and a contiguous
/// row-major byte buffer. Carried through the Codec via extension tag `1`
/// (see `quiverdb-codec`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NdArray {
    pub dtype: DType,
    pub shape: Vec<u64>,
    pub data: Vec<u8>,
}

impl NdArray {
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Whether `data`'s length matches `dtype.item_size() * element_count()`.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() as u64 == self.dtype.item_size() as u64 * self.element_count()
    }
}

/// A typed key or value, as it crosses the façade boundary.
///
/// The same enum models both keys and values: `decode_key` (in
/// `quiverdb-codec`) is what guarantees that a sequence-shaped key comes
/// back as `Tuple` rather than `Sequence`, so tuple-valued keys stay
/// hashable and compare equal on round-trip.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Undefined,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(OrderedF64),
    Text(String),
    Bytes(Vec<u8>),
    /// Decodes from a msgpack array when not in key position.
    Sequence(Vec<Value>),
    /// Decodes from a msgpack array when in key position (see `decode_key`).
    Tuple(Vec<Value>),
    /// An ordered association list rather than a `HashMap`, so that `Value`
    /// itself can remain `Hash + Eq` without requiring its own keys to be
    /// inserted in a canonical order.
    Map(Vec<(Value, Value)>),
    Array(NdArray),
    /// An opaque serialized tabular frame (extension tag `2`). Carried
    /// as raw bytes when the `frame` feature is not enabled.
    Frame(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::UInt(_) => ValueKind::UInt,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Sequence(_) => ValueKind::Sequence,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Map(_) => ValueKind::Map,
            Value::Array(_) => ValueKind::Array,
            Value::Frame(_) => ValueKind::Frame,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn float(v: f64) -> Self {
        OrderedF64::try_from(v).map(Value::Float).unwrap_or(Value::Undefined)
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Bool(v) => Display::fmt(v, f),
            Value::Int(v) => Display::fmt(v, f),
            Value::UInt(v) => Display::fmt(v, f),
            Value::Float(v) => Display::fmt(v, f),
            Value::Text(v) => Display::fmt(v, f),
            Value::Bytes(v) => write!(f, "b{:?}", v),
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                write!(f, "]")
            }
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    Display::fmt(item, f)?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Array(arr) => write!(f, "array(dtype={}, shape={:?})", arr.dtype, arr.shape),
            Value::Frame(bytes) => write!(f, "frame({} bytes)", bytes.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn tuple_keys_are_hashable() {
        let mut map = HashMap::new();
        map.insert(Value::tuple([Value::Int(1), Value::tuple([Value::Int(2), Value::Int(3)])]), Value::Int(42));
        let lookup = Value::tuple([Value::Int(1), Value::tuple([Value::Int(2), Value::Int(3)])]);
        assert_eq!(map.get(&lookup), Some(&Value::Int(42)));
    }

    #[test]
    fn tuple_and_sequence_are_distinct_keys() {
        let t = Value::Tuple(vec![Value::Int(1)]);
        let s = Value::Sequence(vec![Value::Int(1)]);
        assert_ne!(t, s);
    }
}
