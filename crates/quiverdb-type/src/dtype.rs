// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Element type of a [`crate::value::NdArray`], encoded on the wire as the
//! little-endian numpy-style dtype string (`"<f8"`, `"<i4"`, ...) so that
//! arrays round-trip against the Python original this workspace replicates.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl DType {
    pub fn item_size(self) -> usize {
        match self {
            DType::Bool | DType::I8 | DType::U8 => 1,
            DType::I16 | DType::U16 => 2,
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }

    pub fn as_numpy_str(self) -> &'static str {
        match self {
            DType::Bool => "|b1",
            DType::I8 => "|i1",
            DType::I16 => "<i2",
            DType::I32 => "<i4",
            DType::I64 => "<i8",
            DType::U8 => "|u1",
            DType::U16 => "<u2",
            DType::U32 => "<u4",
            DType::U64 => "<u8",
            DType::F32 => "<f4",
            DType::F64 => "<f8",
        }
    }

    pub fn from_numpy_str(s: &str) -> Option<Self> {
        Some(match s {
            "|b1" | "?" | "b1" => DType::Bool,
            "|i1" | "i1" => DType::I8,
            "<i2" | "i2" => DType::I16,
            "<i4" | "i4" => DType::I32,
            "<i8" | "i8" => DType::I64,
            "|u1" | "u1" => DType::U8,
            "<u2" | "u2" => DType::U16,
            "<u4" | "u4" => DType::U32,
            "<u8" | "u8" => DType::U64,
            "<f4" | "f4" => DType::F32,
            "<f8" | "f8" => DType::F64,
            _ => return None,
        })
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_numpy_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        let all = [
            DType::Bool,
            DType::I8,
            DType::I16,
            DType::I32,
            DType::I64,
            DType::U8,
            DType::U16,
            DType::U32,
            DType::U64,
            DType::F32,
            DType::F64,
        ];
        for dtype in all {
            let s = dtype.as_numpy_str();
            assert_eq!(DType::from_numpy_str(s), Some(dtype));
        }
    }
}
