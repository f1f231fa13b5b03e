// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Typed value and key model shared across the quiverdb workspace.
//!
//! This crate defines no storage or wire-format logic of its own; see
//! `quiverdb-codec` for encode/decode and `quiverdb-engine` for the
//! dictionary façade built on top of [`Value`].

pub mod dtype;
pub mod ordered_float;
pub mod value;

pub use dtype::DType;
pub use ordered_float::OrderedF64;
pub use value::{NdArray, Value, ValueKind};
