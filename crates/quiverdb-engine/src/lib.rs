// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Write-Buffer Engine and the dictionary-style façade built on top
//! of it: everything between the Backend Adapter and the
//! embedded/network-attached entry points in `pkg/rust/quiverdb` and
//! `quiverdb-server`.

mod engine;
mod error;
mod facade;
mod options;
pub mod registry;
mod signal;

pub use engine::{Engine, EngineKind, EngineSnapshot};
pub use error::EngineError;
pub use facade::{Dict, Stat};
pub use options::EngineOptions;
pub use quiverdb_storage::{Kind, OpenOptions};
