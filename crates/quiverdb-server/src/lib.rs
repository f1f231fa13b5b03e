// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! The Server Router: the process that hosts databases for the Remote
//! Transport, implementing the full HTTP API on top of `axum`.

mod error;
mod routes;
mod state;

pub use error::ServerError;
pub use routes::router;
pub use state::ServerState;
