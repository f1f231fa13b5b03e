// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Shared wire types for the remote replication protocol: request/delta
//! envelopes, sentinels, and framing, used by both `quiverdb-client` and
//! `quiverdb-server` so the two sides of the protocol can't drift apart.

pub mod batch;
pub mod client_id;
pub mod connect;
mod error;
mod map;
pub mod notification;
pub mod sentinel;
pub mod stat;

pub use batch::{DeleteBatch, PutBatch};
pub use client_id::ClientId;
pub use connect::{ConnectRequest, DetachRequest, SuccessResponse};
pub use error::WireError;
pub use notification::Notification;
pub use sentinel::{FRAME_END, IAMNULL123};
pub use stat::Stat;
