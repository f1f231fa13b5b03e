// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Wire codec for [`quiverdb_type::Value`]: MessagePack on the wire, with
//! extension tags for arrays, frames, and tuples (see [`codec`] for the
//! format).

pub mod codec;
pub mod error;

pub use codec::{decode, decode_key, encode};
pub use error::{DecodeError, EncodeError};
