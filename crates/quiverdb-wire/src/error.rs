// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use std::fmt::{self, Display, Formatter};

/// Failure to turn a wire payload into (or out of) its typed shape — a
/// codec failure, or a malformed `Value::Map` that is missing a field the
/// protocol requires.
#[derive(Clone, Debug, PartialEq)]
pub enum WireError {
    Codec(String),
    MalformedPayload(String),
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Codec(msg) => write!(f, "codec error: {msg}"),
            WireError::MalformedPayload(msg) => write!(f, "malformed payload: {msg}"),
        }
    }
}

impl std::error::Error for WireError {}

impl From<quiverdb_codec::DecodeError> for WireError {
    fn from(e: quiverdb_codec::DecodeError) -> Self {
        WireError::Codec(e.to_string())
    }
}

impl From<quiverdb_codec::EncodeError> for WireError {
    fn from(e: quiverdb_codec::EncodeError) -> Self {
        WireError::Codec(e.to_string())
    }
}
