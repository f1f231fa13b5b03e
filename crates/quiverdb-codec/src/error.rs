// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use std::fmt::{self, Display, Formatter};

/// Failure to turn a [`quiverdb_type::Value`] into bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeError(pub String);

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "encode error: {}", self.0)
    }
}

impl std::error::Error for EncodeError {}

/// Failure to turn bytes into a [`quiverdb_type::Value`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeError(pub String);

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "decode error: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

impl DecodeError {
    pub(crate) fn from_display(e: impl std::fmt::Display) -> Self {
        DecodeError(e.to_string())
    }
}

impl EncodeError {
    pub(crate) fn from_display(e: impl std::fmt::Display) -> Self {
        EncodeError(e.to_string())
    }
}
