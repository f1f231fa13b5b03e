// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use std::fmt::{self, Display, Formatter};

/// Failure from the Remote Transport or the `Backend` it backs.
#[derive(Debug)]
pub enum ClientError {
    /// The request never got a response after exhausting retries.
    Http(String),
    /// The server answered but with a non-success status.
    Server { status: u16, body: String },
    Wire(quiverdb_wire::WireError),
    Codec(quiverdb_codec::DecodeError),
    /// A `Backend` method was called on a transport whose notification
    /// stream has already ended (disconnect or connection loss).
    Disconnected,
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Http(msg) => write!(f, "transport error: {msg}"),
            ClientError::Server { status, body } => write!(f, "server responded {status}: {body}"),
            ClientError::Wire(e) => write!(f, "{e}"),
            ClientError::Codec(e) => write!(f, "{e}"),
            ClientError::Disconnected => write!(f, "remote transport is disconnected"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Http(e.to_string())
    }
}

impl From<quiverdb_wire::WireError> for ClientError {
    fn from(e: quiverdb_wire::WireError) -> Self {
        ClientError::Wire(e)
    }
}

impl From<quiverdb_codec::DecodeError> for ClientError {
    fn from(e: quiverdb_codec::DecodeError) -> Self {
        ClientError::Codec(e)
    }
}

impl From<ClientError> for quiverdb_storage::StorageError {
    fn from(e: ClientError) -> Self {
        quiverdb_storage::StorageError::Backend(e.to_string())
    }
}
