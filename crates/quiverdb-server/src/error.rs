// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Error propagation rules for the Server Router: `DbNotFound` and codec
//! failures become HTTP 500, usage errors become 400, and a missing key
//! reported through the bracketed-access path becomes 404.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quiverdb_engine::EngineError;
use quiverdb_wire::{ClientId, WireError};
use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub enum ServerError {
    /// The named database has not been attached via `/connect` in this
    /// process.
    DbNotFound(String),
    /// A put-batch/delete-batch request whose client id is not a current
    /// subscriber of the target database.
    UnknownClient(ClientId),
    Engine(EngineError),
    Wire(WireError),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::DbNotFound(name) => write!(f, "database not attached: {name}"),
            ServerError::UnknownClient(id) => write!(f, "client {id} is not a subscriber of this database"),
            ServerError::Engine(e) => write!(f, "{e}"),
            ServerError::Wire(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<EngineError> for ServerError {
    fn from(e: EngineError) -> Self {
        ServerError::Engine(e)
    }
}

impl From<WireError> for ServerError {
    fn from(e: WireError) -> Self {
        ServerError::Wire(e)
    }
}

impl From<quiverdb_codec::DecodeError> for ServerError {
    fn from(e: quiverdb_codec::DecodeError) -> Self {
        ServerError::Wire(WireError::from(e))
    }
}

impl From<quiverdb_codec::EncodeError> for ServerError {
    fn from(e: quiverdb_codec::EncodeError) -> Self {
        ServerError::Wire(WireError::from(e))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::DbNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::UnknownClient(_) => StatusCode::BAD_REQUEST,
            ServerError::Engine(EngineError::NotFound) => StatusCode::NOT_FOUND,
            ServerError::Engine(EngineError::Usage(_)) => StatusCode::BAD_REQUEST,
            ServerError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Wire(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
