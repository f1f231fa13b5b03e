// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! JSON control-plane bodies: `/connect` and `/detach` carry plain JSON,
//! unlike the data-plane routes which use the Codec.

use crate::client_id::ClientId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub db_name: String,
    pub backend: String,
    pub rebuild: bool,
    pub client_id: ClientId,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetachRequest {
    pub db_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub const fn ok() -> Self {
        SuccessResponse { success: true }
    }

    pub const fn failed() -> Self {
        SuccessResponse { success: false }
    }
}
