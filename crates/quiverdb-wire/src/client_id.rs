// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one connected remote client. Generated once at `connect` time
/// and carried on every subsequent RPC so the server can tell batches apart
/// for fan-out exclusion and find the right subscriber record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        ClientId(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(ClientId)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
