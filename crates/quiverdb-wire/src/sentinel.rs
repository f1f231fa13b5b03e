// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Wire-level constants: the sentinel `/get` uses to signal key absence,
//! and the token that frames each notification on the `/connect` stream.

/// Response body of `/get` when the key is absent. Chosen by the protocol,
/// not negotiable per-request, so a legitimate value can never collide
/// with it — values are always codec-framed, never this bare literal.
pub const IAMNULL123: &[u8] = b"iamnull123";

/// Delimiter terminating each framed payload on the `/connect` notification
/// stream.
pub const FRAME_END: &[u8] = b"data: end\n\n";
