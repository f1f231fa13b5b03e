// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! Exponential backoff for `connect`/`get`/`put`/`delete`/`stat`/batch RPCs,
//! hand-rolled rather than pulled from a retry crate.

use crate::error::ClientError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub factor: f64,
}

impl RetryPolicy {
    /// `connect`, `get`, `put`, `delete`, and stat RPCs: 3 attempts, base
    /// 0.2 s, factor 2.
    pub const SINGLE: RetryPolicy = RetryPolicy { attempts: 3, base: Duration::from_millis(200), factor: 2.0 };

    /// Batch RPCs use the higher end of the base-delay range: 3 attempts,
    /// base 0.5 s, factor 2.
    pub const BATCH: RetryPolicy = RetryPolicy { attempts: 3, base: Duration::from_millis(500), factor: 2.0 };
}

pub async fn with_retry<T, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut f: impl FnMut() -> Fut,
) -> Result<T, ClientError>
where
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut delay = policy.base;
    let mut last_err = None;
    for attempt in 1..=policy.attempts {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                warn!(attempt, %operation, error = %e, "remote RPC failed, retrying");
                last_err = Some(e);
                if attempt < policy.attempts {
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(policy.factor);
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}
