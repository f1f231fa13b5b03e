// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

use std::time::Duration;

/// Tuning knobs for one [`crate::engine::Engine`].
#[derive(Clone, Debug)]
pub struct EngineOptions {
    /// (a) C ≥ this triggers an immediate flush.
    pub max_buffer_size: usize,
    /// Long upper bound for the periodic flusher wakeup, in the absence of
    /// any trigger.
    pub commit_time_interval: Duration,
    /// How often the watchdog wakes to check for idle time.
    pub watchdog_interval: Duration,
    /// (b) watchdog idle timeout: flush if this much time has passed since
    /// the last mutating call.
    pub watchdog_idle_timeout: Duration,
    /// Keep a complete in-memory mirror of committed state.
    pub cache_all: bool,
    /// Whether `get` on a miss memoizes `default` into the put-buffer.
    /// An explicit policy flag, defaulting to `false`, rather than a
    /// silent `setdefault`-style side effect on every read.
    pub memoize_reads_on_miss: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            max_buffer_size: 1000,
            commit_time_interval: Duration::from_secs(5 * 60),
            watchdog_interval: Duration::from_millis(200),
            watchdog_idle_timeout: Duration::from_millis(600),
            cache_all: false,
            memoize_reads_on_miss: false,
        }
    }
}
