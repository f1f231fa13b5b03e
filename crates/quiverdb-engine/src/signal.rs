// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 the quiverdb authors

//! A bounded, drop-oldest channel of capacity 1 — the "write-now" and
//! "flush-complete" signals the engine's flusher and watchdog coordinate
//! on: several callers may request a flush before the flusher wakes up,
//! but only the latest request (or the fact that *a* request happened)
//! matters, so this coalesces rather than queues. A small bespoke
//! primitive rather than a general queue.

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::time::Duration;

#[derive(Clone)]
pub struct OneSlot<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> OneSlot<T> {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(1);
        OneSlot { tx, rx }
    }

    /// Send `value`, discarding whatever was pending if the slot was full.
    pub fn send(&self, value: T) {
        match self.tx.try_send(value) {
            Ok(()) => {}
            Err(crossbeam_channel::TrySendError::Full(value)) => {
                // Evict the stale message, then retry. A concurrent
                // receiver may win the race and empty the slot first, in
                // which case our own try_send below succeeds directly.
                let _ = self.rx.try_recv();
                let _ = self.tx.try_send(value);
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => {}
        }
    }

    /// Block until a value arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(v) => Some(v),
            Err(_) => None,
        }
    }

    pub fn try_recv(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(v) => Some(v),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl<T> Default for OneSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_keeps_only_the_latest_value() {
        let slot: OneSlot<u32> = OneSlot::new();
        slot.send(1);
        slot.send(2);
        slot.send(3);
        assert_eq!(slot.try_recv(), Some(3));
        assert_eq!(slot.try_recv(), None);
    }

    #[test]
    fn recv_timeout_returns_none_when_empty() {
        let slot: OneSlot<u32> = OneSlot::new();
        assert_eq!(slot.recv_timeout(Duration::from_millis(10)), None);
    }
}
