// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-slot completion signal with bounded waits.
//!
//! A signal is either clear or fired. It fires at most once per use, is
//! reset before reuse, and is observed with a timed wait. Setting it from
//! any task wakes the waiter; setting it again is a no-op.

use std::time::Duration;

use tokio::sync::watch;

/// A set-once, resettable completion flag.
#[derive(Debug)]
pub struct CompletionSignal {
    fired: watch::Sender<bool>,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self {
            fired: watch::Sender::new(false),
        }
    }

    /// Fires the signal. Returns `true` if this call fired it.
    pub fn set(&self) -> bool {
        !self.fired.send_replace(true)
    }

    /// Clears the signal for the next use.
    pub fn reset(&self) {
        self.fired.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.fired.borrow()
    }

    /// Waits until the signal fires or `timeout` elapses.
    ///
    /// Returns `true` if the signal fired (including before the call).
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.fired.subscribe();
        // The sender lives in `self`, so `wait_for` can only end by matching.
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|fired| *fired)).await,
            Ok(Ok(_))
        )
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}
