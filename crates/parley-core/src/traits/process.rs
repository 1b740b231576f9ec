// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Native process recovery boundary.

/// Terminates stuck native platform processes.
pub trait ProcessRecovery: Send + Sync + 'static {
    /// Kills every process whose name matches `name`, best effort.
    ///
    /// Returns the number of processes that accepted the kill signal.
    fn terminate_by_name(&self, name: &str) -> usize;
}
