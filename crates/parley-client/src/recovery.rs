// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Native process termination backed by `sysinfo`.

use std::ffi::OsStr;

use parley_core::ProcessRecovery;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Kills host processes by name. Failures are logged and skipped.
#[derive(Debug, Default)]
pub struct SystemProcessRecovery;

impl ProcessRecovery for SystemProcessRecovery {
    fn terminate_by_name(&self, name: &str) -> usize {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut killed = 0;
        for process in system.processes_by_name(OsStr::new(name)) {
            if process.kill() {
                debug!(pid = %process.pid(), name, "killed platform process");
                killed += 1;
            } else {
                warn!(pid = %process.pid(), name, "failed to kill platform process");
            }
        }
        killed
    }
}
