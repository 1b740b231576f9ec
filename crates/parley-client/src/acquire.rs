// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client handle acquisition with native process recovery.
//!
//! A handle is usable unless the client reports `Invalid` or `SigningOut`.
//! A client stuck mid-sign-out never recovers on its own, so its native
//! process is killed before the next attempt.

use std::sync::Arc;

use parley_config::model::AcquireConfig;
use parley_core::{ClientState, Failure, GatewayError, PlatformClient, PlatformGateway, ProcessRecovery};
use tracing::{debug, info, warn};

/// Resolves a usable [`PlatformClient`] handle.
pub struct ClientAcquirer {
    gateway: Arc<dyn PlatformGateway>,
    recovery: Arc<dyn ProcessRecovery>,
    process_name: String,
    config: AcquireConfig,
}

impl ClientAcquirer {
    pub fn new(
        gateway: Arc<dyn PlatformGateway>,
        recovery: Arc<dyn ProcessRecovery>,
        process_name: impl Into<String>,
        config: AcquireConfig,
    ) -> Self {
        Self {
            gateway,
            recovery,
            process_name: process_name.into(),
            config,
        }
    }

    /// Obtains a usable client handle.
    ///
    /// Fails with [`Failure::PlatformUnavailable`] once every attempt returned
    /// an unusable handle, and with [`Failure::PlatformInit`] as soon as the
    /// gateway itself refuses to hand out a client.
    pub async fn acquire(&self) -> Result<Arc<dyn PlatformClient>, Failure> {
        let attempts = self.config.attempts.max(1);

        for attempt in 1..=attempts {
            let client = self.gateway.get_client().await.map_err(init_failure)?;
            let state = client.state();

            if state.is_usable() {
                info!(attempt, %state, "platform client handle acquired");
                return Ok(client);
            }

            warn!(attempt, attempts, %state, "platform client handle is not usable");

            if state == ClientState::SigningOut {
                let killed = self.recovery.terminate_by_name(&self.process_name);
                info!(
                    process = %self.process_name,
                    killed,
                    "terminated platform process stuck signing out"
                );
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        debug!("no usable platform client after {attempts} attempts");
        Err(Failure::PlatformUnavailable)
    }
}

/// Maps a gateway refusal to the init failure reported to the caller.
fn init_failure(err: GatewayError) -> Failure {
    let message = match err {
        GatewayError::ClientNotFound(msg) => format!("Client not found: {msg}"),
        GatewayError::NotStartedByUser(msg) => format!("Client not started by user: {msg}"),
        other => format!("Exception occurred during platform initialization: {other}"),
    };
    Failure::PlatformInit(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_not_started_keep_the_platform_message() {
        assert_eq!(
            init_failure(GatewayError::ClientNotFound("no process".into())),
            Failure::PlatformInit("Client not found: no process".into())
        );
        assert_eq!(
            init_failure(GatewayError::NotStartedByUser("service".into())),
            Failure::PlatformInit("Client not started by user: service".into())
        );
    }

    #[test]
    fn other_gateway_errors_become_init_failures() {
        let failure = init_failure(GatewayError::Unavailable("rpc server".into()));
        match failure {
            Failure::PlatformInit(msg) => {
                assert!(msg.starts_with("Exception occurred during platform initialization"));
                assert!(msg.contains("rpc server"));
            }
            other => panic!("expected PlatformInit, got {other:?}"),
        }
    }
}
