// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end session testing.
//!
//! `TestHarness` wires a [`MockGateway`], a [`MockProcessRecovery`], an
//! isolated session slot, and a configuration together, and opens
//! [`Session`]s over them.

use std::sync::Arc;

use parley_client::{Session, SessionSlot};
use parley_config::ParleyConfig;
use parley_core::Status;
use secrecy::SecretString;

use crate::mock_gateway::{MockClient, MockGateway, MockProcessRecovery};

/// Sign-in address used by [`TestHarness::open_signed_in`].
pub const TEST_ADDRESS: &str = "alice@corp.example";
/// Username used by [`TestHarness::open_signed_in`].
pub const TEST_USERNAME: &str = "CORP\\alice";

pub fn test_password() -> SecretString {
    SecretString::from("correct horse battery staple")
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    gateway: MockGateway,
    config: ParleyConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            gateway: MockGateway::new(),
            config: ParleyConfig::default(),
        }
    }

    /// Use a scripted gateway instead of the cooperative default.
    pub fn with_gateway(mut self, gateway: MockGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_config(mut self, config: ParleyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sign_in_timeout(mut self, secs: u64) -> Self {
        self.config.sign_in.timeout_secs = secs;
        self
    }

    pub fn with_admission_timeout(mut self, secs: u64) -> Self {
        self.config.delivery.admission_timeout_secs = secs;
        self
    }

    pub fn with_send_timeout(mut self, secs: u64) -> Self {
        self.config.delivery.send_timeout_secs = secs;
        self
    }

    pub fn build(self) -> TestHarness {
        TestHarness {
            gateway: Arc::new(self.gateway),
            recovery: Arc::new(MockProcessRecovery::new()),
            slot: SessionSlot::new(),
            config: self.config,
        }
    }
}

/// A complete test environment around a mock platform.
pub struct TestHarness {
    /// The scripted platform gateway.
    pub gateway: Arc<MockGateway>,
    /// Records process terminations.
    pub recovery: Arc<MockProcessRecovery>,
    /// Slot private to this harness.
    pub slot: SessionSlot,
    pub config: ParleyConfig,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The mock client shared by every session of this harness.
    pub fn client(&self) -> Arc<MockClient> {
        self.gateway.client()
    }

    /// Opens a session without signing in.
    pub async fn open(&self) -> Session {
        Session::open(
            &self.slot,
            self.gateway.clone(),
            self.recovery.clone(),
            &self.config,
        )
        .await
    }

    /// Signs `session` in with the test credentials.
    pub async fn sign_in(&self, session: &mut Session) -> Status {
        session
            .sign_in(TEST_ADDRESS, TEST_USERNAME, test_password())
            .await
    }

    /// Opens a session and signs in with the test credentials.
    pub async fn open_signed_in(&self) -> (Session, Status) {
        let mut session = self.open().await;
        let status = self.sign_in(&mut session).await;
        (session, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::{ClientState, PlatformClient};

    #[tokio::test]
    async fn default_harness_signs_in() {
        let harness = TestHarness::builder().build();
        let (session, status) = harness.open_signed_in().await;

        assert!(status.is_up(), "unexpected status: {}", status.message());
        assert_eq!(harness.client().state(), ClientState::SignedIn);
        assert_eq!(harness.client().sign_in_calls(), 1);
        drop(session);
    }

    #[tokio::test]
    async fn builder_overrides_timeouts() {
        let harness = TestHarness::builder()
            .with_sign_in_timeout(5)
            .with_admission_timeout(6)
            .with_send_timeout(7)
            .build();

        assert_eq!(harness.config.sign_in.timeout_secs, 5);
        assert_eq!(harness.config.delivery.admission_timeout_secs, 6);
        assert_eq!(harness.config.delivery.send_timeout_secs, 7);
    }

    #[tokio::test]
    async fn harnesses_have_independent_slots() {
        let h1 = TestHarness::builder().build();
        let h2 = TestHarness::builder().build();

        let _held = h1.open().await;
        assert!(h1.slot.is_held());
        assert!(!h2.slot.is_held());
    }
}
