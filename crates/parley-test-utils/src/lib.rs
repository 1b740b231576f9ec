// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Parley integration tests.
//!
//! Provides a scriptable mock platform and test harness infrastructure for
//! fast, deterministic tests without a real platform client.
//!
//! # Components
//!
//! - [`MockGateway`] - Mock platform with scripted states, failures, and hangs
//! - [`MockProcessRecovery`] - Records process terminations
//! - [`TestHarness`] - Opens sessions over the mocks with an isolated slot

pub mod harness;
pub mod mock_gateway;

pub use harness::{TEST_ADDRESS, TEST_USERNAME, TestHarness, test_password};
pub use mock_gateway::{
    MockClient, MockGateway, MockProcessRecovery, SELF_URI, SendBehavior, SignInBehavior,
};
