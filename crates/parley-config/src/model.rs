// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Parley driver.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Parley configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Platform backend selection and native process details.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Client handle acquisition policy.
    #[serde(default)]
    pub acquire: AcquireConfig,

    /// Sign-in state machine policy.
    #[serde(default)]
    pub sign_in: SignInConfig,

    /// Conversation and message delivery policy.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Names of the platform backends the binary knows how to build.
pub const KNOWN_BACKENDS: &[&str] = &["loopback"];

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Which platform binding drives the session.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Native client process name, killed when a handle is stuck signing out.
    #[serde(default = "default_process_name")]
    pub process_name: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            process_name: default_process_name(),
        }
    }
}

fn default_backend() -> String {
    "loopback".to_string()
}

fn default_process_name() -> String {
    "lync".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AcquireConfig {
    /// Attempts to obtain a usable client handle.
    #[serde(default = "default_acquire_attempts")]
    pub attempts: u32,

    /// Pause between attempts, in milliseconds.
    #[serde(default = "default_acquire_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            attempts: default_acquire_attempts(),
            retry_delay_ms: default_acquire_retry_delay_ms(),
        }
    }
}

impl AcquireConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn default_acquire_attempts() -> u32 {
    3
}

fn default_acquire_retry_delay_ms() -> u64 {
    250
}

/// Upper bound for `sign_in.max_credential_retries`.
pub const MAX_CREDENTIAL_RETRIES: u32 = 10;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignInConfig {
    /// Budget for the whole sign-in sequence, in seconds.
    #[serde(default = "default_sign_in_timeout_secs")]
    pub timeout_secs: u64,

    /// Auto-discovery credential requests tolerated before aborting.
    #[serde(default = "default_max_credential_retries")]
    pub max_credential_retries: u32,
}

impl Default for SignInConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_sign_in_timeout_secs(),
            max_credential_retries: default_max_credential_retries(),
        }
    }
}

impl SignInConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_sign_in_timeout_secs() -> u64 {
    75
}

fn default_max_credential_retries() -> u32 {
    MAX_CREDENTIAL_RETRIES
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Budget for admitting every recipient, in seconds.
    #[serde(default = "default_phase_timeout_secs")]
    pub admission_timeout_secs: u64,

    /// Budget for the message send itself, in seconds.
    #[serde(default = "default_phase_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Availability polls per participant before declaring it offline.
    #[serde(default = "default_availability_polls")]
    pub availability_polls: u32,

    /// Pause between availability polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Pause after a successful send so the platform can flush it, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Scheme prepended to bare recipient identifiers.
    #[serde(default = "default_contact_scheme")]
    pub contact_scheme: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            admission_timeout_secs: default_phase_timeout_secs(),
            send_timeout_secs: default_phase_timeout_secs(),
            availability_polls: default_availability_polls(),
            poll_interval_ms: default_poll_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            contact_scheme: default_contact_scheme(),
        }
    }
}

impl DeliveryConfig {
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_secs(self.admission_timeout_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_phase_timeout_secs() -> u64 {
    75
}

fn default_availability_polls() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_settle_delay_ms() -> u64 {
    250
}

fn default_contact_scheme() -> String {
    "sip:".to_string()
}
