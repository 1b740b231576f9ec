// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the semantic constraints serde cannot express: non-zero budgets,
//! bounded retry counts, and a backend the binary can build.

use crate::diagnostic::ConfigError;
use crate::model::{ParleyConfig, KNOWN_BACKENDS, MAX_CREDENTIAL_RETRIES};

/// Validate a deserialized configuration.
///
/// Collects every violation instead of failing on the first one.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.logging.level.trim();
    if !["trace", "debug", "info", "warn", "error"].contains(&level) {
        fail(format!(
            "logging.level must be one of trace, debug, info, warn, error, got `{level}`"
        ));
    }

    if !KNOWN_BACKENDS.contains(&config.platform.backend.as_str()) {
        fail(format!(
            "platform.backend `{}` is not supported (known: {})",
            config.platform.backend,
            KNOWN_BACKENDS.join(", ")
        ));
    }

    if config.platform.process_name.trim().is_empty() {
        fail("platform.process_name must not be empty".to_string());
    }

    if config.acquire.attempts == 0 {
        fail("acquire.attempts must be at least 1".to_string());
    }

    if config.sign_in.timeout_secs == 0 {
        fail("sign_in.timeout_secs must be greater than 0".to_string());
    }

    let retries = config.sign_in.max_credential_retries;
    if retries == 0 || retries > MAX_CREDENTIAL_RETRIES {
        fail(format!(
            "sign_in.max_credential_retries must be between 1 and {MAX_CREDENTIAL_RETRIES}, got {retries}"
        ));
    }

    if config.delivery.admission_timeout_secs == 0 {
        fail("delivery.admission_timeout_secs must be greater than 0".to_string());
    }

    if config.delivery.send_timeout_secs == 0 {
        fail("delivery.send_timeout_secs must be greater than 0".to_string());
    }

    if config.delivery.availability_polls == 0 {
        fail("delivery.availability_polls must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
