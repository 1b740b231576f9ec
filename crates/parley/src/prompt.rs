// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password acquisition via PARLEY_PASSWORD or an interactive TTY prompt.

use parley_core::ParleyError;
use secrecy::SecretString;

/// The environment variable name for providing the sign-in password.
pub const PASSWORD_ENV_VAR: &str = "PARLEY_PASSWORD";

/// Get the sign-in password from the environment or an interactive prompt.
///
/// Priority:
/// 1. `PARLEY_PASSWORD` environment variable (for scripts and services)
/// 2. Interactive TTY prompt via `rpassword`
pub fn get_password() -> Result<SecretString, ParleyError> {
    if let Ok(password) = std::env::var(PASSWORD_ENV_VAR)
        && !password.is_empty()
    {
        return Ok(SecretString::from(password));
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Password: ");
        let password = rpassword::read_password()
            .map_err(|e| ParleyError::Credentials(format!("failed to read password: {e}")))?;
        if password.is_empty() {
            return Err(ParleyError::Credentials(
                "empty password not allowed".to_string(),
            ));
        }
        return Ok(SecretString::from(password));
    }

    Err(ParleyError::Credentials(
        "No password provided. Pass it as an argument, set PARLEY_PASSWORD, or run interactively."
            .to_string(),
    ))
}
