// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley` command implementation.
//!
//! Opens a session on the configured backend, signs in, optionally delivers
//! one message, and writes each status message on its own line.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use parley_client::{LoopbackGateway, Session, SessionSlot, SystemProcessRecovery};
use parley_config::ParleyConfig;
use parley_core::{ParleyError, PlatformGateway, Status};
use secrecy::SecretString;
use tracing::info;

/// Parsed command-line request.
pub struct Invocation {
    pub address: String,
    pub username: String,
    pub password: SecretString,
    pub recipients: Vec<String>,
    pub message: Option<String>,
}

/// Statuses produced by one run.
#[derive(Debug)]
pub struct Outcome {
    pub sign_in: Status,
    pub delivery: Option<Status>,
}

impl Outcome {
    pub fn is_up(&self) -> bool {
        self.sign_in.is_up() && self.delivery.as_ref().is_none_or(Status::is_up)
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_up() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Initialize the tracing subscriber with an env filter.
///
/// Logs go to stderr; stdout carries only status messages.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Resolves the platform gateway for the configured backend.
fn gateway_for(config: &ParleyConfig) -> Result<Arc<dyn PlatformGateway>, ParleyError> {
    match config.platform.backend.as_str() {
        "loopback" => {
            let gateway: Arc<dyn PlatformGateway> = Arc::new(LoopbackGateway::new());
            Ok(gateway)
        }
        other => Err(ParleyError::Config(format!(
            "unknown platform backend '{other}'"
        ))),
    }
}

/// Runs one sign-in and, when a message is given, one delivery.
///
/// Platform failures are reported through the returned statuses; `Err` is
/// reserved for setup problems and output errors.
pub async fn run(
    invocation: Invocation,
    config: &ParleyConfig,
    out: &mut impl Write,
) -> Result<Outcome, ParleyError> {
    let gateway = gateway_for(config)?;
    info!(backend = %config.platform.backend, "opening session");

    let mut session = Session::open(
        &SessionSlot::global(),
        gateway,
        Arc::new(SystemProcessRecovery),
        config,
    )
    .await;

    let sign_in = session
        .sign_in(&invocation.address, &invocation.username, invocation.password)
        .await;
    print_status(out, &sign_in)?;

    let delivery = match invocation.message {
        Some(message) if sign_in.is_up() => {
            let status = session
                .send_message(&message, invocation.recipients)
                .await;
            print_status(out, &status)?;
            Some(status)
        }
        Some(_) => {
            info!("sign-in failed, message not sent");
            None
        }
        None => None,
    };

    Ok(Outcome { sign_in, delivery })
}

fn print_status(out: &mut impl Write, status: &Status) -> Result<(), ParleyError> {
    writeln!(out, "{}", status.message())
        .and_then(|()| out.flush())
        .map_err(|e| ParleyError::Internal(format!("failed to write status: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::Failure;

    fn invocation(address: &str, message: Option<&str>, recipients: &[&str]) -> Invocation {
        Invocation {
            address: address.to_string(),
            username: "alice".to_string(),
            password: SecretString::from("pw"),
            recipients: recipients.iter().map(|r| r.to_string()).collect(),
            message: message.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn sign_in_only_prints_one_empty_status_line() {
        let mut out = Vec::new();
        let outcome = run(
            invocation("alice@corp.example", None, &[]),
            &ParleyConfig::default(),
            &mut out,
        )
        .await
        .unwrap();

        assert!(outcome.is_up());
        assert!(outcome.delivery.is_none());
        assert_eq!(String::from_utf8(out).unwrap(), "\n");
    }

    #[tokio::test]
    async fn delivery_status_follows_sign_in_status() {
        let mut out = Vec::new();
        let outcome = run(
            invocation("alice@corp.example", Some("hi"), &["bob@corp.example", "carol"]),
            &ParleyConfig::default(),
            &mut out,
        )
        .await
        .unwrap();

        assert!(outcome.sign_in.is_up());
        assert!(!outcome.is_up());
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "");
        assert!(lines[1].ends_with("conversation: carol"), "{printed}");
    }

    #[tokio::test]
    async fn failed_sign_in_skips_delivery() {
        let mut out = Vec::new();
        let outcome = run(
            invocation("alice", Some("hi"), &["bob@corp.example"]),
            &ParleyConfig::default(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(
            outcome.sign_in.failure,
            Some(Failure::BadAddress {
                address: "alice".into()
            })
        );
        assert!(outcome.delivery.is_none());
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let mut config = ParleyConfig::default();
        config.platform.backend = "carrier-pigeon".to_string();
        assert!(matches!(gateway_for(&config), Err(ParleyError::Config(_))));
    }

    #[test]
    fn exit_code_reflects_every_status() {
        let up = Outcome {
            sign_in: Status::up(),
            delivery: Some(Status::up()),
        };
        assert!(up.is_up());

        let down = Outcome {
            sign_in: Status::up(),
            delivery: Some(Status::down(Failure::AllRecipientsOffline)),
        };
        assert!(!down.is_up());
    }
}
