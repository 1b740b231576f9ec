// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parley - bounded sign-in and instant-message delivery driver.
//!
//! This is the binary entry point. It signs in with the given credentials,
//! optionally delivers one message, and prints each status message on stdout.

mod prompt;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use secrecy::SecretString;
use tracing::error;

use crate::run::Invocation;

/// Parley - sign in to the presence/IM platform and deliver a message.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about, long_about = None)]
struct Cli {
    /// Sign-in address, e.g. alice@corp.example.
    sign_in_address: String,

    /// Username, e.g. CORP\alice.
    username: String,

    /// Password. Falls back to PARLEY_PASSWORD, then an interactive prompt.
    password: Option<String>,

    /// Recipient of the message. Repeatable.
    #[arg(long = "to", value_name = "RECIPIENT", requires = "message")]
    recipients: Vec<String>,

    /// Message text to deliver after signing in.
    #[arg(long, requires = "recipients")]
    message: Option<String>,

    /// Configuration file to use instead of the standard locations.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => parley_config::load_and_validate_path(path),
        None => parley_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            parley_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    run::init_tracing(&config.logging.level);

    let password = match cli.password {
        Some(password) => SecretString::from(password),
        None => match prompt::get_password() {
            Ok(password) => password,
            Err(err) => {
                error!(error = %err, "no password available");
                eprintln!("parley: {err}");
                return ExitCode::FAILURE;
            }
        },
    };

    let invocation = Invocation {
        address: cli.sign_in_address,
        username: cli.username,
        password,
        recipients: cli.recipients,
        message: cli.message,
    };

    let mut stdout = std::io::stdout().lock();
    match run::run(invocation, &config, &mut stdout).await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!(error = %err, "parley failed");
            eprintln!("parley: {err}");
            ExitCode::FAILURE
        }
    }
}
