// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Parley driver.
//!
//! Three layers:
//! - [`GatewayError`]: what the platform binding reports for a single call.
//! - [`Failure`]: the terminal reason carried by a Down status. Its `Display`
//!   output is the user-visible message.
//! - [`ParleyError`]: glue errors for the binary (config, credential input).

use thiserror::Error;

/// The phase whose wait budget expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the sign-in sequence to settle.
    SignIn,
    /// Waiting for every recipient to be admitted to the conversation.
    Admission,
    /// Waiting for the instant message send to complete.
    Send,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::SignIn => write!(f, "Timeout occurred during sign-in procedure."),
            Phase::Admission => write!(
                f,
                "Timeout occurred while adding participants to the conversation."
            ),
            Phase::Send => write!(
                f,
                "Timeout occurred during send instant message procedure."
            ),
        }
    }
}

/// Errors reported by the platform binding for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The platform client is not installed or not running.
    #[error("{0}")]
    ClientNotFound(String),

    /// The platform client was not launched by an interactive user.
    #[error("{0}")]
    NotStartedByUser(String),

    /// Generic low-level communication failure. During sign-in this is the
    /// signature of an unusable sign-in address.
    #[error("communication failure: {0}")]
    Communication(String),

    /// Client-level failure reported by the platform.
    #[error("client error: {0}")]
    Client(String),

    /// The request was rejected before being issued.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The platform object is gone or unusable.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Returns `true` for the designated low-level failure kind that marks a
    /// sign-in address as bad.
    pub fn is_communication_failure(&self) -> bool {
        matches!(self, GatewayError::Communication(_))
    }
}

/// Terminal reason for a Down status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// No valid client handle could be obtained.
    #[error("Client in invalid state")]
    PlatformUnavailable,

    /// The platform refused to hand out a client (not found, not started by
    /// the user, or any other initialization failure).
    #[error("{0}")]
    PlatformInit(String),

    /// A bounded wait expired.
    #[error("{0}")]
    Timeout(Phase),

    /// The sign-in address produced a low-level communication failure.
    #[error("Sign-in action has been aborted. Sign-in address {address} looks invalid.")]
    BadAddress { address: String },

    /// The credential retry budget is exhausted.
    #[error("Sign-in action has been aborted. Please verify your credentials parameters.")]
    RetryExhausted,

    /// The platform refused to create a conversation.
    #[error("Conversation cannot be created: {0}")]
    ConversationFailed(String),

    /// At least one recipient could not be added to the conversation.
    #[error(
        "Conversation cannot be initiated. All participants cannot be added to the conversation: {}",
        .0.join(", ")
    )]
    UnauthorizedRecipients(Vec<String>),

    /// Every recipient was admitted but none became available.
    #[error("All participants offline: no users involved in the conversation received the message.")]
    AllRecipientsOffline,
}

/// Top-level error type for driver glue code outside the state machines.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// Configuration errors (invalid TOML, unknown backend, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Credentials could not be obtained from arguments, environment, or TTY.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// A platform request failed outside of a state machine.
    #[error("gateway error: {source}")]
    Gateway {
        #[from]
        source: GatewayError,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
