// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Parley sign-in and delivery driver.
//!
//! This crate provides the collaborator traits the driver talks to, the error
//! taxonomy, and the common types shared by every Parley crate. Platform
//! bindings implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{Failure, GatewayError, ParleyError, Phase};
pub use types::{
    Availability, ClientEvent, ClientState, CredentialReply, CredentialRequest,
    CredentialRequestKind, EventReceiver, Status, StatusValue,
};

pub use traits::{
    Conversation, InstantMessaging, Participant, PlatformClient, PlatformGateway,
    ProcessRecovery,
};
