// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the platform traits and the driver state machines.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::{mpsc, oneshot};

use crate::error::Failure;

/// Receiving half of a platform event subscription.
///
/// Dropping the receiver deregisters the observer: the platform prunes
/// closed senders on its next delivery.
pub type EventReceiver<T> = mpsc::UnboundedReceiver<T>;

/// State reported by the platform client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ClientState {
    Invalid,
    Uninitialized,
    Initializing,
    SignedOut,
    SigningIn,
    SignedIn,
    SigningOut,
    ShuttingDown,
}

impl ClientState {
    /// A handle is usable unless it is invalid or stuck mid-sign-out.
    pub fn is_usable(self) -> bool {
        !matches!(self, ClientState::Invalid | ClientState::SigningOut)
    }
}

/// Contact availability as published by the presence service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Availability {
    None,
    Free,
    FreeIdle,
    Busy,
    BusyIdle,
    DoNotDisturb,
    TemporarilyAway,
    Away,
    Offline,
    Invalid,
}

impl Availability {
    /// Whether a message sent now would reach the contact.
    pub fn is_reachable(self) -> bool {
        !matches!(
            self,
            Availability::None | Availability::Offline | Availability::Invalid
        )
    }
}

/// Origin of a credential request raised by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum CredentialRequestKind {
    /// The platform's own server auto-discovery asked again.
    AutoDiscovery,
    /// The sign-in server asked for credentials.
    SignIn,
    /// A web service behind the platform asked for credentials.
    WebService,
    /// An authenticating proxy asked for credentials.
    Proxy,
}

/// Credentials handed back to the platform in response to a request.
#[derive(Debug)]
pub struct CredentialReply {
    pub username: String,
    pub password: SecretString,
    /// Whether the platform should cache the credentials.
    pub persist: bool,
}

/// A pending credential request. Answer it with [`CredentialRequest::submit`]
/// or drop it to leave the platform without an answer.
#[derive(Debug)]
pub struct CredentialRequest {
    kind: CredentialRequestKind,
    reply: oneshot::Sender<CredentialReply>,
}

impl CredentialRequest {
    /// Creates a request and the receiver the platform listens on.
    pub fn new(kind: CredentialRequestKind) -> (Self, oneshot::Receiver<CredentialReply>) {
        let (reply, rx) = oneshot::channel();
        (Self { kind, reply }, rx)
    }

    pub fn kind(&self) -> CredentialRequestKind {
        self.kind
    }

    /// Supplies credentials. Returns `false` if the platform stopped waiting.
    pub fn submit(self, username: impl Into<String>, password: SecretString, persist: bool) -> bool {
        self.reply
            .send(CredentialReply {
                username: username.into(),
                password,
                persist,
            })
            .is_ok()
    }
}

/// Push events raised by the platform client.
#[derive(Debug)]
pub enum ClientEvent {
    StateChanged { old: ClientState, new: ClientState },
    SignInDelayed,
    CredentialRequested(CredentialRequest),
}

/// Two-valued status consumed by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum StatusValue {
    Up,
    Down,
}

/// Terminal status of a sign-in or delivery run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub value: StatusValue,
    pub failure: Option<Failure>,
}

impl Status {
    pub fn up() -> Self {
        Self {
            value: StatusValue::Up,
            failure: None,
        }
    }

    pub fn down(failure: Failure) -> Self {
        Self {
            value: StatusValue::Down,
            failure: Some(failure),
        }
    }

    pub fn is_up(&self) -> bool {
        self.value == StatusValue::Up
    }

    /// Human-readable reason. Empty when the status is Up.
    pub fn message(&self) -> String {
        self.failure
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}
