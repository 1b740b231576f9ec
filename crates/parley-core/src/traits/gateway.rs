// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform gateway and client handle traits.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::GatewayError;
use crate::traits::conversation::Conversation;
use crate::types::{ClientEvent, ClientState, EventReceiver};

/// Entry point to the presence/IM platform installed on this host.
#[async_trait]
pub trait PlatformGateway: Send + Sync + 'static {
    /// Returns a handle to the platform client.
    ///
    /// Fails with [`GatewayError::ClientNotFound`] when no client is running
    /// and [`GatewayError::NotStartedByUser`] when it was not launched by an
    /// interactive user.
    async fn get_client(&self) -> Result<Arc<dyn PlatformClient>, GatewayError>;
}

/// Handle to the single platform client identity of this host.
///
/// Async methods resolve when the platform reports completion of the request.
/// They may never resolve; callers bound every wait.
#[async_trait]
pub trait PlatformClient: Send + Sync + 'static {
    /// Current client state.
    fn state(&self) -> ClientState;

    /// Whether the client runs with its UI suppressed (headless).
    fn in_suppressed_mode(&self) -> bool;

    /// Registers an observer for client events.
    fn subscribe(&self) -> EventReceiver<ClientEvent>;

    async fn initialize(&self) -> Result<(), GatewayError>;

    async fn sign_in(
        &self,
        address: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<(), GatewayError>;

    async fn sign_out(&self) -> Result<(), GatewayError>;

    /// Drops cached credentials for `address`.
    fn forget_credentials(&self, address: &str) -> Result<(), GatewayError>;

    /// Registers an observer for conversations added to the conversation manager.
    fn subscribe_conversations(&self) -> EventReceiver<Arc<dyn Conversation>>;

    /// Requests a new conversation. The platform also announces it to
    /// conversation observers.
    fn add_conversation(&self) -> Result<Arc<dyn Conversation>, GatewayError>;
}
