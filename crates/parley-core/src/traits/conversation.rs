// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation, participant, and messaging capability traits.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::types::{Availability, EventReceiver};

/// A conversation created through the platform's conversation manager.
pub trait Conversation: Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Registers an observer for participants joining this conversation.
    fn subscribe_participants(&self) -> EventReceiver<Arc<dyn Participant>>;

    /// Resolves `contact_uri` and adds it as a participant.
    fn add_participant(&self, contact_uri: &str) -> Result<(), GatewayError>;

    /// The instant-messaging modality, if the conversation carries one.
    fn instant_messaging(&self) -> Option<Arc<dyn InstantMessaging>>;
}

/// A member of a conversation.
pub trait Participant: Send + Sync + 'static {
    /// Contact URI, usually `sip:` prefixed.
    fn uri(&self) -> &str;

    /// Whether this participant is the signed-in user.
    fn is_self(&self) -> bool;

    fn availability(&self) -> Availability;
}

/// Instant-messaging capability of a conversation.
#[async_trait]
pub trait InstantMessaging: Send + Sync + 'static {
    /// Whether a send may be invoked right now.
    fn can_send(&self) -> bool;

    async fn send_message(&self, text: &str) -> Result<(), GatewayError>;
}
