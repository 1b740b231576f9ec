// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process platform emulation.
//!
//! Backs the `loopback` backend: sign-in succeeds for any address that looks
//! like `user@domain`, every contact is available, and sent messages are
//! recorded instead of delivered. Useful for dry runs of the CLI.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use parley_core::{
    Availability, ClientEvent, ClientState, Conversation, EventReceiver, GatewayError,
    InstantMessaging, Participant, PlatformClient, PlatformGateway,
};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tracing::debug;

/// Fan-out of events to registered observers. Closed observers are pruned.
struct Observers<T>(Mutex<Vec<mpsc::UnboundedSender<T>>>);

impl<T> Observers<T> {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn subscribe(&self) -> EventReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        rx
    }

    fn emit(&self, event: impl Fn() -> T) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event()).is_ok());
    }
}

/// Gateway handing out a single shared [`LoopbackClient`].
#[derive(Clone)]
pub struct LoopbackGateway {
    client: Arc<LoopbackClient>,
}

impl LoopbackGateway {
    /// A gateway whose client is running and signed out.
    pub fn new() -> Self {
        Self::with_state(ClientState::SignedOut)
    }

    pub fn with_state(state: ClientState) -> Self {
        Self {
            client: Arc::new(LoopbackClient::new(state)),
        }
    }

    pub fn client(&self) -> Arc<LoopbackClient> {
        Arc::clone(&self.client)
    }
}

impl Default for LoopbackGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformGateway for LoopbackGateway {
    async fn get_client(&self) -> Result<Arc<dyn PlatformClient>, GatewayError> {
        let client: Arc<dyn PlatformClient> = self.client.clone();
        Ok(client)
    }
}

/// Emulated platform client.
pub struct LoopbackClient {
    state: Mutex<ClientState>,
    events: Observers<ClientEvent>,
    conversations: Observers<Arc<dyn Conversation>>,
    sent: Arc<Mutex<Vec<String>>>,
    next_id: AtomicU64,
}

impl LoopbackClient {
    fn new(state: ClientState) -> Self {
        Self {
            state: Mutex::new(state),
            events: Observers::new(),
            conversations: Observers::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Messages sent through any conversation of this client.
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn transition(&self, new: ClientState) {
        let old = std::mem::replace(
            &mut *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            new,
        );
        debug!(%old, %new, "loopback client state changed");
        self.events.emit(|| ClientEvent::StateChanged { old, new });
    }
}

#[async_trait]
impl PlatformClient for LoopbackClient {
    fn state(&self) -> ClientState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_suppressed_mode(&self) -> bool {
        true
    }

    fn subscribe(&self) -> EventReceiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn initialize(&self) -> Result<(), GatewayError> {
        self.transition(ClientState::Initializing);
        self.transition(ClientState::SignedOut);
        Ok(())
    }

    async fn sign_in(
        &self,
        address: &str,
        _username: &str,
        _password: &SecretString,
    ) -> Result<(), GatewayError> {
        self.transition(ClientState::SigningIn);
        let looks_valid = address
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
        if !looks_valid {
            self.transition(ClientState::SignedOut);
            return Err(GatewayError::Communication(format!(
                "no sign-in server found for {address}"
            )));
        }
        self.transition(ClientState::SignedIn);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.transition(ClientState::SigningOut);
        self.transition(ClientState::SignedOut);
        Ok(())
    }

    fn forget_credentials(&self, _address: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    fn subscribe_conversations(&self) -> EventReceiver<Arc<dyn Conversation>> {
        self.conversations.subscribe()
    }

    fn add_conversation(&self) -> Result<Arc<dyn Conversation>, GatewayError> {
        if self.state() != ClientState::SignedIn {
            return Err(GatewayError::InvalidArgument(
                "client is not signed in".to_string(),
            ));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conversation: Arc<dyn Conversation> = Arc::new(LoopbackConversation {
            id: format!("loopback-{id}"),
            participants: Observers::new(),
            messaging: Arc::new(LoopbackMessaging {
                sent: Arc::clone(&self.sent),
            }),
        });
        self.conversations.emit(|| Arc::clone(&conversation));
        Ok(conversation)
    }
}

struct LoopbackConversation {
    id: String,
    participants: Observers<Arc<dyn Participant>>,
    messaging: Arc<LoopbackMessaging>,
}

impl Conversation for LoopbackConversation {
    fn id(&self) -> &str {
        &self.id
    }

    fn subscribe_participants(&self) -> EventReceiver<Arc<dyn Participant>> {
        self.participants.subscribe()
    }

    fn add_participant(&self, contact_uri: &str) -> Result<(), GatewayError> {
        if !contact_uri.contains('@') {
            return Err(GatewayError::InvalidArgument(format!(
                "unknown contact {contact_uri}"
            )));
        }
        let participant: Arc<dyn Participant> = Arc::new(LoopbackParticipant {
            uri: contact_uri.to_string(),
        });
        self.participants.emit(|| Arc::clone(&participant));
        Ok(())
    }

    fn instant_messaging(&self) -> Option<Arc<dyn InstantMessaging>> {
        let messaging: Arc<dyn InstantMessaging> = self.messaging.clone();
        Some(messaging)
    }
}

struct LoopbackParticipant {
    uri: String,
}

impl Participant for LoopbackParticipant {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn is_self(&self) -> bool {
        false
    }

    fn availability(&self) -> Availability {
        Availability::Free
    }
}

struct LoopbackMessaging {
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl InstantMessaging for LoopbackMessaging {
    fn can_send(&self) -> bool {
        true
    }

    async fn send_message(&self, text: &str) -> Result<(), GatewayError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        Ok(())
    }
}
