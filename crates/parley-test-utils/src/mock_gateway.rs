// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable mock platform for deterministic testing.
//!
//! `MockGateway` hands out one shared [`MockClient`]. Behaviors are scripted
//! up front with `with_*` builders, and every call is recorded for assertion
//! in tests. Operations scripted to hang never resolve, so tests drive them
//! with a paused clock.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot};

use parley_core::{
    Availability, ClientEvent, ClientState, Conversation, CredentialReply, CredentialRequest,
    CredentialRequestKind, EventReceiver, GatewayError, InstantMessaging, Participant,
    PlatformClient, PlatformGateway, ProcessRecovery,
};

/// URI of the signed-in user as announced by mock conversations.
pub const SELF_URI: &str = "sip:me@mock.example";

/// How the mock answers `sign_in`.
#[derive(Debug, Clone)]
pub enum SignInBehavior {
    /// `SigningIn -> SignedIn`, then success.
    Succeed,
    /// `SigningIn -> SignedOut`, then the given error.
    Fail(GatewayError),
    /// Raise an auto-discovery credential request and never complete.
    RequestCredentials,
    /// Never complete.
    Hang,
}

/// How the mock answers `send_message`.
#[derive(Debug, Clone)]
pub enum SendBehavior {
    Succeed,
    Fail(GatewayError),
    Hang,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registered observers. Closed ones are pruned on every delivery and count.
struct Observers<T>(Mutex<Vec<mpsc::UnboundedSender<T>>>);

impl<T> Observers<T> {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn subscribe(&self) -> EventReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.0).push(tx);
        rx
    }

    fn emit(&self, event: impl Fn() -> T) {
        lock(&self.0).retain(|tx| tx.send(event()).is_ok());
    }

    fn count(&self) -> usize {
        let mut observers = lock(&self.0);
        observers.retain(|tx| !tx.is_closed());
        observers.len()
    }
}

/// A scriptable platform gateway.
pub struct MockGateway {
    client: Arc<MockClient>,
    client_states: Mutex<VecDeque<ClientState>>,
    get_client_error: Mutex<Option<GatewayError>>,
    get_client_calls: AtomicUsize,
}

impl MockGateway {
    /// A gateway whose client is running, signed out, and cooperative.
    pub fn new() -> Self {
        Self {
            client: Arc::new(MockClient::new()),
            client_states: Mutex::new(VecDeque::new()),
            get_client_error: Mutex::new(None),
            get_client_calls: AtomicUsize::new(0),
        }
    }

    /// Client state observed by successive `get_client` calls.
    ///
    /// Once the script runs out the client keeps its current state.
    pub fn with_client_states(self, states: impl IntoIterator<Item = ClientState>) -> Self {
        lock(&self.client_states).extend(states);
        self
    }

    /// Every `get_client` call fails with `error`.
    pub fn with_get_client_error(self, error: GatewayError) -> Self {
        *lock(&self.get_client_error) = Some(error);
        self
    }

    pub fn with_sign_in(self, behavior: SignInBehavior) -> Self {
        *lock(&self.client.sign_in_behavior) = behavior;
        self
    }

    /// `initialize` never completes.
    pub fn with_hanging_initialize(self) -> Self {
        self.client.hang_initialize.store(1, Ordering::SeqCst);
        self
    }

    /// `sign_out` never completes.
    pub fn with_hanging_sign_out(self) -> Self {
        self.client.hang_sign_out.store(1, Ordering::SeqCst);
        self
    }

    pub fn with_suppressed_mode(self, suppressed: bool) -> Self {
        self.client
            .not_suppressed
            .store(usize::from(!suppressed), Ordering::SeqCst);
        self
    }

    /// `add_conversation` fails with `error`.
    pub fn with_conversation_error(self, error: GatewayError) -> Self {
        *lock(&self.client.conversation_error) = Some(error);
        self
    }

    /// Adding `recipient` to a conversation fails.
    pub fn with_rejected(self, recipient: &str) -> Self {
        lock(&self.client.script).rejected.insert(bare(recipient));
        self
    }

    /// Availability returned by successive polls of `recipient`; the last
    /// value repeats. Unscripted recipients are `Free`.
    pub fn with_availability(
        self,
        recipient: &str,
        sequence: impl IntoIterator<Item = Availability>,
    ) -> Self {
        lock(&self.client.script)
            .availability
            .insert(bare(recipient), sequence.into_iter().collect());
        self
    }

    /// Added participants are never announced.
    pub fn with_silent_participants(self) -> Self {
        lock(&self.client.script).silent_participants = true;
        self
    }

    /// Conversations carry no instant-messaging modality.
    pub fn without_messaging(self) -> Self {
        lock(&self.client.script).messaging = false;
        self
    }

    /// The messaging modality reports it cannot send.
    pub fn with_send_disabled(self) -> Self {
        lock(&self.client.script).can_send = false;
        self
    }

    pub fn with_send(self, behavior: SendBehavior) -> Self {
        lock(&self.client.script).send = behavior;
        self
    }

    pub fn client(&self) -> Arc<MockClient> {
        Arc::clone(&self.client)
    }

    pub fn get_client_calls(&self) -> usize {
        self.get_client_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformGateway for MockGateway {
    async fn get_client(&self) -> Result<Arc<dyn PlatformClient>, GatewayError> {
        self.get_client_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.get_client_error).clone() {
            return Err(error);
        }
        if let Some(state) = lock(&self.client_states).pop_front() {
            *lock(&self.client.state) = state;
        }
        let client: Arc<dyn PlatformClient> = self.client.clone();
        Ok(client)
    }
}

/// Per-conversation script shared by every conversation of a client.
#[derive(Debug, Clone)]
struct ConversationScript {
    rejected: HashSet<String>,
    availability: HashMap<String, Vec<Availability>>,
    silent_participants: bool,
    messaging: bool,
    can_send: bool,
    send: SendBehavior,
}

impl Default for ConversationScript {
    fn default() -> Self {
        Self {
            rejected: HashSet::new(),
            availability: HashMap::new(),
            silent_participants: false,
            messaging: true,
            can_send: true,
            send: SendBehavior::Succeed,
        }
    }
}

/// Mock platform client. Records every call.
pub struct MockClient {
    state: Mutex<ClientState>,
    events: Observers<ClientEvent>,
    conversation_observers: Observers<Arc<dyn Conversation>>,
    sign_in_behavior: Mutex<SignInBehavior>,
    conversation_error: Mutex<Option<GatewayError>>,
    script: Mutex<ConversationScript>,
    conversations: Mutex<Vec<Arc<MockConversation>>>,
    credential_replies: Mutex<Vec<oneshot::Receiver<CredentialReply>>>,
    forgotten: Mutex<Vec<String>>,
    hang_initialize: AtomicUsize,
    hang_sign_out: AtomicUsize,
    not_suppressed: AtomicUsize,
    initialize_calls: AtomicUsize,
    sign_in_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl MockClient {
    fn new() -> Self {
        Self {
            state: Mutex::new(ClientState::SignedOut),
            events: Observers::new(),
            conversation_observers: Observers::new(),
            sign_in_behavior: Mutex::new(SignInBehavior::Succeed),
            conversation_error: Mutex::new(None),
            script: Mutex::new(ConversationScript::default()),
            conversations: Mutex::new(Vec::new()),
            credential_replies: Mutex::new(Vec::new()),
            forgotten: Mutex::new(Vec::new()),
            hang_initialize: AtomicUsize::new(0),
            hang_sign_out: AtomicUsize::new(0),
            not_suppressed: AtomicUsize::new(0),
            initialize_calls: AtomicUsize::new(0),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }

    /// Moves to `new` and notifies event observers.
    pub fn transition(&self, new: ClientState) {
        let old = std::mem::replace(&mut *lock(&self.state), new);
        self.events.emit(|| ClientEvent::StateChanged { old, new });
    }

    /// Emits a state change without touching the current state.
    pub fn emit_state_change(&self, old: ClientState, new: ClientState) {
        self.events.emit(|| ClientEvent::StateChanged { old, new });
    }

    pub fn emit_sign_in_delayed(&self) {
        self.events.emit(|| ClientEvent::SignInDelayed);
    }

    /// Raises a credential request to the first live observer.
    ///
    /// Returns the receiver the platform would listen on, or `None` if no
    /// observer is registered.
    pub fn request_credentials(
        &self,
        kind: CredentialRequestKind,
    ) -> Option<oneshot::Receiver<CredentialReply>> {
        let mut observers = lock(&self.events.0);
        observers.retain(|tx| !tx.is_closed());
        let observer = observers.first()?;
        let (request, reply) = CredentialRequest::new(kind);
        observer
            .send(ClientEvent::CredentialRequested(request))
            .ok()?;
        Some(reply)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.count()
    }

    pub fn conversation_subscriber_count(&self) -> usize {
        self.conversation_observers.count()
    }

    /// Live participant observers across every conversation created so far.
    pub fn participant_subscriber_count(&self) -> usize {
        lock(&self.conversations)
            .iter()
            .map(|c| c.participants.count())
            .sum()
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    pub fn forgotten_addresses(&self) -> Vec<String> {
        lock(&self.forgotten).clone()
    }

    pub fn conversations_created(&self) -> usize {
        lock(&self.conversations).len()
    }

    /// Contact URIs passed to `add_participant`, in call order.
    pub fn added_participants(&self) -> Vec<String> {
        lock(&self.conversations)
            .iter()
            .flat_map(|c| lock(&c.added).clone())
            .collect()
    }

    /// Messages passed to `send_message`.
    pub fn sent_messages(&self) -> Vec<String> {
        lock(&self.conversations)
            .iter()
            .flat_map(|c| lock(&c.messaging.sent).clone())
            .collect()
    }

    pub fn send_calls(&self) -> usize {
        self.sent_messages().len()
    }

    /// Availability polls issued for `recipient`.
    pub fn availability_polls(&self, recipient: &str) -> usize {
        let key = bare(recipient);
        lock(&self.conversations)
            .iter()
            .map(|c| lock(&c.polls).get(&key).copied().unwrap_or(0))
            .sum()
    }

    /// Replies to credential requests answered by the driver so far.
    pub fn credential_replies(&self) -> Vec<CredentialReply> {
        lock(&self.credential_replies)
            .iter_mut()
            .filter_map(|rx| rx.try_recv().ok())
            .collect()
    }
}

#[async_trait]
impl PlatformClient for MockClient {
    fn state(&self) -> ClientState {
        *lock(&self.state)
    }

    fn in_suppressed_mode(&self) -> bool {
        self.not_suppressed.load(Ordering::SeqCst) == 0
    }

    fn subscribe(&self) -> EventReceiver<ClientEvent> {
        self.events.subscribe()
    }

    async fn initialize(&self) -> Result<(), GatewayError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_initialize.load(Ordering::SeqCst) != 0 {
            std::future::pending::<()>().await;
        }
        self.transition(ClientState::Initializing);
        self.transition(ClientState::SignedOut);
        Ok(())
    }

    async fn sign_in(
        &self,
        _address: &str,
        _username: &str,
        _password: &SecretString,
    ) -> Result<(), GatewayError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = lock(&self.sign_in_behavior).clone();
        self.transition(ClientState::SigningIn);

        match behavior {
            SignInBehavior::Succeed => {
                self.transition(ClientState::SignedIn);
                Ok(())
            }
            SignInBehavior::Fail(error) => {
                self.transition(ClientState::SignedOut);
                Err(error)
            }
            SignInBehavior::RequestCredentials => {
                if let Some(reply) = self.request_credentials(CredentialRequestKind::AutoDiscovery)
                {
                    lock(&self.credential_replies).push(reply);
                }
                std::future::pending().await
            }
            SignInBehavior::Hang => std::future::pending().await,
        }
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.transition(ClientState::SigningOut);
        if self.hang_sign_out.load(Ordering::SeqCst) != 0 {
            std::future::pending::<()>().await;
        }
        self.transition(ClientState::SignedOut);
        Ok(())
    }

    fn forget_credentials(&self, address: &str) -> Result<(), GatewayError> {
        lock(&self.forgotten).push(address.to_string());
        Ok(())
    }

    fn subscribe_conversations(&self) -> EventReceiver<Arc<dyn Conversation>> {
        self.conversation_observers.subscribe()
    }

    fn add_conversation(&self) -> Result<Arc<dyn Conversation>, GatewayError> {
        if let Some(error) = lock(&self.conversation_error).clone() {
            return Err(error);
        }
        let mut conversations = lock(&self.conversations);
        let script = lock(&self.script).clone();
        let conversation = Arc::new(MockConversation {
            id: format!("mock-conversation-{}", conversations.len() + 1),
            participants: Observers::new(),
            added: Mutex::new(Vec::new()),
            polls: Arc::new(Mutex::new(HashMap::new())),
            messaging: Arc::new(MockMessaging {
                can_send: script.can_send,
                send: script.send.clone(),
                sent: Mutex::new(Vec::new()),
            }),
            script,
        });
        conversations.push(Arc::clone(&conversation));
        drop(conversations);

        let announced: Arc<dyn Conversation> = conversation;
        self.conversation_observers.emit(|| Arc::clone(&announced));
        Ok(announced)
    }
}

/// Mock conversation. Announces the signed-in user before the first added
/// participant.
pub struct MockConversation {
    id: String,
    participants: Observers<Arc<dyn Participant>>,
    added: Mutex<Vec<String>>,
    polls: Arc<Mutex<HashMap<String, usize>>>,
    messaging: Arc<MockMessaging>,
    script: ConversationScript,
}

impl Conversation for MockConversation {
    fn id(&self) -> &str {
        &self.id
    }

    fn subscribe_participants(&self) -> EventReceiver<Arc<dyn Participant>> {
        self.participants.subscribe()
    }

    fn add_participant(&self, contact_uri: &str) -> Result<(), GatewayError> {
        let first = {
            let mut added = lock(&self.added);
            added.push(contact_uri.to_string());
            added.len() == 1
        };

        let key = bare(contact_uri);
        if self.script.rejected.contains(&key) {
            return Err(GatewayError::InvalidArgument(format!(
                "contact {contact_uri} cannot be resolved"
            )));
        }
        if self.script.silent_participants {
            return Ok(());
        }

        if first {
            let me: Arc<dyn Participant> = Arc::new(MockParticipant {
                uri: SELF_URI.to_string(),
                key: bare(SELF_URI),
                is_self: true,
                availability: vec![Availability::Free],
                polls: Arc::clone(&self.polls),
            });
            self.participants.emit(|| Arc::clone(&me));
        }

        let participant: Arc<dyn Participant> = Arc::new(MockParticipant {
            uri: contact_uri.to_string(),
            availability: self
                .script
                .availability
                .get(&key)
                .cloned()
                .unwrap_or_else(|| vec![Availability::Free]),
            key,
            is_self: false,
            polls: Arc::clone(&self.polls),
        });
        self.participants.emit(|| Arc::clone(&participant));
        Ok(())
    }

    fn instant_messaging(&self) -> Option<Arc<dyn InstantMessaging>> {
        if !self.script.messaging {
            return None;
        }
        let messaging: Arc<dyn InstantMessaging> = self.messaging.clone();
        Some(messaging)
    }
}

struct MockParticipant {
    uri: String,
    key: String,
    is_self: bool,
    availability: Vec<Availability>,
    polls: Arc<Mutex<HashMap<String, usize>>>,
}

impl Participant for MockParticipant {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn is_self(&self) -> bool {
        self.is_self
    }

    fn availability(&self) -> Availability {
        let mut polls = lock(&self.polls);
        let count = polls.entry(self.key.clone()).or_insert(0);
        let index = (*count).min(self.availability.len().saturating_sub(1));
        *count += 1;
        self.availability
            .get(index)
            .copied()
            .unwrap_or(Availability::Free)
    }
}

struct MockMessaging {
    can_send: bool,
    send: SendBehavior,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl InstantMessaging for MockMessaging {
    fn can_send(&self) -> bool {
        self.can_send
    }

    async fn send_message(&self, text: &str) -> Result<(), GatewayError> {
        lock(&self.sent).push(text.to_string());
        match &self.send {
            SendBehavior::Succeed => Ok(()),
            SendBehavior::Fail(error) => Err(error.clone()),
            SendBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Records process terminations instead of performing them.
#[derive(Default)]
pub struct MockProcessRecovery {
    terminated: Mutex<Vec<String>>,
}

impl MockProcessRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process names passed to `terminate_by_name`, in call order.
    pub fn terminated(&self) -> Vec<String> {
        lock(&self.terminated).clone()
    }

    pub fn kill_count(&self) -> usize {
        lock(&self.terminated).len()
    }
}

impl ProcessRecovery for MockProcessRecovery {
    fn terminate_by_name(&self, name: &str) -> usize {
        lock(&self.terminated).push(name.to_string());
        1
    }
}

/// Scheme-less, lowercased contact.
fn bare(uri: &str) -> String {
    uri.strip_prefix("sip:")
        .unwrap_or(uri)
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_states_apply_per_get_client_call() {
        let gateway = MockGateway::new()
            .with_client_states([ClientState::SigningOut, ClientState::SignedIn]);

        assert_eq!(
            gateway.get_client().await.unwrap().state(),
            ClientState::SigningOut
        );
        assert_eq!(
            gateway.get_client().await.unwrap().state(),
            ClientState::SignedIn
        );
        assert_eq!(
            gateway.get_client().await.unwrap().state(),
            ClientState::SignedIn
        );
        assert_eq!(gateway.get_client_calls(), 3);
    }

    #[tokio::test]
    async fn get_client_error_is_returned() {
        let gateway = MockGateway::new()
            .with_get_client_error(GatewayError::ClientNotFound("no client".into()));
        assert!(matches!(
            gateway.get_client().await,
            Err(GatewayError::ClientNotFound(_))
        ));
    }

    #[tokio::test]
    async fn dropped_subscribers_are_not_counted() {
        let gateway = MockGateway::new();
        let client = gateway.client();
        let kept = client.subscribe();
        drop(client.subscribe());
        assert_eq!(client.subscriber_count(), 1);
        drop(kept);
        assert_eq!(client.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn availability_sequence_repeats_last_value() {
        let gateway = MockGateway::new()
            .with_availability("bob@corp", [Availability::Offline, Availability::Busy]);
        let client = gateway.client();
        let conversation = client.add_conversation().unwrap();
        let mut participants = conversation.subscribe_participants();
        conversation.add_participant("sip:bob@corp").unwrap();

        let me = participants.recv().await.unwrap();
        assert!(me.is_self());
        let bob = participants.recv().await.unwrap();
        assert_eq!(bob.availability(), Availability::Offline);
        assert_eq!(bob.availability(), Availability::Busy);
        assert_eq!(bob.availability(), Availability::Busy);
        assert_eq!(client.availability_polls("bob@corp"), 3);
    }

    #[tokio::test]
    async fn rejected_recipients_fail_to_add() {
        let gateway = MockGateway::new().with_rejected("eve@corp");
        let conversation = gateway.client().add_conversation().unwrap();
        assert!(conversation.add_participant("sip:eve@corp").is_err());
        assert!(conversation.add_participant("sip:bob@corp").is_ok());
    }

    #[test]
    fn process_recovery_records_names() {
        let recovery = MockProcessRecovery::new();
        recovery.terminate_by_name("lync");
        assert_eq!(recovery.terminated(), vec!["lync".to_string()]);
        assert_eq!(recovery.kill_count(), 1);
    }
}
