// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sign-in state machine.
//!
//! The controller issues the action matching the client's current state,
//! then waits on a single completion signal for a bounded time. Client
//! events are handled on a dedicated event-pump task:
//!
//! - `Initializing -> SignedOut`: sign in (the platform just finished initializing).
//! - `SigningOut -> SignedOut` in suppressed mode: forget cached credentials.
//! - `ShuttingDown -> Uninitialized`: detach from the client.
//! - auto-discovery credential request: sign out and sign in again, until the
//!   retry budget is exhausted, then sign out and release the waiter.
//! - any other credential request: answer with the stored credentials.
//! - sign-in delayed: sign out early rather than wait on it.
//!
//! Operations the controller starts are tracked and aborted when it is dropped.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use parley_config::model::SignInConfig;
use parley_core::{
    ClientEvent, ClientState, CredentialRequest, CredentialRequestKind, EventReceiver,
    PlatformClient,
};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::signal::CompletionSignal;
use crate::status::SignInFacts;

/// Sign-in credentials. The password is never logged.
#[derive(Debug)]
pub struct Credentials {
    pub address: String,
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password,
        }
    }
}

/// Drives a platform client to a terminal sign-in outcome.
pub struct SignInController {
    shared: Arc<Shared>,
    config: SignInConfig,
    _pump: EventPump,
}

impl SignInController {
    /// Registers for client events and starts the event pump.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(client: Arc<dyn PlatformClient>, config: SignInConfig) -> Self {
        let events = client.subscribe();
        let shared = Arc::new(Shared {
            client,
            credentials: RwLock::new(None),
            retries: AtomicU32::new(0),
            max_retries: config.max_credential_retries,
            bad_address: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
            initialized_platform: AtomicBool::new(false),
            completion: CompletionSignal::new(),
            operations: Mutex::new(JoinSet::new()),
        });
        let pump = EventPump(tokio::spawn(run_event_pump(Arc::clone(&shared), events)));

        Self {
            shared,
            config,
            _pump: pump,
        }
    }

    /// Runs the sign-in sequence until it settles or the budget expires.
    ///
    /// Never retries after the budget expires; the timeout flag is set instead.
    pub async fn sign_in(&self, credentials: Credentials) {
        let deadline = Instant::now() + self.config.timeout();
        let shared = &self.shared;

        *shared
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(credentials));
        shared.completion.reset();

        let state = shared.client.state();
        info!(%state, "starting sign-in");

        match state {
            ClientState::Uninitialized => {
                // Suppressed UI: the client must be initialized first. The
                // Initializing -> SignedOut transition triggers the sign-in.
                let task = Arc::clone(shared);
                shared.spawn(async move { task.initialize().await });
            }
            ClientState::SignedOut => shared.begin_sign_in(),
            ClientState::SigningIn | ClientState::SignedIn => {
                if !self.sign_out_within(self.config.timeout()).await {
                    shared.timed_out.store(true, Ordering::SeqCst);
                    warn!("sign-out before sign-in did not complete in time");
                    return;
                }
                shared.begin_sign_in();
            }
            other => debug!(state = %other, "no sign-in action for state, waiting for events"),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if !shared.completion.wait(remaining).await {
            shared.timed_out.store(true, Ordering::SeqCst);
            warn!(
                timeout_secs = self.config.timeout_secs,
                "sign-in did not complete in time"
            );
        }
    }

    /// Signs out if signed in or signing in, then forgets cached credentials
    /// once the client reports `SignedOut`.
    ///
    /// Returns `false` if the sign-out did not complete within the sign-in budget.
    pub async fn sign_out(&self) -> bool {
        self.sign_out_within(self.config.timeout()).await
    }

    async fn sign_out_within(&self, limit: Duration) -> bool {
        let client = &self.shared.client;

        if matches!(client.state(), ClientState::SignedIn | ClientState::SigningIn) {
            match tokio::time::timeout(limit, client.sign_out()).await {
                Ok(Ok(())) => debug!("signed out"),
                Ok(Err(err)) => warn!(error = %err, "sign-out failed"),
                Err(_) => return false,
            }
        }

        if client.state() == ClientState::SignedOut {
            self.shared.forget_credentials();
        }
        true
    }

    /// Auto-discovery credential requests seen so far.
    pub fn retries(&self) -> u32 {
        self.shared.retries.load(Ordering::SeqCst)
    }

    pub fn timed_out(&self) -> bool {
        self.shared.timed_out.load(Ordering::SeqCst)
    }

    pub fn bad_address(&self) -> bool {
        self.shared.bad_address.load(Ordering::SeqCst)
    }

    /// Whether this session, rather than a previous one, initialized the platform.
    pub fn initialized_platform(&self) -> bool {
        self.shared.initialized_platform.load(Ordering::SeqCst)
    }

    /// Snapshot of the flags the status reporter needs.
    pub fn facts(&self) -> SignInFacts {
        SignInFacts {
            address: self
                .shared
                .credentials()
                .map(|c| c.address.clone())
                .unwrap_or_default(),
            timed_out: self.timed_out(),
            init_failure: None,
            bad_address: self.bad_address(),
            retries_exhausted: self.shared.retries_exhausted(),
        }
    }
}

impl Drop for SignInController {
    fn drop(&mut self) {
        self.shared
            .operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}

/// Aborts the event pump on drop, which drops the event receiver and so
/// deregisters from the client.
struct EventPump(JoinHandle<()>);

impl Drop for EventPump {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// State shared between the caller, the event pump, and spawned operations.
struct Shared {
    client: Arc<dyn PlatformClient>,
    credentials: RwLock<Option<Arc<Credentials>>>,
    retries: AtomicU32,
    max_retries: u32,
    bad_address: AtomicBool,
    timed_out: AtomicBool,
    initialized_platform: AtomicBool,
    completion: CompletionSignal,
    operations: Mutex<JoinSet<()>>,
}

impl Shared {
    fn credentials(&self) -> Option<Arc<Credentials>> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn retries_exhausted(&self) -> bool {
        self.retries.load(Ordering::SeqCst) >= self.max_retries
    }

    /// A new sign-in may start only before a timeout and while retries remain.
    fn may_sign_in(&self) -> bool {
        !self.timed_out.load(Ordering::SeqCst) && !self.retries_exhausted()
    }

    /// Counts an auto-discovery request, saturating at the budget.
    fn record_retry(&self) -> u32 {
        let max = self.max_retries;
        match self
            .retries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| {
                (r < max).then_some(r + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => current,
        }
    }

    fn spawn<F>(&self, operation: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut operations = self
            .operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while operations.try_join_next().is_some() {}
        operations.spawn(operation);
    }

    async fn initialize(&self) {
        match self.client.initialize().await {
            Ok(()) => {
                self.initialized_platform.store(true, Ordering::SeqCst);
                info!("platform initialized by this session");
            }
            Err(err) => warn!(error = %err, "platform initialization failed"),
        }
    }

    fn begin_sign_in(self: &Arc<Self>) {
        let shared = Arc::clone(self);
        self.spawn(async move { shared.sign_in_once().await });
    }

    /// One sign-in request. Success or a communication failure releases the
    /// waiter; other failures are left to the timeout.
    async fn sign_in_once(&self) {
        if !self.may_sign_in() {
            debug!("sign-in skipped, sequence already settled");
            return;
        }
        let Some(credentials) = self.credentials() else {
            debug!("sign-in skipped, no credentials supplied yet");
            return;
        };

        let result = self
            .client
            .sign_in(
                &credentials.address,
                &credentials.username,
                &credentials.password,
            )
            .await;

        match result {
            Ok(()) => {
                info!(address = %credentials.address, "signed in");
                self.completion.set();
            }
            Err(err) if err.is_communication_failure() => {
                warn!(
                    address = %credentials.address,
                    error = %err,
                    "sign-in address looks invalid"
                );
                self.bad_address.store(true, Ordering::SeqCst);
                self.completion.set();
            }
            Err(err) => warn!(error = %err, "sign-in attempt failed"),
        }
    }

    async fn sign_out_quietly(&self) -> bool {
        match self.client.sign_out().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "sign-out failed");
                false
            }
        }
    }

    fn forget_credentials(&self) {
        let Some(credentials) = self.credentials() else {
            return;
        };
        if let Err(err) = self.client.forget_credentials(&credentials.address) {
            warn!(error = %err, "failed to forget cached credentials");
        } else {
            debug!(address = %credentials.address, "forgot cached credentials");
        }
    }

    fn on_state_changed(self: &Arc<Self>, old: ClientState, new: ClientState) -> ControlFlow<()> {
        match (old, new) {
            (ClientState::Initializing, ClientState::SignedOut) => self.begin_sign_in(),
            (ClientState::SigningOut, ClientState::SignedOut) => {
                if self.client.in_suppressed_mode() {
                    self.forget_credentials();
                }
            }
            (ClientState::ShuttingDown, ClientState::Uninitialized) => {
                return ControlFlow::Break(());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn on_sign_in_delayed(self: &Arc<Self>) {
        info!("sign-in delayed by the platform, signing out");
        let shared = Arc::clone(self);
        self.spawn(async move {
            shared.sign_out_quietly().await;
        });
    }

    fn on_credential_requested(self: &Arc<Self>, request: CredentialRequest) {
        if request.kind() != CredentialRequestKind::AutoDiscovery {
            self.submit_credentials(request);
            return;
        }

        let retries = self.record_retry();
        let shared = Arc::clone(self);

        if retries < self.max_retries {
            info!(retries, max = self.max_retries, "server asked for credentials again, retrying sign-in");
            self.spawn(async move {
                if shared.sign_out_quietly().await {
                    shared.sign_in_once().await;
                }
            });
        } else {
            warn!(retries, "credential retry budget exhausted, aborting sign-in");
            self.spawn(async move {
                shared.sign_out_quietly().await;
                shared.completion.set();
            });
        }
    }

    fn submit_credentials(&self, request: CredentialRequest) {
        let kind = request.kind();
        let Some(credentials) = self.credentials() else {
            warn!(%kind, "credentials requested before any were supplied");
            return;
        };
        let password = SecretString::from(credentials.password.expose_secret().to_owned());
        if request.submit(credentials.username.clone(), password, false) {
            debug!(%kind, "submitted stored credentials");
        } else {
            debug!(%kind, "platform stopped waiting for credentials");
        }
    }
}

async fn run_event_pump(shared: Arc<Shared>, mut events: EventReceiver<ClientEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::StateChanged { old, new } => {
                debug!(%old, %new, "client state changed");
                if shared.on_state_changed(old, new).is_break() {
                    info!("platform shut down, detaching from client events");
                    break;
                }
            }
            ClientEvent::SignInDelayed => shared.on_sign_in_delayed(),
            ClientEvent::CredentialRequested(request) => shared.on_credential_requested(request),
        }
    }
}
