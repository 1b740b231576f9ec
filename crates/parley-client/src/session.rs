// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller-facing session over one platform client handle.
//!
//! A session holds the session slot for its whole lifetime, so at most one
//! session per slot drives the platform at a time. Lifecycle:
//! Open (slot acquired, handle resolved) -> SignIn -> Send* -> Dropped
//! (subscriptions detached, in-flight operations aborted, slot released).

use std::sync::{Arc, LazyLock};

use parley_config::ParleyConfig;
use parley_core::{Failure, PlatformClient, PlatformGateway, ProcessRecovery, Status};
use secrecy::SecretString;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::acquire::ClientAcquirer;
use crate::conversation::{ConversationOrchestrator, DeliveryReport, DeliveryRequest};
use crate::signin::{Credentials, SignInController};
use crate::status::{SignInFacts, sign_in_status};

static GLOBAL_SLOT: LazyLock<SessionSlot> = LazyLock::new(SessionSlot::new);

/// Serializes sessions that share one platform client identity.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot {
    lock: Arc<Mutex<()>>,
}

impl SessionSlot {
    /// An isolated slot, independent of [`SessionSlot::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide slot.
    pub fn global() -> Self {
        GLOBAL_SLOT.clone()
    }

    /// Waits for the slot. Not time-bounded.
    pub async fn acquire(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.lock).lock_owned().await
    }

    /// Whether a session currently holds the slot.
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// One sign-in and any number of deliveries over a single client handle.
pub struct Session {
    address: String,
    init_failure: Option<Failure>,
    client: Option<Arc<dyn PlatformClient>>,
    controller: Option<SignInController>,
    orchestrator: Option<ConversationOrchestrator>,
    last_delivery: Option<DeliveryReport>,
    // Declared last: released only after the controller has detached.
    _slot: OwnedMutexGuard<()>,
}

impl Session {
    /// Acquires `slot`, then resolves a usable client handle.
    ///
    /// Never fails: an unusable platform is recorded and reported by
    /// [`Session::sign_in_status`].
    pub async fn open(
        slot: &SessionSlot,
        gateway: Arc<dyn PlatformGateway>,
        recovery: Arc<dyn ProcessRecovery>,
        config: &ParleyConfig,
    ) -> Self {
        let guard = slot.acquire().await;
        debug!("session slot acquired");

        let acquirer = ClientAcquirer::new(
            gateway,
            recovery,
            config.platform.process_name.clone(),
            config.acquire.clone(),
        );

        let (client, init_failure) = match acquirer.acquire().await {
            Ok(client) => (Some(client), None),
            Err(failure) => {
                warn!(%failure, "platform client unavailable");
                (None, Some(failure))
            }
        };

        let controller = client
            .as_ref()
            .map(|c| SignInController::new(Arc::clone(c), config.sign_in.clone()));
        let orchestrator = client
            .as_ref()
            .map(|c| ConversationOrchestrator::new(Arc::clone(c), config.delivery.clone()));

        Self {
            address: String::new(),
            init_failure,
            client,
            controller,
            orchestrator,
            last_delivery: None,
            _slot: guard,
        }
    }

    /// Signs in and returns the resulting sign-in status.
    pub async fn sign_in(
        &mut self,
        address: &str,
        username: &str,
        password: SecretString,
    ) -> Status {
        self.address = address.to_string();

        if let Some(controller) = &self.controller {
            info!(address, username, "signing in");
            controller
                .sign_in(Credentials::new(address, username, password))
                .await;
        }

        self.sign_in_status()
    }

    /// Status of the last sign-in. Repeated calls return the same status.
    pub fn sign_in_status(&self) -> Status {
        let mut facts = self
            .controller
            .as_ref()
            .map(SignInController::facts)
            .unwrap_or_default();
        if facts.address.is_empty() {
            facts.address.clone_from(&self.address);
        }
        facts.init_failure.clone_from(&self.init_failure);
        sign_in_status(&facts)
    }

    /// Delivers `message` to `recipients` and returns the delivery status.
    pub async fn send_message<I, S>(&mut self, message: &str, recipients: I) -> Status
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(orchestrator) = &self.orchestrator else {
            return self.delivery_status();
        };

        let request = DeliveryRequest::new(message, recipients);
        info!(recipients = request.recipients.len(), "sending message");
        let report = orchestrator.send(&request).await;
        let status = report.status();
        self.last_delivery = Some(report);
        status
    }

    /// Status of the last delivery, or Up if nothing was sent yet.
    pub fn delivery_status(&self) -> Status {
        if let Some(failure) = &self.init_failure {
            return Status::down(failure.clone());
        }
        self.last_delivery
            .as_ref()
            .map(DeliveryReport::status)
            .unwrap_or_else(Status::up)
    }

    pub fn last_delivery(&self) -> Option<&DeliveryReport> {
        self.last_delivery.as_ref()
    }

    /// Signs out and forgets cached credentials.
    ///
    /// Returns `false` if there is no client or the sign-out timed out.
    pub async fn sign_out(&self) -> bool {
        match &self.controller {
            Some(controller) => controller.sign_out().await,
            None => false,
        }
    }

    /// Sign-in flags gathered so far.
    pub fn sign_in_facts(&self) -> SignInFacts {
        self.controller
            .as_ref()
            .map(SignInController::facts)
            .unwrap_or_default()
    }

    /// Auto-discovery credential requests seen during sign-in.
    pub fn credential_retries(&self) -> u32 {
        self.controller
            .as_ref()
            .map_or(0, SignInController::retries)
    }

    /// Whether this session initialized the platform itself.
    pub fn initialized_platform(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(SignInController::initialized_platform)
    }

    pub fn client(&self) -> Option<&Arc<dyn PlatformClient>> {
        self.client.as_ref()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("session closed, releasing slot");
    }
}
