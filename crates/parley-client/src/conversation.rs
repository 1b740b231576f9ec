// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration: admission, then send.
//!
//! Admission runs on its own task, which owns the [`AdmissionLedger`] and
//! hands it back through a one-shot channel only once admission is
//! complete. The caller bounds that hand-over with the admission budget.
//! The task is aborted on every exit path, which drops its conversation and
//! participant subscriptions along with any in-flight availability polls.

use std::sync::Arc;
use std::time::Duration;

use parley_config::model::DeliveryConfig;
use parley_core::{Conversation, EventReceiver, Participant, PlatformClient, Status};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::admission::{AdmissionLedger, contact_uri};
use crate::status::{DeliveryFacts, delivery_status};

/// A message and the recipients it is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub message: String,
    pub recipients: Vec<String>,
}

impl DeliveryRequest {
    pub fn new<I, S>(message: impl Into<String>, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of one delivery.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub facts: DeliveryFacts,
    /// Final admission records. Recipients stay pending if admission timed out.
    pub ledger: AdmissionLedger,
    /// Whether a send was issued to the platform.
    pub send_invoked: bool,
}

impl DeliveryReport {
    fn new(ledger: AdmissionLedger) -> Self {
        Self {
            facts: DeliveryFacts::default(),
            ledger,
            send_invoked: false,
        }
    }

    pub fn status(&self) -> Status {
        delivery_status(&self.facts)
    }
}

/// Admission result handed back by the admission task.
struct Admitted {
    conversation: Arc<dyn Conversation>,
    ledger: AdmissionLedger,
}

/// Drives one conversation per delivery.
pub struct ConversationOrchestrator {
    client: Arc<dyn PlatformClient>,
    config: DeliveryConfig,
}

impl ConversationOrchestrator {
    pub fn new(client: Arc<dyn PlatformClient>, config: DeliveryConfig) -> Self {
        Self { client, config }
    }

    /// Delivers `request.message` to its recipients.
    ///
    /// Never fails: every platform error and timeout is folded into the
    /// report's facts.
    pub async fn send(&self, request: &DeliveryRequest) -> DeliveryReport {
        let ledger = AdmissionLedger::new(request.recipients.iter().map(String::as_str));
        let mut report = DeliveryReport::new(ledger);

        if report.ledger.is_empty() {
            warn!("delivery requested without recipients, nothing to send");
            return report;
        }

        // Register before requesting so the announcement cannot be missed.
        let conversations = self.client.subscribe_conversations();
        match self.client.add_conversation() {
            Ok(conversation) => debug!(conversation = conversation.id(), "conversation requested"),
            Err(err) => {
                warn!(error = %err, "conversation could not be created");
                report.facts.conversation_failure = Some(err.to_string());
                return report;
            }
        }

        // Transition: Admission
        let (done_tx, done_rx) = oneshot::channel();
        let admission = AdmissionTask(tokio::spawn(run_admission(
            conversations,
            report.ledger.clone(),
            self.config.clone(),
            done_tx,
        )));
        let admitted = tokio::time::timeout(self.config.admission_timeout(), done_rx).await;
        drop(admission);

        let Admitted {
            conversation,
            ledger,
        } = match admitted {
            Ok(Ok(admitted)) => admitted,
            Ok(Err(_)) => {
                warn!("admission ended before every recipient was accounted for");
                report.facts.admission_timed_out = true;
                return report;
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.admission_timeout_secs,
                    "participants were not admitted in time"
                );
                report.facts.admission_timed_out = true;
                return report;
            }
        };

        info!(%ledger, "admission complete");
        report.facts.unauthorized = ledger.unauthorized();
        report.facts.all_offline = ledger.all_offline();
        let buildable = ledger.is_buildable();
        report.ledger = ledger;

        if report.facts.all_offline {
            info!("every recipient is offline, message not sent");
            return report;
        }
        if !buildable {
            return report;
        }

        // Transition: Admission -> Send
        let Some(messaging) = conversation.instant_messaging() else {
            debug!("conversation has no instant-messaging modality, skipping send");
            return report;
        };
        if !messaging.can_send() {
            debug!("instant messaging cannot send right now, skipping send");
            return report;
        }

        report.send_invoked = true;
        let sent = tokio::time::timeout(
            self.config.send_timeout(),
            messaging.send_message(&request.message),
        )
        .await;

        match sent {
            Ok(Ok(())) => {
                info!(conversation = conversation.id(), "message sent");
                tokio::time::sleep(self.config.settle_delay()).await;
            }
            Ok(Err(err)) => warn!(error = %err, "message send failed"),
            Err(_) => {
                warn!(
                    timeout_secs = self.config.send_timeout_secs,
                    "message send did not complete in time"
                );
                report.facts.send_timed_out = true;
            }
        }

        report
    }
}

/// Aborts the admission task when dropped.
struct AdmissionTask(JoinHandle<()>);

impl Drop for AdmissionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_admission(
    mut conversations: EventReceiver<Arc<dyn Conversation>>,
    mut ledger: AdmissionLedger,
    config: DeliveryConfig,
    done: oneshot::Sender<Admitted>,
) {
    let Some(conversation) = conversations.recv().await else {
        debug!("conversation stream closed before a conversation was added");
        return;
    };
    drop(conversations);
    debug!(conversation = conversation.id(), "conversation added");

    let mut participants = conversation.subscribe_participants();
    let recipients: Vec<String> = ledger.recipients().map(str::to_owned).collect();
    for recipient in recipients {
        let uri = contact_uri(&config.contact_scheme, &recipient);
        match conversation.add_participant(&uri) {
            Ok(()) => debug!(%recipient, "participant add requested"),
            Err(err) => {
                warn!(%recipient, error = %err, "recipient could not be added");
                ledger.reject(&recipient);
            }
        }
    }

    let interval = config.poll_interval();
    let mut polls = JoinSet::new();

    while !ledger.is_complete() {
        tokio::select! {
            Some(participant) = participants.recv() => {
                if !participant.is_self() {
                    if let Some(recipient) = ledger.begin_polling(participant.uri()) {
                        polls.spawn(poll_availability(
                            participant,
                            recipient,
                            config.availability_polls,
                            interval,
                        ));
                    } else if !ledger.matches(participant.uri()) {
                        debug!(uri = participant.uri(), "participant does not match any recipient");
                    }
                }
            }
            Some(joined) = polls.join_next() => match joined {
                Ok((recipient, online)) => ledger.resolve(&recipient, online),
                Err(err) => warn!(error = %err, "availability poll ended abnormally"),
            },
            else => {
                debug!("participant stream closed before admission completed");
                return;
            }
        }
    }

    // Receiver may be gone if the caller already gave up.
    let _ = done.send(Admitted {
        conversation,
        ledger,
    });
}

/// Checks availability, allowing `polls` misses with `interval` after each.
///
/// A final reading after the last wait decides the outcome, so a recipient
/// who comes online during that wait still counts as online.
async fn poll_availability(
    participant: Arc<dyn Participant>,
    recipient: String,
    polls: u32,
    interval: Duration,
) -> (String, bool) {
    for attempt in 1..=polls {
        let availability = participant.availability();
        if availability.is_reachable() {
            debug!(%recipient, attempt, %availability, "recipient available");
            return (recipient, true);
        }
        debug!(%recipient, attempt, %availability, "recipient not available yet");
        tokio::time::sleep(interval).await;
    }

    let availability = participant.availability();
    if availability.is_reachable() {
        debug!(%recipient, %availability, "recipient available after last wait");
        return (recipient, true);
    }
    info!(%recipient, polls, %availability, "recipient offline");
    (recipient, false)
}
