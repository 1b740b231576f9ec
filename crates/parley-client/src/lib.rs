// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sign-in and delivery driver for the Parley platform client.
//!
//! A [`Session`] is the entry point. It:
//! - Holds the session slot so one session drives the platform at a time
//! - Resolves a usable client handle, killing a native process stuck signing out
//! - Runs the sign-in state machine to a bounded, terminal outcome
//! - Delivers messages with per-recipient admission and availability polling
//! - Reports every outcome as an Up/Down [`Status`](parley_core::Status)

pub mod acquire;
pub mod admission;
pub mod conversation;
pub mod loopback;
pub mod recovery;
pub mod session;
pub mod signal;
pub mod signin;
pub mod status;

pub use acquire::ClientAcquirer;
pub use admission::{Admission, AdmissionLedger, AdmissionState};
pub use conversation::{ConversationOrchestrator, DeliveryReport, DeliveryRequest};
pub use loopback::{LoopbackClient, LoopbackGateway};
pub use recovery::SystemProcessRecovery;
pub use session::{Session, SessionSlot};
pub use signal::CompletionSignal;
pub use signin::{Credentials, SignInController};
pub use status::{DeliveryFacts, SignInFacts, delivery_status, sign_in_status};
