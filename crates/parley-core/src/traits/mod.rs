// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator boundaries of the driver.
//!
//! The presence/IM platform is reached through [`PlatformGateway`] and the
//! objects it hands out. Process recovery sits behind [`ProcessRecovery`].
//! Async operations use `#[async_trait]` for dynamic dispatch compatibility.

pub mod conversation;
pub mod gateway;
pub mod process;

pub use conversation::{Conversation, InstantMessaging, Participant};
pub use gateway::{PlatformClient, PlatformGateway};
pub use process::ProcessRecovery;
