// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the orchestrator.
//!
//! Backend traits and the calling-platform traits use `#[async_trait]` so
//! they can be held as trait objects inside the session context.

pub mod account;
pub mod backend;
pub mod matchmaking;
pub mod moderation;
pub mod notifier;
pub mod platform;

pub use account::AccountApi;
pub use backend::BackendApi;
pub use matchmaking::MatchmakingApi;
pub use moderation::ModerationApi;
pub use notifier::Notifier;
pub use platform::{CallHandle, CallPlatform};
