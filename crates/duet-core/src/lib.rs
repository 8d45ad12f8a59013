// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Duet call orchestrator.
//!
//! This crate provides the error type, the domain types, and the collaborator
//! traits (backend endpoints, calling platform, notice sink) that the session
//! orchestrator is written against. Concrete implementations live in
//! `duet-backend` and in the embedding application.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DuetError, PlatformErrorKind};
pub use types::{CallId, CallingState, Match, Notice, UserId};

pub use traits::{
    AccountApi, BackendApi, CallHandle, CallPlatform, MatchmakingApi, ModerationApi, Notifier,
};
