// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Calling-platform SDK seam.
//!
//! The platform owns the media transport and the session's calling state.
//! The orchestrator only reads that state and reacts to pushed events.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::DuetError;
use crate::types::{CallEvent, CallId, CallSettings, CallingState, Participant, UserId};

/// A handle to one platform session.
#[async_trait]
pub trait CallHandle: Send + Sync + 'static {
    /// The platform-side call identifier.
    fn id(&self) -> &CallId;

    /// The user this client is signed in as on the platform.
    fn current_user_id(&self) -> &UserId;

    /// Current calling state, as advanced by the platform.
    fn calling_state(&self) -> CallingState;

    /// Members currently present in the session.
    fn participants(&self) -> Vec<Participant>;

    /// When the platform considers the session to have started.
    fn session_started_at(&self) -> Option<DateTime<Utc>>;

    /// Subscribes to state, membership and custom-message events.
    fn subscribe(&self) -> broadcast::Receiver<CallEvent>;

    /// Creates the session if it does not exist yet, with the given members.
    async fn get_or_create(
        &self,
        members: &[UserId],
        settings: &CallSettings,
    ) -> Result<(), DuetError>;

    /// Joins the session. `create: false` joins an existing session only.
    async fn join(&self, create: bool) -> Result<(), DuetError>;

    /// Leaves the session without ending it for the other members.
    async fn leave(&self) -> Result<(), DuetError>;

    /// Ends the session for every member.
    async fn end_call(&self) -> Result<(), DuetError>;

    async fn toggle_microphone(&self) -> Result<(), DuetError>;

    async fn disable_camera(&self) -> Result<(), DuetError>;

    /// Broadcasts an opaque payload to the other members. Best-effort, unacknowledged.
    async fn send_custom_event(&self, payload: serde_json::Value) -> Result<(), DuetError>;
}

/// Factory for session handles.
pub trait CallPlatform: Send + Sync + 'static {
    /// Returns the handle for `call_id`. Does not contact the platform.
    fn call(&self, call_id: &CallId) -> Arc<dyn CallHandle>;
}
