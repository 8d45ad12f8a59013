// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory calling platform.
//!
//! `MockCall` keeps the calling state and participant list the platform
//! would own, and pushes every change through a broadcast channel so the
//! orchestrator sees the same event flow a real SDK produces.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_core::types::{CallEvent, CallSettings, Participant};
use duet_core::{CallHandle, CallId, CallPlatform, CallingState, DuetError, UserId};
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::lock;

/// A single mock platform session.
pub struct MockCall {
    id: CallId,
    user_id: UserId,
    state: Mutex<CallingState>,
    participants: Mutex<Vec<Participant>>,
    started_at: Mutex<Option<DateTime<Utc>>>,
    events: broadcast::Sender<CallEvent>,
    join_results: Mutex<VecDeque<Result<(), DuetError>>>,
    join_instants: Mutex<Vec<Instant>>,
    created_with: Mutex<Vec<(Vec<UserId>, CallSettings)>>,
    create_failure: Mutex<Option<DuetError>>,
    sent_events: Mutex<Vec<serde_json::Value>>,
    fail_sends: AtomicBool,
    end_calls: AtomicUsize,
    leave_calls: AtomicUsize,
    mic_toggles: AtomicUsize,
    camera_disables: AtomicUsize,
}

impl MockCall {
    pub fn new(id: CallId, user_id: UserId) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            id,
            user_id,
            state: Mutex::new(CallingState::Idle),
            participants: Mutex::new(Vec::new()),
            started_at: Mutex::new(None),
            events,
            join_results: Mutex::new(VecDeque::new()),
            join_instants: Mutex::new(Vec::new()),
            created_with: Mutex::new(Vec::new()),
            create_failure: Mutex::new(None),
            sent_events: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            end_calls: AtomicUsize::new(0),
            leave_calls: AtomicUsize::new(0),
            mic_toggles: AtomicUsize::new(0),
            camera_disables: AtomicUsize::new(0),
        }
    }

    /// Scripts the result of the next `join`. Unscripted joins succeed.
    pub fn push_join(&self, result: Result<(), DuetError>) {
        lock(&self.join_results).push_back(result);
    }

    pub fn fail_create(&self, error: DuetError) {
        *lock(&self.create_failure) = Some(error);
    }

    /// Makes every `send_custom_event` fail.
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Advances the calling state and notifies subscribers.
    pub fn set_calling_state(&self, state: CallingState) {
        *lock(&self.state) = state;
        let _ = self.events.send(CallEvent::CallingState(state));
    }

    /// Replaces the participant list and notifies subscribers.
    pub fn set_participants(&self, participants: Vec<Participant>) {
        *lock(&self.participants) = participants.clone();
        let _ = self.events.send(CallEvent::Participants(participants));
    }

    /// Self plus `peer` are present.
    pub fn peer_joins(&self, peer: &str) {
        self.set_participants(vec![
            Participant::new(self.user_id.0.clone()),
            Participant::new(peer),
        ]);
    }

    /// Only self remains.
    pub fn peer_leaves(&self) {
        self.set_participants(vec![Participant::new(self.user_id.0.clone())]);
    }

    /// Relays a custom message as if another member sent it.
    pub fn deliver_custom(&self, payload: serde_json::Value) {
        let _ = self.events.send(CallEvent::Custom(payload));
    }

    pub fn join_count(&self) -> usize {
        lock(&self.join_instants).len()
    }

    pub fn join_instants(&self) -> Vec<Instant> {
        lock(&self.join_instants).clone()
    }

    pub fn created_with(&self) -> Vec<(Vec<UserId>, CallSettings)> {
        lock(&self.created_with).clone()
    }

    pub fn sent_events(&self) -> Vec<serde_json::Value> {
        lock(&self.sent_events).clone()
    }

    pub fn end_call_count(&self) -> usize {
        self.end_calls.load(Ordering::SeqCst)
    }

    pub fn leave_count(&self) -> usize {
        self.leave_calls.load(Ordering::SeqCst)
    }

    pub fn mic_toggle_count(&self) -> usize {
        self.mic_toggles.load(Ordering::SeqCst)
    }

    pub fn camera_disable_count(&self) -> usize {
        self.camera_disables.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl CallHandle for MockCall {
    fn id(&self) -> &CallId {
        &self.id
    }

    fn current_user_id(&self) -> &UserId {
        &self.user_id
    }

    fn calling_state(&self) -> CallingState {
        *lock(&self.state)
    }

    fn participants(&self) -> Vec<Participant> {
        lock(&self.participants).clone()
    }

    fn session_started_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.started_at)
    }

    fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    async fn get_or_create(
        &self,
        members: &[UserId],
        settings: &CallSettings,
    ) -> Result<(), DuetError> {
        if let Some(error) = lock(&self.create_failure).take() {
            return Err(error);
        }
        lock(&self.created_with).push((members.to_vec(), settings.clone()));
        Ok(())
    }

    async fn join(&self, _create: bool) -> Result<(), DuetError> {
        lock(&self.join_instants).push(Instant::now());
        let result = lock(&self.join_results).pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            *lock(&self.started_at) = Some(Utc::now());
            *lock(&self.participants) = vec![Participant::new(self.user_id.0.clone())];
            self.set_calling_state(CallingState::Joined);
        }
        result
    }

    async fn leave(&self) -> Result<(), DuetError> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);
        self.set_calling_state(CallingState::Left);
        Ok(())
    }

    async fn end_call(&self) -> Result<(), DuetError> {
        self.end_calls.fetch_add(1, Ordering::SeqCst);
        self.set_calling_state(CallingState::Left);
        Ok(())
    }

    async fn toggle_microphone(&self) -> Result<(), DuetError> {
        self.mic_toggles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disable_camera(&self) -> Result<(), DuetError> {
        self.camera_disables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_custom_event(&self, payload: serde_json::Value) -> Result<(), DuetError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(DuetError::platform(
                duet_core::PlatformErrorKind::Transport,
                "custom event channel closed",
            ));
        }
        lock(&self.sent_events).push(payload);
        Ok(())
    }
}

/// A platform handing out one [`MockCall`] per call id.
pub struct MockPlatform {
    user_id: UserId,
    calls: Mutex<HashMap<CallId, Arc<MockCall>>>,
}

impl MockPlatform {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: UserId::from(user_id),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// The mock session for `call_id`, created on first use.
    ///
    /// Tests call this before the orchestrator does to script the session.
    pub fn mock_call(&self, call_id: &str) -> Arc<MockCall> {
        let id = CallId::from(call_id);
        Arc::clone(
            lock(&self.calls)
                .entry(id.clone())
                .or_insert_with(|| Arc::new(MockCall::new(id, self.user_id.clone()))),
        )
    }
}

impl CallPlatform for MockPlatform {
    fn call(&self, call_id: &CallId) -> Arc<dyn CallHandle> {
        self.mock_call(&call_id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_advances_state_and_notifies() {
        let platform = MockPlatform::new("me");
        let call = platform.mock_call("c1");
        let mut events = call.subscribe();

        call.join(false).await.unwrap();

        assert_eq!(call.calling_state(), CallingState::Joined);
        assert!(call.session_started_at().is_some());
        assert!(matches!(
            events.recv().await.unwrap(),
            CallEvent::CallingState(CallingState::Joined)
        ));
    }

    #[tokio::test]
    async fn scripted_join_failure_leaves_state_untouched() {
        let platform = MockPlatform::new("me");
        let call = platform.mock_call("c1");
        call.push_join(Err(DuetError::platform(
            duet_core::PlatformErrorKind::Transport,
            "ws failed",
        )));

        assert!(call.join(false).await.is_err());
        assert_eq!(call.calling_state(), CallingState::Idle);
        assert_eq!(call.join_count(), 1);
    }

    #[test]
    fn same_id_yields_same_session() {
        let platform = MockPlatform::new("me");
        let a = platform.mock_call("c1");
        let b = platform.call(&CallId::from("c1"));
        a.set_calling_state(CallingState::Ringing);
        assert_eq!(b.calling_state(), CallingState::Ringing);
    }
}
