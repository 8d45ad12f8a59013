// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted backend for deterministic orchestrator tests.
//!
//! Each endpoint pops its next result from a FIFO queue. When a queue is
//! empty the endpoint returns a benign default (`waiting`, success, the
//! last known profile or moderation status).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use duet_core::types::{JoinOutcome, ModerationStatus, PollOutcome, UserProfile};
use duet_core::{AccountApi, DuetError, MatchmakingApi, ModerationApi, UserId};
use tokio::time::Instant;

use crate::lock;

/// A backend whose responses are pre-configured by the test.
pub struct MockBackend {
    join_results: Mutex<VecDeque<Result<JoinOutcome, DuetError>>>,
    poll_results: Mutex<VecDeque<Result<PollOutcome, DuetError>>>,
    poll_instants: Mutex<Vec<Instant>>,
    leave_calls: AtomicUsize,
    profile: Mutex<UserProfile>,
    current_user_calls: AtomicUsize,
    decrease_results: Mutex<VecDeque<Result<(), DuetError>>>,
    decrease_calls: Mutex<Vec<u32>>,
    ban_statuses: Mutex<VecDeque<ModerationStatus>>,
    last_ban_status: Mutex<ModerationStatus>,
    ban_status_calls: AtomicUsize,
    report_results: Mutex<VecDeque<Result<(), DuetError>>>,
    reports: Mutex<Vec<(UserId, String)>>,
}

impl MockBackend {
    /// A backend for `user_id` holding `stars` stars, with a clean moderation record.
    pub fn new(user_id: &str, stars: u32) -> Self {
        Self {
            join_results: Mutex::new(VecDeque::new()),
            poll_results: Mutex::new(VecDeque::new()),
            poll_instants: Mutex::new(Vec::new()),
            leave_calls: AtomicUsize::new(0),
            profile: Mutex::new(UserProfile {
                id: UserId::from(user_id),
                name: user_id.to_string(),
                stars,
            }),
            current_user_calls: AtomicUsize::new(0),
            decrease_results: Mutex::new(VecDeque::new()),
            decrease_calls: Mutex::new(Vec::new()),
            ban_statuses: Mutex::new(VecDeque::new()),
            last_ban_status: Mutex::new(clean_record()),
            ban_status_calls: AtomicUsize::new(0),
            report_results: Mutex::new(VecDeque::new()),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn push_join(&self, result: Result<JoinOutcome, DuetError>) {
        lock(&self.join_results).push_back(result);
    }

    pub fn push_poll(&self, result: Result<PollOutcome, DuetError>) {
        lock(&self.poll_results).push_back(result);
    }

    /// Queues `count` consecutive `waiting` poll responses.
    pub fn push_waiting_polls(&self, count: usize) {
        let mut polls = lock(&self.poll_results);
        for _ in 0..count {
            polls.push_back(Ok(PollOutcome::Waiting));
        }
    }

    pub fn push_decrease(&self, result: Result<(), DuetError>) {
        lock(&self.decrease_results).push_back(result);
    }

    /// Queues a moderation status. The last one served stays sticky.
    pub fn push_ban_status(&self, status: ModerationStatus) {
        lock(&self.ban_statuses).push_back(status);
    }

    pub fn push_report(&self, result: Result<(), DuetError>) {
        lock(&self.report_results).push_back(result);
    }

    pub fn set_stars(&self, stars: u32) {
        lock(&self.profile).stars = stars;
    }

    pub fn stars(&self) -> u32 {
        lock(&self.profile).stars
    }

    pub fn poll_count(&self) -> usize {
        lock(&self.poll_instants).len()
    }

    /// Instants at which each status poll was received.
    pub fn poll_instants(&self) -> Vec<Instant> {
        lock(&self.poll_instants).clone()
    }

    pub fn leave_count(&self) -> usize {
        self.leave_calls.load(Ordering::SeqCst)
    }

    pub fn current_user_calls(&self) -> usize {
        self.current_user_calls.load(Ordering::SeqCst)
    }

    /// Amounts of every debit attempt, successful or not.
    pub fn decrease_calls(&self) -> Vec<u32> {
        lock(&self.decrease_calls).clone()
    }

    pub fn ban_status_calls(&self) -> usize {
        self.ban_status_calls.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> Vec<(UserId, String)> {
        lock(&self.reports).clone()
    }
}

/// A moderation status with no reports and no ban.
pub fn clean_record() -> ModerationStatus {
    ModerationStatus {
        is_banned: false,
        ban_expires_at: None,
        report_count: 0,
        weekly_ban_count: 0,
    }
}

#[async_trait]
impl MatchmakingApi for MockBackend {
    async fn join_queue(&self) -> Result<JoinOutcome, DuetError> {
        lock(&self.join_results)
            .pop_front()
            .unwrap_or(Ok(JoinOutcome::Waiting))
    }

    async fn queue_status(&self) -> Result<PollOutcome, DuetError> {
        lock(&self.poll_instants).push(Instant::now());
        lock(&self.poll_results)
            .pop_front()
            .unwrap_or(Ok(PollOutcome::Waiting))
    }

    async fn leave_queue(&self) -> Result<(), DuetError> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl AccountApi for MockBackend {
    async fn current_user(&self) -> Result<UserProfile, DuetError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        Ok(lock(&self.profile).clone())
    }

    async fn decrease_stars(&self, amount: u32) -> Result<(), DuetError> {
        lock(&self.decrease_calls).push(amount);
        let result = lock(&self.decrease_results).pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            let mut profile = lock(&self.profile);
            profile.stars = profile.stars.saturating_sub(amount);
        }
        result
    }
}

#[async_trait]
impl ModerationApi for MockBackend {
    async fn ban_status(&self) -> Result<ModerationStatus, DuetError> {
        self.ban_status_calls.fetch_add(1, Ordering::SeqCst);
        let next = lock(&self.ban_statuses).pop_front();
        let mut last = lock(&self.last_ban_status);
        if let Some(status) = next {
            *last = status;
        }
        Ok(last.clone())
    }

    async fn submit_report(
        &self,
        reported_user_id: &UserId,
        reason: &str,
    ) -> Result<(), DuetError> {
        lock(&self.reports).push((reported_user_id.clone(), reason.to_string()));
        lock(&self.report_results).pop_front().unwrap_or(Ok(()))
    }
}
