// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matchmaking queue client with a self-rescheduling poll timer.
//!
//! A search moves through `idle -> joining_queue -> waiting` and ends in one
//! of the terminal [`SearchOutcome`]s, after which the client is idle again.
//! Every poll is armed as a single one-shot sleep whose delay grows after
//! each non-terminal response, so a new delay takes effect immediately and
//! nothing keeps firing once the search is over.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use duet_config::model::MatchmakingConfig;
use duet_core::types::{JoinOutcome, PollOutcome};
use duet_core::{BackendApi, DuetError, Match};
use strum::Display;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Non-terminal states of the queue client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum QueueState {
    Idle,
    JoiningQueue,
    Waiting,
}

/// How a queue search ended. The client is idle again afterwards.
#[derive(Debug)]
pub enum SearchOutcome {
    /// A partner was found; hand off to the call lifecycle.
    Matched(Match),
    /// The entry was removed server-side (someone else cancelled it).
    NotInQueue,
    /// The poll budget ran out without a match.
    TimedOut,
    /// The user cancelled the search.
    Cancelled,
    /// Joining the queue failed. No queue entry is assumed.
    Failed(DuetError),
}

/// Delays between queue polls: starts at the initial delay, grows by a fixed
/// factor after every poll, is capped at the maximum, and yields at most
/// `attempts` delays.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    next: Duration,
    growth: f64,
    max: Duration,
    remaining: u32,
}

impl PollSchedule {
    pub fn new(initial: Duration, growth: f64, max: Duration, attempts: u32) -> Self {
        Self {
            next: initial.min(max),
            growth,
            max,
            remaining: attempts,
        }
    }

    pub fn from_config(config: &MatchmakingConfig) -> Self {
        Self::new(
            config.initial_poll_delay(),
            config.poll_growth_factor,
            config.max_poll_delay(),
            config.max_poll_attempts,
        )
    }

    fn grow(&self, delay: Duration) -> Duration {
        let grown_ms = (delay.as_millis() as f64 * self.growth.max(1.0)).round();
        if !grown_ms.is_finite() || grown_ms >= self.max.as_millis() as f64 {
            self.max
        } else {
            Duration::from_millis(grown_ms as u64).max(delay)
        }
    }
}

impl Iterator for PollSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.next;
        self.next = self.grow(delay);
        Some(delay)
    }
}

struct ActiveSearch {
    id: u64,
    timer: CancellationToken,
}

struct Inner {
    state: QueueState,
    search: Option<ActiveSearch>,
}

/// Joins, polls and leaves the server-side matchmaking queue.
pub struct QueueClient {
    backend: Arc<dyn BackendApi>,
    config: MatchmakingConfig,
    inner: Mutex<Inner>,
    next_search_id: AtomicU64,
}

impl QueueClient {
    pub fn new(backend: Arc<dyn BackendApi>, config: MatchmakingConfig) -> Self {
        Self {
            backend,
            config,
            inner: Mutex::new(Inner {
                state: QueueState::Idle,
                search: None,
            }),
            next_search_id: AtomicU64::new(1),
        }
    }

    pub async fn state(&self) -> QueueState {
        self.inner.lock().await.state
    }

    /// Enqueues the user. Never retried automatically.
    pub async fn join(&self) -> Result<JoinOutcome, DuetError> {
        self.backend.join_queue().await
    }

    /// Reads the queue status. Idempotent.
    pub async fn poll(&self) -> Result<PollOutcome, DuetError> {
        self.backend.queue_status().await
    }

    /// Leaves the queue. Best-effort: failures are logged and swallowed.
    pub async fn leave(&self) {
        if let Err(e) = self.backend.leave_queue().await {
            warn!(error = %e, "leaving the matchmaking queue failed, ignoring");
        }
    }

    /// Runs one complete search: join, then poll on the backoff schedule
    /// until a terminal outcome.
    pub async fn search(&self) -> SearchOutcome {
        let id = self.next_search_id.fetch_add(1, Ordering::Relaxed);
        let timer = {
            let mut inner = self.inner.lock().await;
            if inner.state != QueueState::Idle {
                return SearchOutcome::Failed(DuetError::Internal(
                    "a queue search is already in progress".to_string(),
                ));
            }
            let timer = CancellationToken::new();
            inner.state = QueueState::JoiningQueue;
            inner.search = Some(ActiveSearch {
                id,
                timer: timer.clone(),
            });
            timer
        };

        let outcome = self.run_search(id, &timer).await;

        let mut inner = self.inner.lock().await;
        if inner.search.as_ref().is_some_and(|s| s.id == id) {
            inner.search = None;
            inner.state = QueueState::Idle;
        }
        outcome
    }

    /// Cancels the running search, if any, then leaves the queue.
    ///
    /// The pending poll timer is cleared before the leave request is sent.
    /// Returns false when there was nothing to cancel.
    pub async fn cancel(&self) -> bool {
        let cancelled = {
            let mut inner = self.inner.lock().await;
            match inner.search.take() {
                Some(search) => {
                    search.timer.cancel();
                    inner.state = QueueState::Idle;
                    true
                }
                None => false,
            }
        };

        if cancelled {
            info!("queue search cancelled");
            self.leave().await;
        }
        cancelled
    }

    async fn set_state(&self, id: u64, state: QueueState) {
        let mut inner = self.inner.lock().await;
        if inner.search.as_ref().is_some_and(|s| s.id == id) {
            debug!(from = %inner.state, to = %state, "queue state transition");
            inner.state = state;
        }
    }

    async fn run_search(&self, id: u64, timer: &CancellationToken) -> SearchOutcome {
        info!("joining matchmaking queue");
        let joined = tokio::select! {
            _ = timer.cancelled() => return SearchOutcome::Cancelled,
            result = self.join() => result,
        };

        match joined {
            Ok(JoinOutcome::Matched(found)) => {
                info!(call_id = %found.call_id, "matched on queue join");
                return SearchOutcome::Matched(found);
            }
            Ok(JoinOutcome::Waiting) => {}
            Err(e) => {
                error!(error = %e, "joining the matchmaking queue failed");
                return SearchOutcome::Failed(e);
            }
        }

        self.set_state(id, QueueState::Waiting).await;

        for (index, delay) in PollSchedule::from_config(&self.config).enumerate() {
            let attempt = index + 1;
            debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "queue poll scheduled"
            );

            tokio::select! {
                _ = timer.cancelled() => return SearchOutcome::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }

            let polled = tokio::select! {
                _ = timer.cancelled() => return SearchOutcome::Cancelled,
                result = self.poll() => result,
            };

            match polled {
                Ok(PollOutcome::Matched(found)) => {
                    info!(attempt, call_id = %found.call_id, "match found");
                    return SearchOutcome::Matched(found);
                }
                Ok(PollOutcome::NotInQueue) => {
                    info!(attempt, "queue entry no longer exists");
                    self.leave().await;
                    return SearchOutcome::NotInQueue;
                }
                Ok(PollOutcome::Waiting) => {}
                Err(e) => warn!(attempt, error = %e, "queue poll failed, backing off"),
            }
        }

        info!(
            attempts = self.config.max_poll_attempts,
            "no match within the poll budget"
        );
        self.leave().await;
        SearchOutcome::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::types::PollOutcome;
    use duet_core::{CallId, UserId};
    use duet_test_utils::MockBackend;
    use proptest::prelude::*;
    use tokio::time::Instant;

    fn matched(call: &str, peer: &str) -> Match {
        Match {
            call_id: CallId::from(call),
            peer_id: UserId::from(peer),
        }
    }

    fn client(backend: &Arc<MockBackend>) -> QueueClient {
        QueueClient::new(backend.clone(), MatchmakingConfig::default())
    }

    #[test]
    fn default_schedule_matches_product_cadence() {
        let delays: Vec<u64> = PollSchedule::from_config(&MatchmakingConfig::default())
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(delays.len(), 15);
        assert_eq!(&delays[..4], &[3000, 3600, 4320, 5184]);
        assert_eq!(*delays.last().unwrap(), 10_000);
    }

    proptest! {
        #[test]
        fn schedule_is_bounded_and_non_decreasing(
            initial in 1u64..5_000,
            growth in 1.0f64..3.0,
            extra in 0u64..20_000,
            attempts in 1u32..40,
        ) {
            let max = Duration::from_millis(initial + extra);
            let delays: Vec<Duration> = PollSchedule::new(
                Duration::from_millis(initial), growth, max, attempts,
            ).collect();

            prop_assert_eq!(delays.len(), attempts as usize);
            for pair in delays.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
            prop_assert!(delays.iter().all(|d| *d <= max));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_match_skips_polling() {
        let backend = Arc::new(MockBackend::new("me", 0));
        backend.push_join(Ok(JoinOutcome::Matched(matched("c1", "peer"))));

        let outcome = client(&backend).search().await;

        assert!(matches!(outcome, SearchOutcome::Matched(m) if m.call_id == CallId::from("c1")));
        assert_eq!(backend.poll_count(), 0);
        assert_eq!(backend.leave_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_growing_delays_until_matched() {
        let backend = Arc::new(MockBackend::new("me", 0));
        backend.push_waiting_polls(2);
        backend.push_poll(Ok(PollOutcome::Matched(matched("c2", "peer"))));
        let queue = client(&backend);

        let started = Instant::now();
        let outcome = queue.search().await;
        assert!(matches!(outcome, SearchOutcome::Matched(_)));

        let instants = backend.poll_instants();
        assert_eq!(instants.len(), 3);
        assert_eq!(instants[0] - started, Duration::from_millis(3000));
        assert_eq!(instants[1] - instants[0], Duration::from_millis(3600));
        assert_eq!(instants[2] - instants[1], Duration::from_millis(4320));

        // Nothing fires after the terminal response.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.poll_count(), 3);
        assert_eq!(queue.state().await, QueueState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn not_in_queue_leaves_defensively() {
        let backend = Arc::new(MockBackend::new("me", 0));
        backend.push_poll(Ok(PollOutcome::NotInQueue));

        let outcome = client(&backend).search().await;

        assert!(matches!(outcome, SearchOutcome::NotInQueue));
        assert_eq!(backend.poll_count(), 1);
        assert_eq!(backend.leave_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_the_budget_times_out() {
        let backend = Arc::new(MockBackend::new("me", 0));
        let queue = client(&backend);

        let started = Instant::now();
        let outcome = queue.search().await;

        assert!(matches!(outcome, SearchOutcome::TimedOut));
        assert_eq!(backend.poll_count(), 15);
        assert_eq!(backend.leave_count(), 1);
        // Total wait is bounded by the capped schedule.
        assert!(Instant::now() - started <= Duration::from_secs(15 * 10));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(backend.poll_count(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_consume_attempts_and_keep_backing_off() {
        let backend = Arc::new(MockBackend::new("me", 0));
        backend.push_poll(Err(DuetError::Transport {
            message: "connection reset".into(),
            source: None,
        }));
        backend.push_poll(Ok(PollOutcome::Matched(matched("c3", "peer"))));

        let outcome = client(&backend).search().await;

        assert!(matches!(outcome, SearchOutcome::Matched(_)));
        let instants = backend.poll_instants();
        assert_eq!(instants[1] - instants[0], Duration::from_millis(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn join_failure_is_terminal_without_leave() {
        let backend = Arc::new(MockBackend::new("me", 0));
        backend.push_join(Err(DuetError::QueueUnavailable {
            message: "unreachable".into(),
            source: None,
        }));

        let outcome = client(&backend).search().await;

        assert!(matches!(
            outcome,
            SearchOutcome::Failed(DuetError::QueueUnavailable { .. })
        ));
        assert_eq!(backend.poll_count(), 0);
        assert_eq!(backend.leave_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_timer_then_leaves() {
        let backend = Arc::new(MockBackend::new("me", 0));
        let queue = Arc::new(client(&backend));

        let search = tokio::spawn({
            let queue = queue.clone();
            async move { queue.search().await }
        });

        // First poll lands at 3s; cancel while the second is pending.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(queue.state().await, QueueState::Waiting);
        assert!(queue.cancel().await);

        let outcome = search.await.unwrap();
        assert!(matches!(outcome, SearchOutcome::Cancelled));
        assert_eq!(backend.leave_count(), 1);
        assert_eq!(queue.state().await, QueueState::Idle);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.poll_count(), 1);
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_noop() {
        let backend = Arc::new(MockBackend::new("me", 0));
        assert!(!client(&backend).cancel().await);
        assert_eq!(backend.leave_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_search_is_rejected() {
        let backend = Arc::new(MockBackend::new("me", 0));
        let queue = Arc::new(client(&backend));

        let first = tokio::spawn({
            let queue = queue.clone();
            async move { queue.search().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = queue.search().await;
        assert!(matches!(second, SearchOutcome::Failed(DuetError::Internal(_))));

        queue.cancel().await;
        assert!(matches!(first.await.unwrap(), SearchOutcome::Cancelled));
    }
}
