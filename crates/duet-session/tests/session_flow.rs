// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end session flows against the mock backend and platform.
//!
//! Every test runs on a paused tokio clock, so timer-driven behaviour
//! (poll backoff, debounces, the duration watchdog) is asserted at exact
//! instants.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use duet_core::types::{ExtensionEvent, JoinOutcome, ModerationStatus, PollOutcome};
use duet_core::{CallId, DuetError, Match, Notice, PlatformErrorKind, UserId};
use duet_session::{
    CallOrchestrator, EndReason, ExtensionOutcome, Release, SearchOutcome, SessionContext,
    SessionOutcome,
};
use duet_test_utils::TestHarness;
use duet_test_utils::mock_backend::clean_record;
use tokio::time::Instant;

fn orchestrator(harness: &TestHarness) -> Arc<CallOrchestrator> {
    Arc::new(CallOrchestrator::new(SessionContext::new(
        harness.self_id.clone(),
        harness.backend_api(),
        harness.platform_api(),
        harness.notifier_api(),
        harness.config.clone(),
    )))
}

fn matched(call: &str, peer: &str) -> Match {
    Match {
        call_id: CallId::from(call),
        peer_id: UserId::from(peer),
    }
}

// ---- Matchmaking ----

#[tokio::test(start_paused = true)]
async fn match_after_polling_follows_backoff_schedule() {
    let harness = TestHarness::default();
    harness.backend.push_waiting_polls(3);
    harness
        .backend
        .push_poll(Ok(PollOutcome::Matched(matched("c1", "bob"))));
    let orchestrator = orchestrator(&harness);
    let start = Instant::now();

    let outcome = orchestrator.find_partner().await;

    let SearchOutcome::Matched(found) = outcome else {
        panic!("expected a match, got {outcome:?}");
    };
    assert_eq!(found.peer_id, UserId::from("bob"));
    let offsets: Vec<u128> = harness
        .backend
        .poll_instants()
        .iter()
        .map(|at| (*at - start).as_millis())
        .collect();
    assert_eq!(offsets, vec![3000, 6600, 10920, 16104]);
    assert!(harness.notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn server_side_removal_ends_search_quietly() {
    let harness = TestHarness::default();
    harness.backend.push_poll(Ok(PollOutcome::NotInQueue));
    let orchestrator = orchestrator(&harness);

    let outcome = orchestrator.find_partner().await;

    assert!(matches!(outcome, SearchOutcome::NotInQueue));
    assert_eq!(harness.backend.poll_count(), 1);
    assert!(harness.notifier.notices().is_empty());
}

// ---- Full session ----

#[tokio::test(start_paused = true)]
async fn immediate_match_runs_until_times_up() {
    let harness = TestHarness::default();
    harness
        .backend
        .push_join(Ok(JoinOutcome::Matched(matched("c1", "bob"))));
    let call = harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    let start = Instant::now();

    let outcome = orchestrator.run_once().await;

    let SessionOutcome::Ended(Some(report)) = outcome else {
        panic!("expected a completed session, got {outcome:?}");
    };
    assert_eq!(report.reason, EndReason::TimeUp);
    assert_eq!(report.release, Release::Home);
    assert_eq!(call.end_call_count(), 1);
    assert_eq!(call.camera_disable_count(), 1);

    let notifier = &harness.notifier;
    let warned = notifier
        .first_at(|n| *n == Notice::OneMinuteRemaining)
        .unwrap();
    let times_up = notifier.first_at(|n| *n == Notice::TimesUp).unwrap();
    assert_eq!(warned - start, Duration::from_secs(240));
    assert_eq!(times_up - start, Duration::from_secs(300));
    assert_eq!(notifier.count(|n| *n == Notice::TimesUp), 1);
}

#[tokio::test(start_paused = true)]
async fn partner_leaving_tears_down_after_debounce() {
    let harness = TestHarness::default();
    let call = harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();
    let supervising = orchestrator.clone();
    let supervise = tokio::spawn(async move { supervising.supervise().await });

    tokio::time::sleep(Duration::from_secs(2)).await;
    call.peer_joins("bob");
    tokio::time::sleep(Duration::from_secs(88)).await;
    call.peer_leaves();

    let report = supervise.await.unwrap().unwrap();
    assert_eq!(report.reason, EndReason::PeerLeft);
    assert_eq!(report.penalty.session_duration_secs, 92);
    assert!(!report.penalty.penalty_applied);
    assert_eq!(harness.notifier.count(|n| *n == Notice::PartnerLeft), 1);
    assert_eq!(harness.backend.leave_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn user_end_during_debounce_runs_one_teardown() {
    let harness = TestHarness::default();
    let call = harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();
    let supervising = orchestrator.clone();
    let supervise = tokio::spawn(async move { supervising.supervise().await });

    tokio::time::sleep(Duration::from_secs(70)).await;
    call.peer_joins("bob");
    tokio::time::sleep(Duration::from_secs(1)).await;
    call.peer_leaves();
    tokio::time::sleep(Duration::from_secs(1)).await;

    let ended = orchestrator.end_call().await.unwrap();
    let supervised = supervise.await.unwrap().unwrap();

    assert_eq!(ended.reason, EndReason::User);
    assert_eq!(supervised.reason, EndReason::User);
    assert_eq!(call.end_call_count(), 1);
    assert_eq!(harness.backend.ban_status_calls(), 1);
    assert_eq!(harness.backend.current_user_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn short_call_reports_penalty() {
    let harness = TestHarness::default();
    harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(20)).await;
    let report = orchestrator.end_call().await.unwrap();

    assert!(report.penalty.penalty_applied);
    assert_eq!(
        harness
            .notifier
            .count(|n| matches!(n, Notice::EarlyExitPenalty { .. })),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn failed_join_leaves_the_queue() {
    let harness = TestHarness::default();
    harness
        .backend
        .push_join(Ok(JoinOutcome::Matched(matched("c1", "bob"))));
    let call = harness.platform.mock_call("c1");
    for _ in 0..2 {
        call.push_join(Err(DuetError::platform(
            PlatformErrorKind::Transport,
            "socket closed",
        )));
    }
    let orchestrator = orchestrator(&harness);

    let outcome = orchestrator.run_once().await;

    assert!(matches!(outcome, SessionOutcome::ConnectFailed(_)));
    assert_eq!(call.join_count(), 2);
    assert_eq!(harness.backend.leave_count(), 1);
    assert_eq!(
        harness.notifier.count(|n| *n == Notice::ConnectionFailed),
        1
    );
    assert!(orchestrator.controller().active_call().is_none());
}

// ---- Duration extension ----

#[tokio::test(start_paused = true)]
async fn near_simultaneous_extensions_raise_once() {
    let harness = TestHarness::builder().with_stars(40).build();
    let call = harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();
    let supervising = orchestrator.clone();
    let supervise = tokio::spawn(async move { supervising.supervise().await });

    tokio::time::sleep(Duration::from_secs(120)).await;
    let outcome = orchestrator.request_extension().await.unwrap();
    call.deliver_custom(ExtensionEvent::new(600, UserId::from("bob"), Utc::now()).to_payload());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        outcome,
        ExtensionOutcome::Applied {
            current_max_secs: 600
        }
    );
    assert_eq!(orchestrator.current_max(), Some(600));
    assert_eq!(
        harness.notifier.count(|n| matches!(
            n,
            Notice::CallExtended { .. } | Notice::PartnerExtended { .. }
        )),
        1
    );
    assert_eq!(harness.backend.stars(), 30);

    let report = supervise.await.unwrap().unwrap();
    assert_eq!(report.reason, EndReason::TimeUp);
    assert_eq!(report.penalty.session_duration_secs, 603);
}

#[tokio::test(start_paused = true)]
async fn stale_partner_announcement_is_ignored() {
    let harness = TestHarness::default();
    let call = harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();
    let supervising = orchestrator.clone();
    let supervise = tokio::spawn(async move { supervising.supervise().await });

    tokio::time::sleep(Duration::from_secs(10)).await;
    call.deliver_custom(ExtensionEvent::new(200, UserId::from("bob"), Utc::now()).to_payload());
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(orchestrator.current_max(), Some(300));
    orchestrator.end_call().await.unwrap();
    assert!(supervise.await.unwrap().is_some());
    assert_eq!(
        harness
            .notifier
            .count(|n| matches!(n, Notice::PartnerExtended { .. })),
        0
    );
}

// ---- Moderation ----

#[tokio::test(start_paused = true)]
async fn report_warning_shown_once_across_calls() {
    let harness = TestHarness::default();
    harness.backend.push_ban_status(clean_record());
    harness.backend.push_ban_status(ModerationStatus {
        report_count: 2,
        ..clean_record()
    });
    harness.platform.mock_call("c1");
    harness.platform.mock_call("c2");
    harness.platform.mock_call("c3");
    let orchestrator = orchestrator(&harness);
    let is_warning = |n: &Notice| matches!(n, Notice::ReportWarning { report_count: 2 });

    for (call, peer) in [("c1", "bob"), ("c2", "carol"), ("c3", "dave")] {
        orchestrator.connect(&matched(call, peer)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;
        let report = orchestrator.end_call().await.unwrap();
        assert_eq!(report.release, Release::Home);
    }

    assert_eq!(harness.notifier.count(is_warning), 1);
    assert_eq!(orchestrator.controller().report_baseline(), 2);
}

#[tokio::test(start_paused = true)]
async fn ban_after_call_blocks_release() {
    let harness = TestHarness::default();
    harness.backend.push_ban_status(ModerationStatus {
        is_banned: true,
        ban_expires_at: Some(Utc::now() + chrono::Duration::minutes(30)),
        report_count: 0,
        weekly_ban_count: 1,
    });
    harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(90)).await;
    let report = orchestrator.end_call().await.unwrap();

    assert_eq!(report.release, Release::AwaitAcknowledgement);
    assert_eq!(harness.notifier.count(Notice::is_blocking), 1);
}

#[tokio::test]
async fn rate_limited_report_gets_its_own_notice() {
    let harness = TestHarness::default();
    harness.backend.push_report(Err(duet_core::DuetError::RateLimited {
        message: "Daily report limit reached".into(),
    }));
    harness.platform.mock_call("c1");
    let orchestrator = orchestrator(&harness);
    orchestrator.connect(&matched("c1", "bob")).await.unwrap();

    assert!(orchestrator.submit_report("harassment").await.is_err());
    assert_eq!(
        harness.notifier.notices(),
        vec![Notice::ReportRateLimited]
    );
}
