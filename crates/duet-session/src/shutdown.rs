// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal-driven shutdown: stop searching and end the call cleanly.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::lifecycle::{EndReason, TeardownReport};
use crate::orchestrator::CallOrchestrator;

/// Spawns a task that cancels the returned token on SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!(signal, "shutting down");
        trigger.cancel();
    });

    token
}

/// Resolves with the name of the first shutdown signal delivered.
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = term.recv() => "SIGTERM",
            },
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
                "SIGINT"
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        "Ctrl+C"
    }
}

/// Cancels any search and ends the active call, waiting up to `timeout`
/// for the teardown to finish.
pub async fn drain_session(
    orchestrator: &CallOrchestrator,
    timeout: Duration,
) -> Option<TeardownReport> {
    if orchestrator.cancel_search().await {
        info!("cancelled queue search for shutdown");
    }

    if orchestrator.controller().active_call().is_none() {
        info!("no active call to drain");
        return None;
    }

    info!(timeout_secs = timeout.as_secs(), "ending active call for shutdown");
    match tokio::time::timeout(timeout, orchestrator.controller().end_call(EndReason::Shutdown))
        .await
    {
        Ok(report) => report,
        Err(_) => {
            warn!("drain timeout reached, abandoning teardown");
            None
        }
    }
}
