// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `duet search` command implementation.
//!
//! Joins the queue and polls until a partner is found or the poll budget
//! runs out. Ctrl+C cancels the search and leaves the queue.

use std::sync::Arc;

use duet_backend::BackendClient;
use duet_config::DuetConfig;
use duet_core::{DuetError, Notice, Notifier};
use duet_session::display::format_elapsed;
use duet_session::shutdown::install_signal_handler;
use duet_session::{QueueClient, SearchOutcome};
use tokio::time::Instant;
use tracing::info;

use crate::notifier::ConsoleNotifier;

pub async fn run_search(config: &DuetConfig) -> Result<(), DuetError> {
    let client = BackendClient::from_config(&config.backend)?;
    let queue = QueueClient::new(Arc::new(client), config.matchmaking.clone());
    let notifier = ConsoleNotifier;
    let shutdown = install_signal_handler();
    let started = Instant::now();

    println!("Searching for a partner... (Ctrl+C to cancel)");
    let search = queue.search();
    tokio::pin!(search);
    let outcome = tokio::select! {
        outcome = &mut search => outcome,
        _ = shutdown.cancelled() => {
            info!("search interrupted");
            queue.cancel().await;
            search.await
        }
    };

    let waited = format_elapsed(started.elapsed());
    match outcome {
        SearchOutcome::Matched(found) => {
            println!(
                "Matched with {} after {waited} (call {})",
                found.peer_id, found.call_id
            );
            Ok(())
        }
        SearchOutcome::TimedOut => {
            notifier.notify(Notice::NoMatch);
            Ok(())
        }
        SearchOutcome::NotInQueue => {
            println!("Your queue entry was removed after {waited}.");
            Ok(())
        }
        SearchOutcome::Cancelled => {
            println!("Search cancelled after {waited}.");
            Ok(())
        }
        SearchOutcome::Failed(DuetError::Banned {
            message,
            ban_expires_at,
        }) => {
            notifier.notify(Notice::Banned {
                message: message.clone(),
                ban_expires_at,
            });
            Err(DuetError::Banned {
                message,
                ban_expires_at,
            })
        }
        SearchOutcome::Failed(e) => Err(e),
    }
}
