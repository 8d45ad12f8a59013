// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `duet report` command implementation.

use std::sync::Arc;

use duet_backend::BackendClient;
use duet_config::DuetConfig;
use duet_core::{DuetError, UserId};
use duet_session::ModerationGate;

use crate::notifier::ConsoleNotifier;

pub async fn run_report(config: &DuetConfig, user_id: &str, reason: &str) -> Result<(), DuetError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DuetError::Internal("a report needs a reason".to_string()));
    }

    let client = BackendClient::from_config(&config.backend)?;
    let gate = ModerationGate::new(
        Arc::new(client),
        Arc::new(ConsoleNotifier),
        config.moderation.report_limit,
    );
    gate.submit_report(&UserId::from(user_id), reason).await
}
