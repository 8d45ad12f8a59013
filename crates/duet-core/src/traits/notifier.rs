// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sink for user-visible notices.

use crate::types::Notice;

/// The UI collaborator that renders notices (toasts, overlays, dialogs).
///
/// Implementations must not block; rendering happens on the UI side.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notice: Notice);
}
