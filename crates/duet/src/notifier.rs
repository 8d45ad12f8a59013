// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of user notices.

use duet_core::{Notice, Notifier};

/// Prints every notice on its own line. Blocking notices are marked so the
/// user knows the flow stops there.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    fn render(notice: &Notice) -> String {
        if notice.is_blocking() {
            format!("[blocked] {}", notice.text())
        } else {
            notice.text()
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        println!("{}", Self::render(&notice));
    }
}
