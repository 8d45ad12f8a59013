// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Partner disconnect detection from participant snapshots.

use duet_core::UserId;
use duet_core::types::Participant;

/// Raised once when a partner who was present is gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectSignal {
    pub peer_id: Option<UserId>,
}

/// Distinguishes "partner never joined yet" from "partner joined, then left".
///
/// A signal needs a partner to have been seen first, so the ringing/joining
/// phase where only one side is present never counts as a disconnect.
#[derive(Debug)]
pub struct DisconnectDetector {
    self_id: UserId,
    seen_partner: bool,
    last_peer: Option<UserId>,
}

impl DisconnectDetector {
    pub fn new(self_id: UserId) -> Self {
        Self {
            self_id,
            seen_partner: false,
            last_peer: None,
        }
    }

    pub fn has_seen_partner(&self) -> bool {
        self.seen_partner
    }

    /// Feeds the current participant list.
    pub fn observe(&mut self, participants: &[Participant]) -> Option<DisconnectSignal> {
        let other = participants.iter().find(|p| p.user_id != self.self_id);

        if let Some(peer) = other {
            self.seen_partner = true;
            self.last_peer = Some(peer.user_id.clone());
            return None;
        }

        if self.seen_partner && participants.len() == 1 {
            // Cleared on raise so a single flap never signals twice.
            self.seen_partner = false;
            return Some(DisconnectSignal {
                peer_id: self.last_peer.take(),
            });
        }

        None
    }
}
