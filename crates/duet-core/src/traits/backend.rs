// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Umbrella trait for a complete backend implementation.

use crate::traits::{AccountApi, MatchmakingApi, ModerationApi};

/// Everything the orchestrator needs from the backend.
///
/// Implemented automatically for any type that implements the three
/// endpoint traits.
pub trait BackendApi: MatchmakingApi + AccountApi + ModerationApi {}

impl<T> BackendApi for T where T: MatchmakingApi + AccountApi + ModerationApi {}
