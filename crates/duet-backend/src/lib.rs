// SPDX-FileCopyrightText: 2026 Duet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! reqwest implementation of the Duet backend HTTP contract.
//!
//! [`BackendClient`] implements [`duet_core::MatchmakingApi`],
//! [`duet_core::AccountApi`] and [`duet_core::ModerationApi`], and therefore
//! the umbrella [`duet_core::BackendApi`].

pub mod client;
pub mod types;

pub use client::BackendClient;
