/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Error types for the wake scheduler.
//!
//! * [`WakeError`] – why a single participant could not report its next
//!   change.  The scheduler logs it and keeps serving the other participants.
//! * [`DriverError`] – failures seen by callers of the running driver.

use thiserror::Error;

use super::ParticipantId;

// ── Per-participant errors ────────────────────────────────────────────────────

/// A participant's next-change query failed.
///
/// Never fatal: [`WakeScheduler::arm()`](super::WakeScheduler::arm) skips the
/// participant for the current tick only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WakeError {
    /// The next change lies beyond the representable timestamp range.
    #[error("next change overflows the timestamp range")]
    Overflow,

    /// The participant reported a timestamp at or before `now`.
    #[error("next change {next_ms}ms is not after now ({now_ms}ms)")]
    NotInFuture { next_ms: i64, now_ms: i64 },
}

// ── Driver errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver task has exited and no longer accepts commands.
    #[error("wake driver has stopped")]
    Stopped,

    /// The driver task panicked or was aborted.
    #[error("wake driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl WakeError {
    /// Wraps this error with the participant it came from, for logging.
    pub fn for_participant(self, participant: ParticipantId) -> ParticipantError {
        ParticipantError {
            participant,
            source: self,
        }
    }
}

/// A [`WakeError`] tagged with the participant that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{participant}: {source}")]
pub struct ParticipantError {
    pub participant: ParticipantId,
    #[source]
    pub source: WakeError,
}
