/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Corrected wall-clock time in milliseconds.
//!
//! ```text
//! now_ms = anchor_ms + (Instant::now() - anchor) + correction_ms
//! ```
//!
//! The wall clock is read once, at construction; everything after that runs
//! on tokio's monotonic clock, so a stepped system clock cannot move "now"
//! backwards and paused-time tests stay deterministic.

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

/// Stand-in for timestamps too far ahead for `Instant` arithmetic.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Clone, Copy)]
pub struct Clock {
    anchor: Instant,
    anchor_ms: i64,
    correction_ms: i64,
}

impl Clock {
    /// Anchored at the current system time.
    pub fn system() -> Self {
        Self::starting_at(Utc::now().timestamp_millis())
    }

    /// Anchored so that `now_ms()` returns `anchor_ms` right now.
    pub fn starting_at(anchor_ms: i64) -> Self {
        Self {
            anchor: Instant::now(),
            anchor_ms,
            correction_ms: 0,
        }
    }

    /// Same anchor, different correction.
    pub fn with_correction(self, correction_ms: i64) -> Self {
        Self {
            correction_ms,
            ..self
        }
    }

    pub fn correction_ms(&self) -> i64 {
        self.correction_ms
    }

    pub fn now_ms(&self) -> i64 {
        let elapsed = i64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.anchor_ms
            .saturating_add(elapsed)
            .saturating_add(self.correction_ms)
    }

    /// Monotonic instant at which `now_ms()` reaches `at_ms`.
    ///
    /// Timestamps already in the past map to the anchor.
    pub fn instant_at(&self, at_ms: i64) -> Instant {
        let offset = at_ms
            .saturating_sub(self.anchor_ms)
            .saturating_sub(self.correction_ms);
        match u64::try_from(offset) {
            Ok(ms) => self
                .anchor
                .checked_add(Duration::from_millis(ms))
                .unwrap_or_else(|| self.anchor + FAR_FUTURE),
            Err(_) => self.anchor,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
