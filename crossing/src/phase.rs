/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Phase and light-settings records.
//!
//! ```text
//! config / edits ──► LightSettings ──(rescale)──► LightSettings ──► TrafficLight
//!                      any total                  total == cycle
//! ```
//!
//! # Ownership model
//! Both records are plain values.  Every edit in [`crate::rescale`] takes a
//! borrow and returns a fresh `LightSettings`, so the copy held by an
//! observer and the copy held by the wake driver can never alias.

use serde::{Deserialize, Serialize};

use crate::state::State;

/// Milliseconds per second; offsets and per-phase shares snap to this grid.
pub const MS_PER_SECOND: i64 = 1_000;

/// Longest cycle, and longest phase program, accepted anywhere: one day.
pub const MAX_CYCLE_LENGTH_MS: i64 = 86_400_000;

// ── Phase ─────────────────────────────────────────────────────────────────────

/// One `(state, duration)` step of a light's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub state: State,

    /// Duration in milliseconds.  Never negative once produced by the
    /// rescaler.
    pub duration_ms: i64,
}

impl Phase {
    pub fn new(state: State, duration_ms: i64) -> Self {
        Self { state, duration_ms }
    }
}

// ── LightSettings ─────────────────────────────────────────────────────────────

/// Per-light configuration: a wall-clock offset plus the ordered phase list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSettings {
    /// Shift applied to the timestamp before looking up the phase, in ms.
    #[serde(default)]
    pub offset_ms: i64,

    pub phases: Vec<Phase>,
}

impl LightSettings {
    /// Sum of all phase durations, in ms.
    pub fn total_duration_ms(&self) -> i64 {
        total_duration_ms(&self.phases)
    }

    /// Duration of the phase for `state`, or `None` if the light has no such
    /// phase.
    pub fn duration_of(&self, state: State) -> Option<i64> {
        self.phases
            .iter()
            .find(|p| p.state == state)
            .map(|p| p.duration_ms)
    }
}

impl Default for LightSettings {
    /// 30 s red, 2 s red+yellow, 26 s green, 2 s yellow: a 60 s cycle.
    fn default() -> Self {
        Self {
            offset_ms: 0,
            phases: vec![
                Phase::new(State::Red, 30_000),
                Phase::new(State::RedYellow, 2_000),
                Phase::new(State::Green, 26_000),
                Phase::new(State::Yellow, 2_000),
            ],
        }
    }
}

/// Sum of the durations in `phases`, in ms, saturating at the `i64` bounds.
pub fn total_duration_ms(phases: &[Phase]) -> i64 {
    phases
        .iter()
        .fold(0i64, |total, p| total.saturating_add(p.duration_ms))
}

/// Stable sort by canonical state order.
pub fn sort_by_order(phases: &mut [Phase]) {
    phases.sort_by_key(|p| p.state.order());
}

// ── Tests ─────────────────────────────────────────────────────────────────────
