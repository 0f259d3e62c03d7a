/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Traffic light evaluator: maps a timestamp to the phase that is active.
//!
//! A [`TrafficLight`] is built from a [`LightSettings`] record and the
//! crossing's cycle length.  Construction rescales the phases so their total
//! equals the cycle, then lays them out as contiguous windows:
//!
//! ```text
//! elapsed = (timestamp + offset) mod cycle
//!
//! 0        30000 32000          58000 60000
//! ├── red ───┼─ry─┼──── green ────┼─y──┤
//! ```
//!
//! Zero-duration phases occupy no window and are never reported.

use thiserror::Error;
use tracing::debug;

use crate::config::CrossingSettings;
use crate::phase::{sort_by_order, LightSettings, Phase};
use crate::rescale::{self, RescaleError};
use crate::scheduler::{WakeError, WakeSource};
use crate::state::State;

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LightError {
    #[error("light has no phases")]
    NoPhases,

    #[error("cycle length must be positive, got {0}ms")]
    NonPositiveCycleLength(i64),

    #[error("every phase has zero duration")]
    NoActivePhase,

    #[error(transparent)]
    Rescale(#[from] RescaleError),
}

// ── Window layout ─────────────────────────────────────────────────────────────

/// Half-open `[start_ms, end_ms)` slot of one non-zero phase inside a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    phase: Phase,
    start_ms: i64,
    end_ms: i64,
}

fn layout(phases: &[Phase]) -> Vec<Window> {
    let mut start_ms = 0;
    let mut windows = Vec::with_capacity(phases.len());
    for &phase in phases {
        let end_ms = start_ms + phase.duration_ms;
        if phase.duration_ms > 0 {
            windows.push(Window {
                phase,
                start_ms,
                end_ms,
            });
        }
        start_ms = end_ms;
    }
    windows
}

// ── TrafficLight ──────────────────────────────────────────────────────────────

/// Immutable evaluator for one light.  Edits produce a new instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficLight {
    settings: LightSettings,
    cycle_length_ms: i64,
    /// Never empty; the last window ends at `cycle_length_ms`.
    windows: Vec<Window>,
}

impl TrafficLight {
    /// Rescale `settings` to the crossing's cycle length and build the
    /// evaluator.
    pub fn new(settings: &LightSettings, crossing: &CrossingSettings) -> Result<Self, LightError> {
        let cycle_length_ms = crossing.cycle_length_ms;
        if cycle_length_ms <= 0 {
            return Err(LightError::NonPositiveCycleLength(cycle_length_ms));
        }
        if settings.phases.is_empty() {
            return Err(LightError::NoPhases);
        }

        let mut settings = rescale::rescale_settings(settings, cycle_length_ms)?;
        sort_by_order(&mut settings.phases);
        let windows = layout(&settings.phases);
        if windows.is_empty() {
            return Err(LightError::NoActivePhase);
        }

        debug!(
            cycle_length_ms,
            offset_ms = settings.offset_ms,
            windows = windows.len(),
            "Built traffic light"
        );

        Ok(Self {
            settings,
            cycle_length_ms,
            windows,
        })
    }

    /// The rescaled settings this light evaluates.
    pub fn settings(&self) -> &LightSettings {
        &self.settings
    }

    pub fn cycle_length_ms(&self) -> i64 {
        self.cycle_length_ms
    }

    /// Position of `timestamp_ms` inside the cycle, in `[0, cycle)`.
    pub fn elapsed_in_cycle(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms
            .saturating_add(self.settings.offset_ms)
            .rem_euclid(self.cycle_length_ms)
    }

    fn window_index(&self, elapsed_ms: i64) -> usize {
        let index = self.windows.partition_point(|w| w.end_ms <= elapsed_ms);
        index.min(self.windows.len() - 1)
    }

    /// Phase active at `timestamp_ms`.
    ///
    /// While the intersection is `faulted` every light reports
    /// [`State::OutOfService`] for a whole cycle.
    pub fn current_phase(&self, timestamp_ms: i64, faulted: bool) -> Phase {
        if faulted {
            return Phase::new(State::OutOfService, self.cycle_length_ms);
        }
        let elapsed = self.elapsed_in_cycle(timestamp_ms);
        self.windows[self.window_index(elapsed)].phase
    }

    /// Earliest timestamp after `timestamp_ms` at which the non-faulted
    /// phase changes.
    ///
    /// Adjacent windows holding an equal phase are walked over.  A light with
    /// a single active phase reports the next cycle boundary.
    pub fn next_state_timestamp(&self, timestamp_ms: i64) -> i64 {
        let elapsed = self.elapsed_in_cycle(timestamp_ms);
        let current = self.window_index(elapsed);
        let phase = self.windows[current].phase;
        let count = self.windows.len();

        let mut delta = self.windows[current].end_ms - elapsed;
        for step in 1..count {
            let next = &self.windows[(current + step) % count];
            if next.phase != phase {
                return timestamp_ms.saturating_add(delta);
            }
            delta += next.end_ms - next.start_ms;
        }
        timestamp_ms.saturating_add(self.cycle_length_ms - elapsed)
    }
}

impl WakeSource for TrafficLight {
    fn next_state_timestamp(&self, now_ms: i64) -> Result<i64, WakeError> {
        Ok(TrafficLight::next_state_timestamp(self, now_ms))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
