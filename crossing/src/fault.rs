/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Deterministic fault simulation.
//!
//! Time is cut into fixed windows of `duration_ms`.  Each window index is
//! hashed into a pseudo-random value in `[0, 1)`; the window is faulted when
//! that value falls below the configured probability.  The same timestamp
//! therefore always yields the same answer, on every run and every host.
//!
//! ```text
//!   window:   …   0   │   1   │   2   │   3   │ …
//!   value:       .88  │  .57  │  .59  │  .11  │
//!   p = 0.58:     ok  │ FAULT │   ok  │ FAULT │
//! ```

use tracing::debug;

use crate::config::{ConfigError, FaultSettings};
use crate::scheduler::{WakeError, WakeSource};

/// SplitMix64 finaliser.  Well-mixed output for consecutive window indices.
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Pseudo-random value of `window` in `[0, 1)`, from the top 53 bits.
pub fn window_value(window: i64) -> f64 {
    // Two's-complement reinterpretation keeps negative windows distinct.
    let bits = splitmix64(window as u64) >> 11;
    bits as f64 / (1u64 << 53) as f64
}

// ── FaultGenerator ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultGenerator {
    duration_ms: i64,
    probability: f64,
}

impl FaultGenerator {
    /// # Errors
    /// [`ConfigError::NonPositiveFaultDuration`] for `duration_ms <= 0`,
    /// [`ConfigError::ProbabilityOutOfRange`] outside `[0, 1]`.
    pub fn new(duration_ms: i64, probability: f64) -> Result<Self, ConfigError> {
        let settings = FaultSettings {
            duration_ms,
            probability,
        };
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &FaultSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        debug!(
            duration_ms = settings.duration_ms,
            probability = settings.probability,
            "Built fault generator"
        );
        Ok(Self {
            duration_ms: settings.duration_ms,
            probability: settings.probability,
        })
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Index of the window containing `timestamp_ms` (floor division).
    pub fn window(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms.div_euclid(self.duration_ms)
    }

    /// Whether the intersection is faulted at `timestamp_ms`.
    pub fn current_state(&self, timestamp_ms: i64) -> bool {
        window_value(self.window(timestamp_ms)) < self.probability
    }

    /// Start of the window after the one containing `timestamp_ms`.
    ///
    /// The faulted flag may or may not flip there; the scheduler simply
    /// re-evaluates.  Saturates at `i64::MAX`.
    pub fn next_state_timestamp(&self, timestamp_ms: i64) -> i64 {
        self.window(timestamp_ms)
            .saturating_add(1)
            .saturating_mul(self.duration_ms)
    }
}

impl WakeSource for FaultGenerator {
    fn next_state_timestamp(&self, now_ms: i64) -> Result<i64, WakeError> {
        self.window(now_ms)
            .checked_add(1)
            .and_then(|next| next.checked_mul(self.duration_ms))
            .ok_or(WakeError::Overflow)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
