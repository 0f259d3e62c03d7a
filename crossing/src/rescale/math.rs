/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure integer helpers for the rescaler: half-up rounding onto the
//! one-second grid and zero-clamped deltas.
//!
//! Free functions so they can be tested without building phase lists.

use crate::phase::MS_PER_SECOND;

/// `round(numerator / denominator)` with halves rounded toward +∞.
///
/// Exact integer form of `floor(n / d + 0.5)`, i.e. `floor((2n + d) / 2d)`;
/// `denominator` must be positive.  Evaluated in `i128`, so every `i64`
/// input is in range.
pub fn div_round_half_up(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(denominator > 0, "denominator must be positive");
    let (n, d) = (i128::from(numerator), i128::from(denominator));
    let quotient = (2 * n + d).div_euclid(2 * d);
    // Within half a unit of numerator / denominator, so always in range
    i64::try_from(quotient).unwrap_or(i64::MAX)
}

/// Round a millisecond value to the nearest whole second, saturating at the
/// `i64` bounds.
pub fn round_to_second(ms: i64) -> i64 {
    div_round_half_up(ms, MS_PER_SECOND).saturating_mul(MS_PER_SECOND)
}

/// Split `diff_ms` evenly over `count` phases, snapped to whole seconds.
///
/// Returns `0` for `count == 0`; there is nothing to share with.
pub fn share_per_phase(diff_ms: i64, count: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    div_round_half_up(diff_ms, count.saturating_mul(MS_PER_SECOND)).saturating_mul(MS_PER_SECOND)
}

/// The part of `delta_ms` a phase of `duration_ms` can take without going
/// negative: `max(delta, -duration)`.
pub fn clamp_delta(delta_ms: i64, duration_ms: i64) -> i64 {
    delta_ms.max(-duration_ms)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── round_to_second ───────────────────────────────────────────────────────

    #[test]
    fn round_to_second_basic_cases() {
        assert_eq!(round_to_second(0), 0);
        assert_eq!(round_to_second(1_499), 1_000);
        assert_eq!(round_to_second(1_500), 2_000);
        assert_eq!(round_to_second(-1_499), -1_000);
    }

    #[test]
    fn halves_round_toward_positive_infinity() {
        assert_eq!(round_to_second(500), 1_000);
        assert_eq!(round_to_second(-500), 0);
        assert_eq!(round_to_second(-1_500), -1_000);
        assert_eq!(round_to_second(-2_500), -2_000);
    }

    #[test]
    fn extreme_values_saturate() {
        assert_eq!(div_round_half_up(i64::MAX, 1), i64::MAX);
        assert_eq!(div_round_half_up(i64::MIN, 1), i64::MIN);
        assert_eq!(div_round_half_up(i64::MAX, 2), i64::MAX / 2 + 1);
        assert_eq!(round_to_second(i64::MAX), i64::MAX);
        assert_eq!(round_to_second(i64::MIN), i64::MIN);
    }

    // ── share_per_phase ───────────────────────────────────────────────────────

    #[test]
    fn share_splits_evenly() {
        assert_eq!(share_per_phase(30_000, 2), 15_000);
        assert_eq!(share_per_phase(-20_000, 2), -10_000);
    }

    #[test]
    fn share_rounds_to_whole_seconds() {
        // 2000 / 3 = 666.7 ms → 1 s
        assert_eq!(share_per_phase(2_000, 3), 1_000);
        // -57000 / 2 = -28.5 s → -28 s
        assert_eq!(share_per_phase(-57_000, 2), -28_000);
        // 1000 / 3 = 333 ms → 0
        assert_eq!(share_per_phase(1_000, 3), 0);
    }

    #[test]
    fn share_with_no_phases_is_zero() {
        assert_eq!(share_per_phase(5_000, 0), 0);
    }

    // ── clamp_delta ───────────────────────────────────────────────────────────

    #[test]
    fn clamp_delta_never_drives_duration_negative() {
        assert_eq!(clamp_delta(-5_000, 2_000), -2_000);
        assert_eq!(clamp_delta(-1_000, 2_000), -1_000);
        assert_eq!(clamp_delta(3_000, 0), 3_000);
        assert_eq!(clamp_delta(-3_000, 0), 0);
    }
}
