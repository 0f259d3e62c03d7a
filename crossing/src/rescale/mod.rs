//! Phase-duration rescaling.
//!
//! Two pure entry points keep a light's phases consistent with the crossing's
//! cycle length:
//!
//! * [`rescale`] – stretch or shrink a whole phase list to a new target
//!   length (used when the cycle length changes or a light is built).
//! * [`with_state_duration`] – edit one phase and let the others absorb the
//!   difference so the total stays put.
//!
//! Only *fixable* phases (see [`State::is_fixable`]) absorb automatic
//! adjustments; short transitional phases keep their duration unless nothing
//! else can give.
//!
//! # Failure model
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Target length negative | `Err(NegativeCycleLength)` |
//! | Edited or input duration negative | `Err(NegativeDuration)` |
//! | Target, edited duration or phase total above [`MAX_CYCLE_LENGTH_MS`] | `Err(TooLong)` |
//! | Remainder left after every pass (empty phase list) | `Err(Unsatisfiable)`, never a silently short list |

pub mod math;

use tracing::{debug, warn};

use crate::phase::{sort_by_order, total_duration_ms, LightSettings, Phase, MAX_CYCLE_LENGTH_MS};
use crate::state::State;
use math::{clamp_delta, round_to_second, share_per_phase};

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors returned by the rescaling entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RescaleError {
    /// The requested cycle length is below zero.
    NegativeCycleLength { target_ms: i64 },

    /// A phase edit asked for a negative duration, or an input phase has one.
    NegativeDuration { state: State, duration_ms: i64 },

    /// A target, a phase or the sum of a phase list exceeds
    /// [`MAX_CYCLE_LENGTH_MS`].
    TooLong { length_ms: i64 },

    /// The fallback pass could not place the whole difference.
    ///
    /// Only reachable when there is no phase at all to stretch.
    Unsatisfiable { target_ms: i64, remainder_ms: i64 },
}

impl std::fmt::Display for RescaleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RescaleError::NegativeCycleLength { target_ms } => {
                write!(f, "cycle length {target_ms}ms is negative")
            }
            RescaleError::NegativeDuration { state, duration_ms } => {
                write!(f, "duration {duration_ms}ms for {state} is negative")
            }
            RescaleError::TooLong { length_ms } => write!(
                f,
                "length {length_ms}ms exceeds the {MAX_CYCLE_LENGTH_MS}ms limit"
            ),
            RescaleError::Unsatisfiable {
                target_ms,
                remainder_ms,
            } => write!(
                f,
                "cannot rescale phases to {target_ms}ms: {remainder_ms}ms left unassigned"
            ),
        }
    }
}

impl std::error::Error for RescaleError {}

// ── Passes ────────────────────────────────────────────────────────────────────

/// The three passes of [`rescale`], tried in order until nothing is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    /// Every fixable phase takes an equal, second-rounded share.
    EvenShare,
    /// Fixable phases take the whole remainder, first come first served.
    FixableRemainder,
    /// Any phase takes the whole remainder.
    AnyRemainder,
}

impl Pass {
    const ORDER: [Pass; 3] = [
        Pass::EvenShare,
        Pass::FixableRemainder,
        Pass::AnyRemainder,
    ];

    fn applies_to(self, phase: &Phase) -> bool {
        match self {
            Pass::EvenShare | Pass::FixableRemainder => phase.state.is_fixable(),
            Pass::AnyRemainder => true,
        }
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Rescale `phases` so their durations sum to exactly `target_ms`.
///
/// Phases are visited largest first.  The difference is spread over the
/// fixable phases in a second-rounded even share, then whatever rounding or
/// clamping left over goes to the first fixable phase able to take it, and
/// finally to any phase at all.  Durations are clamped at zero throughout.
/// The result is sorted by canonical state order.
///
/// A list that already has the right length is returned unchanged.
///
/// # Errors
/// * [`RescaleError::NegativeCycleLength`] – `target_ms < 0`.
/// * [`RescaleError::NegativeDuration`] – an input phase is negative.
/// * [`RescaleError::TooLong`] – target or input total above the limit.
/// * [`RescaleError::Unsatisfiable`] – no phase could take the remainder.
pub fn rescale(phases: &[Phase], target_ms: i64) -> Result<Vec<Phase>, RescaleError> {
    if target_ms < 0 {
        return Err(RescaleError::NegativeCycleLength { target_ms });
    }
    if target_ms > MAX_CYCLE_LENGTH_MS {
        return Err(RescaleError::TooLong {
            length_ms: target_ms,
        });
    }
    let total_ms = checked_total(phases)?;

    let diff = target_ms - total_ms;
    if diff == 0 {
        return Ok(phases.to_vec());
    }

    let fixable_count = phases.iter().filter(|p| p.state.is_fixable()).count();
    let even_share = share_per_phase(diff, fixable_count);

    let mut fixed: Vec<Phase> = phases.to_vec();
    fixed.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));

    let mut remainder = diff;
    for pass in Pass::ORDER {
        if remainder == 0 {
            break;
        }
        for phase in fixed.iter_mut().filter(|p| pass.applies_to(p)) {
            let wanted = match pass {
                Pass::EvenShare => even_share,
                Pass::FixableRemainder | Pass::AnyRemainder => remainder,
            };
            let applied = clamp_delta(wanted, phase.duration_ms);
            phase.duration_ms += applied;
            remainder -= applied;
        }
        debug!(?pass, remainder_ms = remainder, "rescale pass done");
    }

    if remainder != 0 {
        warn!(
            target_ms,
            remainder_ms = remainder,
            phase_count = phases.len(),
            "rescale could not place the whole difference"
        );
        return Err(RescaleError::Unsatisfiable {
            target_ms,
            remainder_ms: remainder,
        });
    }

    debug!(
        target_ms,
        diff_ms = diff,
        fixable_count,
        even_share_ms = even_share,
        "rescaled phases"
    );

    sort_by_order(&mut fixed);
    Ok(fixed)
}

/// Set the phase for `state` to `new_duration_ms`, keeping the total length.
///
/// The difference is taken from (or given to) the other fixable phases,
/// lowest priority first.  A phase that would go negative is clamped at zero
/// and passes the rest on.  Whatever none of them could take is folded back
/// into the edited phase.  Non-fixable phases are never touched.
///
/// A state the light does not have yet is added with the new duration.
///
/// # Errors
/// * [`RescaleError::NegativeDuration`] – `new_duration_ms < 0`, or a
///   phase of `settings` is negative.
/// * [`RescaleError::TooLong`] – `new_duration_ms` or the current total
///   above the limit.
pub fn with_state_duration(
    settings: &LightSettings,
    state: State,
    new_duration_ms: i64,
) -> Result<LightSettings, RescaleError> {
    if new_duration_ms < 0 {
        return Err(RescaleError::NegativeDuration {
            state,
            duration_ms: new_duration_ms,
        });
    }
    if new_duration_ms > MAX_CYCLE_LENGTH_MS {
        return Err(RescaleError::TooLong {
            length_ms: new_duration_ms,
        });
    }
    checked_total(&settings.phases)?;

    let old_duration_ms = settings.duration_of(state).unwrap_or(0);
    let mut diff = old_duration_ms - new_duration_ms;

    let (mut fixable, unfixable): (Vec<Phase>, Vec<Phase>) = settings
        .phases
        .iter()
        .copied()
        .filter(|p| p.state != state)
        .partition(|p| p.state.is_fixable());
    fixable.sort_by_key(|p| p.state.priority());

    let mut phases = Vec::with_capacity(settings.phases.len() + 1);
    for phase in fixable {
        let before = phase.duration_ms;
        phases.push(Phase::new(phase.state, (before + diff).max(0)));
        diff = if diff < 0 && before < -diff {
            diff + before
        } else {
            0
        };
    }

    if diff != 0 {
        debug!(
            %state,
            residual_ms = diff,
            "other phases exhausted, residual folded into edited phase"
        );
    }
    phases.push(Phase::new(state, new_duration_ms + diff));
    phases.extend(unfixable);
    sort_by_order(&mut phases);

    Ok(LightSettings {
        offset_ms: settings.offset_ms,
        phases,
    })
}

/// Total of `phases` once every duration is known to be in
/// `[0, MAX_CYCLE_LENGTH_MS]` and so is the sum.
///
/// Every later step of a rescale stays within twice the limit.
fn checked_total(phases: &[Phase]) -> Result<i64, RescaleError> {
    if let Some(phase) = phases.iter().find(|p| p.duration_ms < 0) {
        return Err(RescaleError::NegativeDuration {
            state: phase.state,
            duration_ms: phase.duration_ms,
        });
    }
    let total_ms = total_duration_ms(phases);
    if total_ms > MAX_CYCLE_LENGTH_MS {
        return Err(RescaleError::TooLong { length_ms: total_ms });
    }
    Ok(total_ms)
}

/// Replace the offset, rounded to the nearest whole second.
pub fn with_offset(settings: &LightSettings, offset_ms: i64) -> LightSettings {
    LightSettings {
        offset_ms: round_to_second(offset_ms),
        phases: settings.phases.clone(),
    }
}

/// [`rescale`] applied to a whole [`LightSettings`]; the offset is snapped to
/// the second grid on the way through.
pub fn rescale_settings(
    settings: &LightSettings,
    target_ms: i64,
) -> Result<LightSettings, RescaleError> {
    Ok(LightSettings {
        offset_ms: round_to_second(settings.offset_ms),
        phases: rescale(&settings.phases, target_ms)?,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
