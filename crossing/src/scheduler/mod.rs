//! Wake scheduler: one timer for every "when do I next change" producer.
//!
//! Each participant (every light, the fault generator, the cycle-boundary
//! watcher) reports the next timestamp at which its output may change.  The
//! scheduler pushes those reports into a min-heap and arms a single wake at
//! the earliest one.  When it fires, the driver recomputes "now", publishes
//! it and arms again.
//!
//! ```text
//!  Light(0) ──┐
//!  Light(1) ──┤  next_state_timestamp(now)
//!  Fault    ──┼──────────────────────────► BinaryHeap<Reverse<Wake>> ──► armed
//!  Cycle    ──┘                                 (min first)
//! ```
//!
//! # Design decisions
//!
//! | Topic | Choice |
//! |---|---|
//! | Participant identity | [`ParticipantId`] index into the intersection, no back-references |
//! | Pending timers | exactly one; [`WakeScheduler::arm`] replaces the previous wake |
//! | Misbehaving participant | logged and skipped for the current tick |
//! | Time source | `now` is an explicit parameter; only [`driver`] reads the clock |

pub mod driver;
pub mod error;

pub use error::{DriverError, ParticipantError, WakeError};

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::{debug, warn};

// ── Participants ──────────────────────────────────────────────────────────────

/// Index of a wake participant inside the intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParticipantId {
    Light(usize),
    Fault,
    CycleBoundary,
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParticipantId::Light(index) => write!(f, "light {}", index),
            ParticipantId::Fault => f.write_str("fault generator"),
            ParticipantId::CycleBoundary => f.write_str("cycle boundary"),
        }
    }
}

/// Anything that can tell when its observable output next changes.
pub trait WakeSource {
    /// Smallest timestamp after `now_ms` at which the output may differ.
    fn next_state_timestamp(&self, now_ms: i64) -> Result<i64, WakeError>;
}

/// Fires at every multiple of the cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBoundary {
    pub cycle_length_ms: i64,
}

impl WakeSource for CycleBoundary {
    fn next_state_timestamp(&self, now_ms: i64) -> Result<i64, WakeError> {
        now_ms
            .div_euclid(self.cycle_length_ms)
            .checked_add(1)
            .and_then(|cycles| cycles.checked_mul(self.cycle_length_ms))
            .ok_or(WakeError::Overflow)
    }
}

// ── Wake ──────────────────────────────────────────────────────────────────────

/// A pending wake-up.  Ordered by time, ties broken by participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Wake {
    pub at_ms: i64,
    pub participant: ParticipantId,
}

// ── WakeScheduler ─────────────────────────────────────────────────────────────

/// Coalesces all participants' next-change reports into one armed wake.
///
/// Holds no clock and no timer itself: the [`driver`] task turns the armed
/// wake into a tokio sleep.
#[derive(Debug, Default)]
pub struct WakeScheduler {
    queue: BinaryHeap<Reverse<Wake>>,
    armed: Option<Wake>,
}

impl WakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query every participant at `now_ms` and arm the earliest report.
    ///
    /// Any previously armed wake is cancelled.  Returns the new armed wake, or
    /// `None` if no participant reported a usable timestamp.
    pub fn arm<'a, I>(&mut self, now_ms: i64, participants: I) -> Option<Wake>
    where
        I: IntoIterator<Item = (ParticipantId, &'a dyn WakeSource)>,
    {
        self.queue.clear();

        for (participant, source) in participants {
            let report = source
                .next_state_timestamp(now_ms)
                .and_then(|next_ms| {
                    if next_ms > now_ms {
                        Ok(next_ms)
                    } else {
                        Err(WakeError::NotInFuture { next_ms, now_ms })
                    }
                });

            match report {
                Ok(at_ms) => self.queue.push(Reverse(Wake { at_ms, participant })),
                Err(e) => {
                    let e = e.for_participant(participant);
                    warn!(now_ms, error = %e, "Skipping wake participant");
                }
            }
        }

        if let Some(previous) = self.armed.take() {
            debug!(at_ms = previous.at_ms, participant = %previous.participant, "Cancelled pending wake");
        }
        self.armed = self.queue.peek().map(|Reverse(wake)| *wake);

        match self.armed {
            Some(wake) => debug!(
                now_ms,
                at_ms = wake.at_ms,
                participant = %wake.participant,
                reports = self.queue.len(),
                "Armed wake"
            ),
            None => warn!(now_ms, "No participant reported a next change, nothing armed"),
        }
        self.armed
    }

    /// The wake currently armed, if any.
    pub fn armed(&self) -> Option<Wake> {
        self.armed
    }

    /// Cancel the armed wake.
    pub fn disarm(&mut self) -> Option<Wake> {
        self.queue.clear();
        self.armed.take()
    }

    /// Consume the armed wake if it is due at `now_ms`.
    pub fn fire(&mut self, now_ms: i64) -> Option<Wake> {
        match self.armed {
            Some(wake) if wake.at_ms <= now_ms => self.armed.take(),
            _ => None,
        }
    }

    /// Every report from the last [`arm`](Self::arm), earliest first.
    pub fn upcoming(&self) -> Vec<Wake> {
        let mut wakes: Vec<Wake> = self.queue.iter().map(|Reverse(w)| *w).collect();
        wakes.sort_unstable();
        wakes
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Participant that always reports a fixed result.
    struct Fixed(Result<i64, WakeError>);

    impl WakeSource for Fixed {
        fn next_state_timestamp(&self, _now_ms: i64) -> Result<i64, WakeError> {
            self.0.clone()
        }
    }

    fn participants(sources: &[Fixed]) -> Vec<(ParticipantId, &dyn WakeSource)> {
        sources
            .iter()
            .enumerate()
            .map(|(i, s)| (ParticipantId::Light(i), s as &dyn WakeSource))
            .collect()
    }

    #[test]
    fn earliest_report_is_armed() {
        let sources = [Fixed(Ok(1_000)), Fixed(Ok(5_000)), Fixed(Ok(3_000))];
        let mut scheduler = WakeScheduler::new();

        let wake = scheduler.arm(0, participants(&sources));

        assert_eq!(
            wake,
            Some(Wake {
                at_ms: 1_000,
                participant: ParticipantId::Light(0)
            })
        );
        assert_eq!(scheduler.armed(), wake);
        let upcoming: Vec<i64> = scheduler.upcoming().iter().map(|w| w.at_ms).collect();
        assert_eq!(upcoming, vec![1_000, 3_000, 5_000]);
    }

    #[test]
    fn arming_again_replaces_the_pending_wake() {
        let mut scheduler = WakeScheduler::new();
        scheduler.arm(0, participants(&[Fixed(Ok(1_000))]));
        let wake = scheduler.arm(0, participants(&[Fixed(Ok(7_000))]));

        assert_eq!(wake.map(|w| w.at_ms), Some(7_000));
        assert_eq!(scheduler.upcoming().len(), 1);
    }

    #[test]
    fn failing_participant_does_not_block_others() {
        let sources = [
            Fixed(Err(WakeError::Overflow)),
            Fixed(Ok(4_000)),
            Fixed(Ok(500)), // not after now
        ];
        let mut scheduler = WakeScheduler::new();

        let wake = scheduler.arm(500, participants(&sources));

        assert_eq!(
            wake,
            Some(Wake {
                at_ms: 4_000,
                participant: ParticipantId::Light(1)
            })
        );
        assert_eq!(scheduler.upcoming().len(), 1);
    }

    #[test]
    fn nothing_armed_without_usable_reports() {
        let mut scheduler = WakeScheduler::new();
        assert_eq!(scheduler.arm(0, participants(&[Fixed(Ok(0))])), None);
        assert_eq!(scheduler.arm(0, Vec::new()), None);
        assert_eq!(scheduler.armed(), None);
    }

    #[test]
    fn ties_break_by_participant() {
        let sources = [Fixed(Ok(2_000)), Fixed(Ok(2_000))];
        let mut scheduler = WakeScheduler::new();
        let wake = scheduler.arm(0, participants(&sources));
        assert_eq!(wake.map(|w| w.participant), Some(ParticipantId::Light(0)));
    }

    #[test]
    fn fire_consumes_only_due_wakes() {
        let mut scheduler = WakeScheduler::new();
        scheduler.arm(0, participants(&[Fixed(Ok(1_000))]));

        assert_eq!(scheduler.fire(999), None);
        assert_eq!(scheduler.fire(1_000).map(|w| w.at_ms), Some(1_000));
        assert_eq!(scheduler.armed(), None);
    }

    #[test]
    fn disarm_cancels_the_pending_wake() {
        let mut scheduler = WakeScheduler::new();
        scheduler.arm(0, participants(&[Fixed(Ok(1_000))]));
        assert!(scheduler.disarm().is_some());
        assert_eq!(scheduler.armed(), None);
        assert!(scheduler.upcoming().is_empty());
    }

    // ── CycleBoundary ─────────────────────────────────────────────────────────

    #[test]
    fn cycle_boundary_reports_next_multiple() {
        let boundary = CycleBoundary {
            cycle_length_ms: 60_000,
        };
        assert_eq!(boundary.next_state_timestamp(0), Ok(60_000));
        assert_eq!(boundary.next_state_timestamp(59_999), Ok(60_000));
        assert_eq!(boundary.next_state_timestamp(60_000), Ok(120_000));
        assert_eq!(boundary.next_state_timestamp(-1), Ok(0));
    }

    #[test]
    fn cycle_boundary_overflow_is_an_error() {
        let boundary = CycleBoundary {
            cycle_length_ms: 60_000,
        };
        assert_eq!(
            boundary.next_state_timestamp(i64::MAX),
            Err(WakeError::Overflow)
        );
    }
}
