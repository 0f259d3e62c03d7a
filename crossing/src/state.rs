/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Discrete signal states and their static attribute table.
//!
//! Every [`State`] maps to exactly one [`StateAttributes`] entry through an
//! exhaustive `match`, so adding a variant without giving it an order, a
//! priority and a lamp set is a compile error rather than a lookup miss at
//! runtime.
//!
//! ```text
//! State ──attributes()──► { order, priority, segments }
//!   │                         │       │         └─ which lamps are lit
//!   │                         │       └─ rescaling weight (>= 3 → fixable)
//!   │                         └─ canonical position in the cycle
//! ```

use serde::{Deserialize, Serialize};

/// Minimum priority a state needs for its phase to absorb automatic duration
/// adjustments.
pub const FIXABLE_PRIORITY: u8 = 3;

// ── Lamp segments ─────────────────────────────────────────────────────────────

/// One lamp of a three-aspect signal head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Red,
    Yellow,
    Green,
}

impl Segment {
    /// Lamps from top to bottom, the order a signal head shows them.
    pub const ALL: [Segment; 3] = [Segment::Red, Segment::Yellow, Segment::Green];
}

// ── Attributes ────────────────────────────────────────────────────────────────

/// Immutable, globally shared attributes of a [`State`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateAttributes {
    /// Canonical position of the state inside one cycle.
    pub order: u8,

    /// Editing weight. Phases whose state has a priority of at least
    /// [`FIXABLE_PRIORITY`] absorb duration changes during rescaling.
    pub priority: u8,

    /// Lamps lit while the state is active.
    pub segments: &'static [Segment],
}

const RED: StateAttributes = StateAttributes {
    order: 0,
    priority: 4,
    segments: &[Segment::Red],
};

const RED_YELLOW: StateAttributes = StateAttributes {
    order: 1,
    priority: 1,
    segments: &[Segment::Red, Segment::Yellow],
};

const GREEN: StateAttributes = StateAttributes {
    order: 2,
    priority: 3,
    segments: &[Segment::Green],
};

const YELLOW: StateAttributes = StateAttributes {
    order: 3,
    priority: 2,
    segments: &[Segment::Yellow],
};

// Shown flashing by the display layer; never part of a normal cycle.
const OUT_OF_SERVICE: StateAttributes = StateAttributes {
    order: 4,
    priority: 0,
    segments: &[Segment::Yellow],
};

// ── State ─────────────────────────────────────────────────────────────────────

/// Illumination state of a traffic light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    Red,
    RedYellow,
    Green,
    Yellow,
    /// Fallback shown while the intersection is faulted.
    OutOfService,
}

impl State {
    /// States that make up a regular cycle, in canonical order.
    pub const CYCLE: [State; 4] = [State::Red, State::RedYellow, State::Green, State::Yellow];

    /// Static attribute lookup. Total over every variant.
    pub fn attributes(self) -> &'static StateAttributes {
        match self {
            State::Red => &RED,
            State::RedYellow => &RED_YELLOW,
            State::Green => &GREEN,
            State::Yellow => &YELLOW,
            State::OutOfService => &OUT_OF_SERVICE,
        }
    }

    pub fn order(self) -> u8 {
        self.attributes().order
    }

    pub fn priority(self) -> u8 {
        self.attributes().priority
    }

    /// Returns `true` if phases in this state absorb automatic adjustments.
    pub fn is_fixable(self) -> bool {
        self.priority() >= FIXABLE_PRIORITY
    }

    /// Returns `true` if `segment` is lit while this state is active.
    pub fn is_lit(self, segment: Segment) -> bool {
        self.attributes().segments.contains(&segment)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Red => "red",
            State::RedYellow => "red+yellow",
            State::Green => "green",
            State::Yellow => "yellow",
            State::OutOfService => "out-of-service",
        };
        f.write_str(name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [State; 5] = [
        State::Red,
        State::RedYellow,
        State::Green,
        State::Yellow,
        State::OutOfService,
    ];

    #[test]
    fn orders_are_unique() {
        let mut orders: Vec<u8> = ALL_STATES.iter().map(|s| s.order()).collect();
        orders.sort_unstable();
        orders.dedup();
        assert_eq!(orders.len(), ALL_STATES.len());
    }

    #[test]
    fn cycle_is_listed_in_canonical_order() {
        let orders: Vec<u8> = State::CYCLE.iter().map(|s| s.order()).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn only_red_and_green_are_fixable() {
        assert!(State::Red.is_fixable());
        assert!(State::Green.is_fixable());
        assert!(!State::RedYellow.is_fixable());
        assert!(!State::Yellow.is_fixable());
        assert!(!State::OutOfService.is_fixable());
    }

    #[test]
    fn red_yellow_lights_two_lamps() {
        assert!(State::RedYellow.is_lit(Segment::Red));
        assert!(State::RedYellow.is_lit(Segment::Yellow));
        assert!(!State::RedYellow.is_lit(Segment::Green));
    }

    #[test]
    fn every_state_lights_at_least_one_lamp() {
        for state in ALL_STATES {
            assert!(
                Segment::ALL.iter().any(|&seg| state.is_lit(seg)),
                "{state} lights nothing"
            );
        }
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let yaml = serde_yaml::to_string(&State::RedYellow).unwrap();
        assert_eq!(yaml.trim(), "red_yellow");
        let back: State = serde_yaml::from_str("out_of_service").unwrap();
        assert_eq!(back, State::OutOfService);
    }
}
