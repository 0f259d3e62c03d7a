/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The intersection aggregate: crossing settings, its lights, and the fault
//! generator they share.
//!
//! [`Intersection`] is the arena behind every [`ParticipantId`]:
//! `Light(i)` is `lights[i]`, `Fault` is the generator, `CycleBoundary` the
//! watcher derived from the cycle length.  Every edit rebuilds the affected
//! [`TrafficLight`] from fresh settings; a rejected edit leaves the aggregate
//! untouched.

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{validate_light, ConfigError, CrossingSettings, IntersectionConfig};
use crate::fault::FaultGenerator;
use crate::light::{LightError, TrafficLight};
use crate::phase::{LightSettings, Phase};
use crate::rescale::{self, RescaleError};
use crate::scheduler::{CycleBoundary, ParticipantId, WakeSource};
use crate::state::State;

// ── Error type ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntersectionError {
    #[error("no light at index {index} (intersection has {count})")]
    UnknownLight { index: usize, count: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("light {index}: {source}")]
    Light {
        index: usize,
        #[source]
        source: LightError,
    },

    #[error("light {index}: {source}")]
    Rescale {
        index: usize,
        #[source]
        source: RescaleError,
    },
}

// ── Edits ─────────────────────────────────────────────────────────────────────

/// One edit applied through [`Intersection::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    AddLight,
    DeleteLights(Vec<usize>),
    ReplaceLight {
        index: usize,
        settings: LightSettings,
    },
    SetStateDuration {
        index: usize,
        state: State,
        duration_ms: i64,
    },
    SetOffset {
        index: usize,
        offset_ms: i64,
    },
    SetCrossing(CrossingSettings),
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// What observers see at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub now_ms: i64,
    pub faulted: bool,
    /// Current phase of every light, fault override applied.
    pub phases: Vec<Phase>,
}

// ── Intersection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Intersection {
    crossing: CrossingSettings,
    lights: Vec<TrafficLight>,
    fault: FaultGenerator,
    cycle: CycleBoundary,
}

impl Intersection {
    /// Build every light from `settings`, rescaled to the crossing's cycle.
    pub fn new(
        crossing: CrossingSettings,
        settings: &[LightSettings],
    ) -> Result<Self, IntersectionError> {
        crossing.validate()?;
        let fault = FaultGenerator::from_settings(&crossing.fault)?;
        let lights = settings
            .iter()
            .enumerate()
            .map(|(index, s)| build_light(index, s, &crossing))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            cycle_length_ms = crossing.cycle_length_ms,
            light_count = lights.len(),
            "Intersection ready"
        );

        Ok(Self {
            crossing,
            lights,
            fault,
            cycle: CycleBoundary {
                cycle_length_ms: crossing.cycle_length_ms,
            },
        })
    }

    pub fn from_config(config: &IntersectionConfig) -> Result<Self, IntersectionError> {
        Self::new(config.crossing, &config.lights)
    }

    pub fn crossing(&self) -> &CrossingSettings {
        &self.crossing
    }

    pub fn lights(&self) -> &[TrafficLight] {
        &self.lights
    }

    pub fn light(&self, index: usize) -> Result<&TrafficLight, IntersectionError> {
        self.lights.get(index).ok_or(IntersectionError::UnknownLight {
            index,
            count: self.lights.len(),
        })
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    pub fn faulted(&self, now_ms: i64) -> bool {
        self.fault.current_state(now_ms)
    }

    /// Current phase of every light at `now_ms`.
    pub fn phases(&self, now_ms: i64) -> Vec<Phase> {
        let faulted = self.faulted(now_ms);
        self.lights
            .iter()
            .map(|light| light.current_phase(now_ms, faulted))
            .collect()
    }

    pub fn snapshot(&self, now_ms: i64) -> Snapshot {
        Snapshot {
            now_ms,
            faulted: self.faulted(now_ms),
            phases: self.phases(now_ms),
        }
    }

    /// Everything the wake scheduler has to watch, lights first.
    pub fn participants(&self) -> Vec<(ParticipantId, &dyn WakeSource)> {
        let mut participants: Vec<(ParticipantId, &dyn WakeSource)> =
            Vec::with_capacity(self.lights.len() + 2);
        for (index, light) in self.lights.iter().enumerate() {
            participants.push((ParticipantId::Light(index), light));
        }
        participants.push((ParticipantId::Fault, &self.fault));
        participants.push((ParticipantId::CycleBoundary, &self.cycle));
        participants
    }

    // ── Edits ─────────────────────────────────────────────────────────────────

    pub fn apply(&mut self, edit: Edit) -> Result<(), IntersectionError> {
        match edit {
            Edit::AddLight => {
                self.add_light()?;
            }
            Edit::DeleteLights(indices) => {
                self.delete_lights(&indices);
            }
            Edit::ReplaceLight { index, settings } => self.replace_light(index, &settings)?,
            Edit::SetStateDuration {
                index,
                state,
                duration_ms,
            } => self.set_state_duration(index, state, duration_ms)?,
            Edit::SetOffset { index, offset_ms } => self.set_offset(index, offset_ms)?,
            Edit::SetCrossing(crossing) => self.set_crossing(crossing)?,
        }
        Ok(())
    }

    /// Append a light running the default program.  Returns its index.
    pub fn add_light(&mut self) -> Result<usize, IntersectionError> {
        let index = self.lights.len();
        let light = build_light(index, &LightSettings::default(), &self.crossing)?;
        self.lights.push(light);
        info!(index, "Added light");
        Ok(index)
    }

    /// Remove the lights at `indices`.  Unknown indices are ignored.
    ///
    /// Remaining lights shift down, so `Light(i)` ids are only stable between
    /// deletions.  Returns the number of lights removed.
    pub fn delete_lights(&mut self, indices: &[usize]) -> usize {
        let before = self.lights.len();
        for &index in indices.iter().filter(|&&i| i >= before) {
            warn!(index, count = before, "Ignoring deletion of unknown light");
        }

        let mut position = 0;
        self.lights.retain(|_| {
            let keep = !indices.contains(&position);
            position += 1;
            keep
        });

        let removed = before - self.lights.len();
        info!(removed, remaining = self.lights.len(), "Deleted lights");
        removed
    }

    /// Replace the settings of light `index`, rescaled to the cycle.
    pub fn replace_light(
        &mut self,
        index: usize,
        settings: &LightSettings,
    ) -> Result<(), IntersectionError> {
        self.light(index)?;
        let light = build_light(index, settings, &self.crossing)?;
        self.lights[index] = light;
        info!(index, "Replaced light settings");
        Ok(())
    }

    /// Give `state` a new duration on light `index`; the other phases absorb
    /// the difference.
    pub fn set_state_duration(
        &mut self,
        index: usize,
        state: State,
        duration_ms: i64,
    ) -> Result<(), IntersectionError> {
        let settings = rescale::with_state_duration(self.light(index)?.settings(), state, duration_ms)
            .map_err(|source| IntersectionError::Rescale { index, source })?;
        let light = build_light(index, &settings, &self.crossing)?;
        self.lights[index] = light;
        info!(index, %state, duration_ms, "Changed phase duration");
        Ok(())
    }

    pub fn set_offset(&mut self, index: usize, offset_ms: i64) -> Result<(), IntersectionError> {
        let settings = rescale::with_offset(self.light(index)?.settings(), offset_ms);
        let light = build_light(index, &settings, &self.crossing)?;
        self.lights[index] = light;
        info!(
            index,
            offset_ms = self.lights[index].settings().offset_ms,
            "Changed light offset"
        );
        Ok(())
    }

    /// Switch to new crossing settings, rescaling every light to the new
    /// cycle length.  All-or-nothing.
    pub fn set_crossing(&mut self, crossing: CrossingSettings) -> Result<(), IntersectionError> {
        crossing.validate()?;
        let fault = FaultGenerator::from_settings(&crossing.fault)?;
        let lights = self
            .lights
            .iter()
            .enumerate()
            .map(|(index, light)| build_light(index, light.settings(), &crossing))
            .collect::<Result<Vec<_>, _>>()?;

        self.crossing = crossing;
        self.lights = lights;
        self.fault = fault;
        self.cycle = CycleBoundary {
            cycle_length_ms: crossing.cycle_length_ms,
        };
        info!(
            cycle_length_ms = crossing.cycle_length_ms,
            fault_duration_ms = crossing.fault.duration_ms,
            fault_probability = crossing.fault.probability,
            "Changed crossing settings"
        );
        Ok(())
    }
}

fn build_light(
    index: usize,
    settings: &LightSettings,
    crossing: &CrossingSettings,
) -> Result<TrafficLight, IntersectionError> {
    validate_light(index, settings)?;
    TrafficLight::new(settings, crossing).map_err(|source| IntersectionError::Light { index, source })
}

/// Lights eligible for display: the selection, or every light when nothing
/// is selected.  Out-of-range indices are dropped.
pub fn effective_selection(selected: &[usize], light_count: usize) -> Vec<usize> {
    if selected.is_empty() {
        return (0..light_count).collect();
    }
    let mut eligible: Vec<usize> = selected
        .iter()
        .copied()
        .filter(|&index| index < light_count)
        .collect();
    eligible.sort_unstable();
    eligible.dedup();
    eligible
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaultSettings;

    fn crossing(cycle_length_ms: i64) -> CrossingSettings {
        CrossingSettings {
            cycle_length_ms,
            fault: FaultSettings::default(),
        }
    }

    fn two_lights() -> Intersection {
        let offset = LightSettings {
            offset_ms: 30_000,
            ..LightSettings::default()
        };
        Intersection::new(crossing(60_000), &[LightSettings::default(), offset]).unwrap()
    }

    #[test]
    fn phases_follow_each_light() {
        let x = two_lights();
        let states: Vec<State> = x.phases(0).iter().map(|p| p.state).collect();
        assert_eq!(states, vec![State::Red, State::RedYellow]);
        assert!(!x.faulted(0));
    }

    #[test]
    fn fault_puts_every_light_out_of_service() {
        let always = CrossingSettings {
            cycle_length_ms: 60_000,
            fault: FaultSettings {
                duration_ms: 1_000,
                probability: 1.0,
            },
        };
        let x = Intersection::new(always, &[LightSettings::default(), LightSettings::default()])
            .unwrap();
        let snapshot = x.snapshot(12_345);
        assert!(snapshot.faulted);
        assert!(snapshot
            .phases
            .iter()
            .all(|p| *p == Phase::new(State::OutOfService, 60_000)));
    }

    #[test]
    fn participants_cover_lights_fault_and_cycle() {
        let x = two_lights();
        let ids: Vec<ParticipantId> = x.participants().iter().map(|(id, _)| *id).collect();
        assert_eq!(
            ids,
            vec![
                ParticipantId::Light(0),
                ParticipantId::Light(1),
                ParticipantId::Fault,
                ParticipantId::CycleBoundary
            ]
        );
    }

    #[test]
    fn add_light_uses_default_program() {
        let mut x = two_lights();
        assert_eq!(x.add_light().unwrap(), 2);
        assert_eq!(x.lights()[2].settings(), &LightSettings::default());
    }

    #[test]
    fn delete_lights_shifts_the_rest_down() {
        let mut x = two_lights();
        x.add_light().unwrap();
        assert_eq!(x.delete_lights(&[0, 7]), 1);
        assert_eq!(x.lights().len(), 2);
        assert_eq!(x.lights()[0].settings().offset_ms, 30_000);
    }

    #[test]
    fn set_state_duration_keeps_the_cycle() {
        let mut x = two_lights();
        x.set_state_duration(0, State::Green, 20_000).unwrap();
        let settings = x.lights()[0].settings();
        assert_eq!(settings.duration_of(State::Green), Some(20_000));
        assert_eq!(settings.duration_of(State::Red), Some(36_000));
        assert_eq!(settings.total_duration_ms(), 60_000);
    }

    #[test]
    fn set_offset_snaps_to_seconds() {
        let mut x = two_lights();
        x.set_offset(1, 4_600).unwrap();
        assert_eq!(x.lights()[1].settings().offset_ms, 5_000);
    }

    #[test]
    fn set_crossing_rescales_every_light() {
        let mut x = two_lights();
        x.set_crossing(crossing(90_000)).unwrap();
        for light in x.lights() {
            assert_eq!(light.settings().total_duration_ms(), 90_000);
        }
        assert_eq!(
            x.participants()
                .last()
                .map(|(_, source)| source.next_state_timestamp(0)),
            Some(Ok(90_000))
        );
    }

    #[test]
    fn rejected_edit_leaves_state_untouched() {
        let mut x = two_lights();
        let before: Vec<LightSettings> = x.lights().iter().map(|l| l.settings().clone()).collect();

        assert!(matches!(
            x.set_crossing(crossing(0)),
            Err(IntersectionError::Config(ConfigError::NonPositiveCycleLength(0)))
        ));
        assert!(matches!(
            x.set_state_duration(0, State::Red, -1),
            Err(IntersectionError::Rescale { index: 0, .. })
        ));
        assert_eq!(
            x.replace_light(5, &LightSettings::default()),
            Err(IntersectionError::UnknownLight { index: 5, count: 2 })
        );

        let after: Vec<LightSettings> = x.lights().iter().map(|l| l.settings().clone()).collect();
        assert_eq!(before, after);
        assert_eq!(x.crossing().cycle_length_ms, 60_000);
    }

    #[test]
    fn oversized_edits_are_rejected() {
        let mut x = two_lights();
        assert_eq!(
            x.set_crossing(crossing(i64::MAX)),
            Err(IntersectionError::Config(ConfigError::CycleLengthTooLong(i64::MAX)))
        );
        assert_eq!(
            x.set_state_duration(1, State::Green, i64::MAX),
            Err(IntersectionError::Rescale {
                index: 1,
                source: RescaleError::TooLong { length_ms: i64::MAX }
            })
        );
        assert_eq!(x.crossing().cycle_length_ms, 60_000);

        // Offsets only shift the lookup; an extreme one still evaluates
        x.set_offset(0, i64::MAX).unwrap();
        let light = &x.lights()[0];
        assert!(light.next_state_timestamp(0) > 0);
    }

    #[test]
    fn apply_dispatches_edits() {
        let mut x = two_lights();
        x.apply(Edit::AddLight).unwrap();
        x.apply(Edit::SetOffset {
            index: 2,
            offset_ms: 10_000,
        })
        .unwrap();
        x.apply(Edit::DeleteLights(vec![0])).unwrap();
        assert_eq!(x.lights().len(), 2);
        assert_eq!(x.lights()[1].settings().offset_ms, 10_000);
    }

    // ── effective_selection ───────────────────────────────────────────────────

    #[test]
    fn empty_selection_means_every_light() {
        assert_eq!(effective_selection(&[], 3), vec![0, 1, 2]);
    }

    #[test]
    fn selection_is_sorted_and_bounded() {
        assert_eq!(effective_selection(&[2, 0, 2, 9], 3), vec![0, 2]);
    }
}
