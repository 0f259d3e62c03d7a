//! Intersection configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! crossing:
//!   cycle_length_ms: 60000
//!   fault:
//!     duration_ms: 10000
//!     probability: 0.05
//! lights:
//!   - offset_ms: 0
//!     phases:
//!       - { state: red, duration_ms: 30000 }
//!       - { state: red_yellow, duration_ms: 2000 }
//!       - { state: green, duration_ms: 26000 }
//!       - { state: yellow, duration_ms: 2000 }
//! time_sync:
//!   endpoint: "http://localhost:50061"
//!   timeout_ms: 2000
//! ```
//!
//! Every section is optional.  A file without lights gets one light with the
//! default 60 s program.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::phase::{LightSettings, MAX_CYCLE_LENGTH_MS};
use crate::state::State;

/// Cycle length used when the file does not name one.
pub const DEFAULT_CYCLE_LENGTH_MS: i64 = 60_000;

/// Fault window used when the file does not name one.
pub const DEFAULT_FAULT_DURATION_MS: i64 = 10_000;

/// Upper bound on a single time-sync round trip when the file does not name
/// one.
pub const DEFAULT_TIME_SYNC_TIMEOUT_MS: u64 = 2_000;

// ── Error type ────────────────────────────────────────────────────────────────

/// Configuration values rejected before any light is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("cycle length must be positive, got {0}ms")]
    NonPositiveCycleLength(i64),

    #[error("cycle length must be at most {max}ms, got {0}ms", max = MAX_CYCLE_LENGTH_MS)]
    CycleLengthTooLong(i64),

    /// A zero or negative window would make every timestamp its own window.
    #[error("fault window duration must be positive, got {0}ms")]
    NonPositiveFaultDuration(i64),

    #[error("fault probability must be within [0, 1], got {0}")]
    ProbabilityOutOfRange(f64),

    #[error("light {light} has no phases")]
    EmptyLight { light: usize },

    #[error("light {light}: {state} has negative duration {duration_ms}ms")]
    NegativePhaseDuration {
        light: usize,
        state: State,
        duration_ms: i64,
    },

    /// Checked per phase and for the light's total.
    #[error(
        "light {light}: phases last {total_ms}ms, at most {max}ms allowed",
        max = MAX_CYCLE_LENGTH_MS
    )]
    ProgramTooLong { light: usize, total_ms: i64 },

    #[error("light {light}: {state} appears more than once")]
    DuplicateState { light: usize, state: State },

    /// `out_of_service` is the fault fallback and cannot be programmed.
    #[error("light {light}: {state} cannot be part of a cycle")]
    ReservedState { light: usize, state: State },
}

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Deserialize)]
struct IntersectionFile {
    #[serde(default)]
    crossing: CrossingSettings,
    #[serde(default)]
    lights: Vec<LightSettings>,
    time_sync: Option<TimeSyncEntry>,
}

#[derive(Debug, Deserialize)]
struct TimeSyncEntry {
    endpoint: String,
    #[serde(default = "default_time_sync_timeout_ms")]
    timeout_ms: u64,
}

fn default_time_sync_timeout_ms() -> u64 {
    DEFAULT_TIME_SYNC_TIMEOUT_MS
}

// ── Public data structures ────────────────────────────────────────────────────

/// Fault-simulation parameters shared by every light of the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultSettings {
    /// Length of one fault window, in ms.
    pub duration_ms: i64,

    /// Chance that any given window is faulted, `0.0..=1.0`.
    pub probability: f64,
}

impl Default for FaultSettings {
    /// 10 s windows that never fault.
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_FAULT_DURATION_MS,
            probability: 0.0,
        }
    }
}

/// Crossing-wide settings, read-only to the timing core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingSettings {
    /// Target total duration of every light's cycle, in ms.
    #[serde(default = "default_cycle_length_ms")]
    pub cycle_length_ms: i64,

    #[serde(default)]
    pub fault: FaultSettings,
}

fn default_cycle_length_ms() -> i64 {
    DEFAULT_CYCLE_LENGTH_MS
}

impl Default for CrossingSettings {
    fn default() -> Self {
        Self {
            cycle_length_ms: DEFAULT_CYCLE_LENGTH_MS,
            fault: FaultSettings::default(),
        }
    }
}

impl CrossingSettings {
    /// Checks the cycle length and the fault parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_length_ms <= 0 {
            return Err(ConfigError::NonPositiveCycleLength(self.cycle_length_ms));
        }
        if self.cycle_length_ms > MAX_CYCLE_LENGTH_MS {
            return Err(ConfigError::CycleLengthTooLong(self.cycle_length_ms));
        }
        self.fault.validate()
    }
}

impl FaultSettings {
    /// Rejects non-positive windows and probabilities outside `[0, 1]`
    /// (including NaN).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_ms <= 0 {
            return Err(ConfigError::NonPositiveFaultDuration(self.duration_ms));
        }
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::ProbabilityOutOfRange(self.probability));
        }
        Ok(())
    }
}

/// Where to ask for the network time correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSyncSettings {
    /// gRPC endpoint URI, e.g. `http://localhost:50061`.
    pub endpoint: String,
    pub timeout_ms: u64,
}

/// Fully parsed and validated intersection description.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionConfig {
    pub crossing: CrossingSettings,
    pub lights: Vec<LightSettings>,
    pub time_sync: Option<TimeSyncSettings>,
}

impl Default for IntersectionConfig {
    /// Default crossing with a single default light and no time sync.
    fn default() -> Self {
        Self {
            crossing: CrossingSettings::default(),
            lights: vec![LightSettings::default()],
            time_sync: None,
        }
    }
}

impl IntersectionConfig {
    /// Parses and validates `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, if the YAML is
    /// structurally invalid, or if any value fails [`validate`](Self::validate).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading intersection configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: IntersectionFile =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;

        let mut lights = file.lights;
        if lights.is_empty() {
            warn!("No lights found in configuration, using one default light");
            lights.push(LightSettings::default());
        }

        let config = Self {
            crossing: file.crossing,
            lights,
            time_sync: file.time_sync.map(|entry| TimeSyncSettings {
                endpoint: entry.endpoint,
                timeout_ms: entry.timeout_ms,
            }),
        };
        config.validate()?;

        info!(
            cycle_length_ms = config.crossing.cycle_length_ms,
            fault_duration_ms = config.crossing.fault.duration_ms,
            fault_probability = config.crossing.fault.probability,
            light_count = config.lights.len(),
            time_sync = config.time_sync.is_some(),
            "Loaded intersection configuration"
        );
        for (index, light) in config.lights.iter().enumerate() {
            debug!(
                "  Light {}: offset={}ms phases={:?}",
                index, light.offset_ms, light.phases
            );
        }

        Ok(config)
    }

    /// Checks the crossing settings and every light program.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.crossing.validate()?;
        for (index, light) in self.lights.iter().enumerate() {
            validate_light(index, light)?;
        }
        Ok(())
    }
}

/// Checks one light program: at least one phase, no negative durations, each
/// state at most once, no reserved state, and a total no longer than
/// [`MAX_CYCLE_LENGTH_MS`].
pub fn validate_light(light: usize, settings: &LightSettings) -> Result<(), ConfigError> {
    if settings.phases.is_empty() {
        return Err(ConfigError::EmptyLight { light });
    }

    let mut seen = HashSet::new();
    for phase in &settings.phases {
        if phase.state == State::OutOfService {
            return Err(ConfigError::ReservedState {
                light,
                state: phase.state,
            });
        }
        if phase.duration_ms < 0 {
            return Err(ConfigError::NegativePhaseDuration {
                light,
                state: phase.state,
                duration_ms: phase.duration_ms,
            });
        }
        if !seen.insert(phase.state) {
            return Err(ConfigError::DuplicateState {
                light,
                state: phase.state,
            });
        }
    }

    let total_ms = settings.total_duration_ms();
    if total_ms > MAX_CYCLE_LENGTH_MS {
        return Err(ConfigError::ProgramTooLong { light, total_ms });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    // ── load_from_file ────────────────────────────────────────────────────────

    #[test]
    fn load_full_example() {
        let yaml = r#"
crossing:
  cycle_length_ms: 90000
  fault:
    duration_ms: 5000
    probability: 0.25
lights:
  - offset_ms: 0
    phases:
      - { state: red, duration_ms: 30000 }
      - { state: red_yellow, duration_ms: 2000 }
      - { state: green, duration_ms: 26000 }
      - { state: yellow, duration_ms: 2000 }
  - offset_ms: 30000
    phases:
      - { state: red, duration_ms: 40000 }
      - { state: green, duration_ms: 20000 }
time_sync:
  endpoint: "http://localhost:50061"
"#;
        let f = yaml_tempfile(yaml);
        let cfg = IntersectionConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.crossing.cycle_length_ms, 90_000);
        assert_eq!(cfg.crossing.fault.duration_ms, 5_000);
        assert!((cfg.crossing.fault.probability - 0.25).abs() < 1e-12);
        assert_eq!(cfg.lights.len(), 2);
        assert_eq!(cfg.lights[1].offset_ms, 30_000);
        assert_eq!(
            cfg.lights[1].phases,
            vec![Phase::new(State::Red, 40_000), Phase::new(State::Green, 20_000)]
        );

        let ts = cfg.time_sync.unwrap();
        assert_eq!(ts.endpoint, "http://localhost:50061");
        assert_eq!(ts.timeout_ms, DEFAULT_TIME_SYNC_TIMEOUT_MS);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = IntersectionConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, IntersectionConfig::default());
    }

    #[test]
    fn missing_fault_section_never_faults() {
        let cfg = IntersectionConfig::from_yaml_str("crossing:\n  cycle_length_ms: 30000\n").unwrap();
        assert_eq!(cfg.crossing.cycle_length_ms, 30_000);
        assert_eq!(cfg.crossing.fault, FaultSettings::default());
    }

    #[test]
    fn missing_file_returns_error() {
        let result = IntersectionConfig::load_from_file(Path::new("/nonexistent/intersection.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(IntersectionConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn unknown_state_name_returns_error() {
        let yaml = "lights:\n  - phases:\n      - { state: purple, duration_ms: 1000 }\n";
        assert!(IntersectionConfig::from_yaml_str(yaml).is_err());
    }

    // ── validation ────────────────────────────────────────────────────────────

    fn config_error(yaml: &str) -> ConfigError {
        let err = IntersectionConfig::from_yaml_str(yaml).unwrap_err();
        err.downcast::<ConfigError>().unwrap()
    }

    #[test]
    fn zero_cycle_length_is_rejected() {
        assert_eq!(
            config_error("crossing:\n  cycle_length_ms: 0\n"),
            ConfigError::NonPositiveCycleLength(0)
        );
    }

    #[test]
    fn cycle_length_above_one_day_is_rejected() {
        assert_eq!(
            config_error("crossing:\n  cycle_length_ms: 9223372036854775807\n"),
            ConfigError::CycleLengthTooLong(i64::MAX)
        );
        let longest = format!("crossing:\n  cycle_length_ms: {MAX_CYCLE_LENGTH_MS}\n");
        assert!(IntersectionConfig::from_yaml_str(&longest).is_ok());
    }

    #[test]
    fn zero_fault_window_is_rejected() {
        let yaml = "crossing:\n  fault:\n    duration_ms: 0\n    probability: 0.5\n";
        assert_eq!(config_error(yaml), ConfigError::NonPositiveFaultDuration(0));
    }

    #[test]
    fn probability_above_one_is_rejected() {
        let yaml = "crossing:\n  fault:\n    duration_ms: 1000\n    probability: 1.5\n";
        assert_eq!(config_error(yaml), ConfigError::ProbabilityOutOfRange(1.5));
    }

    #[test]
    fn nan_probability_is_rejected() {
        let fault = FaultSettings {
            duration_ms: 1_000,
            probability: f64::NAN,
        };
        assert!(matches!(
            fault.validate(),
            Err(ConfigError::ProbabilityOutOfRange(_))
        ));
    }

    #[test]
    fn light_without_phases_is_rejected() {
        assert_eq!(
            config_error("lights:\n  - phases: []\n"),
            ConfigError::EmptyLight { light: 0 }
        );
    }

    #[test]
    fn negative_duration_is_rejected() {
        let yaml = "lights:\n  - phases:\n      - { state: red, duration_ms: -1 }\n";
        assert!(matches!(
            config_error(yaml),
            ConfigError::NegativePhaseDuration { light: 0, state: State::Red, .. }
        ));
    }

    #[test]
    fn overflowing_phase_program_is_rejected() {
        let yaml = r#"
lights:
  - phases:
      - { state: red, duration_ms: 5000000000000000000 }
      - { state: green, duration_ms: 5000000000000000000 }
"#;
        assert_eq!(
            config_error(yaml),
            ConfigError::ProgramTooLong {
                light: 0,
                total_ms: i64::MAX
            }
        );
    }

    #[test]
    fn phase_program_longer_than_one_day_is_rejected() {
        let yaml = r#"
lights:
  - phases:
      - { state: red, duration_ms: 86400000 }
      - { state: green, duration_ms: 1000 }
"#;
        assert!(matches!(
            config_error(yaml),
            ConfigError::ProgramTooLong { light: 0, total_ms: 86_401_000 }
        ));
    }

    #[test]
    fn duplicate_state_is_rejected() {
        let yaml = r#"
lights:
  - phases:
      - { state: red, duration_ms: 1000 }
  - phases:
      - { state: green, duration_ms: 1000 }
      - { state: green, duration_ms: 2000 }
"#;
        assert_eq!(
            config_error(yaml),
            ConfigError::DuplicateState {
                light: 1,
                state: State::Green
            }
        );
    }

    #[test]
    fn out_of_service_cannot_be_programmed() {
        let yaml = "lights:\n  - phases:\n      - { state: out_of_service, duration_ms: 1000 }\n";
        assert!(matches!(
            config_error(yaml),
            ConfigError::ReservedState { light: 0, .. }
        ));
    }
}
