/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Crossing – traffic-signal timing core
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── state         – signal states and their static attribute table
//! ├── phase         – (state, duration) phases and per-light settings
//! ├── rescale/      – keep phase durations summing to the cycle length
//! ├── light         – timestamp → active phase, next phase change
//! ├── fault         – deterministic, time-windowed fault predicate
//! ├── scheduler/    – single-timer wake scheduler + async driver
//! ├── intersection  – lights + fault generator as one editable aggregate
//! ├── clock         – corrected wall-clock time on tokio's monotonic clock
//! ├── config/       – YAML intersection configuration
//! ├── proto/        – gRPC wire types for the time-sync service
//! └── timesync      – network time correction (falls back to 0)
//! ```

pub mod clock;
pub mod config;
pub mod fault;
pub mod intersection;
pub mod light;
pub mod phase;
pub mod proto;
pub mod rescale;
pub mod scheduler;
pub mod state;
pub mod timesync;
