/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Async driver that turns the armed wake into a tokio timer.
//!
//! One task owns the [`Intersection`], the [`WakeScheduler`] and the
//! [`Clock`].  Timer expiry, edits and shutdown are handled in a single
//! `select!` loop, so nothing is shared and nothing is locked:
//!
//! ```text
//!            ┌────────── publish Snapshot (watch) ◄──────────┐
//!            ▼                                               │
//!   arm(now, participants) ──► sleep_until(armed) ──fire──► now = clock
//!            ▲                        │
//!            │                 Command (mpsc) ──► apply ─────┘
//!            │                        │
//!            └───────── cancel ◄──────┘  CancellationToken → disarm, exit
//! ```
//!
//! Published timestamps never go backwards, even when a new time correction
//! moves the clock back.

use std::future;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{DriverError, WakeScheduler};
use crate::clock::Clock;
use crate::intersection::{Edit, Intersection, Snapshot};

/// Pending commands buffered before senders wait.
const COMMAND_CAPACITY: usize = 32;

// ── Commands ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Edit the intersection.  A rejected edit is logged and dropped.
    Edit(Edit),
    /// Replace the clock's correction, e.g. once time sync answers.
    SetTimeCorrection(i64),
}

impl From<Edit> for Command {
    fn from(edit: Edit) -> Self {
        Command::Edit(edit)
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

/// Owner-side handle of a running driver.
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    cancel: CancellationToken,
    task: JoinHandle<Intersection>,
}

impl DriverHandle {
    pub async fn send(&self, command: impl Into<Command>) -> Result<(), DriverError> {
        self.commands
            .send(command.into())
            .await
            .map_err(|_| DriverError::Stopped)
    }

    /// Sender for tasks that outlive a borrow of the handle.
    pub fn commands(&self) -> mpsc::Sender<Command> {
        self.commands.clone()
    }

    /// A receiver positioned at the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Cancel the timer, stop the task and return the final intersection.
    pub async fn shutdown(self) -> Result<Intersection, DriverError> {
        self.cancel.cancel();
        Ok(self.task.await?)
    }
}

/// Start a driver task for `intersection`.  The first snapshot is published
/// before this returns.
pub fn spawn(intersection: Intersection, clock: Clock) -> DriverHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let now_ms = clock.now_ms();
    let (snapshot_tx, snapshot_rx) = watch::channel(intersection.snapshot(now_ms));
    let cancel = CancellationToken::new();

    let driver = WakeDriver {
        intersection,
        clock,
        scheduler: WakeScheduler::new(),
        commands: command_rx,
        snapshots: snapshot_tx,
        cancel: cancel.clone(),
        last_published_ms: now_ms,
    };
    let task = tokio::spawn(driver.run());

    DriverHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        cancel,
        task,
    }
}

// ── Driver task ───────────────────────────────────────────────────────────────

struct WakeDriver {
    intersection: Intersection,
    clock: Clock,
    scheduler: WakeScheduler,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<Snapshot>,
    cancel: CancellationToken,
    last_published_ms: i64,
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

impl WakeDriver {
    async fn run(mut self) -> Intersection {
        info!(
            lights = self.intersection.lights().len(),
            correction_ms = self.clock.correction_ms(),
            "Wake driver started"
        );
        let mut commands_open = true;

        loop {
            let now_ms = self.last_published_ms;
            let deadline = self
                .scheduler
                .arm(now_ms, self.intersection.participants())
                .map(|wake| self.clock.instant_at(wake.at_ms));

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.scheduler.disarm();
                    break;
                }
                _ = sleep_until(deadline) => {
                    let now_ms = self.clock.now_ms();
                    if let Some(wake) = self.scheduler.fire(now_ms) {
                        debug!(at_ms = wake.at_ms, participant = %wake.participant, "Wake fired");
                    }
                    self.publish();
                }
                command = self.commands.recv(), if commands_open => match command {
                    Some(command) => {
                        self.handle(command);
                        self.publish();
                    }
                    None => {
                        debug!("All command senders dropped");
                        commands_open = false;
                    }
                },
            }
        }

        info!("Wake driver stopped");
        self.intersection
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Edit(edit) => {
                debug!(?edit, "Applying edit");
                if let Err(e) = self.intersection.apply(edit) {
                    warn!(error = %e, "Edit rejected");
                }
            }
            Command::SetTimeCorrection(correction_ms) => {
                info!(correction_ms, "Time correction updated");
                self.clock = self.clock.with_correction(correction_ms);
            }
        }
    }

    /// Recompute now, clamp it to be non-decreasing, and publish.
    fn publish(&mut self) {
        let clock_ms = self.clock.now_ms();
        if clock_ms < self.last_published_ms {
            debug!(
                clock_ms,
                last_published_ms = self.last_published_ms,
                "Clock moved back, holding the published time"
            );
        }
        let now_ms = clock_ms.max(self.last_published_ms);
        self.last_published_ms = now_ms;

        let snapshot = self.intersection.snapshot(now_ms);
        debug!(now_ms, faulted = snapshot.faulted, "Publishing snapshot");
        self.snapshots.send_replace(snapshot);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
