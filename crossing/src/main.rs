/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::future;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use crossing::clock::Clock;
use crossing::config::IntersectionConfig;
use crossing::intersection::{effective_selection, Intersection, Snapshot};
use crossing::scheduler::driver::{self, Command};
use crossing::state::Segment;
use crossing::timesync;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Crossing traffic-light simulator.
///
/// Example:
///   crossing -c config/intersection.yaml -t http://localhost:50061 -r 120 -s 0 -s 2
#[derive(Debug, Parser)]
#[command(
    name = "crossing",
    about = "Crossing – traffic-light timing simulator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML intersection configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Time-sync gRPC endpoint; overrides the one in the configuration file.
    #[arg(short = 't', long = "time-sync")]
    time_sync: Option<String>,

    /// Fixed clock correction in ms; skips network time sync.
    #[arg(long = "time-correction", allow_hyphen_values = true)]
    time_correction: Option<i64>,

    /// Stop after this many seconds (default: run until Ctrl-C).
    #[arg(short = 'r', long = "run-for")]
    run_for: Option<u64>,

    /// Light index to display; repeat for several.  Default: every light.
    #[arg(short = 's', long = "select")]
    select: Vec<usize>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Initialise structured logging.
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Crossing starting up...");

    // ── Parse CLI arguments ───────────────────────────────────────────────────
    let cli = Cli::parse();

    info!(
        config          = ?cli.config,
        time_sync       = ?cli.time_sync,
        time_correction = ?cli.time_correction,
        run_for         = ?cli.run_for,
        select          = ?cli.select,
        "Configuration"
    );

    // ── Load intersection configuration ───────────────────────────────────────
    let config = match &cli.config {
        Some(path) => match IntersectionConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load intersection configuration: {:#}", e);
                process::exit(1);
            }
        },
        None => {
            warn!("No configuration file provided, using default intersection settings");
            IntersectionConfig::default()
        }
    };

    let intersection = match Intersection::from_config(&config) {
        Ok(intersection) => intersection,
        Err(e) => {
            error!("Failed to build intersection: {}", e);
            process::exit(1);
        }
    };

    // ── Start the wake driver ─────────────────────────────────────────────────
    let clock = Clock::system().with_correction(cli.time_correction.unwrap_or(0));
    let handle = driver::spawn(intersection, clock);

    // Time sync runs in the background; the correction arrives as a command.
    if cli.time_correction.is_none() {
        let endpoint = cli
            .time_sync
            .clone()
            .or_else(|| config.time_sync.as_ref().map(|ts| ts.endpoint.clone()));
        if let Some(endpoint) = endpoint {
            let timeout = Duration::from_millis(
                config
                    .time_sync
                    .as_ref()
                    .map_or(crossing::config::DEFAULT_TIME_SYNC_TIMEOUT_MS, |ts| ts.timeout_ms),
            );
            let commands = handle.commands();
            tokio::spawn(async move {
                let correction_ms = timesync::time_correction(&endpoint, timeout).await;
                if commands
                    .send(Command::SetTimeCorrection(correction_ms))
                    .await
                    .is_err()
                {
                    warn!("Wake driver stopped before time sync finished");
                }
            });
        }
    }

    // ── Log snapshots until Ctrl-C or --run-for elapses ───────────────────────
    let mut snapshots = handle.subscribe();
    log_snapshot(&snapshots.borrow_and_update(), &cli.select);

    let deadline = async {
        match cli.run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("Wake driver stopped unexpectedly");
                    break;
                }
                log_snapshot(&snapshots.borrow_and_update(), &cli.select);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            _ = &mut deadline => {
                info!("Run time elapsed, shutting down");
                break;
            }
        }
    }

    match handle.shutdown().await {
        Ok(intersection) => info!(lights = intersection.lights().len(), "Crossing stopped"),
        Err(e) => {
            error!("Wake driver failed: {}", e);
            process::exit(1);
        }
    }
}

// ── Snapshot logging ──────────────────────────────────────────────────────────

/// One log line per eligible light: state plus a lamp column, top to bottom.
fn log_snapshot(snapshot: &Snapshot, select: &[usize]) {
    info!(now_ms = snapshot.now_ms, faulted = snapshot.faulted, "Tick");
    for index in effective_selection(select, snapshot.phases.len()) {
        let phase = snapshot.phases[index];
        let lamps: String = Segment::ALL
            .iter()
            .map(|&segment| if phase.state.is_lit(segment) { '●' } else { '○' })
            .collect();
        info!(
            "  Light {index}: [{lamps}] {state} ({duration}ms)",
            state = phase.state,
            duration = phase.duration_ms,
        );
    }
}
