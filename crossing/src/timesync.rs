/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Network time correction.
//!
//! One `ClockService/GetTime` round trip against a reference server.  The
//! server's answer is assumed to describe the midpoint of the round trip:
//!
//! ```text
//! local:  sent ─────────── midpoint ─────────── received
//! server:                  unix_time_ms
//! correction = unix_time_ms - midpoint
//! ```
//!
//! The intersection keeps running on the local clock when the server cannot
//! be reached, so [`time_correction`] never fails: any error is logged and
//! the correction is `0`.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tonic::transport::Endpoint;
use tracing::{debug, info, warn};

use crate::proto::clock_v1::clock_service_client::ClockServiceClient;
use crate::proto::clock_v1::GetTimeRequest;

#[derive(Debug, Error)]
pub enum TimeSyncError {
    #[error("invalid time-sync endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("cannot connect to time-sync server: {0}")]
    Connect(#[from] tonic::transport::Error),

    #[error("time-sync call failed: {0}")]
    Status(#[from] tonic::Status),

    #[error("time-sync timed out after {0:?}")]
    Timeout(Duration),
}

/// `server_ms - midpoint(sent_ms, received_ms)`.
pub fn correction_from(sent_ms: i64, received_ms: i64, server_ms: i64) -> i64 {
    let midpoint = sent_ms + (received_ms - sent_ms) / 2;
    server_ms - midpoint
}

/// Query `endpoint` once and return the correction in ms.
///
/// # Errors
/// Every failure along the way: bad URI, connection, gRPC status, or the
/// whole exchange exceeding `timeout`.
pub async fn fetch_correction(endpoint: &str, timeout: Duration) -> Result<i64, TimeSyncError> {
    let endpoint_config = Endpoint::from_shared(endpoint.to_string()).map_err(|source| {
        TimeSyncError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        }
    })?;

    let exchange = async {
        let channel = endpoint_config.connect().await?;
        let mut client = ClockServiceClient::new(channel);

        let sent_ms = Utc::now().timestamp_millis();
        let response = client.get_time(GetTimeRequest {}).await?;
        let received_ms = Utc::now().timestamp_millis();

        let server_ms = response.into_inner().unix_time_ms;
        debug!(sent_ms, received_ms, server_ms, "Time-sync round trip");
        Ok::<_, TimeSyncError>(correction_from(sent_ms, received_ms, server_ms))
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| TimeSyncError::Timeout(timeout))?
}

/// Like [`fetch_correction`], but degrades to `0` on any failure.
pub async fn time_correction(endpoint: &str, timeout: Duration) -> i64 {
    match fetch_correction(endpoint, timeout).await {
        Ok(correction_ms) => {
            info!(endpoint, correction_ms, "Time synchronised");
            correction_ms
        }
        Err(e) => {
            warn!(endpoint, error = %e, "Time sync failed, running on the local clock");
            0
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
