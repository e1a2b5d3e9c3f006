use axum::{body::Bytes, extract::State};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aggregate::Sample;
use crate::lifecycle;
use crate::AppState;

use super::AppError;

// ─── Request types ───────────────────────────────────────────────

/// Wire shape of one report from a load-generating client.
#[derive(Debug, Deserialize)]
pub struct LatencyPayload {
    pub client_id: String,
    /// Nanoseconds.
    pub latency: u64,
}

// ─── POST /record-latency ────────────────────────────────────────

/// The body is decoded by hand rather than through `Json<T>` so that
/// every decode failure, including a missing content type, is a 400.
pub async fn record_latency(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<String, AppError> {
    let payload: LatencyPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "rejected latency payload");
        AppError::BadRequest(format!("Invalid request payload: {e}"))
    })?;

    let ack = format!("Latency recorded for client: {}", payload.client_id);
    let client_id = payload.client_id;
    let latency = Duration::from_nanos(payload.latency);

    let accepted = state.store.accept(Sample {
        client_id: client_id.clone(),
        latency,
    });
    debug!(
        client = %client_id,
        latency_us = latency.as_micros() as u64,
        total = accepted.total,
        "sample accepted"
    );

    let target = state.store.target();
    if accepted.crossed {
        info!(
            total = accepted.total,
            target,
            "completion threshold reached, generating report"
        );
        // Fire-and-forget: this response must not wait on the report.
        lifecycle::spawn_report(state.clone());
    } else if accepted.total > target {
        warn!(total = accepted.total, target, "late sample after completion threshold");
    }

    Ok(ack)
}

// ─── Tests ───────────────────────────────────────────────────────
