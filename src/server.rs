use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        // ── Ingestion ───────────────────────────────────────────
        .route("/record-latency", post(handlers::latency::record_latency))
        // ── Progress ────────────────────────────────────────────
        .route("/stats", get(handlers::stats::get_stats))
        .route("/stats/stream", get(handlers::stats::stats_stream))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(TimeoutLayer::new(request_timeout))
}

#[cfg(test)]
pub fn test_app(
    target: u64,
) -> (
    Router,
    Arc<AppState>,
    tokio::sync::oneshot::Receiver<crate::report::Report>,
) {
    let target = std::num::NonZeroU64::new(target).expect("target must be positive");
    let (state, rx) = AppState::new(target);
    let app = create_router(state.clone(), Duration::from_secs(5));
    (app, state, rx)
}
