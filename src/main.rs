use std::num::NonZeroU64;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod config;
mod handlers;
mod lifecycle;
mod middleware;
mod report;
mod server;

use aggregate::AggregationStore;
use config::Config;
use lifecycle::Completion;
use report::Report;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Every accepted sample, plus the completion threshold.
    pub store: AggregationStore,

    /// Fired once by the report task; `main` waits on the other end.
    pub completion: Completion,

    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(target: NonZeroU64) -> (Arc<Self>, oneshot::Receiver<Report>) {
        let (completion, rx) = Completion::channel();
        let state = Arc::new(Self {
            store: AggregationStore::new(target),
            completion,
            started_at: Utc::now(),
        });
        (state, rx)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the final report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ── 1. Configuration (fail fast, before binding) ─────────────
    let config = Config::from_env().context("invalid startup configuration")?;
    info!(
        target_count = config.total_requests.get(),
        "starting latency aggregator"
    );

    // ── 2. Build shared state & router ───────────────────────────
    let (state, completion_rx) = AppState::new(config.total_requests);
    let app = server::create_router(state.clone(), config.request_timeout);

    // ── 3. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "latency collection server listening");

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = drain_rx.await;
            })
            .await
    });

    // ── 4. Wait for the collection-complete signal ───────────────
    let report = tokio::select! {
        report = completion_rx => report.context("completion signal dropped")?,
        joined = &mut server => {
            joined.context("server task panicked")?.context("server error")?;
            anyhow::bail!("server stopped before collection completed");
        }
    };

    // ── 5. Drain in-flight requests, bounded ─────────────────────
    let _ = drain_tx.send(());
    match tokio::time::timeout(config.shutdown_grace, &mut server).await {
        Ok(joined) => joined
            .context("server task panicked")?
            .context("server error")?,
        Err(_) => {
            warn!(
                grace_secs = config.shutdown_grace.as_secs(),
                "graceful shutdown timed out, aborting open connections"
            );
            server.abort();
        }
    }

    // ── 6. Report ────────────────────────────────────────────────
    print!("{}", report.render());
    info!(
        samples = state.store.total_count(),
        phase = ?state.store.phase(),
        "collection finished"
    );

    Ok(())
}
