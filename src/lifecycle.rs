use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::report::Report;
use crate::AppState;

/// Single-fire "collection complete" event carrying the finished report.
/// `main` holds the receiver and shuts the server down when it resolves.
pub struct Completion {
    tx: Mutex<Option<oneshot::Sender<Report>>>,
}

impl Completion {
    pub fn channel() -> (Self, oneshot::Receiver<Report>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Deliver the report. Only the first call can succeed.
    pub fn fire(&self, report: Report) -> bool {
        match self.tx.lock().take() {
            Some(tx) => tx.send(report).is_ok(),
            None => false,
        }
    }

    /// Drop the sender without a report, so the waiting side sees the
    /// channel close instead of blocking forever.
    pub fn abandon(&self) -> bool {
        self.tx.lock().take().is_some()
    }
}

/// Build the report off the request path, then signal completion.
///
/// Called by the one ingestion request that crossed the threshold; the
/// request's response does not wait on this task.
pub fn spawn_report(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let snapshot = state.store.snapshot();

        // Sorting every client's latencies is CPU-bound.
        let report =
            match tokio::task::spawn_blocking(move || Report::from_snapshot(snapshot)).await {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, "report generation failed");
                    state.completion.abandon();
                    return;
                }
            };

        state.store.mark_completed();
        info!(
            clients = report.rows.len(),
            samples = report.total_samples,
            "report ready"
        );

        if !state.completion.fire(report) {
            warn!("completion already signalled, report dropped");
        }
    })
}
