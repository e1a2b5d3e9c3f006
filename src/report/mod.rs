pub mod percentiles;

use std::fmt::Write as _;

use serde::Serialize;

use crate::aggregate::Snapshot;

pub use percentiles::{millis, ClientSummary};

const RULE: &str = "---------------------------------------------------------";

/// Final summary of a collection run: one row per client that reported
/// at least one sample, ordered by client id.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub rows: Vec<ClientSummary>,
    pub total_samples: usize,
}

impl Report {
    /// Consumes a snapshot, sorting each client's latencies in place.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut total_samples = 0;
        let mut rows: Vec<ClientSummary> = snapshot
            .into_iter()
            .filter_map(|(client_id, mut latencies)| {
                total_samples += latencies.len();
                ClientSummary::from_latencies(client_id, &mut latencies)
            })
            .collect();
        rows.sort_by(|a, b| a.client_id.cmp(&b.client_id));

        Self {
            rows,
            total_samples,
        }
    }

    /// Fixed-width table, durations in whole milliseconds.
    pub fn render(&self) -> String {
        let mut out = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(out, "Final Results:");
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(
            out,
            "{:<10} | {:<10} | {:<10} | {:<10} | {:<10}",
            "ClientID", "Min", "Max", "P50", "P95"
        );
        let _ = writeln!(out, "{RULE}");
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<10} | {:<10} | {:<10} | {:<10} | {:<10}",
                row.client_id,
                millis(row.min),
                millis(row.max),
                millis(row.p50),
                millis(row.p95),
            );
        }
        let _ = writeln!(out, "{RULE}");
        let _ = writeln!(
            out,
            "{} samples from {} clients",
            self.total_samples,
            self.rows.len()
        );

        out
    }
}
