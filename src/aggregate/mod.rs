pub mod store;

use std::collections::HashMap;
use std::time::Duration;

pub use store::{AggregationStore, Phase, Progress};

/// A single latency observation reported by a load-generating client.
/// The ingestion handler builds these and pushes them into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Opaque reporter identity; the empty string is a valid bucket.
    pub client_id: String,
    pub latency: Duration,
}

/// Independent copy of every client's latencies, in arrival order.
pub type Snapshot = HashMap<String, Vec<Duration>>;
