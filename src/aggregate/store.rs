use std::collections::HashMap;
use std::num::NonZeroU64;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use super::{Sample, Snapshot};

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe aggregation state.
/// Handlers call `accept()`, the report task calls `snapshot()`.
pub struct AggregationStore {
    target: NonZeroU64,
    inner: Mutex<Inner>,
}

/// Outcome of a single `accept()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted {
    /// Running total including this sample.
    pub total: u64,
    /// True for exactly one call: the first to reach the target.
    pub crossed: bool,
}

/// Where the collection run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Collecting,
    Reporting,
    Completed,
}

/// Counters shipped by the progress endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub phase: Phase,
    pub total_count: u64,
    pub target_count: u64,
    pub remaining: u64,
    pub clients: usize,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    records: HashMap<String, Vec<Duration>>,
    total_count: u64,
    phase: Phase,
}

// ─── AggregationStore impl ───────────────────────────────────────

impl AggregationStore {
    pub fn new(target: NonZeroU64) -> Self {
        Self {
            target,
            inner: Mutex::new(Inner {
                records: HashMap::new(),
                total_count: 0,
                phase: Phase::Collecting,
            }),
        }
    }

    pub fn target(&self) -> u64 {
        self.target.get()
    }

    /// Append one sample and check the completion threshold.
    ///
    /// The increment and the threshold check share one critical section,
    /// so under any interleaving exactly one caller sees `crossed == true`.
    pub fn accept(&self, sample: Sample) -> Accepted {
        let mut inner = self.inner.lock();

        inner
            .records
            .entry(sample.client_id)
            .or_default()
            .push(sample.latency);
        inner.total_count += 1;

        let crossed = inner.phase == Phase::Collecting
            && inner.total_count >= self.target.get();
        if crossed {
            inner.phase = Phase::Reporting;
        }

        Accepted {
            total: inner.total_count,
            crossed,
        }
    }

    /// Copy of all records as of this instant. Later `accept()` calls
    /// never touch the returned map.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().records.clone()
    }

    /// `Reporting → Completed`. Returns false if reporting never started
    /// or completion was already recorded.
    pub fn mark_completed(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase != Phase::Reporting {
            return false;
        }
        inner.phase = Phase::Completed;
        true
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn total_count(&self) -> u64 {
        self.inner.lock().total_count
    }

    pub fn progress(&self) -> Progress {
        let inner = self.inner.lock();
        let target = self.target.get();
        Progress {
            phase: inner.phase,
            total_count: inner.total_count,
            target_count: target,
            remaining: target.saturating_sub(inner.total_count),
            clients: inner.records.len(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────
