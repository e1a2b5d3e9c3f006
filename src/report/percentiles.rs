use std::time::Duration;

use serde::Serialize;

/// Rank-based nearest-element percentile over an ascending slice.
///
/// `index = floor(n * p)`, clamped to `n - 1`. No interpolation: for
/// small `n` this deliberately answers with an observed value.
/// Returns `None` for an empty slice.
pub fn percentile_by_rank(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let index = ((sorted.len() as f64) * p) as usize;
    Some(sorted[index.min(sorted.len() - 1)])
}

/// Order statistics for one client.
/// Serialized as whole milliseconds, truncated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSummary {
    pub client_id: String,
    pub count: usize,
    #[serde(serialize_with = "as_millis")]
    pub min: Duration,
    #[serde(serialize_with = "as_millis")]
    pub max: Duration,
    #[serde(serialize_with = "as_millis")]
    pub p50: Duration,
    #[serde(serialize_with = "as_millis")]
    pub p95: Duration,
}

impl ClientSummary {
    /// Sorts `latencies` in place and extracts the summary.
    /// Returns `None` for a client with no samples.
    pub fn from_latencies(
        client_id: impl Into<String>,
        latencies: &mut [Duration],
    ) -> Option<Self> {
        if latencies.is_empty() {
            return None;
        }
        latencies.sort_unstable();

        Some(Self {
            client_id: client_id.into(),
            count: latencies.len(),
            min: latencies[0],
            max: latencies[latencies.len() - 1],
            p50: percentile_by_rank(latencies, 0.50)?,
            p95: percentile_by_rank(latencies, 0.95)?,
        })
    }
}

/// Whole milliseconds, rounded down.
pub fn millis(d: Duration) -> u128 {
    d.as_millis()
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(millis(*d)).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_slice_has_no_percentile() {
        assert_eq!(percentile_by_rank(&[], 0.5), None);
        assert_eq!(ClientSummary::from_latencies("A", &mut []), None);
    }

    #[test]
    fn single_sample_is_every_statistic() {
        let mut v = vec![ms(42)];
        let s = ClientSummary::from_latencies("solo", &mut v).unwrap();
        assert_eq!((s.min, s.max, s.p50, s.p95), (ms(42), ms(42), ms(42), ms(42)));
        assert_eq!(percentile_by_rank(&v, 0.999), Some(ms(42)));
    }

    #[test]
    fn two_samples_pick_upper_for_median_and_p95() {
        let mut v = vec![ms(100), ms(50)];
        let s = ClientSummary::from_latencies("A", &mut v).unwrap();
        assert_eq!(s.min, ms(50));
        assert_eq!(s.max, ms(100));
        assert_eq!(s.p50, ms(100));
        assert_eq!(s.p95, ms(100));
        assert_eq!(s.count, 2);
    }

    #[test]
    fn index_is_floor_of_rank() {
        let v: Vec<Duration> = (1..=10).map(ms).collect();
        // floor(10 * 0.5) = 5 → sixth element
        assert_eq!(percentile_by_rank(&v, 0.50), Some(ms(6)));
        // floor(10 * 0.95) = 9 → last element
        assert_eq!(percentile_by_rank(&v, 0.95), Some(ms(10)));
        assert_eq!(percentile_by_rank(&v, 0.0), Some(ms(1)));
    }

    #[test]
    fn rank_at_or_past_end_clamps_to_last() {
        let v: Vec<Duration> = (1..=4).map(ms).collect();
        assert_eq!(percentile_by_rank(&v, 1.0), Some(ms(4)));
        assert_eq!(percentile_by_rank(&v, 1.5), Some(ms(4)));
    }

    #[test]
    fn percentiles_stay_within_min_max_and_are_stable() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..200usize {
            let mut v: Vec<Duration> = (0..n)
                .map(|_| Duration::from_micros(rng.gen_range(0..5_000_000)))
                .collect();
            let first = ClientSummary::from_latencies("c", &mut v).unwrap();
            assert!(first.min <= first.p50 && first.p50 <= first.max);
            assert!(first.min <= first.p95 && first.p95 <= first.max);
            assert!(first.p50 <= first.p95);

            // Already sorted now; recomputing must not change anything.
            let second = ClientSummary::from_latencies("c", &mut v).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn millis_truncate() {
        assert_eq!(millis(Duration::from_nanos(1_999_999)), 1);
        assert_eq!(millis(Duration::from_nanos(999_999)), 0);
        assert_eq!(millis(Duration::from_millis(250)), 250);
    }

    #[test]
    fn summary_serializes_milliseconds() {
        let mut v = vec![Duration::from_micros(1_500), Duration::from_micros(2_700)];
        let s = ClientSummary::from_latencies("A", &mut v).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["min"], 1);
        assert_eq!(json["max"], 2);
        assert_eq!(json["client_id"], "A");
        assert_eq!(json["count"], 2);
    }
}
