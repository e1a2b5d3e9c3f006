use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::StreamExt;

use crate::aggregate::Progress;
use crate::AppState;

/// Collection progress as served to operators.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    #[serde(flatten)]
    pub progress: Progress,
    pub started_at: DateTime<Utc>,
}

impl Stats {
    fn current(state: &AppState) -> Self {
        Self {
            progress: state.store.progress(),
            started_at: state.started_at,
        }
    }
}

// ─── GET /stats ──────────────────────────────────────────────────
/// Returns a single JSON progress snapshot, handy for curl.

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<Stats> {
    Json(Stats::current(&state))
}

// ─── GET /stats/stream ───────────────────────────────────────────
/// Server-Sent Events feed of `progress` events, one per tick. Each
/// event's id is the running sample count, so a reconnecting client can
/// tell how far collection moved while it was away.

const PROGRESS_TICK: Duration = Duration::from_millis(500);

pub async fn stats_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>>> {
    let ticks = IntervalStream::new(tokio::time::interval(PROGRESS_TICK));
    let events = ticks.map(move |_| progress_event(&Stats::current(&state)));

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn progress_event(stats: &Stats) -> Result<Event, axum::Error> {
    Event::default()
        .event("progress")
        .id(stats.progress.total_count.to_string())
        .json_data(stats)
}

#[cfg(test)]
mod tests {
    use axum::body::{self, Body};
    use axum::http::{header, Request, StatusCode};
    use std::time::Duration;
    use tokio_stream::StreamExt;
    use tower::ServiceExt;

    use crate::aggregate::Sample;
    use crate::server::test_app;

    #[tokio::test]
    async fn stats_reports_progress() {
        let (app, state, _rx) = test_app(4);
        for client in ["A", "B", "A"] {
            state.store.accept(Sample {
                client_id: client.into(),
                latency: Duration::from_millis(1),
            });
        }

        let resp = app
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["phase"], "collecting");
        assert_eq!(json["total_count"], 3);
        assert_eq!(json["target_count"], 4);
        assert_eq!(json["remaining"], 1);
        assert_eq!(json["clients"], 2);
        assert!(json["started_at"].is_string());
    }

    #[tokio::test]
    async fn stream_emits_progress_events() {
        let (app, state, _rx) = test_app(4);
        state.store.accept(Sample {
            client_id: "A".into(),
            latency: Duration::from_millis(1),
        });

        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/stats/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let mut frames = resp.into_body().into_data_stream();
        let first = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .expect("no event within timeout")
            .unwrap()
            .unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();

        assert!(text.contains("event: progress\n"), "{text}");
        assert!(text.contains("id: 1\n"), "{text}");
        let data = text
            .lines()
            .find_map(|l| l.strip_prefix("data: "))
            .unwrap_or_else(|| panic!("no data line in {text:?}"));
        let json: serde_json::Value = serde_json::from_str(data).unwrap();
        assert_eq!(json["phase"], "collecting");
        assert_eq!(json["total_count"], 1);
    }

    #[tokio::test]
    async fn stream_is_served_as_event_stream() {
        let (app, _state, _rx) = test_app(4);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/stats/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
    }
}
