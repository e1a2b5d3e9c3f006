use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// Records how long the aggregator itself spent on each request.
///
/// Load generators report round-trip latency to their inference backend,
/// not to us, so these headers are the only way to see whether reporting
/// a sample is slowed by contention on the aggregation lock. Requests
/// under `/stream` only time the handshake and are not logged.
pub async fn timing_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    stamp(response.headers_mut(), elapsed);

    if !path.ends_with("/stream") {
        debug!(
            %method,
            path = %path,
            status = response.status().as_u16(),
            us = elapsed.as_micros() as u64,
            "request"
        );
    }

    response
}

/// `X-Response-Time-Us` as integer microseconds, `Server-Timing` as
/// fractional milliseconds.
fn stamp(headers: &mut HeaderMap, elapsed: Duration) {
    headers.insert(
        "X-Response-Time-Us",
        HeaderValue::from(elapsed.as_micros() as u64),
    );
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = HeaderValue::from_str(&server_timing) {
        headers.insert("Server-Timing", val);
    }
}
