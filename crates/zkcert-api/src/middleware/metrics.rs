//! # Request Metrics
//!
//! Records per-request counters and latency through the `metrics` facade.
//! Whether anything is exported depends on the recorder installed by the
//! binary; without one the macros are no-ops.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware that counts requests by method and status and records their
/// duration.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!("zkcert_http_requests_total", "method" => method, "status" => status)
        .increment(1);
    metrics::histogram!("zkcert_http_request_duration_seconds")
        .record(started.elapsed().as_secs_f64());

    response
}
