//! # Operational Endpoints
//!
//! Readiness depends on the circuit template being present, since every
//! proof run copies it. `/metrics` renders the Prometheus recorder when the
//! binary installed one.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::error::AppError;
use crate::state::AppState;

/// Build the operational router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics))
}

/// Readiness probe: 200 when the circuit directory exists, 503 otherwise.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let ready = tokio::fs::metadata(&state.config.circuit_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if ready {
        (StatusCode::OK, "ready")
    } else {
        tracing::warn!(dir = %state.config.circuit_dir.display(), "circuit directory unavailable");
        (StatusCode::SERVICE_UNAVAILABLE, "circuit directory unavailable")
    }
}

/// GET /metrics: Prometheus text exposition.
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| AppError::NotFound("metrics recorder not installed".to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
