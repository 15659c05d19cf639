//! # zkcert-api — Axum API Service
//!
//! HTTP front end for certificate proof generation.
//!
//! ## API Surface
//!
//! | Route                       | Module             | Purpose                          |
//! |-----------------------------|--------------------|----------------------------------|
//! | `POST /api/generate-proof`  | [`routes::proof`]  | Upload certificate, run pipeline |
//! | `GET /health/liveness`      | this module        | Process is up                    |
//! | `GET /health/readiness`     | [`routes::ops`]    | Circuit template present         |
//! | `GET /metrics`              | [`routes::ops`]    | Prometheus exposition            |
//! | `GET /openapi.json`         | [`openapi`]        | Generated OpenAPI document       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → DefaultBodyLimit → Handler
//! ```

pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    // Oversized uploads surface as multipart read errors in the handler,
    // which answers with a JSON `PAYLOAD_TOO_LARGE` body.
    let proofs = routes::proof::router().layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .merge(routes::ops::router())
        .merge(openapi::router())
        .merge(proofs)
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}
