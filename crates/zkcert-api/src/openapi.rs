//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "zkcert API",
        version = "0.1.0",
        description = "Generates zero-knowledge proofs over X.509 certificates by driving the nargo/bb circuit toolchain.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(crate::routes::proof::generate_proof),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::proof::GenerateProofForm,
        crate::routes::proof::ProofResponse,
        crate::routes::proof::TimingsResponse,
    )),
    tags((name = "proofs", description = "Certificate proof generation"))
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
