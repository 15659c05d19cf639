//! # Proof Generation API
//!
//! `POST /api/generate-proof` accepts a multipart upload, prepares an
//! isolated run directory from the circuit template, and drives the
//! execute → prove → verify pipeline inside it.
//!
//! The pipeline runs on its own task. If the client disconnects, the
//! handler future is dropped, the drop guard cancels the run, and the task
//! still gets to clean up its run directory.

use std::sync::Arc;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;
use uuid::Uuid;
use zkcert_toolchain::{
    Discovery, Pipeline, PipelineError, PipelineResult, ProofRequest, RunRetention, RunWorkspace,
    Verification,
};

use crate::error::AppError;
use crate::state::AppState;

/// Build the proof router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/generate-proof", post(generate_proof))
}

// -- Request / Response DTOs --------------------------------------------------

/// Multipart form accepted by `POST /api/generate-proof`. Documentation
/// only; the handler reads the fields as they stream in.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct GenerateProofForm {
    /// Certificate file, DER or PEM.
    #[schema(value_type = String, format = Binary)]
    cert_file: Vec<u8>,
    /// Expected first RDN attribute; each character must be ≤ U+00FF.
    rdn_string: Option<String>,
    /// `1` or `true` enables the RDN check.
    check_rdn: Option<String>,
    /// `1` or `true` enables the validity check.
    check_validity: Option<String>,
    /// `YYMMDDhhmmssZ` or a calendar date; takes precedence over `date`.
    date_str: Option<String>,
    date: Option<String>,
}

/// Per-stage durations in milliseconds.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimingsResponse {
    pub execute_ms: u64,
    pub prove_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_ms: Option<u64>,
}

/// Successful proof generation.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProofResponse {
    pub ok: bool,
    pub run_id: Uuid,
    pub toml_path: String,
    pub witness_path: String,
    /// `newest_by_mtime` or `conventional`.
    pub witness_discovery: String,
    pub proof_path: String,
    pub proof_size: Option<u64>,
    pub proof_sha256: Option<String>,
    /// `verified`, `failed` or `skipped`.
    pub verification: String,
    pub verification_ok: bool,
    pub verify_output: Option<String>,
    pub timings: TimingsResponse,
}

impl From<PipelineResult> for ProofResponse {
    fn from(r: PipelineResult) -> Self {
        Self {
            ok: true,
            run_id: r.run_id,
            toml_path: r.document_path.display().to_string(),
            witness_path: r.witness.path.display().to_string(),
            witness_discovery: match r.witness.discovery {
                Discovery::NewestByMtime => "newest_by_mtime",
                Discovery::Conventional => "conventional",
            }
            .to_string(),
            proof_path: r.proof.path.display().to_string(),
            proof_size: r.proof_size,
            proof_sha256: r.proof_sha256,
            verification: match r.verification {
                Verification::Verified => "verified",
                Verification::Failed => "failed",
                Verification::Skipped => "skipped",
            }
            .to_string(),
            verification_ok: r.verification == Verification::Verified,
            verify_output: r.verify_output,
            timings: TimingsResponse {
                execute_ms: r.timings.execute_ms,
                prove_ms: r.timings.prove_ms,
                verify_ms: r.timings.verify_ms,
            },
        }
    }
}

// -- Handler ------------------------------------------------------------------

/// POST /api/generate-proof: Generate a proof for an uploaded certificate.
#[utoipa::path(
    post,
    path = "/api/generate-proof",
    request_body(content = GenerateProofForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Proof generated", body = ProofResponse),
        (status = 400, description = "Missing upload or invalid input", body = crate::error::ErrorBody),
        (status = 413, description = "Upload too large", body = crate::error::ErrorBody),
        (status = 500, description = "Toolchain stage failed", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
async fn generate_proof(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProofResponse>, AppError> {
    let multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = read_form(multipart).await?;
    // Reject unencodable input before copying the template.
    request.document().map_err(PipelineError::from)?;

    let workspace = RunWorkspace::prepare(&state.config.circuit_dir, &state.config.runs_dir).await?;
    tracing::info!(
        run_id = %workspace.id(),
        cert_len = request.certificate.len(),
        check_rdn = request.check_rdn,
        check_validity = request.check_validity,
        "proof requested"
    );

    let cancel = CancellationToken::new();
    let _cancel_on_disconnect = cancel.clone().drop_guard();
    let task = tokio::spawn(run_in_workspace(
        Arc::clone(&state.pipeline),
        workspace,
        request,
        state.config.retain_runs.then(|| Arc::clone(&state.retention)),
        cancel,
    ));
    let result = task
        .await
        .map_err(|e| AppError::Internal(format!("pipeline task failed: {e}")))??;

    Ok(Json(ProofResponse::from(result)))
}

async fn run_in_workspace(
    pipeline: Arc<Pipeline>,
    workspace: RunWorkspace,
    request: ProofRequest,
    retention: Option<Arc<RunRetention>>,
    cancel: CancellationToken,
) -> Result<PipelineResult, PipelineError> {
    let outcome = pipeline.run(&workspace, &request, &cancel).await;

    // Invalid input never reaches the toolchain; its directory holds nothing
    // worth inspecting.
    match retention {
        Some(retention) if !matches!(outcome, Err(PipelineError::InvalidInput(_))) => {
            retention.retain(workspace).await;
        }
        _ => {
            let dir = workspace.dir().display().to_string();
            if let Err(e) = workspace.remove().await {
                tracing::warn!(dir = %dir, error = %e, "failed to remove run directory");
            }
        }
    }
    outcome
}

/// Collected multipart fields.
#[derive(Default)]
struct ProofForm {
    certificate: Option<Vec<u8>>,
    rdn: Option<String>,
    check_rdn: Option<String>,
    check_validity: Option<String>,
    date_str: Option<String>,
    date: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<ProofRequest, AppError> {
    let mut form = ProofForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "certFile" => form.certificate = Some(field.bytes().await.map_err(multipart_error)?.to_vec()),
            "rdnString" => form.rdn = Some(field.text().await.map_err(multipart_error)?),
            "checkRdn" => form.check_rdn = Some(field.text().await.map_err(multipart_error)?),
            "checkValidity" => {
                form.check_validity = Some(field.text().await.map_err(multipart_error)?)
            }
            "dateStr" => form.date_str = Some(field.text().await.map_err(multipart_error)?),
            "date" => form.date = Some(field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }

    let certificate = form
        .certificate
        .ok_or_else(|| AppError::BadRequest("Missing certFile upload".to_string()))?;
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

    Ok(ProofRequest {
        certificate,
        rdn: form.rdn.unwrap_or_default(),
        check_rdn: is_enabled(form.check_rdn.as_deref()),
        check_validity: is_enabled(form.check_validity.as_deref()),
        date: non_empty(form.date_str).or_else(|| non_empty(form.date)),
    })
}

fn is_enabled(flag: Option<&str>) -> bool {
    matches!(flag.map(str::trim), Some("1" | "true"))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("malformed multipart body: {}", e.body_text()))
    }
}
