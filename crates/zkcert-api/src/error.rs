//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps pipeline failures to HTTP status codes and JSON error bodies with a
//! machine-readable code, a message, and, for toolchain failures, the stage
//! context and an excerpt of the failing command's output.
//! Internal error details are never returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use zkcert_toolchain::{PipelineError, Stage};

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "BAD_REQUEST", "EXECUTION_FAILED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Failing stage and last completed stage; toolchain failures add an
    /// output excerpt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Context for a toolchain stage that exhausted its command variants.
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub last_completed: Stage,
    pub message: String,
    /// Bounded stderr/stdout of the last failing attempt.
    pub excerpt: Option<String>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request could not be read: missing upload or malformed form (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Certificate or text fields cannot be encoded (400).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Upload exceeds the configured body limit (413).
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// All `execute` variants failed (500).
    #[error("witness execution failed: {}", .0.message)]
    ExecutionFailed(StageFailure),

    /// All `prove` variants failed (500).
    #[error("proof generation failed: {}", .0.message)]
    ProveFailed(StageFailure),

    /// The run stopped outside the toolchain stages: preparing the run
    /// directory, writing `Prover.toml`, or cancellation (500). The stage
    /// context is returned; the message is only logged.
    #[error("run aborted at {stage}: {message}")]
    RunAborted {
        stage: &'static str,
        last_completed: Stage,
        message: String,
    },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::ExecutionFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXECUTION_FAILED"),
            Self::ProveFailed(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROVE_FAILED"),
            Self::RunAborted { .. } | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        let (stage, failure) = match self {
            Self::BadRequest(_) | Self::InvalidInput(_) | Self::PayloadTooLarge(_) => {
                return Some(serde_json::json!({
                    "stage": "input",
                    "last_completed": Stage::Start,
                }))
            }
            Self::RunAborted {
                stage,
                last_completed,
                ..
            } => {
                return Some(serde_json::json!({
                    "stage": stage,
                    "last_completed": last_completed,
                }))
            }
            Self::ExecutionFailed(f) => ("execute", f),
            Self::ProveFailed(f) => ("prove", f),
            _ => return None,
        };
        Some(serde_json::json!({
            "stage": stage,
            "last_completed": failure.last_completed,
            "excerpt": failure.excerpt,
        }))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let hidden = matches!(&self, Self::Internal(_) | Self::RunAborted { .. });
        let message = if hidden {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        if hidden {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let failure = |err: &PipelineError| StageFailure {
            last_completed: err.last_completed(),
            message: err
                .invoke_error()
                .map(ToString::to_string)
                .unwrap_or_else(|| err.to_string()),
            excerpt: err
                .invoke_error()
                .and_then(|e| e.last_failure())
                .and_then(|f| f.excerpt())
                .map(str::to_string),
        };
        match &err {
            PipelineError::InvalidInput(e) => Self::InvalidInput(e.to_string()),
            PipelineError::ExecutionFailed(_) => Self::ExecutionFailed(failure(&err)),
            PipelineError::ProveFailed(_) => Self::ProveFailed(failure(&err)),
            PipelineError::Document { .. } | PipelineError::Cancelled { .. } => Self::RunAborted {
                stage: err.failed_stage(),
                last_completed: err.last_completed(),
                message: err.to_string(),
            },
        }
    }
}

impl From<zkcert_toolchain::WorkspaceError> for AppError {
    fn from(err: zkcert_toolchain::WorkspaceError) -> Self {
        Self::RunAborted {
            stage: "workspace",
            last_completed: Stage::Start,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use zkcert_core::InputError;
    use zkcert_toolchain::{AttemptFailure, InvokeError, ProcessResult};

    fn exhausted(stderr: &str) -> InvokeError {
        InvokeError::Exhausted {
            attempts: 3,
            last: Some(AttemptFailure::Exited(ProcessResult {
                command: "nargo execute".into(),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: stderr.into(),
                success: false,
            })),
        }
    }

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            (
                AppError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_and_code(), (status, code));
        }
    }

    #[test]
    fn input_error_maps_to_400() {
        let err = AppError::from(PipelineError::InvalidInput(InputError::MalformedPem(
            "bad base64".into(),
        )));
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("bad base64")));
    }

    #[test]
    fn execution_failure_keeps_excerpt() {
        let err = AppError::from(PipelineError::ExecutionFailed(exhausted("Failed constraint")));
        let AppError::ExecutionFailed(f) = &err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(f.last_completed, Stage::DocumentWritten);
        assert_eq!(f.excerpt.as_deref(), Some("Failed constraint"));
        assert!(f.message.contains("all command variants failed"));
    }

    #[tokio::test]
    async fn cancellation_reports_stage_but_hides_message() {
        let err = AppError::from(PipelineError::Cancelled {
            after: Stage::WitnessResolved,
        });
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert_eq!(body.error.message, "An internal error occurred");
        let details = body.error.details.unwrap();
        assert_eq!(details["stage"], "cancelled");
        assert_eq!(details["last_completed"], "witness_resolved");
    }

    #[tokio::test]
    async fn document_write_failure_reports_document_stage() {
        let err = AppError::from(PipelineError::Document {
            path: "/runs/x/Prover.toml".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        let (_, body) = response_parts(err).await;
        assert!(!body.error.message.contains("/runs/x"));
        let details = body.error.details.unwrap();
        assert_eq!(details["stage"], "document");
        assert_eq!(details["last_completed"], "start");
    }

    #[tokio::test]
    async fn workspace_failure_reports_workspace_stage() {
        let err = AppError::from(zkcert_toolchain::WorkspaceError::MissingTemplate(
            "/srv/circuits".into(),
        ));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.error.message.contains("/srv/circuits"));
        let details = body.error.details.unwrap();
        assert_eq!(details["stage"], "workspace");
        assert_eq!(details["last_completed"], "start");
        assert!(details.get("excerpt").is_none());
    }

    #[tokio::test]
    async fn internal_message_is_hidden() {
        let (status, body) = response_parts(AppError::Internal("disk full at /srv".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(body.error.details.is_none());
    }

    #[tokio::test]
    async fn prove_failure_body_carries_stage_context() {
        let err = AppError::from(PipelineError::ProveFailed(exhausted("bad witness")));
        let (status, body) = response_parts(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "PROVE_FAILED");
        let details = body.error.details.unwrap();
        assert_eq!(details["stage"], "prove");
        assert_eq!(details["last_completed"], "witness_resolved");
        assert_eq!(details["excerpt"], "bad witness");
    }

    #[tokio::test]
    async fn bad_request_names_input_stage() {
        let (status, body) = response_parts(AppError::BadRequest("Missing certFile upload".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "BAD_REQUEST");
        assert!(body.error.message.contains("Missing certFile upload"));
        let details = body.error.details.unwrap();
        assert_eq!(details["stage"], "input");
        assert_eq!(details["last_completed"], "start");
    }
}
