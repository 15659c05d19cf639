//! # Proof Pipeline
//!
//! Sequences one run inside its [`RunWorkspace`]:
//!
//! ```text
//! Start ─► DocumentWritten ─► WitnessExecuted ─► WitnessResolved ─► ProofGenerated ─► Done
//! ```
//!
//! Execute and prove failures abort the run. A failed verification does
//! not: the proof is still returned with `verification = failed`.
//! Verification only runs when `target/vk` exists.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use zkcert_core::certificate;
use zkcert_core::{InputDocument, InputError};

use crate::artifact::{resolve_witness, ArtifactHandle};
use crate::command::{execute_variants, prove_variants, verify_variants};
use crate::config::ToolchainConfig;
use crate::error::InvokeError;
use crate::invoker::invoke;
use crate::workspace::RunWorkspace;

/// `verify_output` when no verification key is present.
pub const VK_MISSING_MESSAGE: &str = "vk not found; skip local verification";

/// Inputs for one proof run.
#[derive(Debug, Clone, Default)]
pub struct ProofRequest {
    /// Uploaded certificate, DER or PEM.
    pub certificate: Vec<u8>,
    /// Expected first RDN attribute.
    pub rdn: String,
    pub check_rdn: bool,
    pub check_validity: bool,
    /// Canonical `YYMMDDhhmmssZ` or a calendar date.
    pub date: Option<String>,
}

impl ProofRequest {
    /// Normalize the certificate and encode every field, without touching
    /// the filesystem.
    pub fn document(&self) -> Result<InputDocument, InputError> {
        let der = certificate::normalize(&self.certificate)?;
        InputDocument::build(
            &der,
            &self.rdn,
            self.check_rdn,
            self.check_validity,
            self.date.as_deref().unwrap_or_default(),
        )
    }
}

/// Last completed pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    DocumentWritten,
    WitnessExecuted,
    WitnessResolved,
    ProofGenerated,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::DocumentWritten => "document_written",
            Self::WitnessExecuted => "witness_executed",
            Self::WitnessResolved => "witness_resolved",
            Self::ProofGenerated => "proof_generated",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the optional verify step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Verified,
    Failed,
    /// No verification key in the run directory.
    Skipped,
}

/// Wall-clock duration of each stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub execute_ms: u64,
    pub prove_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_ms: Option<u64>,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub document_path: PathBuf,
    pub witness: ArtifactHandle,
    pub proof: ArtifactHandle,
    /// Proof size in bytes; `None` when the prover reported success but
    /// left no file behind.
    pub proof_size: Option<u64>,
    /// Lowercase hex SHA-256 of the proof file.
    pub proof_sha256: Option<String>,
    pub verification: Verification,
    pub verify_output: Option<String>,
    pub stage: Stage,
    pub timings: StageTimings,
}

/// A run that did not reach [`Stage::Done`].
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The certificate or a text field could not be encoded.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// `Prover.toml` could not be written.
    #[error("failed to write input document {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Every `execute` variant failed.
    #[error("witness execution failed: {0}")]
    ExecutionFailed(#[source] InvokeError),

    /// Every `prove` variant failed.
    #[error("proof generation failed: {0}")]
    ProveFailed(#[source] InvokeError),

    /// The caller cancelled the run; the active child was killed.
    #[error("pipeline cancelled after stage {after}")]
    Cancelled { after: Stage },
}

impl PipelineError {
    /// The stage the run had completed before failing.
    pub fn last_completed(&self) -> Stage {
        match self {
            Self::InvalidInput(_) | Self::Document { .. } => Stage::Start,
            Self::ExecutionFailed(_) => Stage::DocumentWritten,
            Self::ProveFailed(_) => Stage::WitnessResolved,
            Self::Cancelled { after } => *after,
        }
    }

    /// Machine-readable name of the step that failed.
    pub fn failed_stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::Document { .. } => "document",
            Self::ExecutionFailed(_) => "execute",
            Self::ProveFailed(_) => "prove",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// The underlying invocation failure for toolchain stages.
    pub fn invoke_error(&self) -> Option<&InvokeError> {
        match self {
            Self::ExecutionFailed(e) | Self::ProveFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Runs the execute → prove → verify sequence.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: ToolchainConfig,
}

impl Pipeline {
    pub fn new(config: ToolchainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    /// Run every stage inside `workspace`.
    #[tracing::instrument(name = "pipeline", skip_all, fields(run_id = %workspace.id()))]
    pub async fn run(
        &self,
        workspace: &RunWorkspace,
        request: &ProofRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let outcome = self.run_stages(workspace, request, cancel).await;
        let label = match &outcome {
            Ok(result) => match result.verification {
                Verification::Verified => "verified",
                Verification::Failed => "verification_failed",
                Verification::Skipped => "unverified",
            },
            Err(e) => e.failed_stage(),
        };
        metrics::counter!("zkcert_pipeline_runs_total", "outcome" => label).increment(1);
        match &outcome {
            Ok(result) => tracing::info!(
                proof_size = ?result.proof_size,
                verification = ?result.verification,
                "pipeline finished"
            ),
            Err(e) => tracing::warn!(
                failed_stage = e.failed_stage(),
                last_completed = %e.last_completed(),
                error = %e,
                "pipeline aborted"
            ),
        }
        outcome
    }

    async fn run_stages(
        &self,
        workspace: &RunWorkspace,
        request: &ProofRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let cfg = &self.config;
        let dir = workspace.dir();

        // Start → DocumentWritten
        let document = request.document()?;
        let document_path = workspace.document_path();
        tokio::fs::write(&document_path, document.render())
            .await
            .map_err(|source| PipelineError::Document {
                path: document_path.display().to_string(),
                source,
            })?;
        tracing::info!(path = %document_path.display(), "input document written");

        // DocumentWritten → WitnessExecuted
        let started = Instant::now();
        invoke(
            &execute_variants(&cfg.nargo_bin, &document_path),
            dir,
            cfg.execute_timeout,
            cancel,
        )
        .await
        .map_err(|e| abort(e, Stage::DocumentWritten, PipelineError::ExecutionFailed))?;
        let execute_ms = record_stage("execute", started.elapsed());

        // WitnessExecuted → WitnessResolved
        let witness = resolve_witness(&workspace.target_dir(), &cfg.fallback_witness_name()).await;
        tracing::info!(path = %witness.path.display(), discovery = ?witness.discovery, "witness resolved");

        // WitnessResolved → ProofGenerated
        let proof = ArtifactHandle::conventional(workspace.proof_path());
        let started = Instant::now();
        invoke(
            &prove_variants(
                &cfg.bb_bin,
                &witness.path,
                &workspace.circuit_path(&cfg.circuit_name),
                &proof.path,
            ),
            dir,
            cfg.prove_timeout,
            cancel,
        )
        .await
        .map_err(|e| abort(e, Stage::WitnessResolved, PipelineError::ProveFailed))?;
        let prove_ms = record_stage("prove", started.elapsed());

        // ProofGenerated → Verified | VerificationFailed | VerificationSkipped
        let vk = workspace.vk_path();
        let (verification, verify_output, verify_ms) =
            if tokio::fs::try_exists(&vk).await.unwrap_or(false) {
                let started = Instant::now();
                let outcome = invoke(
                    &verify_variants(&cfg.bb_bin, &proof.path, &vk),
                    dir,
                    cfg.verify_timeout,
                    cancel,
                )
                .await;
                let elapsed = record_stage("verify", started.elapsed());
                match outcome {
                    Ok(result) => (Verification::Verified, Some(result.stdout), Some(elapsed)),
                    Err(InvokeError::Cancelled) => {
                        return Err(PipelineError::Cancelled {
                            after: Stage::ProofGenerated,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "proof verification failed");
                        (Verification::Failed, Some(e.to_string()), Some(elapsed))
                    }
                }
            } else {
                tracing::info!(vk = %vk.display(), "{}", VK_MISSING_MESSAGE);
                (Verification::Skipped, Some(VK_MISSING_MESSAGE.to_string()), None)
            };

        let proof_bytes = tokio::fs::read(&proof.path).await.ok();
        Ok(PipelineResult {
            run_id: workspace.id(),
            document_path,
            witness,
            proof_size: proof_bytes.as_ref().map(|b| b.len() as u64),
            proof_sha256: proof_bytes.as_deref().map(sha256_hex),
            proof,
            verification,
            verify_output,
            stage: Stage::Done,
            timings: StageTimings {
                execute_ms,
                prove_ms,
                verify_ms,
            },
        })
    }
}

fn abort(
    err: InvokeError,
    completed: Stage,
    wrap: fn(InvokeError) -> PipelineError,
) -> PipelineError {
    match err {
        InvokeError::Cancelled => PipelineError::Cancelled { after: completed },
        other => wrap(other),
    }
}

fn record_stage(stage: &'static str, elapsed: Duration) -> u64 {
    metrics::histogram!("zkcert_stage_duration_seconds", "stage" => stage)
        .record(elapsed.as_secs_f64());
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
