//! # zkcert-toolchain — External Toolchain Orchestration
//!
//! Drives the circuit toolchain (`nargo` for witness generation, `bb` for
//! proving and verification) as opaque child processes.
//!
//! ## Modules
//!
//! | Module        | Responsibility                                          |
//! |---------------|---------------------------------------------------------|
//! | [`command`]   | Command variants and process results                    |
//! | [`invoker`]   | First-success-wins execution with timeout + cancel      |
//! | [`artifact`]  | Witness discovery by newest modification time           |
//! | [`workspace`] | Per-run isolated copies of the circuit project          |
//! | [`retention`] | Cap on how many finished run directories are kept       |
//! | [`pipeline`]  | execute → resolve → prove → verify sequencing           |
//!
//! ## Concurrency
//!
//! Stages of one run are strictly sequential. Separate runs never share a
//! working directory, so any number may proceed concurrently.

pub mod artifact;
pub mod command;
pub mod config;
pub mod error;
pub mod invoker;
pub mod pipeline;
pub mod retention;
pub mod workspace;

pub use artifact::{resolve_witness, ArtifactHandle, Discovery};
pub use command::{CommandVariant, ProcessResult};
pub use config::ToolchainConfig;
pub use error::{AttemptFailure, InvokeError, WorkspaceError};
pub use invoker::invoke;
pub use pipeline::{Pipeline, PipelineError, PipelineResult, ProofRequest, Stage, Verification};
pub use retention::RunRetention;
pub use tokio_util::sync::CancellationToken;
pub use workspace::RunWorkspace;
