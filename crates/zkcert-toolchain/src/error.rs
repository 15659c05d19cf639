//! # Toolchain Errors
//!
//! A single variant attempt can fail in three ways (could not start, ran
//! too long, exited non-zero). None of those stop the invoker; only
//! exhausting every variant or an explicit cancellation does.

use std::time::Duration;

use thiserror::Error;

use crate::command::{excerpt, ProcessResult, OUTPUT_EXCERPT_CHARS};

/// Why one command variant did not succeed.
#[derive(Error, Debug, Clone)]
pub enum AttemptFailure {
    /// The process could not be started or awaited (binary missing,
    /// permission denied, pipe failure).
    #[error("`{command}` could not be run: {message}")]
    Spawn { command: String, message: String },

    /// The process outlived its timeout and was killed.
    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    /// The process ran and exited non-zero.
    #[error("{0}")]
    Exited(ProcessResult),
}

impl AttemptFailure {
    /// Bounded output excerpt, when the process produced any.
    pub fn excerpt(&self) -> Option<&str> {
        match self {
            Self::Exited(result) => Some(result.excerpt()).filter(|s| !s.is_empty()),
            Self::Spawn { message, .. } => Some(excerpt(message, OUTPUT_EXCERPT_CHARS)),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Failure of a whole variant list.
#[derive(Error, Debug, Clone)]
pub enum InvokeError {
    /// Every variant failed. Carries the last observed failure, or `None`
    /// when the list was empty.
    #[error("all command variants failed{}", .last.as_ref().map(|f| format!(" (last: {f})")).unwrap_or_default())]
    Exhausted {
        attempts: usize,
        last: Option<AttemptFailure>,
    },

    /// The caller cancelled while a variant was running.
    #[error("invocation cancelled")]
    Cancelled,
}

impl InvokeError {
    /// The last attempt failure, if any.
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        match self {
            Self::Exhausted { last, .. } => last.as_ref(),
            Self::Cancelled => None,
        }
    }
}

/// Failure preparing or cleaning up a per-run working directory.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The circuit template directory does not exist.
    #[error("circuit directory not found: {0}")]
    MissingTemplate(String),

    /// Filesystem operation failed.
    #[error("workspace I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
