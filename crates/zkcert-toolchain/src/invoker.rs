//! # Toolchain Invoker
//!
//! Runs a [`CommandVariant`] list in order and returns the first result
//! with exit status 0. Spawn errors, timeouts and non-zero exits fall
//! through to the next variant; cancellation does not.
//!
//! Children are spawned with `kill_on_drop`, so dropping the wait future
//! (timeout elapsed, token cancelled, caller went away) kills the process.
//! Each output stream is captured up to [`MAX_CAPTURED_OUTPUT_BYTES`].

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::command::{
    excerpt, CommandVariant, ProcessResult, MAX_CAPTURED_OUTPUT_BYTES, OUTPUT_EXCERPT_CHARS,
};
use crate::error::{AttemptFailure, InvokeError};

enum Attempt {
    Completed(ProcessResult),
    Failed(AttemptFailure),
    Cancelled,
}

/// Try each variant in `variants` until one exits 0.
pub async fn invoke(
    variants: &[CommandVariant],
    working_dir: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ProcessResult, InvokeError> {
    let mut last = None;
    for (i, variant) in variants.iter().enumerate() {
        tracing::info!(
            command = %variant,
            attempt = i + 1,
            of = variants.len(),
            "running toolchain command"
        );
        match run_variant(variant, working_dir, timeout, cancel).await {
            Attempt::Completed(result) if result.success => return Ok(result),
            Attempt::Completed(result) => {
                tracing::warn!(command = %variant, exit_code = ?result.exit_code, "command failed");
                last = Some(AttemptFailure::Exited(result));
            }
            Attempt::Failed(failure) => {
                tracing::warn!(command = %variant, error = %failure, "command could not complete");
                last = Some(failure);
            }
            Attempt::Cancelled => {
                tracing::warn!(command = %variant, "command cancelled; child killed");
                return Err(InvokeError::Cancelled);
            }
        }
    }
    Err(InvokeError::Exhausted {
        attempts: variants.len(),
        last,
    })
}

async fn run_variant(
    variant: &CommandVariant,
    working_dir: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Attempt {
    if cancel.is_cancelled() {
        return Attempt::Cancelled;
    }

    let child = Command::new(&variant.program)
        .args(&variant.args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            return Attempt::Failed(AttemptFailure::Spawn {
                command: variant.to_string(),
                message: e.to_string(),
            })
        }
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let collect = async {
        let (status, stdout, stderr) = tokio::try_join!(
            child.wait(),
            read_capped(stdout, MAX_CAPTURED_OUTPUT_BYTES),
            read_capped(stderr, MAX_CAPTURED_OUTPUT_BYTES),
        )?;
        Ok::<_, std::io::Error>(Output {
            status,
            stdout,
            stderr,
        })
    };

    let waited = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Attempt::Cancelled,
        waited = tokio::time::timeout(timeout, collect) => waited,
    };

    match waited {
        Err(_elapsed) => Attempt::Failed(AttemptFailure::TimedOut {
            command: variant.to_string(),
            timeout,
        }),
        Ok(Err(e)) => Attempt::Failed(AttemptFailure::Spawn {
            command: variant.to_string(),
            message: e.to_string(),
        }),
        Ok(Ok(output)) => {
            let result = ProcessResult::from_output(variant, &output);
            tracing::debug!(
                command = %variant,
                stdout = excerpt(&result.stdout, OUTPUT_EXCERPT_CHARS),
                stderr = excerpt(&result.stderr, OUTPUT_EXCERPT_CHARS),
                "command output"
            );
            Attempt::Completed(result)
        }
    }
}

/// Read at most `cap` bytes from `reader`, then drain the rest.
async fn read_capped<R>(reader: Option<R>, cap: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(Vec::new());
    };
    let mut kept = Vec::new();
    (&mut reader).take(cap as u64).read_to_end(&mut kept).await?;
    tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok(kept)
}
