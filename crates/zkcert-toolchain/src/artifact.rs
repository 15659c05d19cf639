//! # Artifact Resolution
//!
//! `nargo execute` names its witness after the package, which the service
//! does not know up front. The resolver therefore picks the newest `*.gz`
//! in the target directory and only falls back to the conventional name
//! when the scan finds nothing.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

/// Extension of witness files written by `nargo execute`.
pub const WITNESS_EXTENSION: &str = "gz";

/// How an artifact path was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Discovery {
    /// Fixed, conventional name. The file may not exist.
    Conventional,
    /// Newest matching file by modification time.
    NewestByMtime,
}

/// A path to a toolchain artifact inside one run directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub discovery: Discovery,
}

impl ArtifactHandle {
    pub fn conventional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            discovery: Discovery::Conventional,
        }
    }
}

/// Locate the witness produced in `target_dir`.
///
/// Falls back to `target_dir/<fallback_name>` when the directory is absent
/// or holds no `*.gz` files.
pub async fn resolve_witness(target_dir: &Path, fallback_name: &str) -> ArtifactHandle {
    match newest_with_extension(target_dir, WITNESS_EXTENSION).await {
        Ok(Some(path)) => ArtifactHandle {
            path,
            discovery: Discovery::NewestByMtime,
        },
        Ok(None) => ArtifactHandle::conventional(target_dir.join(fallback_name)),
        Err(e) => {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(dir = %target_dir.display(), error = %e, "witness scan failed");
            }
            ArtifactHandle::conventional(target_dir.join(fallback_name))
        }
    }
}

/// Newest regular file in `dir` with extension `ext`. Ties on modification
/// time go to the lexicographically greater path.
pub async fn newest_with_extension(dir: &Path, ext: &str) -> io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        let Ok(meta) = tokio::fs::metadata(&path).await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let candidate = (meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), path);
        if newest.as_ref().map_or(true, |current| candidate > *current) {
            newest = Some(candidate);
        }
    }
    Ok(newest.map(|(_, path)| path))
}
