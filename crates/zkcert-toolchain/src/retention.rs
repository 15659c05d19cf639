//! # Run Retention
//!
//! Finished run directories are kept for inspection, but only the newest
//! `max_runs` of them. Each retained run pushes out the oldest one once the
//! cap is reached. Runs still in progress are never tracked here, so they
//! cannot be evicted by a concurrent request.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::WorkspaceError;
use crate::workspace::RunWorkspace;

/// Bounded set of retained run directories, oldest first.
#[derive(Debug)]
pub struct RunRetention {
    max_runs: usize,
    kept: Mutex<VecDeque<PathBuf>>,
}

impl RunRetention {
    pub fn new(max_runs: usize) -> Self {
        Self {
            max_runs,
            kept: Mutex::new(VecDeque::new()),
        }
    }

    pub fn max_runs(&self) -> usize {
        self.max_runs
    }

    /// Track run directories left under `runs_root` by an earlier process,
    /// oldest first by modification time, and prune past the cap. Returns
    /// the number of directories removed.
    pub async fn adopt_existing(&self, runs_root: &Path) -> Result<usize, WorkspaceError> {
        let io_err = |source| WorkspaceError::Io {
            path: runs_root.display().to_string(),
            source,
        };
        let mut entries = match tokio::fs::read_dir(runs_root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_err(e)),
        };

        let mut found: Vec<(SystemTime, PathBuf)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let is_run = entry
                .file_name()
                .to_str()
                .is_some_and(|name| Uuid::parse_str(name).is_ok());
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if is_run && meta.is_dir() {
                let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                found.push((modified, entry.path()));
            }
        }
        found.sort();

        let evicted = {
            let mut kept = self.kept.lock().await;
            for (_, dir) in found.into_iter().rev() {
                kept.push_front(dir);
            }
            self.evict(&mut kept)
        };
        Ok(remove_all(evicted).await)
    }

    /// Keep `workspace` and remove the oldest retained runs past the cap.
    /// Returns the number of directories removed.
    pub async fn retain(&self, workspace: RunWorkspace) -> usize {
        let evicted = {
            let mut kept = self.kept.lock().await;
            kept.push_back(workspace.dir().to_path_buf());
            self.evict(&mut kept)
        };
        remove_all(evicted).await
    }

    fn evict(&self, kept: &mut VecDeque<PathBuf>) -> Vec<PathBuf> {
        let excess = kept.len().saturating_sub(self.max_runs);
        kept.drain(..excess).collect()
    }
}

async fn remove_all(dirs: Vec<PathBuf>) -> usize {
    let mut removed = 0;
    for dir in dirs {
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to prune run directory")
            }
        }
    }
    if removed > 0 {
        metrics::counter!("zkcert_runs_pruned_total").increment(removed as u64);
        tracing::debug!(removed, "pruned retained run directories");
    }
    removed
}
