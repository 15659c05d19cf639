//! # Per-Run Workspaces
//!
//! The toolchain reads `Prover.toml` from, and writes artifacts into, its
//! working directory. Sharing one directory between concurrent requests
//! would let them overwrite each other's inputs and witnesses, so every
//! run gets a private copy of the circuit project under
//! `<runs_root>/<uuid>/`.
//!
//! The copy excludes state left by earlier runs: the template's own
//! `Prover.toml`, witnesses and proofs under `target/`, and the runs root
//! itself when it lives inside the template.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use zkcert_core::DOCUMENT_FILE_NAME;

use crate::artifact::WITNESS_EXTENSION;
use crate::error::WorkspaceError;

/// Toolchain output directory inside a circuit project.
pub const TARGET_DIR: &str = "target";

/// Proof output file name inside [`TARGET_DIR`].
pub const PROOF_FILE_NAME: &str = "proof";

/// Verification key file name inside [`TARGET_DIR`].
pub const VK_FILE_NAME: &str = "vk";

/// An isolated working directory for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunWorkspace {
    id: Uuid,
    dir: PathBuf,
}

impl RunWorkspace {
    /// Create `<runs_root>/<uuid>/` populated from `template`.
    pub async fn prepare(template: &Path, runs_root: &Path) -> Result<Self, WorkspaceError> {
        if !tokio::fs::metadata(template)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(WorkspaceError::MissingTemplate(
                template.display().to_string(),
            ));
        }
        tokio::fs::create_dir_all(runs_root)
            .await
            .map_err(io_at(runs_root))?;
        let template = tokio::fs::canonicalize(template)
            .await
            .map_err(io_at(template))?;
        let runs_root = tokio::fs::canonicalize(runs_root)
            .await
            .map_err(io_at(runs_root))?;

        let id = Uuid::new_v4();
        let dir = runs_root.join(id.to_string());
        tokio::fs::create_dir(&dir).await.map_err(io_at(&dir))?;
        copy_template(&template, &dir, &runs_root).await?;

        tracing::debug!(run_id = %id, dir = %dir.display(), "prepared run workspace");
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Absolute path of the run directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn document_path(&self) -> PathBuf {
        self.dir.join(DOCUMENT_FILE_NAME)
    }

    pub fn target_dir(&self) -> PathBuf {
        self.dir.join(TARGET_DIR)
    }

    /// Compiled circuit definition, `target/<circuit_name>.json`.
    pub fn circuit_path(&self, circuit_name: &str) -> PathBuf {
        self.target_dir().join(format!("{circuit_name}.json"))
    }

    pub fn proof_path(&self) -> PathBuf {
        self.target_dir().join(PROOF_FILE_NAME)
    }

    pub fn vk_path(&self) -> PathBuf {
        self.target_dir().join(VK_FILE_NAME)
    }

    /// Delete the run directory and everything in it.
    pub async fn remove(self) -> Result<(), WorkspaceError> {
        tokio::fs::remove_dir_all(&self.dir)
            .await
            .map_err(io_at(&self.dir))
    }
}

fn io_at(path: &Path) -> impl FnOnce(std::io::Error) -> WorkspaceError + '_ {
    move |source| WorkspaceError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Whether `name` inside `parent` is left-over run state.
fn is_stale(template: &Path, parent: &Path, name: &OsStr) -> bool {
    if parent == template {
        return name == DOCUMENT_FILE_NAME;
    }
    if parent == template.join(TARGET_DIR) {
        let path = Path::new(name);
        return name == PROOF_FILE_NAME
            || path.extension().and_then(|e| e.to_str()) == Some(WITNESS_EXTENSION);
    }
    false
}

async fn copy_template(template: &Path, dest: &Path, exclude: &Path) -> Result<(), WorkspaceError> {
    let mut pending = vec![(template.to_path_buf(), dest.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        tokio::fs::create_dir_all(&dst).await.map_err(io_at(&dst))?;
        let mut entries = tokio::fs::read_dir(&src).await.map_err(io_at(&src))?;
        while let Some(entry) = entries.next_entry().await.map_err(io_at(&src))? {
            let path = entry.path();
            if path == exclude {
                continue;
            }
            let name = entry.file_name();
            let meta = tokio::fs::metadata(&path).await.map_err(io_at(&path))?;
            if meta.is_dir() {
                pending.push((path, dst.join(&name)));
            } else if !is_stale(template, &src, &name) {
                let to = dst.join(&name);
                tokio::fs::copy(&path, &to).await.map_err(io_at(&path))?;
            }
        }
    }
    Ok(())
}
