//! Process-scoped scratch area for uploaded PDFs and rendered page images.
//!
//! One directory is created at startup under the configured temp root and is
//! removed recursively when the owning [`ScratchDir`] is dropped. Individual
//! file names carry a random component so concurrent requests never collide.

use crate::util::{ensure_dir, startup_stamp};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn create(temp_root: &Path) -> Result<Self> {
        let root = temp_root.join(format!("research-pub-area_{}", startup_stamp()));
        ensure_dir(&root)?;
        debug!("scratch dir {}", root.display());
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// A fresh path inside the scratch dir. The file is not created.
    pub fn new_temp_path(&self, prefix: &str, suffix: &str) -> PathBuf {
        let n = fastrand::u32(1..=1_000_000_000);
        self.root.join(format!("{prefix}{n}{suffix}"))
    }

    /// Write `bytes` to a fresh `.pdf` path and hand back its guard.
    pub fn write_pdf(&self, bytes: &[u8], keep: bool) -> Result<TempArtifact> {
        let path = self.new_temp_path("f", ".pdf");
        std::fs::write(&path, bytes)
            .with_context(|| format!("write temp pdf {}", path.display()))?;
        Ok(TempArtifact::new(path, keep))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove scratch dir {}: {e}", self.root.display());
            }
        }
    }
}

/// Delete `path` if it exists. Missing files are not an error.
pub fn remove(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("failed to remove {}: {e}", path.display()),
    }
}

/// A scratch file owned by exactly one request; removed on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    keep: bool,
}

impl TempArtifact {
    pub fn new(path: PathBuf, keep: bool) -> Self {
        Self { path, keep }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.keep {
            debug!("keeping artifact {}", self.path.display());
            return;
        }
        remove(&self.path);
    }
}
