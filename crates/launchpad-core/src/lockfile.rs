//! Advisory lock markers for artifact files.
//!
//! `<artifact file>.lock` exists while a transfer for that exact artifact and
//! version is in progress, and stays behind if the process dies mid-write.
//! Finding one next to an artifact file means its contents are not trusted.
//!
//! This is a crash-recovery signal only. Two workers (or processes) resolving
//! to the same artifact and version are not excluded from each other.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DownloadError;

/// Suffix appended to the artifact file path.
pub const LOCK_SUFFIX: &str = ".lock";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Lock marker for the artifact written at `artifact_path`. The artifact
    /// file name already carries the fully qualified version, so the marker is
    /// keyed on (artifact, resolved version).
    pub fn for_artifact(artifact_path: &Path) -> Self {
        let mut o = artifact_path.as_os_str().to_owned();
        o.push(LOCK_SUFFIX);
        Self {
            path: PathBuf::from(o),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates (or rewrites) the marker, creating parent directories as needed.
    pub fn lock(&self) -> Result<(), DownloadError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DownloadError::io(parent, e))?;
        }
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        fs::write(
            &self.path,
            format!("pid={}\nstarted={}\n", std::process::id(), stamp),
        )
        .map_err(|e| DownloadError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), "lock marker written");
        Ok(())
    }

    /// Deletes the marker. An already-absent marker counts as unlocked and is
    /// not an error, so unlocking twice is harmless.
    pub fn unlock(&self) -> Result<(), DownloadError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "lock marker removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DownloadError::io(&self.path, e)),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }
}
