//! Repository coordinates and the Maven-style remote/local layout derived from them.
//!
//! Remote: `<base>/<group path>/<artifact>/<version>/<artifact>-<file version>[-<classifier>].<packaging>`
//! Local:  `<install dir>/<group path>/<artifact>/<version>/<same file name>`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::DownloadError;
use crate::lockfile::LockFile;
use crate::version::ResolvedVersion;

/// Name of the metadata document at repository and per-version level.
pub const METADATA_FILE: &str = "maven-metadata.xml";

/// Where an application's artifact lives and how to address it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCoordinates {
    /// Registry name of the application (used for logs and the CLI).
    pub app: String,
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: Option<String>,
    /// File extension of the artifact (e.g. `jar`).
    pub packaging: String,
    pub release_repository: String,
    pub snapshot_repository: Option<String>,
}

impl RepositoryCoordinates {
    /// `org.example.tools` → `org/example/tools`.
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// Base URL of the release or snapshot repository, validated.
    pub fn repository(&self, snapshot: bool) -> Result<&str, DownloadError> {
        let base = if snapshot {
            self.snapshot_repository.as_deref().ok_or_else(|| {
                DownloadError::InvalidRepositoryState(format!(
                    "{}: no snapshot repository configured",
                    self.app
                ))
            })?
        } else {
            self.release_repository.as_str()
        };
        url::Url::parse(base).map_err(|e| {
            DownloadError::InvalidRepositoryState(format!(
                "{}: invalid repository URL {}: {}",
                self.app, base, e
            ))
        })?;
        Ok(base.trim_end_matches('/'))
    }

    fn artifact_base(&self, snapshot: bool) -> Result<String, DownloadError> {
        Ok(format!(
            "{}/{}/{}",
            self.repository(snapshot)?,
            self.group_path(),
            self.artifact_id
        ))
    }

    /// Repository-level metadata (carries the `latest`/`release` pointers and version list).
    pub fn metadata_url(&self, snapshot: bool) -> Result<String, DownloadError> {
        Ok(format!("{}/{}", self.artifact_base(snapshot)?, METADATA_FILE))
    }

    /// Per-version metadata; only snapshot versions carry build number and timestamp.
    pub fn version_metadata_url(&self, version: &str) -> Result<String, DownloadError> {
        let snapshot = crate::version::is_snapshot(version);
        Ok(format!(
            "{}/{}/{}",
            self.artifact_base(snapshot)?,
            version,
            METADATA_FILE
        ))
    }

    /// File name of the artifact for a resolved version. Snapshots use the
    /// timestamped form, so each snapshot build gets its own file (and lock).
    pub fn file_name(&self, resolved: &ResolvedVersion) -> String {
        let mut name = format!("{}-{}", self.artifact_id, resolved.file_version());
        if let Some(classifier) = &self.classifier {
            name.push('-');
            name.push_str(classifier);
        }
        name.push('.');
        name.push_str(&self.packaging);
        name
    }

    pub fn artifact_url(&self, resolved: &ResolvedVersion) -> Result<String, DownloadError> {
        Ok(format!(
            "{}/{}/{}",
            self.artifact_base(resolved.snapshot)?,
            resolved.version,
            self.file_name(resolved)
        ))
    }

    /// Directory holding all installed files for `version`.
    pub fn local_dir(&self, install_dir: &Path, version: &str) -> PathBuf {
        let mut dir = install_dir.to_path_buf();
        for part in self.group_id.split('.') {
            dir.push(part);
        }
        dir.push(&self.artifact_id);
        dir.push(version);
        dir
    }

    pub fn local_path(&self, install_dir: &Path, resolved: &ResolvedVersion) -> PathBuf {
        self.local_dir(install_dir, &resolved.version)
            .join(self.file_name(resolved))
    }

    fn is_artifact_file(&self, name: &str) -> bool {
        let mut suffix = String::new();
        if let Some(classifier) = &self.classifier {
            suffix.push('-');
            suffix.push_str(classifier);
        }
        suffix.push('.');
        suffix.push_str(&self.packaging);
        name.starts_with(&format!("{}-", self.artifact_id)) && name.ends_with(&suffix)
    }

    /// Lists artifact files present under `install_dir`, newest first.
    /// A missing app directory yields an empty list.
    pub fn installed(&self, install_dir: &Path) -> io::Result<Vec<InstalledArtifact>> {
        let mut app_dir = install_dir.to_path_buf();
        for part in self.group_id.split('.') {
            app_dir.push(part);
        }
        app_dir.push(&self.artifact_id);

        let versions = match fs::read_dir(&app_dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut found = Vec::new();
        for version_dir in versions {
            let version_dir = version_dir?;
            if !version_dir.file_type()?.is_dir() {
                continue;
            }
            let version = version_dir.file_name().to_string_lossy().to_string();
            for file in fs::read_dir(version_dir.path())? {
                let file = file?;
                let name = file.file_name().to_string_lossy().to_string();
                if !self.is_artifact_file(&name) {
                    continue;
                }
                let path = file.path();
                let modified = file.metadata()?.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                let locked = LockFile::for_artifact(&path).is_locked();
                found.push(InstalledArtifact {
                    version: version.clone(),
                    path,
                    modified,
                    locked,
                });
            }
        }
        found.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(found)
    }
}

/// An artifact file found on disk.
#[derive(Debug, Clone)]
pub struct InstalledArtifact {
    pub version: String,
    pub path: PathBuf,
    pub modified: SystemTime,
    /// A lock marker sits next to the file: a previous write may not have completed.
    pub locked: bool,
}

#[cfg(test)]
pub(crate) fn test_coordinates() -> RepositoryCoordinates {
    RepositoryCoordinates {
        app: "editor".to_string(),
        group_id: "org.example.tools".to_string(),
        artifact_id: "editor".to_string(),
        classifier: None,
        packaging: "jar".to_string(),
        release_repository: "https://repo.example.com/releases/".to_string(),
        snapshot_repository: Some("https://repo.example.com/snapshots".to_string()),
    }
}
