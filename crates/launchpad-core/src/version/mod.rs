//! Version resolution against Maven-style repositories.
//!
//! The resolver never orders version strings itself: "latest" is whatever the
//! repository metadata points at. Its job is to check that the pointer has the
//! classification the caller asked for and, for snapshots, to attach the build
//! number and timestamp needed to address the exact file.

mod metadata;
mod source;

use std::fmt;
use std::sync::Arc;

use crate::artifact::RepositoryCoordinates;
use crate::error::DownloadError;

pub use metadata::{MavenMetadata, Snapshot, Versioning, Versions};
pub use source::{HttpMetadataSource, MetadataSource};

pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX)
}

/// Checks a value that ends up as a directory or file name component of the
/// local layout. Returns why it is unusable.
///
/// Rejected: empty, `.` and `..`, anything with NUL, `/`, `\` or control
/// characters, and anything longer than NAME_MAX (255 bytes).
pub fn check_path_segment(value: &str) -> Result<(), String> {
    const NAME_MAX: usize = 255;

    if value.is_empty() {
        return Err("empty value".to_string());
    }
    if value == "." || value == ".." {
        return Err(format!("{:?} is not a file name", value));
    }
    if let Some(c) = value
        .chars()
        .find(|&c| c == '\0' || c == '/' || c == '\\' || c.is_control())
    {
        return Err(format!("{:?} contains {:?}", value, c));
    }
    if value.len() > NAME_MAX {
        return Err(format!("{} bytes is longer than {}", value.len(), NAME_MAX));
    }
    Ok(())
}

fn checked_metadata_value<'a>(
    url: &str,
    what: &str,
    value: &'a str,
) -> Result<&'a str, DownloadError> {
    check_path_segment(value).map(|()| value).map_err(|why| {
        DownloadError::MalformedMetadata(format!("{}: unusable {}: {}", url, what, why))
    })
}

/// Build metadata of one published snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBuild {
    pub build_number: String,
    pub timestamp: String,
}

/// A concrete version ready to address a file in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub snapshot: bool,
    /// Set for snapshots resolved against a repository.
    pub build: Option<SnapshotBuild>,
}

impl ResolvedVersion {
    pub fn release(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            snapshot: false,
            build: None,
        }
    }

    /// Version as it appears in file names: `1.2.0-SNAPSHOT` with build 7 at
    /// `20240101.120000` becomes `1.2.0-20240101.120000-7`.
    pub fn file_version(&self) -> String {
        match &self.build {
            Some(build) if self.snapshot => {
                let base = self
                    .version
                    .strip_suffix(SNAPSHOT_SUFFIX)
                    .unwrap_or(&self.version);
                format!("{}-{}-{}", base, build.timestamp, build.build_number)
            }
            _ => self.version.clone(),
        }
    }
}

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.build {
            Some(build) => write!(f, "{} (build {})", self.file_version(), build.build_number),
            None => write!(f, "{}", self.version),
        }
    }
}

/// Resolves versions through a [`MetadataSource`].
#[derive(Clone)]
pub struct VersionResolver {
    source: Arc<dyn MetadataSource>,
}

impl VersionResolver {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    fn load(&self, url: &str) -> Result<MavenMetadata, DownloadError> {
        let text = self.source.fetch(url)?;
        MavenMetadata::parse(&text).map_err(|e| match e {
            DownloadError::MalformedMetadata(msg) => {
                DownloadError::MalformedMetadata(format!("{}: {}", url, msg))
            }
            other => other,
        })
    }

    fn latest(
        &self,
        coords: &RepositoryCoordinates,
        snapshot: bool,
    ) -> Result<String, DownloadError> {
        let url = coords.metadata_url(snapshot)?;
        let meta = self.load(&url)?;
        let latest = meta.latest_pointer().ok_or_else(|| {
            DownloadError::MalformedMetadata(format!("{}: no <latest> or <release> element", url))
        })?;
        let latest = checked_metadata_value(&url, "latest version", latest)?;
        if is_snapshot(latest) != snapshot {
            let (found, wanted) = if snapshot {
                ("release", "snapshot")
            } else {
                ("snapshot", "release")
            };
            return Err(DownloadError::InvalidRepositoryState(format!(
                "{}: latest version {} in the {} repository is a {}",
                coords.app, latest, wanted, found
            )));
        }
        Ok(latest.to_string())
    }

    fn snapshot_build(
        &self,
        coords: &RepositoryCoordinates,
        version: &str,
    ) -> Result<ResolvedVersion, DownloadError> {
        let url = coords.version_metadata_url(version)?;
        let meta = self.load(&url)?;
        let (build_number, timestamp) = meta.snapshot_build().ok_or_else(|| {
            DownloadError::MalformedMetadata(format!(
                "{}: missing <snapshot><buildNumber>/<timestamp>",
                url
            ))
        })?;
        let build_number = checked_metadata_value(&url, "build number", build_number)?;
        let timestamp = checked_metadata_value(&url, "timestamp", timestamp)?;
        Ok(ResolvedVersion {
            version: version.to_string(),
            snapshot: true,
            build: Some(SnapshotBuild {
                build_number: build_number.to_string(),
                timestamp: timestamp.to_string(),
            }),
        })
    }

    /// Latest release according to the release repository's metadata.
    pub fn resolve_latest_release(
        &self,
        coords: &RepositoryCoordinates,
    ) -> Result<ResolvedVersion, DownloadError> {
        let version = self.latest(coords, false)?;
        tracing::debug!(app = %coords.app, %version, "resolved latest release");
        Ok(ResolvedVersion::release(version))
    }

    /// Latest snapshot according to the snapshot repository's metadata, with
    /// its build number and timestamp from the per-version document.
    pub fn resolve_latest_snapshot(
        &self,
        coords: &RepositoryCoordinates,
    ) -> Result<ResolvedVersion, DownloadError> {
        let version = self.latest(coords, true)?;
        let resolved = self.snapshot_build(coords, &version)?;
        tracing::debug!(app = %coords.app, version = %resolved, "resolved latest snapshot");
        Ok(resolved)
    }

    /// A pinned version, checked against the repository matching its
    /// classification. Snapshot versions are only accepted when
    /// `snapshots_enabled` is set.
    pub fn resolve_pinned(
        &self,
        coords: &RepositoryCoordinates,
        version: &str,
        snapshots_enabled: bool,
    ) -> Result<ResolvedVersion, DownloadError> {
        check_path_segment(version).map_err(|why| {
            DownloadError::InvalidRepositoryState(format!(
                "{}: pinned version is not usable: {}",
                coords.app, why
            ))
        })?;
        let snapshot = is_snapshot(version);
        if snapshot && !snapshots_enabled {
            return Err(DownloadError::InvalidRepositoryState(format!(
                "{}: pinned version {} is a snapshot but snapshots are not enabled",
                coords.app, version
            )));
        }

        let url = coords.metadata_url(snapshot)?;
        let meta = self.load(&url)?;
        if meta.versions().next().is_some() && !meta.lists(version) {
            return Err(DownloadError::InvalidRepositoryState(format!(
                "{}: version {} is not listed in {}",
                coords.app, version, url
            )));
        }

        if snapshot {
            self.snapshot_build(coords, version)
        } else {
            Ok(ResolvedVersion::release(version))
        }
    }

    /// Dispatches to the pinned or latest lookup.
    pub fn resolve(
        &self,
        coords: &RepositoryCoordinates,
        pinned: Option<&str>,
        snapshots_enabled: bool,
    ) -> Result<ResolvedVersion, DownloadError> {
        match pinned {
            Some(version) => self.resolve_pinned(coords, version, snapshots_enabled),
            None if snapshots_enabled => self.resolve_latest_snapshot(coords),
            None => self.resolve_latest_release(coords),
        }
    }
}
