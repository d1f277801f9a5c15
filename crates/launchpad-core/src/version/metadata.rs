//! `maven-metadata.xml` documents.

use serde::Deserialize;

use crate::error::DownloadError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MavenMetadata {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub artifact_id: Option<String>,
    /// Present on per-version documents.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub versioning: Option<Versioning>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Versioning {
    #[serde(default)]
    pub latest: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
    #[serde(default)]
    pub versions: Option<Versions>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub build_number: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Versions {
    #[serde(default, rename = "version")]
    pub version: Vec<String>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> Result<Self, DownloadError> {
        quick_xml::de::from_str(xml).map_err(|e| DownloadError::MalformedMetadata(e.to_string()))
    }

    /// The repository's own "latest" pointer: `<latest>`, else `<release>`.
    pub fn latest_pointer(&self) -> Option<&str> {
        let v = self.versioning.as_ref()?;
        non_empty(&v.latest).or_else(|| non_empty(&v.release))
    }

    /// Build number and timestamp from `<versioning><snapshot>`, if both are present.
    pub fn snapshot_build(&self) -> Option<(&str, &str)> {
        let s = self.versioning.as_ref()?.snapshot.as_ref()?;
        Some((non_empty(&s.build_number)?, non_empty(&s.timestamp)?))
    }

    /// Versions listed under `<versions>`; empty if the element is absent.
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.versioning
            .iter()
            .flat_map(|v| v.versions.iter())
            .flat_map(|vs| vs.version.iter())
            .map(|s| s.trim())
    }

    pub fn lists(&self, version: &str) -> bool {
        self.versions().any(|v| v == version)
    }
}
