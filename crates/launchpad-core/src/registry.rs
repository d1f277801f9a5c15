//! Application registry: maps an app name to its repository coordinates.

use crate::artifact::RepositoryCoordinates;
use crate::config::{AppConfig, LaunchpadConfig};

pub trait ArtifactRegistry: Send + Sync {
    /// Coordinates for `app`, or None if the registry does not know it.
    fn coordinates(&self, app: &str) -> Option<RepositoryCoordinates>;

    /// Every registered app name, in registration order.
    fn apps(&self) -> Vec<String>;
}

impl From<&AppConfig> for RepositoryCoordinates {
    fn from(app: &AppConfig) -> Self {
        RepositoryCoordinates {
            app: app.name.clone(),
            group_id: app.group_id.clone(),
            artifact_id: app.artifact_id.clone(),
            classifier: app.classifier.clone(),
            packaging: app.packaging.clone(),
            release_repository: app.release_repository.clone(),
            snapshot_repository: app.snapshot_repository.clone(),
        }
    }
}

/// Registry backed by the `[[apps]]` tables of the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    apps: Vec<AppConfig>,
}

impl ConfigRegistry {
    pub fn new(apps: Vec<AppConfig>) -> Self {
        Self { apps }
    }

    pub fn from_config(cfg: &LaunchpadConfig) -> Self {
        Self::new(cfg.apps.clone())
    }

    pub fn app(&self, name: &str) -> Option<&AppConfig> {
        self.apps.iter().find(|a| a.name == name)
    }
}

impl ArtifactRegistry for ConfigRegistry {
    fn coordinates(&self, app: &str) -> Option<RepositoryCoordinates> {
        self.app(app).map(RepositoryCoordinates::from)
    }

    fn apps(&self) -> Vec<String> {
        self.apps.iter().map(|a| a.name.clone()).collect()
    }
}
