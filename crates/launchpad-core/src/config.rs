use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One launchable application: where its artifacts live and how to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name used on the command line.
    pub name: String,
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default)]
    pub classifier: Option<String>,
    /// File extension of the artifact; `jar` is started with the Java command.
    #[serde(default = "default_packaging")]
    pub packaging: String,
    pub release_repository: String,
    #[serde(default)]
    pub snapshot_repository: Option<String>,
    /// Arguments passed on every launch, before any given on the command line.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_packaging() -> String {
    "jar".to_string()
}

/// Global configuration loaded from `~/.config/launchpad/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchpadConfig {
    /// Initial number of download workers.
    pub parallelism: usize,
    /// Resolve "latest" against snapshot repositories by default.
    #[serde(default)]
    pub snapshots: bool,
    /// Root of the local artifact tree (None = `$XDG_DATA_HOME/launchpad/artifacts`).
    #[serde(default)]
    pub install_dir: Option<PathBuf>,
    #[serde(default = "default_java_command")]
    pub java_command: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Abort a transfer that stays under 1 KiB/s for this long.
    #[serde(default = "default_low_speed_timeout")]
    pub low_speed_timeout_secs: u64,
    /// Optional per-transfer bandwidth cap in bytes per second.
    #[serde(default)]
    pub max_bytes_per_sec: Option<u64>,
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

fn default_java_command() -> String {
    "java".to_string()
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_low_speed_timeout() -> u64 {
    60
}

impl Default for LaunchpadConfig {
    fn default() -> Self {
        Self {
            parallelism: 2,
            snapshots: false,
            install_dir: None,
            java_command: default_java_command(),
            connect_timeout_secs: default_connect_timeout(),
            low_speed_timeout_secs: default_low_speed_timeout(),
            max_bytes_per_sec: None,
            apps: Vec::new(),
        }
    }
}

impl LaunchpadConfig {
    /// Configured install directory, or the XDG data default.
    pub fn install_dir(&self) -> Result<PathBuf> {
        match &self.install_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let xdg_dirs = xdg::BaseDirectories::with_prefix("launchpad")?;
                Ok(xdg_dirs.get_data_home().join("launchpad").join("artifacts"))
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn low_speed_timeout(&self) -> Duration {
        Duration::from_secs(self.low_speed_timeout_secs)
    }

    pub fn app(&self, name: &str) -> Option<&AppConfig> {
        self.apps.iter().find(|a| a.name == name)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("launchpad")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LaunchpadConfig> {
    load_or_init_at(&config_path()?)
}

pub fn load_or_init_at(path: &Path) -> Result<LaunchpadConfig> {
    if !path.exists() {
        let default_cfg = LaunchpadConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: LaunchpadConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}
