//! CLI command handlers. Each command is in its own file.

mod fetch;
mod launch;
mod list;
mod report;
mod resolve;
mod status;

pub use fetch::run_fetch;
pub use launch::run_launch;
pub use list::run_list;
pub use resolve::run_resolve;
pub use status::run_status;

use anyhow::{anyhow, Result};
use launchpad_core::artifact::{InstalledArtifact, RepositoryCoordinates};
use launchpad_core::config::LaunchpadConfig;
use launchpad_core::launch::ProcessLauncher;
use launchpad_core::queue::DownloadContext;
use launchpad_core::registry::{ArtifactRegistry, ConfigRegistry};
use launchpad_core::transfer::CurlFetcher;
use launchpad_core::version::{HttpMetadataSource, VersionResolver};
use std::sync::Arc;

fn lookup(registry: &ConfigRegistry, app: &str) -> Result<RepositoryCoordinates> {
    registry
        .coordinates(app)
        .ok_or_else(|| anyhow!("unknown app '{}' (see `launchpad list`)", app))
}

fn resolver(cfg: &LaunchpadConfig) -> VersionResolver {
    VersionResolver::new(Arc::new(HttpMetadataSource {
        connect_timeout: cfg.connect_timeout(),
        ..HttpMetadataSource::default()
    }))
}

fn download_context(cfg: &LaunchpadConfig) -> Result<DownloadContext> {
    Ok(DownloadContext {
        resolver: resolver(cfg),
        fetcher: Arc::new(CurlFetcher {
            connect_timeout: cfg.connect_timeout(),
            low_speed_time: cfg.low_speed_timeout(),
            max_recv_speed: cfg.max_bytes_per_sec,
        }),
        launcher: Arc::new(ProcessLauncher::new(cfg.java_command.clone())),
        install_dir: cfg.install_dir()?,
    })
}

fn print_installed(installed: &[InstalledArtifact]) {
    for a in installed {
        let name = a
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let marker = if a.locked { "  (interrupted)" } else { "" };
        println!("  {:<24} {}{}", a.version, name, marker);
    }
}
