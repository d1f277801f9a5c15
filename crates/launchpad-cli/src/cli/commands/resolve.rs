//! `launchpad resolve` – show what a fetch would download.

use anyhow::{Context, Result};
use launchpad_core::config::LaunchpadConfig;
use launchpad_core::lockfile::LockFile;
use launchpad_core::registry::ConfigRegistry;

use super::{lookup, resolver};

pub fn run_resolve(
    cfg: &LaunchpadConfig,
    registry: &ConfigRegistry,
    app: &str,
    version: Option<&str>,
    snapshots: bool,
) -> Result<()> {
    let coords = lookup(registry, app)?;
    let resolved = resolver(cfg)
        .resolve(&coords, version, snapshots || cfg.snapshots)
        .with_context(|| format!("resolving {}", app))?;
    let url = coords.artifact_url(&resolved)?;
    let path = coords.local_path(&cfg.install_dir()?, &resolved);

    let state = if LockFile::for_artifact(&path).is_locked() {
        "interrupted"
    } else if path.exists() {
        "installed"
    } else {
        "not installed"
    };
    println!("{:<8} {}", "VERSION", resolved);
    println!("{:<8} {}", "URL", url);
    println!("{:<8} {} ({})", "PATH", path.display(), state);
    Ok(())
}
