//! `launchpad list` – configured apps and what is installed locally.

use anyhow::Result;
use launchpad_core::config::LaunchpadConfig;
use launchpad_core::registry::{ArtifactRegistry, ConfigRegistry};

use super::{lookup, print_installed};

pub fn run_list(cfg: &LaunchpadConfig, registry: &ConfigRegistry) -> Result<()> {
    let apps = registry.apps();
    if apps.is_empty() {
        println!("No apps configured. Add [[apps]] entries to config.toml.");
        return Ok(());
    }
    let install_dir = cfg.install_dir()?;
    for app in apps {
        let coords = lookup(registry, &app)?;
        let installed = coords.installed(&install_dir)?;
        println!(
            "{} ({}:{}) {} installed",
            app,
            coords.group_id,
            coords.artifact_id,
            installed.len()
        );
        print_installed(&installed);
    }
    Ok(())
}
