//! `launchpad status` – installed versions of one app.

use anyhow::Result;
use launchpad_core::config::LaunchpadConfig;
use launchpad_core::registry::ConfigRegistry;

use super::{lookup, print_installed};

pub fn run_status(cfg: &LaunchpadConfig, registry: &ConfigRegistry, app: &str) -> Result<()> {
    let coords = lookup(registry, app)?;
    let install_dir = cfg.install_dir()?;
    let installed = coords.installed(&install_dir)?;
    if installed.is_empty() {
        println!("{}: nothing installed under {}", app, install_dir.display());
        return Ok(());
    }
    println!("  {:<24} FILE", "VERSION");
    print_installed(&installed);
    let interrupted = installed.iter().filter(|a| a.locked).count();
    if interrupted > 0 {
        println!(
            "{} interrupted download(s); the next fetch of those versions downloads them again.",
            interrupted
        );
    }
    Ok(())
}
