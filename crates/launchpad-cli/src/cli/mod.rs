//! CLI for the launchpad application launcher.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use launchpad_core::config;
use launchpad_core::registry::ConfigRegistry;

use commands::{run_fetch, run_launch, run_list, run_resolve, run_status};

/// Top-level CLI for launchpad.
#[derive(Debug, Parser)]
#[command(name = "launchpad")]
#[command(about = "launchpad: download and launch Maven-hosted applications", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List configured apps and their installed versions.
    List,

    /// Resolve the version an app would download, without downloading it.
    Resolve {
        /// App name from config.toml.
        app: String,
        /// Pin an exact version instead of the repository's latest.
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        /// Use the snapshot repository.
        #[arg(long)]
        snapshots: bool,
    },

    /// Download one or more apps and wait until every download finishes.
    Fetch {
        /// App names from config.toml.
        #[arg(required = true)]
        apps: Vec<String>,
        /// Pin an exact version (applies to every app given).
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        /// Use the snapshot repositories.
        #[arg(long)]
        snapshots: bool,
        /// Number of concurrent downloads (default from config).
        #[arg(long, value_name = "N")]
        parallel: Option<usize>,
    },

    /// Download an app if needed, then start it and wait for it to exit.
    Launch {
        /// App name from config.toml.
        app: String,
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        #[arg(long)]
        snapshots: bool,
        /// Never download; run an installed version.
        #[arg(long)]
        offline: bool,
        /// Arguments passed to the app after its configured ones.
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show installed versions and interrupted-download markers for one app.
    Status {
        /// App name from config.toml.
        app: String,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let registry = ConfigRegistry::from_config(&cfg);

        match cli.command {
            CliCommand::List => run_list(&cfg, &registry)?,
            CliCommand::Resolve {
                app,
                version,
                snapshots,
            } => run_resolve(&cfg, &registry, &app, version.as_deref(), snapshots)?,
            CliCommand::Fetch {
                apps,
                version,
                snapshots,
                parallel,
            } => run_fetch(&cfg, &registry, &apps, version.as_deref(), snapshots, parallel)?,
            CliCommand::Launch {
                app,
                version,
                snapshots,
                offline,
                args,
            } => run_launch(
                &cfg,
                &registry,
                &app,
                version.as_deref(),
                snapshots,
                offline,
                args,
            )?,
            CliCommand::Status { app } => run_status(&cfg, &registry, &app)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
