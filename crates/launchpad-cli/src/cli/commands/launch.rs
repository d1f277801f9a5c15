//! `launchpad launch` – download if needed, then run the app in the foreground.

use anyhow::{anyhow, bail, Result};
use launchpad_core::config::LaunchpadConfig;
use launchpad_core::queue::{DownloadQueue, DownloadQueueEntry};
use launchpad_core::registry::ConfigRegistry;
use std::sync::{mpsc, Arc};

use super::report::ReportSink;
use super::{download_context, lookup};

pub fn run_launch(
    cfg: &LaunchpadConfig,
    registry: &ConfigRegistry,
    app: &str,
    version: Option<&str>,
    snapshots: bool,
    offline: bool,
    extra_args: Vec<String>,
) -> Result<()> {
    let coords = lookup(registry, app)?;
    let mut args = registry.app(app).map(|a| a.args.clone()).unwrap_or_default();
    args.extend(extra_args);

    let sink = Arc::new(ReportSink::new(app));
    let (exit_tx, exit_rx) = mpsc::channel();
    let mut entry = DownloadQueueEntry::builder(coords)
        .snapshots(snapshots || cfg.snapshots)
        .download_disabled(offline)
        .launch(true)
        .args(args)
        .sink(sink.clone())
        .on_exit(Box::new(move |status| {
            let _ = exit_tx.send(status);
        }));
    if let Some(v) = version {
        entry = entry.version(v);
    }

    let queue = DownloadQueue::new(download_context(cfg)?, 1);
    queue.enqueue(entry.build());
    queue.wait_idle();
    queue.shutdown();

    if sink.failed() || !sink.launched() {
        bail!("{} was not launched", app);
    }
    let status = exit_rx
        .recv()
        .map_err(|_| anyhow!("{} exited without reporting a status", app))??;
    tracing::info!(app, %status, "app exited");
    if !status.success() {
        bail!("{} exited with {}", app, status);
    }
    Ok(())
}
