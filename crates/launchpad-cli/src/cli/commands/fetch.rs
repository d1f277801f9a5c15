//! `launchpad fetch` – download apps through the download queue.

use anyhow::{bail, Result};
use launchpad_core::config::LaunchpadConfig;
use launchpad_core::queue::{DownloadQueue, DownloadQueueEntry};
use launchpad_core::registry::ConfigRegistry;
use std::sync::Arc;
use std::thread;

use super::report::ReportSink;
use super::{download_context, lookup};

pub fn run_fetch(
    cfg: &LaunchpadConfig,
    registry: &ConfigRegistry,
    apps: &[String],
    version: Option<&str>,
    snapshots: bool,
    parallel: Option<usize>,
) -> Result<()> {
    let coords = apps
        .iter()
        .map(|app| lookup(registry, app))
        .collect::<Result<Vec<_>>>()?;
    let parallel = parallel.unwrap_or(cfg.parallelism).max(1);
    let snapshots = snapshots || cfg.snapshots;

    let queue = DownloadQueue::new(download_context(cfg)?, 0);
    let counts = queue.subscribe();
    let printer = thread::spawn(move || {
        for c in counts {
            println!("queue: {} waiting, {} in flight", c.queued, c.total_in_flight);
        }
    });

    let mut sinks = Vec::with_capacity(coords.len());
    for c in coords {
        let sink = Arc::new(ReportSink::new(&c.app));
        let mut entry = DownloadQueueEntry::builder(c)
            .snapshots(snapshots)
            .sink(sink.clone());
        if let Some(v) = version {
            entry = entry.version(v);
        }
        queue.enqueue(entry.build());
        sinks.push(sink);
    }
    queue.set_target_parallelism(parallel);
    queue.wait_idle();
    // Joined workers release the queue, so dropping it ends the subscription.
    queue.shutdown();
    drop(queue);
    let _ = printer.join();

    let failed = sinks.iter().filter(|s| s.failed()).count();
    if failed > 0 {
        bail!("{} of {} download(s) failed", failed, sinks.len());
    }
    Ok(())
}
