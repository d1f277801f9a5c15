//! Download worker thread.
//!
//! A worker pulls one entry at a time and runs it to completion:
//! resolve → lock → transfer → install → unlock → launch. Between entries it
//! parks on the queue monitor and exits only once marked for retirement.
//! Every per-entry failure is reported to the entry's sink and the worker
//! moves on.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError};

use super::entry::DownloadQueueEntry;
use super::guard::ExitGuard;
use super::Shared;
use crate::error::DownloadError;
use crate::launch::Launcher;
use crate::lockfile::LockFile;
use crate::storage;
use crate::transfer::{ArtifactFetcher, FetchError};
use crate::version::{is_snapshot, ResolvedVersion, VersionResolver};

/// Collaborators the workers call out to.
#[derive(Clone)]
pub struct DownloadContext {
    pub resolver: VersionResolver,
    pub fetcher: Arc<dyn ArtifactFetcher>,
    pub launcher: Arc<dyn Launcher>,
    /// Root of the local artifact layout.
    pub install_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Idle,
    FetchingEntry,
    ResolvingVersion,
    Locking,
    Transferring,
    Installing,
    Launching,
    Retired,
}

impl Shared {
    /// Pops the next entry for worker `id`, parking while the deque is empty.
    /// A retiring worker signs itself out instead, under the monitor, so the
    /// roster never counts a worker that will not pull again.
    fn next_entry(&self, id: usize) -> Option<Arc<DownloadQueueEntry>> {
        let mut state = self.lock();
        loop {
            let slot = state.slot_mut(id)?;
            if slot.retiring {
                slot.exited = true;
                slot.busy = false;
                slot.phase = WorkerPhase::Retired;
                state.recompute();
                self.changed.notify_all();
                return None;
            }
            if let Some(entry) = state.entries.pop_front() {
                if let Some(slot) = state.slot_mut(id) {
                    slot.busy = true;
                    slot.phase = WorkerPhase::FetchingEntry;
                }
                state.recompute();
                self.changed.notify_all();
                return Some(entry);
            }
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn finish_entry(&self, id: usize) {
        let mut state = self.lock();
        if let Some(slot) = state.slot_mut(id) {
            slot.busy = false;
            slot.phase = WorkerPhase::Idle;
        }
        state.recompute();
        self.changed.notify_all();
    }

    fn set_phase(&self, id: usize, phase: WorkerPhase) {
        if let Some(slot) = self.lock().slot_mut(id) {
            slot.phase = phase;
        }
    }
}

pub(super) fn run(shared: Arc<Shared>, id: usize) {
    let _guard = ExitGuard {
        shared: &shared,
        id,
    };
    tracing::debug!(worker = id, "download worker started");
    while let Some(entry) = shared.next_entry(id) {
        process(&shared, id, &entry);
        shared.finish_entry(id);
    }
    tracing::debug!(worker = id, "download worker exiting");
}

/// Runs one entry and reports the outcome. Never panics on entry failure.
fn process(shared: &Shared, id: usize, entry: &DownloadQueueEntry) {
    let sink = entry.sink();
    sink.prepare_phase_started();
    match execute(shared, id, entry) {
        Ok(path) => {
            tracing::info!(worker = id, app = entry.app(), path = %path.display(), "entry done");
        }
        Err(DownloadError::Cancelled) => {
            tracing::info!(worker = id, app = entry.app(), "entry cancelled");
            sink.operation_canceled();
        }
        Err(e) => {
            tracing::warn!(worker = id, app = entry.app(), "entry failed: {}", e);
            sink.show_error_message(&e.to_string());
        }
    }
    sink.hidden();
}

fn checkpoint(entry: &DownloadQueueEntry) -> Result<(), DownloadError> {
    if entry.is_cancelled() {
        Err(DownloadError::Cancelled)
    } else {
        Ok(())
    }
}

fn execute(shared: &Shared, id: usize, entry: &DownloadQueueEntry) -> Result<PathBuf, DownloadError> {
    let ctx = &shared.context;
    let coords = entry.coordinates();
    checkpoint(entry)?;

    let artifact = if entry.download_disabled() {
        installed_artifact(ctx, entry)?
    } else {
        shared.set_phase(id, WorkerPhase::ResolvingVersion);
        let resolved = ctx
            .resolver
            .resolve(coords, entry.version(), entry.snapshots_enabled())?;
        checkpoint(entry)?;

        let path = coords.local_path(&ctx.install_dir, &resolved);
        let lock = LockFile::for_artifact(&path);
        if lock.is_locked() {
            tracing::warn!(
                path = %path.display(),
                "lock marker present: previous download of {} was interrupted, fetching again",
                resolved
            );
        } else if path.exists() {
            tracing::info!(app = entry.app(), version = %resolved, "already installed");
        }

        if lock.is_locked() || !path.exists() {
            shared.set_phase(id, WorkerPhase::Locking);
            lock.lock()?;
            shared.set_phase(id, WorkerPhase::Transferring);
            transfer(ctx, entry, &resolved, &path, &lock)?;
            shared.set_phase(id, WorkerPhase::Installing);
            install(entry, &path, &lock)?;
        }
        path
    };

    if entry.launch_after_download() {
        checkpoint(entry)?;
        shared.set_phase(id, WorkerPhase::Launching);
        entry.sink().launch_started();
        ctx.launcher.launch(
            &artifact,
            &coords.packaging,
            entry.args(),
            entry.take_on_exit(),
        )?;
    }
    Ok(artifact)
}

fn transfer(
    ctx: &DownloadContext,
    entry: &DownloadQueueEntry,
    resolved: &ResolvedVersion,
    path: &Path,
    lock: &LockFile,
) -> Result<(), DownloadError> {
    let url = entry.coordinates().artifact_url(resolved)?;
    let temp = storage::temp_path(path);
    let sink = entry.sink();
    sink.download_started();
    tracing::debug!(%url, dest = %temp.display(), "transfer starting");

    let mut report = |done: u64, total: u64| sink.download_progress_changed(done, total);
    match ctx
        .fetcher
        .fetch(&url, &temp, &mut report, entry.cancel_token())
    {
        Ok(bytes) => {
            tracing::debug!(%url, bytes, "transfer complete");
            Ok(())
        }
        Err(e @ FetchError::Storage { .. }) => {
            // Write failure: abandon the partial file but keep the lock as
            // the crash marker for the next run.
            storage::discard(&temp);
            Err(e.into())
        }
        Err(e) => {
            storage::discard(&temp);
            release(lock);
            Err(e.into())
        }
    }
}

fn install(entry: &DownloadQueueEntry, path: &Path, lock: &LockFile) -> Result<(), DownloadError> {
    entry.sink().install_started();
    let temp = storage::temp_path(path);
    storage::install(&temp, path).map_err(|e| DownloadError::io(path, e))?;
    release(lock);
    Ok(())
}

/// Unlock failures are logged and ignored: the marker is advisory.
fn release(lock: &LockFile) {
    if let Err(e) = lock.unlock() {
        tracing::warn!("could not remove lock marker: {}", e);
    }
}

/// Launch-only entries run what is already installed: the pinned version, or
/// the most recently installed one. Locked (possibly partial) files are skipped.
fn installed_artifact(
    ctx: &DownloadContext,
    entry: &DownloadQueueEntry,
) -> Result<PathBuf, DownloadError> {
    let installed = entry
        .coordinates()
        .installed(&ctx.install_dir)
        .map_err(|e| DownloadError::io(&ctx.install_dir, e))?;
    installed
        .into_iter()
        .filter(|a| !a.locked)
        .find(|a| match entry.version() {
            Some(v) => a.version == v,
            None => entry.snapshots_enabled() || !is_snapshot(&a.version),
        })
        .map(|a| a.path)
        .ok_or_else(|| {
            DownloadError::io(
                &ctx.install_dir,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!(
                        "no usable installed version of {}{}",
                        entry.app(),
                        entry
                            .version()
                            .map(|v| format!(" {}", v))
                            .unwrap_or_default()
                    ),
                ),
            )
        })
}
