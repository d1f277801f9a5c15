//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::error::DownloadError;
use crate::launch::{ExitCallback, Launcher};
use crate::queue::DownloadContext;
use crate::transfer::{ArtifactFetcher, FetchError};
use crate::version::{MetadataSource, VersionResolver};

pub(crate) fn repo_doc(latest: &str, versions: &[&str]) -> String {
    let listed: String = versions
        .iter()
        .map(|v| format!("<version>{}</version>", v))
        .collect();
    format!(
        "<metadata><versioning><latest>{}</latest><versions>{}</versions></versioning></metadata>",
        latest, listed
    )
}

pub(crate) fn snapshot_doc(version: &str, build: &str, timestamp: &str) -> String {
    format!(
        "<metadata><version>{}</version><versioning><snapshot><timestamp>{}</timestamp><buildNumber>{}</buildNumber></snapshot></versioning></metadata>",
        version, timestamp, build
    )
}

/// Polls `f` until it holds or `timeout` passes.
pub(crate) fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    f()
}

/// Serves fixed documents by URL; anything else is a 404.
#[derive(Clone, Default)]
pub(crate) struct StaticMetadataSource {
    docs: Arc<Mutex<HashMap<String, String>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl StaticMetadataSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(self, url: &str, doc: String) -> Self {
        self.docs.lock().unwrap().insert(url.to_string(), doc);
        self
    }

    pub(crate) fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl MetadataSource for StaticMetadataSource {
    fn fetch(&self, url: &str) -> Result<String, DownloadError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.docs
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::NetworkFailure(format!("GET {} returned HTTP 404", url)))
    }
}

#[derive(Default)]
struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

/// Writes a fixed body. Optionally holds every transfer at a gate until
/// `open_gate`, honouring cancellation while it waits.
pub(crate) struct FakeFetcher {
    body: Vec<u8>,
    gate: Option<Gate>,
    pub(crate) calls: AtomicUsize,
    pub(crate) in_progress: AtomicUsize,
    pub(crate) peak: AtomicUsize,
    fail_urls: Mutex<HashSet<String>>,
    storage_fail: bool,
    pub(crate) urls: Mutex<Vec<String>>,
    /// Whether the lock marker existed when each transfer started.
    pub(crate) lock_seen: Mutex<Vec<bool>>,
}

impl FakeFetcher {
    pub(crate) fn new(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            gate: None,
            calls: AtomicUsize::new(0),
            in_progress: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            fail_urls: Mutex::new(HashSet::new()),
            storage_fail: false,
            urls: Mutex::new(Vec::new()),
            lock_seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn gated(body: &[u8]) -> Self {
        Self {
            gate: Some(Gate::default()),
            ..Self::new(body)
        }
    }

    pub(crate) fn failing_storage(body: &[u8]) -> Self {
        Self {
            storage_fail: true,
            ..Self::new(body)
        }
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.fail_urls.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            *gate.open.lock().unwrap() = true;
            gate.cv.notify_all();
        }
    }

    fn wait_gate(&self, cancel: &CancelToken) -> Result<(), FetchError> {
        let Some(gate) = &self.gate else {
            return Ok(());
        };
        let mut open = gate.open.lock().unwrap();
        while !*open {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            open = gate
                .cv
                .wait_timeout(open, Duration::from_millis(10))
                .unwrap()
                .0;
        }
        Ok(())
    }
}

impl ArtifactFetcher for FakeFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, u64),
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        let artifact = dest.with_extension("");
        let lock = crate::lockfile::LockFile::for_artifact(&artifact);
        self.lock_seen.lock().unwrap().push(lock.is_locked());

        let now = self.in_progress.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let result = self.transfer(url, dest, progress, cancel);
        self.in_progress.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl FakeFetcher {
    fn transfer(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, u64),
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(dest, &self.body[..self.body.len() / 2]).unwrap();
        self.wait_gate(cancel)?;
        if self.fail_urls.lock().unwrap().contains(url) {
            return Err(FetchError::Http(404));
        }
        if self.storage_fail {
            return Err(FetchError::Storage {
                path: dest.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            });
        }
        let total = self.body.len() as u64;
        progress(total / 2, total);
        fs::write(dest, &self.body).unwrap();
        progress(total, total);
        Ok(total)
    }
}

#[derive(Default)]
pub(crate) struct RecordingLauncher {
    pub(crate) launches: Mutex<Vec<(PathBuf, Vec<String>)>>,
}

impl Launcher for RecordingLauncher {
    fn launch(
        &self,
        artifact: &Path,
        _packaging: &str,
        args: &[String],
        on_exit: Option<ExitCallback>,
    ) -> Result<(), DownloadError> {
        self.launches
            .lock()
            .unwrap()
            .push((artifact.to_path_buf(), args.to_vec()));
        if let Some(cb) = on_exit {
            cb(Err(io::Error::new(io::ErrorKind::Other, "not a real process")));
        }
        Ok(())
    }
}

pub(crate) fn context(
    install_dir: &Path,
    source: StaticMetadataSource,
    fetcher: Arc<FakeFetcher>,
    launcher: Arc<RecordingLauncher>,
) -> DownloadContext {
    DownloadContext {
        resolver: VersionResolver::new(Arc::new(source)),
        fetcher,
        launcher,
        install_dir: install_dir.to_path_buf(),
    }
}
