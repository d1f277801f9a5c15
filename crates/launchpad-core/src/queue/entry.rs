//! One unit of download work.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::artifact::RepositoryCoordinates;
use crate::control::CancelToken;
use crate::launch::ExitCallback;
use crate::progress::{NoopSink, ProgressSink};

/// A queued request. Entries are shared as `Arc<DownloadQueueEntry>` and the
/// queue identifies them by pointer, so queuing the same app twice yields two
/// independent entries.
pub struct DownloadQueueEntry {
    coordinates: RepositoryCoordinates,
    version: Option<String>,
    snapshots: bool,
    launch: bool,
    download_disabled: bool,
    args: Vec<String>,
    sink: Arc<dyn ProgressSink>,
    cancel: CancelToken,
    on_exit: Mutex<Option<ExitCallback>>,
}

impl DownloadQueueEntry {
    pub fn builder(coordinates: RepositoryCoordinates) -> EntryBuilder {
        EntryBuilder {
            coordinates,
            version: None,
            snapshots: false,
            launch: false,
            download_disabled: false,
            args: Vec::new(),
            sink: Arc::new(NoopSink),
            on_exit: None,
        }
    }

    pub fn coordinates(&self) -> &RepositoryCoordinates {
        &self.coordinates
    }

    pub fn app(&self) -> &str {
        &self.coordinates.app
    }

    /// Pinned version; `None` resolves the repository's latest.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn snapshots_enabled(&self) -> bool {
        self.snapshots
    }

    pub fn launch_after_download(&self) -> bool {
        self.launch
    }

    /// Launch only from what is installed; never fetch.
    pub fn download_disabled(&self) -> bool {
        self.download_disabled
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn sink(&self) -> &dyn ProgressSink {
        self.sink.as_ref()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Takes the completion callback; later calls return `None`.
    pub(crate) fn take_on_exit(&self) -> Option<ExitCallback> {
        self.on_exit.lock().unwrap().take()
    }
}

impl fmt::Debug for DownloadQueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadQueueEntry")
            .field("app", &self.coordinates.app)
            .field("version", &self.version)
            .field("snapshots", &self.snapshots)
            .field("launch", &self.launch)
            .field("download_disabled", &self.download_disabled)
            .field("args", &self.args)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

pub struct EntryBuilder {
    coordinates: RepositoryCoordinates,
    version: Option<String>,
    snapshots: bool,
    launch: bool,
    download_disabled: bool,
    args: Vec<String>,
    sink: Arc<dyn ProgressSink>,
    on_exit: Option<ExitCallback>,
}

impl EntryBuilder {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn snapshots(mut self, enabled: bool) -> Self {
        self.snapshots = enabled;
        self
    }

    pub fn launch(mut self, launch: bool) -> Self {
        self.launch = launch;
        self
    }

    pub fn download_disabled(mut self, disabled: bool) -> Self {
        self.download_disabled = disabled;
        self
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn on_exit(mut self, cb: ExitCallback) -> Self {
        self.on_exit = Some(cb);
        self
    }

    pub fn build(self) -> Arc<DownloadQueueEntry> {
        Arc::new(DownloadQueueEntry {
            coordinates: self.coordinates,
            version: self.version,
            snapshots: self.snapshots,
            launch: self.launch,
            download_disabled: self.download_disabled,
            args: self.args,
            sink: self.sink,
            cancel: CancelToken::new(),
            on_exit: Mutex::new(self.on_exit),
        })
    }
}
