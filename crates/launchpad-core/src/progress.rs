//! Progress notifications for one queue entry.
//!
//! A worker reports each entry's lifecycle in phase order: prepare, download
//! (with zero or more progress updates), install, launch. Cancellation or an
//! error can cut in at any phase; `hidden` always comes last.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc;

/// Receiver of lifecycle events. All methods default to no-ops so a sink only
/// implements what it displays.
pub trait ProgressSink: Send + Sync {
    fn prepare_phase_started(&self) {}
    fn download_started(&self) {}
    fn download_progress_changed(&self, _bytes_done: u64, _bytes_total: u64) {}
    fn install_started(&self) {}
    fn launch_started(&self) {}
    fn cancel_requested(&self) {}
    fn operation_canceled(&self) {}
    fn show_error_message(&self, _text: &str) {}
    fn hidden(&self) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {}

/// Event form of [`ProgressSink`] calls, for forwarding across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    PreparePhaseStarted,
    DownloadStarted,
    DownloadProgressChanged { bytes_done: u64, bytes_total: u64 },
    InstallStarted,
    LaunchStarted,
    CancelRequested,
    OperationCanceled,
    Error(String),
    Hidden,
}

/// Forwards events over a channel. A dropped receiver silently discards them.
pub struct ChannelSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Sink plus the receiving end.
    pub fn channel() -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl ProgressSink for ChannelSink {
    fn prepare_phase_started(&self) {
        self.send(ProgressEvent::PreparePhaseStarted);
    }
    fn download_started(&self) {
        self.send(ProgressEvent::DownloadStarted);
    }
    fn download_progress_changed(&self, bytes_done: u64, bytes_total: u64) {
        self.send(ProgressEvent::DownloadProgressChanged {
            bytes_done,
            bytes_total,
        });
    }
    fn install_started(&self) {
        self.send(ProgressEvent::InstallStarted);
    }
    fn launch_started(&self) {
        self.send(ProgressEvent::LaunchStarted);
    }
    fn cancel_requested(&self) {
        self.send(ProgressEvent::CancelRequested);
    }
    fn operation_canceled(&self) {
        self.send(ProgressEvent::OperationCanceled);
    }
    fn show_error_message(&self, text: &str) {
        self.send(ProgressEvent::Error(text.to_string()));
    }
    fn hidden(&self) {
        self.send(ProgressEvent::Hidden);
    }
}

/// Writes events to the tracing log. Download progress is logged once per
/// 10% step to keep the log readable.
pub struct LoggingSink {
    app: String,
    last_decile: AtomicU8,
}

impl LoggingSink {
    pub fn new(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            last_decile: AtomicU8::new(0),
        }
    }
}

impl ProgressSink for LoggingSink {
    fn prepare_phase_started(&self) {
        tracing::info!(app = %self.app, "preparing");
    }
    fn download_started(&self) {
        self.last_decile.store(0, Ordering::Relaxed);
        tracing::info!(app = %self.app, "download started");
    }
    fn download_progress_changed(&self, bytes_done: u64, bytes_total: u64) {
        if bytes_total == 0 {
            return;
        }
        let decile = ((bytes_done.min(bytes_total) * 10) / bytes_total) as u8;
        if decile > self.last_decile.fetch_max(decile, Ordering::Relaxed) {
            tracing::info!(
                app = %self.app,
                "{:.1} / {:.1} MiB ({}%)",
                bytes_done as f64 / 1_048_576.0,
                bytes_total as f64 / 1_048_576.0,
                decile as u32 * 10
            );
        }
    }
    fn install_started(&self) {
        tracing::info!(app = %self.app, "installing");
    }
    fn launch_started(&self) {
        tracing::info!(app = %self.app, "launching");
    }
    fn cancel_requested(&self) {
        tracing::info!(app = %self.app, "cancel requested");
    }
    fn operation_canceled(&self) {
        tracing::info!(app = %self.app, "cancelled");
    }
    fn show_error_message(&self, text: &str) {
        tracing::warn!(app = %self.app, "{}", text);
    }
}
