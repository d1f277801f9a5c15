//! Progress sink for the terminal: one line per phase, errors to stderr, and
//! everything forwarded to the log.

use launchpad_core::progress::{LoggingSink, ProgressSink};
use std::sync::atomic::{AtomicBool, Ordering};

pub struct ReportSink {
    app: String,
    log: LoggingSink,
    failed: AtomicBool,
    launched: AtomicBool,
}

impl ReportSink {
    pub fn new(app: &str) -> Self {
        Self {
            app: app.to_string(),
            log: LoggingSink::new(app),
            failed: AtomicBool::new(false),
            launched: AtomicBool::new(false),
        }
    }

    /// True once the entry reported an error or was cancelled.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn launched(&self) -> bool {
        self.launched.load(Ordering::SeqCst)
    }
}

impl ProgressSink for ReportSink {
    fn prepare_phase_started(&self) {
        self.log.prepare_phase_started();
    }

    fn download_started(&self) {
        println!("{}: downloading", self.app);
        self.log.download_started();
    }

    fn download_progress_changed(&self, bytes_done: u64, bytes_total: u64) {
        self.log.download_progress_changed(bytes_done, bytes_total);
    }

    fn install_started(&self) {
        println!("{}: installing", self.app);
        self.log.install_started();
    }

    fn launch_started(&self) {
        self.launched.store(true, Ordering::SeqCst);
        println!("{}: launching", self.app);
        self.log.launch_started();
    }

    fn cancel_requested(&self) {
        self.log.cancel_requested();
    }

    fn operation_canceled(&self) {
        self.failed.store(true, Ordering::SeqCst);
        println!("{}: cancelled", self.app);
        self.log.operation_canceled();
    }

    fn show_error_message(&self, message: &str) {
        self.failed.store(true, Ordering::SeqCst);
        eprintln!("{}: {}", self.app, message);
        self.log.show_error_message(message);
    }

    fn hidden(&self) {
        self.log.hidden();
    }
}
