//! Per-entry error taxonomy.
//!
//! Every failure a worker can hit while servicing one queue entry is folded
//! into [`DownloadError`] and reported through the entry's progress sink.
//! None of these ever terminate a worker thread.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    /// The repository's "latest" pointer (or a pinned version) has the wrong
    /// release/snapshot classification, or names a version the repository does not list.
    #[error("invalid repository state: {0}")]
    InvalidRepositoryState(String),

    /// Transient transport failure (connect, DNS, non-2xx status, truncated body).
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// A metadata document could not be parsed or lacks a required element.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Local filesystem failure (lock marker, partial file, install rename).
    #[error("I/O failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Cooperative abort requested by the producer.
    #[error("operation cancelled")]
    Cancelled,
}

impl DownloadError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        DownloadError::IoFailure {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_failure_display_names_path() {
        let err = DownloadError::io(
            Path::new("/tmp/app/1.0/app-1.0.jar.lock"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("app-1.0.jar.lock"));
        assert!(text.contains("denied"));
    }
}
