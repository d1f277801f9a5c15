//! Artifact transfer: "download this URL to that path".
//!
//! The worker only depends on [`ArtifactFetcher`]; [`CurlFetcher`] is the
//! libcurl-backed implementation used outside tests.

mod http;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::control::CancelToken;
use crate::error::DownloadError;

pub use http::CurlFetcher;

/// Failure of a single transfer, before it is folded into [`DownloadError`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    #[error("storage: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transfer cancelled")]
    Cancelled,
}

impl From<FetchError> for DownloadError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Storage { path, source } => DownloadError::IoFailure { path, source },
            FetchError::Cancelled => DownloadError::Cancelled,
            other => DownloadError::NetworkFailure(other.to_string()),
        }
    }
}

/// Downloads one URL into `dest`, reporting `(bytes_done, bytes_total)` as it
/// goes (`bytes_total` is 0 while unknown) and polling `cancel` at every
/// checkpoint. Returns the number of bytes written.
pub trait ArtifactFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, u64),
        cancel: &CancelToken,
    ) -> Result<u64, FetchError>;
}

/// True for 2xx responses. `file:` URLs report code 0 on success.
pub(crate) fn status_ok(url: &str, code: u32) -> bool {
    (200..300).contains(&code) || (code == 0 && url.starts_with("file:"))
}
