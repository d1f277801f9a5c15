//! Single-stream HTTP GET fetcher.

use std::io;
use std::path::Path;
use std::time::Duration;

use super::{status_ok, ArtifactFetcher, FetchError};
use crate::control::CancelToken;
use crate::storage::PartialFile;

#[derive(Debug, Clone)]
pub struct CurlFetcher {
    pub connect_timeout: Duration,
    /// Abort when the transfer stays under 1 KiB/s for this long.
    pub low_speed_time: Duration,
    pub max_recv_speed: Option<u64>,
}

impl Default for CurlFetcher {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            low_speed_time: Duration::from_secs(60),
            max_recv_speed: None,
        }
    }
}

impl ArtifactFetcher for CurlFetcher {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: &mut dyn FnMut(u64, u64),
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        let mut part = PartialFile::create(dest).map_err(|source| FetchError::Storage {
            path: dest.to_path_buf(),
            source,
        })?;
        let mut write_err: Option<io::Error> = None;
        let mut last_reported = (u64::MAX, u64::MAX);

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.fail_on_error(false)?;
        if let Some(speed) = self.max_recv_speed {
            easy.max_recv_speed(speed)?;
        }
        easy.connect_timeout(self.connect_timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(self.low_speed_time)?;
        easy.progress(true)?;

        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                if cancel.is_cancelled() {
                    return Ok(0); // abort transfer
                }
                match part.write_all(data) {
                    Ok(()) => Ok(data.len()),
                    Err(e) => {
                        write_err = Some(e);
                        Ok(0)
                    }
                }
            })?;
            transfer.progress_function(|dltotal, dlnow, _, _| {
                let now = (dlnow.max(0.0) as u64, dltotal.max(0.0) as u64);
                if now != last_reported && now.0 > 0 {
                    last_reported = now;
                    progress(now.0, now.1);
                }
                !cancel.is_cancelled()
            })?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            if let Some(source) = write_err {
                return Err(FetchError::Storage {
                    path: dest.to_path_buf(),
                    source,
                });
            }
            return Err(FetchError::Curl(e));
        }

        let code = easy.response_code()?;
        if !status_ok(url, code) {
            return Err(FetchError::Http(code));
        }

        let expected = easy.content_length_download().unwrap_or(-1.0);
        let written = part.sync().map_err(|source| FetchError::Storage {
            path: dest.to_path_buf(),
            source,
        })?;
        if expected >= 0.0 && written != expected as u64 {
            return Err(FetchError::PartialTransfer {
                expected: expected as u64,
                received: written,
            });
        }
        progress(written, written);
        Ok(written)
    }
}
