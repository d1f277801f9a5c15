//! Where metadata documents come from.

use std::time::Duration;

use crate::error::DownloadError;

/// Fetches the text of a metadata document by URL.
pub trait MetadataSource: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, DownloadError>;
}

/// Plain HTTP GET via libcurl. Runs in the calling thread.
#[derive(Debug, Clone)]
pub struct HttpMetadataSource {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for HttpMetadataSource {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpMetadataSource {
    fn get(&self, url: &str) -> Result<(u32, Vec<u8>), curl::Error> {
        let mut body = Vec::new();
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }
        let code = easy.response_code()?;
        Ok((code, body))
    }
}

impl MetadataSource for HttpMetadataSource {
    fn fetch(&self, url: &str) -> Result<String, DownloadError> {
        tracing::debug!(url, "fetching metadata");
        let (code, body) = self
            .get(url)
            .map_err(|e| DownloadError::NetworkFailure(format!("GET {}: {}", url, e)))?;
        if !crate::transfer::status_ok(url, code) {
            return Err(DownloadError::NetworkFailure(format!(
                "GET {} returned HTTP {}",
                url, code
            )));
        }
        String::from_utf8(body)
            .map_err(|_| DownloadError::MalformedMetadata(format!("{} is not valid UTF-8", url)))
    }
}
