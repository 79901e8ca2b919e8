//! Network transfers.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::interrupt::CancelFlag;

/// Errors raised while talking to the vendor website.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum FetchError {
    /// Request to {url} failed.
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// {url} answered with status {status}.
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Failed to store the download from {url} at {path:?}.
    Store {
        url: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The download from {url} was interrupted.
    Interrupted { url: String },
}

/// Something that can download resources.
pub trait Fetcher {
    /// Fetches the content of `url` into memory.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Downloads `url` into `dir`, keeping the last path segment of the URL as file name.
    ///
    /// Returns the path of the downloaded file. Nothing is left behind in `dir` on failure.
    fn download(&self, url: &str, dir: &Path) -> Result<PathBuf, FetchError>;

    /// Fetches the content of `url` as text.
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// The file name a download from `url` is stored under.
pub fn file_name_from_url(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next() {
        Some(name) if !name.is_empty() => name,
        _ => "download",
    }
}

/// A [`Fetcher`] using a blocking HTTP client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    cancel: CancelFlag,
}

impl HttpFetcher {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            cancel,
        }
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, FetchError> {
        tracing::debug!("GET {url}");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }

    /// Copies the response body in chunks, checking for cancellation between them.
    fn copy_body(
        &self,
        url: &str,
        path: &Path,
        mut response: reqwest::blocking::Response,
        out: &mut impl Write,
    ) -> Result<u64, FetchError> {
        let store_error = |source| FetchError::Store {
            url: url.to_string(),
            path: path.to_path_buf(),
            source,
        };

        let mut buffer = [0u8; 64 * 1024];
        let mut total = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Interrupted {
                    url: url.to_string(),
                });
            }

            let read = response.read(&mut buffer).map_err(store_error)?;
            if read == 0 {
                break;
            }
            out.write_all(&buffer[..read]).map_err(store_error)?;
            total += read as u64;
        }

        Ok(total)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.get(url)?;
        let mut bytes = Vec::new();
        self.copy_body(url, Path::new(url), response, &mut bytes)?;
        Ok(bytes)
    }

    fn download(&self, url: &str, dir: &Path) -> Result<PathBuf, FetchError> {
        let target = dir.join(file_name_from_url(url));
        let store_error = |source| FetchError::Store {
            url: url.to_string(),
            path: target.clone(),
            source,
        };

        let response = self.get(url)?;
        if let Some(length) = response.content_length() {
            tracing::info!("Downloading {} ({} kB)", target.display(), length / 1024);
        }

        fs::create_dir_all(dir).map_err(store_error)?;

        // The temporary file is removed when dropped, so failures leave nothing behind.
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(store_error)?;
        let total = self.copy_body(url, &target, response, &mut file)?;
        file.persist(&target)
            .map_err(|error| store_error(error.error))?;

        tracing::info!("Downloaded {} bytes to {}", total, target.display());
        Ok(target)
    }
}
