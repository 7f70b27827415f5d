//! Archive transfer and integrity verification
//!
//! Archives are streamed into a temporary file in the scratch directory.
//! Explicit local paths are copied instead of fetched. Verification compares
//! the archive against the detached `.md5` resource published next to it.

use std::path::Path;

use indicatif::ProgressBar;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::app::archive::TempArchive;
use crate::app::client::config::FetchOptions;
use crate::app::client::http::HttpHandler;
use crate::app::hash::Md5Hash;
use crate::app::models::DownloadTarget;
use crate::constants::http;
use crate::errors::{FetchError, FetchResult, IntegrityError};

/// Outcome of checking an archive against its published hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The archive matches the published hash
    Verified(Md5Hash),
    /// No hash could be obtained; the archive is accepted with a warning
    Unavailable(String),
    /// The archive does not match the published hash
    Mismatch { expected: String, actual: Md5Hash },
}

impl Verification {
    /// Whether the archive may be used
    pub fn is_acceptable(&self) -> bool {
        !matches!(self, Verification::Mismatch { .. })
    }

    /// Convert a mismatch into an error
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::HashMismatch` for `Mismatch`
    pub fn into_result(self) -> Result<Option<Md5Hash>, IntegrityError> {
        match self {
            Verification::Verified(hash) => Ok(Some(hash)),
            Verification::Unavailable(_) => Ok(None),
            Verification::Mismatch { expected, actual } => Err(IntegrityError::HashMismatch {
                expected,
                actual: actual.to_hex(),
            }),
        }
    }
}

/// Archive transfer handler
pub struct DownloadHandler<'a> {
    http_handler: &'a HttpHandler,
    progress: Option<&'a ProgressBar>,
}

impl<'a> DownloadHandler<'a> {
    /// Creates a new DownloadHandler with the given HTTP handler
    pub fn new(http_handler: &'a HttpHandler, progress: Option<&'a ProgressBar>) -> Self {
        Self {
            http_handler,
            progress,
        }
    }

    /// Transfer an archive into a new temporary file
    ///
    /// # Arguments
    ///
    /// * `target` - Remote URL or local path of the archive
    /// * `scratch` - Directory for the temporary file
    /// * `options` - Timeout and TLS fallback settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The server answers 404, or a local path does not exist (`NotFound`)
    /// - The server answers any other non-2xx status (`Transfer`)
    /// - The transfer fails or times out
    /// - The temporary file cannot be written
    pub async fn fetch(
        &self,
        target: &DownloadTarget,
        scratch: &Path,
        options: &FetchOptions,
    ) -> FetchResult<TempArchive> {
        if !target.is_remote() {
            return self.copy_local(target, scratch).await;
        }

        let mut response = self
            .http_handler
            .get(&target.url, http::ACCEPT, options)
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(FetchError::NotFound {
                url: target.url.clone(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Transfer {
                url: target.url.clone(),
                status: status.as_u16(),
            });
        }

        let (file, archive) = TempArchive::create_in(scratch, target.format)?;
        let mut file = tokio::fs::File::from_std(file);

        if let (Some(bar), Some(length)) = (self.progress, response.content_length()) {
            bar.set_length(length);
        }

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transfer_error(e, options))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            if let Some(bar) = self.progress {
                bar.set_position(written);
            }
        }
        file.flush().await?;

        info!("Downloaded {} bytes from {}", written, target.url);
        Ok(archive)
    }

    async fn copy_local(&self, target: &DownloadTarget, scratch: &Path) -> FetchResult<TempArchive> {
        let source = Path::new(&target.url);
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(FetchError::NotFound {
                url: target.url.clone(),
            });
        }

        let archive = TempArchive::copy_of(source, scratch, target.format).await?;
        info!("Copied local archive {}", source.display());
        Ok(archive)
    }

    /// Check an archive against the `.md5` resource next to its URL
    ///
    /// Never fails: anything preventing the check yields `Unavailable`
    /// with a logged warning.
    ///
    /// # Arguments
    ///
    /// * `archive` - Downloaded archive
    /// * `target` - Where the archive was downloaded from
    /// * `is_nightly` - Nightly builds publish no hash
    /// * `options` - Timeout and TLS fallback settings
    pub async fn verify(
        &self,
        archive: &TempArchive,
        target: &DownloadTarget,
        is_nightly: bool,
        options: &FetchOptions,
    ) -> Verification {
        if is_nightly {
            return unavailable("md5 hash checks are not available for nightly downloads.".to_string());
        }

        let hash_url = target.hash_url();
        let response = match self.http_handler.get(&hash_url, "*/*", options).await {
            Ok(response) => response,
            Err(e) => {
                return unavailable(format!(
                    "Couldn't access md5 hash for release ({}): {}",
                    hash_url, e
                ))
            }
        };

        let status = response.status();
        if !status.is_success() {
            return unavailable(format!(
                "Couldn't access md5 hash for release ({}, HTTP code {})",
                hash_url,
                status.as_u16()
            ));
        }

        let expected = match response.text().await {
            Ok(body) => body.trim().to_string(),
            Err(e) => {
                return unavailable(format!(
                    "Couldn't read md5 hash for release ({}): {}",
                    hash_url, e
                ))
            }
        };

        let actual = match Md5Hash::of_file(archive.path()).await {
            Ok(hash) => hash,
            Err(e) => return unavailable(format!("Couldn't hash downloaded archive: {}", e)),
        };

        if actual.to_hex() == expected {
            info!("md5 hash verified: {}", expected);
            Verification::Verified(actual)
        } else {
            Verification::Mismatch { expected, actual }
        }
    }
}

fn unavailable(reason: String) -> Verification {
    warn!("{}", reason);
    Verification::Unavailable(reason)
}

fn transfer_error(error: reqwest::Error, options: &FetchOptions) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            seconds: options.timeout.as_secs(),
        }
    } else {
        FetchError::Http(error)
    }
}
