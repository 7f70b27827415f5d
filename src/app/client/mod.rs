//! HTTP client implementation for release downloads
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and per-transfer options
//! - `http`: Core HTTP operations with the insecure TLS fallback
//! - `download`: Archive transfer into temporary files and md5 verification
//! - `api`: Release API consumer for checksums and version offers

use std::path::Path;

use indicatif::ProgressBar;

use crate::app::archive::TempArchive;
use crate::app::models::DownloadTarget;
use crate::errors::FetchResult;

// Module declarations
pub mod api;
pub mod config;
pub mod download;
pub mod http;

pub use api::{ChecksumSource, OfferSource, ReleaseApi, ReleaseOffer};
pub use config::{ClientConfig, FetchOptions};
pub use download::Verification;

use download::DownloadHandler;
use http::HttpHandler;

/// HTTP client for fetching and verifying release archives
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http_handler: HttpHandler,
    config: ClientConfig,
    progress: Option<ProgressBar>,
}

impl ReleaseClient {
    /// Creates a client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if HTTP client creation fails
    pub fn new() -> FetchResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if HTTP client creation fails
    pub fn with_config(config: ClientConfig) -> FetchResult<Self> {
        let http_handler = HttpHandler::new(&config)?;
        Ok(Self {
            http_handler,
            config,
            progress: None,
        })
    }

    /// Report transfer progress on a progress bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Transfer an archive into a new temporary file
    ///
    /// See [`DownloadHandler::fetch`].
    ///
    /// # Errors
    ///
    /// Returns `FetchError` for missing releases, non-2xx answers and
    /// transport or I/O failures
    pub async fn fetch(
        &self,
        target: &DownloadTarget,
        scratch: &Path,
        options: &FetchOptions,
    ) -> FetchResult<TempArchive> {
        DownloadHandler::new(&self.http_handler, self.progress.as_ref())
            .fetch(target, scratch, options)
            .await
    }

    /// Check an archive against its published md5 hash
    ///
    /// See [`DownloadHandler::verify`].
    pub async fn verify(
        &self,
        archive: &TempArchive,
        target: &DownloadTarget,
        is_nightly: bool,
        options: &FetchOptions,
    ) -> Verification {
        DownloadHandler::new(&self.http_handler, self.progress.as_ref())
            .verify(archive, target, is_nightly, options)
            .await
    }
}
