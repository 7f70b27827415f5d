//! Core application logic for Core Fetcher
//!
//! This module contains the acquisition pipeline and its components: release
//! resolution, the HTTP client, the archive cache, archive handling,
//! update discovery and post-upgrade reconciliation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use core_fetcher::app::{
//!     AcquireRequest, ArchiveCache, CacheConfig, CorePipeline, ReleaseApi, ReleaseClient,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ReleaseClient::new()?;
//! let api = ReleaseApi::new(client.config())?;
//! let cache = ArchiveCache::new(CacheConfig::default()).await?;
//!
//! let pipeline = CorePipeline::new(client, cache, api);
//! let request = AcquireRequest::release("latest", "en_US", false, "/var/www/site");
//! let report = pipeline.acquire(&request).await?;
//!
//! println!("Installed {:?} from {}", report.version, report.archive_url);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod cache;
pub mod client;
pub mod hash;
pub mod install;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod release;
pub mod signals;
pub mod updates;

// Re-export main public API
pub use archive::{ExtractReport, TempArchive};
pub use cache::{ArchiveCache, CacheConfig, CacheKey, CacheStats};
pub use client::{
    ChecksumSource, ClientConfig, FetchOptions, OfferSource, ReleaseApi, ReleaseClient,
    ReleaseOffer, Verification,
};
pub use hash::Md5Hash;
pub use install::{is_core_present, InstalledCore};
pub use models::{ArchiveFormat, ArchiveSource, DownloadTarget, Manifest, VersionSpec};
pub use pipeline::{AcquireReport, AcquireRequest, CorePipeline, UpdateOutcome};
pub use reconcile::{
    FileAction, InstallFs, LocalFs, ReconcileOutcome, ReconcileReport, Reconciler,
};
pub use release::resolve;
pub use signals::{run_until_shutdown, shutdown_signal};
pub use updates::{AvailableUpdate, UpdateFilter, UpdateType};
