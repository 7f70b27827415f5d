//! Prelude module for Core Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use core_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use core_fetcher::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ReleaseClient::new()?;
//!     let api = ReleaseApi::new(client.config())?;
//!     let cache = ArchiveCache::new(CacheConfig::default()).await?;
//!     let pipeline = CorePipeline::new(client, cache, api);
//!
//!     let request = AcquireRequest::release("6.7", DEFAULT_LOCALE, false, "./site");
//!     pipeline.acquire(&request).await?;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Essential app components that are used in most integrations
pub use crate::app::{
    // Pipeline
    AcquireReport,
    AcquireRequest,
    CorePipeline,

    // Components
    ArchiveCache,
    CacheConfig,
    ClientConfig,
    FetchOptions,
    ReleaseApi,
    ReleaseClient,
    Reconciler,

    // Data types
    ArchiveFormat,
    InstalledCore,
    Manifest,
    Md5Hash,
    ReconcileOutcome,
    Verification,
    VersionSpec,
};

// Configuration
pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{CONTENT_DIR, DEFAULT_LOCALE, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};

pub use tokio;
