//! Archive cache with atomic imports
//!
//! Downloaded release archives are kept so later installs of the same
//! version and locale skip the network.
//!
//! # Key Features
//!
//! - **OS-specific cache directories**: Uses the standard system cache location
//! - **Atomic operations**: Imports use the temp-file + rename pattern
//! - **Stable keys**: `core/finpress-{version}-{locale}.{ext}`
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`key`] - Cache key construction
//! - [`stats`] - Entry listing and disk usage
//! - [`manager`] - Core cache with atomic imports
//!
//! # Examples
//!
//! ```rust,no_run
//! use core_fetcher::app::cache::{ArchiveCache, CacheConfig, CacheKey};
//! use core_fetcher::app::models::ArchiveFormat;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ArchiveCache::new(CacheConfig::default()).await?;
//! let key = CacheKey::new("6.7", "en_US", ArchiveFormat::Zip)?;
//!
//! if cache.has(&key).await.is_none() {
//!     cache.import(&key, Path::new("/tmp/fin_download.zip")).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod key;
pub mod manager;
pub mod stats;

pub use config::CacheConfig;
pub use key::CacheKey;
pub use manager::ArchiveCache;
pub use stats::{CacheEntry, CacheStats};
