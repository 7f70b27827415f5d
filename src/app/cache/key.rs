//! Cache keys for release archives
//!
//! Archives are stored at `core/finpress-{version}-{locale}.{ext}` below the
//! cache root. The key is computed from the requested version, not the
//! normalized one used in download URLs.

use std::fmt;
use std::path::PathBuf;

use crate::app::models::ArchiveFormat;
use crate::constants::{cache, release};
use crate::errors::{CacheError, CacheResult};

/// Location of an archive relative to the cache root
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a release archive
    ///
    /// # Errors
    ///
    /// Returns `CacheError::InvalidKey` if the version or locale is empty or
    /// would escape the cache namespace
    pub fn new(version: &str, locale: &str, format: ArchiveFormat) -> CacheResult<Self> {
        let key = format!(
            "{}/{}-{}-{}.{}",
            cache::CORE_NAMESPACE,
            release::ARCHIVE_PREFIX,
            version,
            locale,
            format.extension()
        );

        let unsafe_part = |part: &str| {
            part.is_empty() || part.contains(['/', '\\']) || part.contains("..")
        };
        if unsafe_part(version) || unsafe_part(locale) {
            return Err(CacheError::InvalidKey { key });
        }

        Ok(Self(key))
    }

    /// Key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path relative to the cache root
    pub fn relative_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
