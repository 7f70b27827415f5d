//! Archive cache with atomic imports
//!
//! This module contains the main ArchiveCache implementation. Imports copy
//! the archive into a uniquely named temporary sibling and rename it into
//! place, so readers never observe a partially written entry. There is no
//! locking: when two imports race, the last rename wins.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, info, warn};

use crate::constants::{cache, files};
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::key::CacheKey;
use super::stats::{CacheStats, DirectoryScanner};

/// Local store of downloaded release archives
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    /// Configuration
    config: CacheConfig,
    /// Cache root directory
    cache_root: PathBuf,
}

impl ArchiveCache {
    /// Create a new archive cache
    ///
    /// # Arguments
    ///
    /// * `config` - Cache configuration
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if cache directory cannot be created or accessed
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        let cache_root = match &config.cache_root {
            Some(path) => path.clone(),
            None => Self::default_cache_dir()?,
        };

        Self::ensure_directory_exists(&cache_root).await?;

        debug!("Using archive cache at {}", cache_root.display());

        Ok(Self { config, cache_root })
    }

    /// Get the cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Default cache directory for the current OS
    ///
    /// - macOS: ~/Library/Caches/core-fetcher
    /// - Linux: ~/.cache/core-fetcher
    /// - Windows: %LOCALAPPDATA%/core-fetcher
    pub fn default_cache_dir() -> CacheResult<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| CacheError::DirectoryNotAccessible {
                path: PathBuf::from("system cache directory"),
            })?
            .join(cache::APP_DIR);

        Ok(cache_dir)
    }

    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !fs::try_exists(path).await.unwrap_or(false) {
            fs::create_dir_all(path).await.map_err(|e| {
                error!("Failed to create cache directory: {}", e);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }

    /// Path an entry is stored at, whether or not it exists
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_root.join(key.relative_path())
    }

    /// Local path of a stored archive
    ///
    /// The entry is not re-validated.
    pub async fn has(&self, key: &CacheKey) -> Option<PathBuf> {
        let path = self.entry_path(key);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {
                debug!("Cache hit for {}", key);
                Some(path)
            }
            _ => None,
        }
    }

    /// Store a copy of an archive under a key
    ///
    /// Failures are logged as warnings and reported as `false`; they never
    /// abort the caller's operation.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache key of the archive
    /// * `source` - Archive to copy; left in place
    pub async fn import(&self, key: &CacheKey, source: &Path) -> bool {
        match self.try_import(key, source).await {
            Ok(path) => {
                info!("Cached archive at {}", path.display());
                true
            }
            Err(e) => {
                warn!("Failed to cache {}: {}", key, e);
                false
            }
        }
    }

    /// Store a copy of an archive under a key, atomically
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ImportFailed` if the copy or the rename fails
    pub async fn try_import(&self, key: &CacheKey, source: &Path) -> CacheResult<PathBuf> {
        let final_path = self.entry_path(key);
        let import_failed = |reason: String| CacheError::ImportFailed {
            key: key.to_string(),
            reason,
        };

        let parent = final_path
            .parent()
            .ok_or_else(|| CacheError::InvalidKey {
                key: key.to_string(),
            })?;
        Self::ensure_directory_exists(parent).await?;

        let file_name = final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = tempfile::Builder::new()
            .prefix(&format!(".{}", file_name))
            .suffix(files::TEMP_FILE_SUFFIX)
            .tempfile_in(parent)
            .map_err(|e| import_failed(format!("Temporary file creation failed: {}", e)))?
            .into_temp_path();

        // Dropping temp_path on any early return removes the partial copy
        fs::copy(source, &temp_path)
            .await
            .map_err(|e| import_failed(format!("Copy failed: {}", e)))?;

        temp_path
            .persist(&final_path)
            .map_err(|e| import_failed(format!("Atomic rename failed: {}", e.error)))?;

        Ok(final_path)
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        DirectoryScanner::scan_cache_directory(&self.cache_root).await
    }

    /// Remove every stored archive
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Io` if an entry cannot be removed
    pub async fn clear(&self) -> CacheResult<usize> {
        let stats = self.stats().await;
        for entry in &stats.entries {
            fs::remove_file(&entry.path).await?;
            debug!("Removed cached archive {}", entry.key);
        }

        info!("Removed {} cached archives", stats.entries.len());
        Ok(stats.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::ArchiveFormat;
    use tempfile::TempDir;

    async fn create_test_cache() -> (ArchiveCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig::with_cache_root(temp_dir.path().join("cache"));
        let cache = ArchiveCache::new(config).await.unwrap();
        (cache, temp_dir)
    }

    #[tokio::test]
    async fn test_cache_creation() {
        let (cache, temp_dir) = create_test_cache().await;
        assert!(cache.cache_root().exists());
        assert_eq!(cache.cache_root(), temp_dir.path().join("cache"));
    }

    #[tokio::test]
    async fn test_import_then_has_is_byte_identical() {
        let (cache, temp_dir) = create_test_cache().await;
        let key = CacheKey::new("6.7", "en_US", ArchiveFormat::Zip).unwrap();
        assert!(cache.has(&key).await.is_none());

        let source = temp_dir.path().join("fin_abc.zip");
        let content: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        std::fs::write(&source, &content).unwrap();

        assert!(cache.import(&key, &source).await);

        let stored = cache.has(&key).await.unwrap();
        assert_eq!(stored, cache.cache_root().join("core/finpress-6.7-en_US.zip"));
        assert_eq!(std::fs::read(&stored).unwrap(), content);
        assert!(source.exists());

        // No temporary siblings left behind
        let siblings: Vec<_> = std::fs::read_dir(stored.parent().unwrap())
            .unwrap()
            .flatten()
            .collect();
        assert_eq!(siblings.len(), 1);
    }

    #[tokio::test]
    async fn test_reimport_supersedes_entry() {
        let (cache, temp_dir) = create_test_cache().await;
        let key = CacheKey::new("6.7", "de_DE", ArchiveFormat::TarGz).unwrap();
        let source = temp_dir.path().join("fin_1.tar.gz");

        std::fs::write(&source, b"first").unwrap();
        assert!(cache.import(&key, &source).await);
        std::fs::write(&source, b"second").unwrap();
        assert!(cache.import(&key, &source).await);

        let stored = cache.has(&key).await.unwrap();
        assert_eq!(std::fs::read(stored).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_failed_import_reports_false() {
        let (cache, temp_dir) = create_test_cache().await;
        let key = CacheKey::new("6.7", "en_US", ArchiveFormat::Zip).unwrap();

        let missing = temp_dir.path().join("missing.zip");
        assert!(!cache.import(&key, &missing).await);
        assert!(cache.has(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let (cache, temp_dir) = create_test_cache().await;
        let source = temp_dir.path().join("fin_2.zip");
        std::fs::write(&source, b"abcd").unwrap();

        for version in ["6.6", "6.7"] {
            let key = CacheKey::new(version, "en_US", ArchiveFormat::Zip).unwrap();
            assert!(cache.import(&key, &source).await);
        }

        let stats = cache.stats().await;
        assert_eq!(stats.cached_files_count(), 2);
        assert_eq!(stats.total_cache_size, 8);

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert_eq!(cache.stats().await.cached_files_count(), 0);
    }
}
