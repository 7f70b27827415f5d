//! Cache statistics and entry listing
//!
//! This module provides the inventory of stored archives shown by
//! `cache info`, including file counts and disk usage.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::app::models::ArchiveFormat;

/// A stored archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Key of the entry, e.g. `core/finpress-6.7-en_US.zip`
    pub key: String,
    /// Absolute path of the stored archive
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: Option<DateTime<Utc>>,
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Cache root directory
    pub cache_root: PathBuf,
    /// Stored archives sorted by key
    pub entries: Vec<CacheEntry>,
    /// Total size of stored archives in bytes
    pub total_cache_size: u64,
}

impl CacheStats {
    /// Number of stored archives
    pub fn cached_files_count(&self) -> usize {
        self.entries.len()
    }

    /// Format cache size in human-readable format
    pub fn format_cache_size(&self) -> String {
        format_bytes(self.total_cache_size)
    }
}

/// Directory scanner for cache statistics
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Scan the cache root for stored archives
    ///
    /// An unreadable cache root yields empty statistics.
    pub async fn scan_cache_directory(cache_root: &Path) -> CacheStats {
        let root = cache_root.to_path_buf();

        let mut entries = tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            Self::scan_directory_recursive(&root, &root, &mut entries);
            entries
        })
        .await
        .unwrap_or_else(|e| {
            warn!("Cache scan of {} aborted: {}", cache_root.display(), e);
            Vec::new()
        });

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        let total_cache_size = entries.iter().map(|e| e.size).sum();

        CacheStats {
            cache_root: cache_root.to_path_buf(),
            entries,
            total_cache_size,
        }
    }

    fn scan_directory_recursive(root: &Path, dir: &Path, entries: &mut Vec<CacheEntry>) {
        let Ok(read_dir) = std::fs::read_dir(dir) else {
            return;
        };

        for entry in read_dir.flatten() {
            let path = entry.path();

            if path.is_dir() {
                Self::scan_directory_recursive(root, &path, entries);
            } else if path.is_file() && Self::is_archive(&path) {
                let Ok(metadata) = entry.metadata() else {
                    continue;
                };
                let key = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");

                entries.push(CacheEntry {
                    key,
                    path: path.clone(),
                    size: metadata.len(),
                    modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                });
            }
        }
    }

    /// Temporary siblings of in-flight imports are not entries
    fn is_archive(path: &Path) -> bool {
        ArchiveFormat::from_path(path).is_some()
    }
}

/// Binary-prefixed size, e.g. "25.00 MB"
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for &next in &UNITS[1..] {
        if size < 1024.0 {
            break;
        }
        size /= 1024.0;
        unit = next;
    }
    format!("{:.2} {}", size, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(25 * 1024 * 1024), "25.00 MB");
        assert_eq!(format_bytes(3 * 1024u64.pow(4)), "3.00 TB");
    }

    #[tokio::test]
    async fn test_scan_skips_temporary_files() {
        let temp = TempDir::new().unwrap();
        let core = temp.path().join("core");
        std::fs::create_dir_all(&core).unwrap();
        std::fs::write(core.join("finpress-6.7-en_US.zip"), b"12345").unwrap();
        std::fs::write(core.join(".finpress-6.8-en_US.zip.abc.tmp"), b"partial").unwrap();

        let stats = DirectoryScanner::scan_cache_directory(temp.path()).await;
        assert_eq!(stats.cached_files_count(), 1);
        assert_eq!(stats.entries[0].key, "core/finpress-6.7-en_US.zip");
        assert_eq!(stats.total_cache_size, 5);
    }
}
