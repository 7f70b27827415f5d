//! Filesystem access used by reconciliation
//!
//! Reconciliation decisions depend on how the filesystem resolves paths that
//! differ only in case. [`InstallFs`] exposes exactly the queries and
//! mutations the algorithm needs, relative to an installation root, so the
//! algorithm can run against simulated case-insensitive filesystems.

use std::io;
use std::path::{Path, PathBuf};

/// Identity of a file on disk, equal for two paths naming the same file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    /// Device (or volume) identifier
    pub device: u64,
    /// Inode (or file index) on that device
    pub inode: u64,
}

/// Filesystem operations relative to an installation root
pub trait InstallFs {
    /// Canonical path of an installation-relative path, `None` if it does not resolve
    fn real_path(&self, relative: &str) -> Option<PathBuf>;

    /// Identity of a resolved file
    fn file_id(&self, real_path: &Path) -> Option<FileId>;

    /// Names of the entries in a resolved directory, as stored on disk
    fn list_dir(&self, real_dir: &Path) -> io::Result<Vec<String>>;

    /// Whether an installation-relative path currently exists
    fn exists(&self, relative: &str) -> bool;

    /// Rename between installation-relative paths
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Remove an installation-relative file
    fn remove_file(&self, relative: &str) -> io::Result<()>;
}

/// The real filesystem below an installation root
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a filesystem view rooted at an installation directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

impl InstallFs for LocalFs {
    fn real_path(&self, relative: &str) -> Option<PathBuf> {
        std::fs::canonicalize(self.absolute(relative)).ok()
    }

    #[cfg(unix)]
    fn file_id(&self, real_path: &Path) -> Option<FileId> {
        use std::os::unix::fs::MetadataExt;

        let metadata = std::fs::metadata(real_path).ok()?;
        Some(FileId {
            device: metadata.dev(),
            inode: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    fn file_id(&self, real_path: &Path) -> Option<FileId> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        // No stable inode here; canonical paths of one file differ at most in case
        std::fs::metadata(real_path).ok()?;
        let mut hasher = DefaultHasher::new();
        real_path
            .to_string_lossy()
            .to_lowercase()
            .hash(&mut hasher);
        Some(FileId {
            device: 0,
            inode: hasher.finish(),
        })
    }

    fn list_dir(&self, real_dir: &Path) -> io::Result<Vec<String>> {
        std::fs::read_dir(real_dir)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn exists(&self, relative: &str) -> bool {
        self.absolute(relative).exists()
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        std::fs::rename(self.absolute(from), self.absolute(to))
    }

    fn remove_file(&self, relative: &str) -> io::Result<()> {
        std::fs::remove_file(self.absolute(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_fs_queries() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("fin-admin")).unwrap();
        std::fs::write(temp.path().join("fin-admin/about.php"), b"about").unwrap();

        let fs = LocalFs::new(temp.path());
        assert!(fs.exists("fin-admin/about.php"));
        assert!(fs.real_path("fin-admin/missing.php").is_none());

        let real = fs.real_path("fin-admin/about.php").unwrap();
        assert!(fs.file_id(&real).is_some());
        assert_eq!(
            fs.list_dir(real.parent().unwrap()).unwrap(),
            vec!["about.php".to_string()]
        );
    }

    #[test]
    fn test_local_fs_mutations() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.php"), b"a").unwrap();

        let fs = LocalFs::new(temp.path());
        fs.rename("a.php", "b.php").unwrap();
        assert!(!fs.exists("a.php"));
        assert!(fs.exists("b.php"));

        fs.remove_file("b.php").unwrap();
        assert!(!fs.exists("b.php"));
    }
}
