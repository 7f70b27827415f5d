//! Reconciliation tests against simulated filesystems

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use super::*;
use crate::app::hash::Md5Hash;

const ROOT: &str = "/site";

/// How a simulated filesystem resolves paths that differ only in case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaseMode {
    /// Linux: distinct names are distinct files
    Sensitive,
    /// Windows: lookups ignore case, canonical paths carry the stored case
    InsensitiveStoredCase,
    /// macOS: lookups ignore case, canonical paths echo the requested case
    InsensitiveRequestedCase,
}

/// In-memory installation keyed by stored path, valued by file identity
struct MemoryFs {
    mode: CaseMode,
    files: Mutex<BTreeMap<String, u64>>,
    /// Paths that refuse removal
    locked: Vec<String>,
}

impl MemoryFs {
    fn with_files(mode: CaseMode, paths: &[&str]) -> Self {
        let files = paths
            .iter()
            .enumerate()
            .map(|(id, path)| (path.to_string(), id as u64 + 1))
            .collect();
        Self {
            mode,
            files: Mutex::new(files),
            locked: Vec::new(),
        }
    }

    fn with_locked(mut self, paths: &[&str]) -> Self {
        self.locked = paths.iter().map(|path| path.to_string()).collect();
        self
    }

    fn stored_paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    fn lookup(&self, relative: &str) -> Option<(String, u64)> {
        let files = self.files.lock().unwrap();
        if let Some(id) = files.get(relative) {
            return Some((relative.to_string(), *id));
        }
        if self.mode == CaseMode::Sensitive {
            return None;
        }
        files
            .iter()
            .find(|(stored, _)| stored.eq_ignore_ascii_case(relative))
            .map(|(stored, id)| (stored.clone(), *id))
    }

    fn relative(real: &Path) -> String {
        real.strip_prefix(ROOT)
            .unwrap_or(real)
            .to_string_lossy()
            .into_owned()
    }
}

impl InstallFs for MemoryFs {
    fn real_path(&self, relative: &str) -> Option<PathBuf> {
        let (stored, _) = self.lookup(relative)?;
        let shown = match self.mode {
            CaseMode::InsensitiveRequestedCase => relative.to_string(),
            _ => stored,
        };
        Some(Path::new(ROOT).join(shown))
    }

    fn file_id(&self, real_path: &Path) -> Option<FileId> {
        let (_, id) = self.lookup(&Self::relative(real_path))?;
        Some(FileId {
            device: 1,
            inode: id,
        })
    }

    fn list_dir(&self, real_dir: &Path) -> io::Result<Vec<String>> {
        let dir = Self::relative(real_dir);
        let names = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|stored| {
                let path = Path::new(stored);
                let parent = path.parent()?.to_string_lossy().into_owned();
                let matches = match self.mode {
                    CaseMode::Sensitive => parent == dir,
                    _ => parent.eq_ignore_ascii_case(&dir),
                };
                matches.then(|| path.file_name().unwrap().to_string_lossy().into_owned())
            })
            .collect();
        Ok(names)
    }

    fn exists(&self, relative: &str) -> bool {
        self.lookup(relative).is_some()
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let (stored_from, id) = self
            .lookup(from)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        let replaced = self.lookup(to).map(|(stored, _)| stored);

        let mut files = self.files.lock().unwrap();
        files.remove(&stored_from);
        if let Some(stored_to) = replaced {
            files.remove(&stored_to);
        }
        files.insert(to.to_string(), id);
        Ok(())
    }

    fn remove_file(&self, relative: &str) -> io::Result<()> {
        if self.locked.iter().any(|locked| locked == relative) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        let (stored, _) = self
            .lookup(relative)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        self.files.lock().unwrap().remove(&stored);
        Ok(())
    }
}

fn manifest(paths: &[&str]) -> Manifest {
    paths
        .iter()
        .map(|path| (*path, Md5Hash::of_bytes(path.as_bytes())))
        .collect()
}

#[test]
fn test_identical_manifests_plan_nothing() {
    let fs = MemoryFs::with_files(CaseMode::Sensitive, &["index.php", "fin-load.php"]);
    let both = manifest(&["index.php", "fin-load.php"]);

    let actions = Reconciler::default().plan(&both, &both, &fs);
    assert!(actions.is_empty());
}

#[test]
fn test_dropped_file_deleted() {
    let fs = MemoryFs::with_files(CaseMode::Sensitive, &["index.php", "fin-admin/old.php"]);
    let old = manifest(&["index.php", "fin-admin/old.php"]);
    let new = manifest(&["index.php"]);

    let reconciler = Reconciler::default();
    let actions = reconciler.plan(&old, &new, &fs);
    assert_eq!(
        actions,
        vec![FileAction::Delete {
            path: "fin-admin/old.php".to_string()
        }]
    );

    let report = reconciler.apply(&actions, &fs);
    assert_eq!(report.removed, vec!["fin-admin/old.php".to_string()]);
    assert_eq!(report.summary(), "1 file cleaned up.");
    assert_eq!(fs.stored_paths(), vec!["index.php".to_string()]);
}

#[test]
fn test_dropped_file_missing_on_disk_skipped() {
    let fs = MemoryFs::with_files(CaseMode::Sensitive, &["index.php"]);
    let old = manifest(&["index.php", "gone.php"]);
    let new = manifest(&["index.php"]);

    assert!(Reconciler::default().plan(&old, &new, &fs).is_empty());
}

#[test]
fn test_case_sensitive_distinct_files_delete_old_case() {
    let fs = MemoryFs::with_files(CaseMode::Sensitive, &["FOO.php", "foo.php"]);
    let old = manifest(&["FOO.php"]);
    let new = manifest(&["foo.php"]);

    let reconciler = Reconciler::default();
    let actions = reconciler.plan(&old, &new, &fs);
    assert_eq!(
        actions,
        vec![FileAction::Delete {
            path: "FOO.php".to_string()
        }]
    );

    reconciler.apply(&actions, &fs);
    assert_eq!(fs.stored_paths(), vec!["foo.php".to_string()]);
}

#[test]
fn test_case_insensitive_same_inode_renamed_after_listing() {
    // Canonicalization echoes the requested case, so only the listing reveals FOO.php
    let fs = MemoryFs::with_files(CaseMode::InsensitiveRequestedCase, &["FOO.php"]);
    let old = manifest(&["FOO.php"]);
    let new = manifest(&["foo.php"]);

    let reconciler = Reconciler::default();
    let actions = reconciler.plan(&old, &new, &fs);
    assert_eq!(
        actions,
        vec![FileAction::RenameCase {
            from: "FOO.php".to_string(),
            to: "foo.php".to_string()
        }]
    );

    let report = reconciler.apply(&actions, &fs);
    assert_eq!(report.renamed.len(), 1);
    assert_eq!(report.deletions_planned, 0);
    assert_eq!(fs.stored_paths(), vec!["foo.php".to_string()]);
}

#[test]
fn test_case_insensitive_stored_case_renamed() {
    let fs = MemoryFs::with_files(CaseMode::InsensitiveStoredCase, &["fin-admin/About.php"]);
    let old = manifest(&["fin-admin/About.php"]);
    let new = manifest(&["fin-admin/about.php"]);

    let reconciler = Reconciler::default();
    let report = reconciler.reconcile(&old, &new, &fs);

    assert_eq!(
        report.renamed,
        vec![(
            "fin-admin/About.php".to_string(),
            "fin-admin/about.php".to_string()
        )]
    );
    assert_eq!(fs.stored_paths(), vec!["fin-admin/about.php".to_string()]);
}

#[test]
fn test_case_insensitive_already_correct_left_alone() {
    for mode in [
        CaseMode::InsensitiveStoredCase,
        CaseMode::InsensitiveRequestedCase,
    ] {
        let fs = MemoryFs::with_files(mode, &["foo.php"]);
        let old = manifest(&["FOO.php"]);
        let new = manifest(&["foo.php"]);

        let actions = Reconciler::default().plan(&old, &new, &fs);
        assert!(actions.is_empty(), "unexpected actions for {:?}: {:?}", mode, actions);
    }
}

#[test]
fn test_protected_subtree_never_deleted() {
    let fs = MemoryFs::with_files(
        CaseMode::Sensitive,
        &[
            "fin-content/plugins/hello.php",
            "Fin-Content/themes/old/style.css",
            "fin-includes/legacy.php",
        ],
    );
    let old = manifest(&[
        "fin-content/plugins/hello.php",
        "Fin-Content/themes/old/style.css",
        "fin-includes/legacy.php",
    ]);
    let new = manifest(&["fin-includes/version.php"]);

    let reconciler = Reconciler::default();
    let actions = reconciler.plan(&old, &new, &fs);
    assert_eq!(
        actions,
        vec![FileAction::Delete {
            path: "fin-includes/legacy.php".to_string()
        }]
    );

    reconciler.apply(&actions, &fs);
    assert_eq!(
        fs.stored_paths(),
        vec![
            "Fin-Content/themes/old/style.css".to_string(),
            "fin-content/plugins/hello.php".to_string(),
        ]
    );
}

#[test]
fn test_vanished_deletion_reports_nothing_cleaned() {
    let fs = MemoryFs::with_files(CaseMode::Sensitive, &[]);
    let actions = vec![FileAction::Delete {
        path: "fin-admin/old.php".to_string(),
    }];

    let report = Reconciler::default().apply(&actions, &fs);
    assert_eq!(report.removed_count(), 0);
    assert_eq!(report.deletions_planned, 1);
    assert_eq!(report.summary(), "No files found that need cleaning up.");
}

#[test]
fn test_local_fs_reconcile() {
    let temp = TempDir::new().unwrap();
    for path in ["index.php", "fin-admin/old.php", "fin-admin/new.php"] {
        let full = temp.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, path.as_bytes()).unwrap();
    }

    let old = manifest(&["index.php", "fin-admin/old.php"]);
    let new = manifest(&["index.php", "fin-admin/new.php"]);
    let fs = LocalFs::new(temp.path());

    let report = Reconciler::default().reconcile(&old, &new, &fs);

    assert_eq!(report.removed, vec!["fin-admin/old.php".to_string()]);
    assert!(!temp.path().join("fin-admin/old.php").exists());
    assert!(temp.path().join("fin-admin/new.php").exists());
    assert!(temp.path().join("index.php").exists());
}

#[test]
fn test_failed_removal_does_not_stop_others() {
    let fs = MemoryFs::with_files(
        CaseMode::Sensitive,
        &["index.php", "fin-admin/a.php", "fin-admin/b.php", "fin-admin/c.php"],
    )
    .with_locked(&["fin-admin/b.php"]);
    let old = manifest(&["index.php", "fin-admin/a.php", "fin-admin/b.php", "fin-admin/c.php"]);
    let new = manifest(&["index.php"]);

    let report = Reconciler::default().reconcile(&old, &new, &fs);

    assert_eq!(
        report.removed,
        vec!["fin-admin/a.php".to_string(), "fin-admin/c.php".to_string()]
    );
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("fin-admin/b.php"));
    assert_eq!(
        fs.stored_paths(),
        vec!["fin-admin/b.php".to_string(), "index.php".to_string()]
    );
}

#[test]
fn test_failed_rename_restored_and_deletions_continue() {
    // The new case lives in a directory that does not exist, so the second
    // rename step fails
    let temp = TempDir::new().unwrap();
    for path in ["Lib/Foo.php", "stale.php"] {
        let full = temp.path().join(path);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(&full, path.as_bytes()).unwrap();
    }
    let fs = LocalFs::new(temp.path());
    let actions = vec![
        FileAction::RenameCase {
            from: "Lib/Foo.php".to_string(),
            to: "lib/foo.php".to_string(),
        },
        FileAction::Delete {
            path: "stale.php".to_string(),
        },
    ];

    let report = Reconciler::default().apply(&actions, &fs);

    assert!(report.renamed.is_empty());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Lib/Foo.php.tmp"));
    assert!(temp.path().join("Lib/Foo.php").exists());
    assert!(!temp.path().join("Lib/Foo.php.tmp").exists());

    assert_eq!(report.removed, vec!["stale.php".to_string()]);
    assert!(!temp.path().join("stale.php").exists());
}
