//! Post-upgrade reconciliation of installed files
//!
//! After a newer release is extracted over an installation, files the new
//! release no longer ships are still on disk, and files whose names changed
//! only in case may carry the old case. Reconciliation compares the old and
//! new release manifests against the disk and:
//!
//! - deletes files dropped by the new release
//! - renames files whose case changed, in two steps through `<old>.tmp`
//!   so case-insensitive filesystems register the change
//! - never deletes anything below the protected user-content directory
//!
//! # Module Organization
//!
//! - [`fs`] - Filesystem abstraction and the real implementation
//! - [`plan`] - Action planning

use tracing::{debug, info, warn};

use crate::app::models::Manifest;
use crate::constants::{files, layout};
use crate::errors::ReconcileError;

pub mod fs;
pub mod plan;

pub use fs::{FileId, InstallFs, LocalFs};
pub use plan::{plan_actions, FileAction};

/// Applies manifest differences to an installation
#[derive(Debug, Clone)]
pub struct Reconciler {
    protected_prefix: String,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(layout::CONTENT_DIR)
    }
}

impl Reconciler {
    /// Create a reconciler protecting paths below `protected_prefix`
    pub fn new(protected_prefix: impl Into<String>) -> Self {
        Self {
            protected_prefix: protected_prefix.into(),
        }
    }

    /// Protected directory prefix
    pub fn protected_prefix(&self) -> &str {
        &self.protected_prefix
    }

    /// Plan the actions for an upgrade, see [`plan_actions`]
    pub fn plan<F: InstallFs + ?Sized>(&self, old: &Manifest, new: &Manifest, fs: &F) -> Vec<FileAction> {
        plan_actions(old, new, fs, &self.protected_prefix)
    }

    /// Apply planned actions
    ///
    /// Renames run first, then deletions. A deletion whose file no longer
    /// exists is skipped silently. Each action is attempted independently:
    /// a failed rename or deletion is recorded in
    /// [`ReconcileReport::warnings`] and the remaining actions still run.
    /// When the second step of a case rename fails, the file is moved back
    /// from `<old>.tmp` to its original name.
    pub fn apply<F: InstallFs + ?Sized>(&self, actions: &[FileAction], fs: &F) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for action in actions {
            if let FileAction::RenameCase { from, to } = action {
                debug!("Renaming file '{}' => '{}'", from, to);
                match rename_case(fs, from, to) {
                    Ok(()) => report.renamed.push((from.clone(), to.clone())),
                    Err(e) => report.warn(e),
                }
            }
        }

        let deletions: Vec<&str> = actions
            .iter()
            .filter_map(|action| match action {
                FileAction::Delete { path } => Some(path.as_str()),
                FileAction::RenameCase { .. } => None,
            })
            .collect();

        if !deletions.is_empty() {
            info!("Cleaning up files...");
            report.deletions_planned = deletions.len();
        }

        for path in deletions {
            if !fs.exists(path) {
                continue;
            }
            match fs.remove_file(path) {
                Ok(()) => {
                    info!("File removed: {}", path);
                    report.removed.push(path.to_string());
                }
                Err(source) => report.warn(ReconcileError::Io {
                    operation: "remove",
                    path: path.into(),
                    source,
                }),
            }
        }

        if report.deletions_planned > 0 {
            info!("{}", report.summary());
        }

        report
    }

    /// Plan and apply in one step, see [`Reconciler::apply`]
    pub fn reconcile<F: InstallFs + ?Sized>(&self, old: &Manifest, new: &Manifest, fs: &F) -> ReconcileReport {
        let actions = self.plan(old, new, fs);
        self.apply(&actions, fs)
    }
}

/// Two-step rename through `<from>.tmp`, rolled back if the second step fails
fn rename_case<F: InstallFs + ?Sized>(fs: &F, from: &str, to: &str) -> Result<(), ReconcileError> {
    let intermediate = format!("{}{}", from, files::TEMP_FILE_SUFFIX);

    fs.rename(from, &intermediate).map_err(|source| ReconcileError::Io {
        operation: "rename",
        path: from.into(),
        source,
    })?;

    if let Err(source) = fs.rename(&intermediate, to) {
        if let Err(e) = fs.rename(&intermediate, from) {
            warn!("Could not restore '{}' from '{}': {}", from, intermediate, e);
        }
        return Err(ReconcileError::Io {
            operation: "rename",
            path: intermediate.into(),
            source,
        });
    }

    Ok(())
}

/// What reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Files removed, installation-relative
    pub removed: Vec<String>,
    /// Case renames performed, `(from, to)`
    pub renamed: Vec<(String, String)>,
    /// Deletions that were planned, including ones already gone
    pub deletions_planned: usize,
    /// Actions that failed and were left for manual cleanup
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    fn warn(&mut self, error: ReconcileError) {
        warn!("{}", error);
        self.warnings.push(error.to_string());
    }

    /// Number of files removed
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// One-line summary of the cleanup
    pub fn summary(&self) -> String {
        match self.removed.len() {
            0 => "No files found that need cleaning up.".to_string(),
            1 => "1 file cleaned up.".to_string(),
            n => format!("{} files cleaned up.", n),
        }
    }
}

/// Result of attempting reconciliation during an upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Reconciliation ran
    Completed(ReconcileReport),
    /// Reconciliation could not run; files must be cleaned up manually
    Skipped { reason: String },
}

#[cfg(test)]
mod tests;
