//! Computing the file actions that bring an upgraded installation in line
//! with the new release's manifest.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::app::models::Manifest;

use super::fs::InstallFs;

/// A change applied to an installation after extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    /// Remove a file the new release no longer ships
    Delete { path: String },
    /// Give a file the case the new release uses
    RenameCase { from: String, to: String },
}

/// Plan the actions for an upgrade from `old` to `new`
///
/// Only paths of the old manifest that the new one does not list verbatim
/// are examined. Paths that do not resolve on disk are skipped. Deletions
/// below `protected_prefix` (case-insensitive) are never planned.
pub fn plan_actions<F: InstallFs + ?Sized>(
    old: &Manifest,
    new: &Manifest,
    fs: &F,
    protected_prefix: &str,
) -> Vec<FileAction> {
    let new_paths_lower: HashMap<String, &str> = new
        .paths()
        .map(|path| (path.to_lowercase(), path))
        .collect();

    let mut actions = Vec::new();

    for old_path in old.paths().filter(|path| !new.contains(path)) {
        let Some(old_real) = fs.real_path(old_path) else {
            continue;
        };

        let Some(&new_path) = new_paths_lower.get(&old_path.to_lowercase()) else {
            actions.push(FileAction::Delete {
                path: old_path.to_string(),
            });
            continue;
        };

        // Only the case differs between old and new from here on
        let expected_basename = basename(Path::new(new_path));
        let new_real = fs.real_path(new_path);
        let new_basename = new_real.as_deref().map(basename).unwrap_or_default();

        if new_basename != expected_basename {
            actions.push(rename(old_path, new_path));
            continue;
        }

        if basename(Path::new(old_path)) != basename(&old_real) {
            continue;
        }

        let Some(new_real) = new_real else {
            continue;
        };

        let same_file = match (fs.file_id(&old_real), fs.file_id(&new_real)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };

        if same_file {
            // Canonicalization may echo the requested case; the listing is authoritative
            let listing = new_real
                .parent()
                .and_then(|dir| fs.list_dir(dir).ok())
                .unwrap_or_default();
            if !listing.iter().any(|name| name == &expected_basename) {
                actions.push(rename(old_path, new_path));
            }
        } else {
            actions.push(FileAction::Delete {
                path: old_path.to_string(),
            });
        }
    }

    actions.retain(|action| match action {
        FileAction::Delete { path } if is_protected(path, protected_prefix) => {
            debug!("Keeping {} below the protected directory", path);
            false
        }
        _ => true,
    });

    actions
}

/// Case-insensitive prefix match against the protected directory
pub fn is_protected(path: &str, protected_prefix: &str) -> bool {
    path.len() >= protected_prefix.len()
        && path.as_bytes()[..protected_prefix.len()].eq_ignore_ascii_case(protected_prefix.as_bytes())
}

fn rename(from: &str, to: &str) -> FileAction {
    FileAction::RenameCase {
        from: from.to_string(),
        to: to.to_string(),
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_protected() {
        assert!(is_protected("fin-content/plugins/hello.php", "fin-content"));
        assert!(is_protected("FIN-Content/index.php", "fin-content"));
        assert!(!is_protected("fin-admin/index.php", "fin-content"));
        assert!(!is_protected("fin", "fin-content"));
    }
}
