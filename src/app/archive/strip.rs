//! Content stripping for zip release archives
//!
//! Produces a copy of a release zip that installs without the bundled themes
//! and plugins. The emptied directories and their `index.php` placeholders
//! stay so the installed layout remains valid. Kept entries are copied raw,
//! without recompression, and the source archive is never modified.

use std::fs::File;
use std::path::Path;

use tracing::{debug, info};
use zip::{ZipArchive, ZipWriter};

use crate::app::archive::TempArchive;
use crate::app::models::ArchiveFormat;
use crate::constants::layout;
use crate::errors::{ExtractionError, ExtractionResult};

/// Entry names inside a release zip that stripping removes or keeps
#[derive(Debug, Clone)]
struct StripRules {
    drop_prefixes: Vec<String>,
    keep: Vec<String>,
}

impl StripRules {
    fn for_release() -> Self {
        let mut drop_prefixes = Vec::new();
        let mut keep = Vec::new();

        for dir in layout::BUNDLED_DIRS {
            let prefix = format!("{}/{}/{}/", layout::ARCHIVE_ROOT, layout::CONTENT_DIR, dir);
            keep.push(format!("{}{}", prefix, layout::PLACEHOLDER));
            keep.push(prefix.clone());
            drop_prefixes.push(prefix.to_ascii_lowercase());
        }

        Self { drop_prefixes, keep }
    }

    fn should_drop(&self, name: &str) -> bool {
        if self.keep.iter().any(|kept| kept == name) {
            return false;
        }
        let lower = name.to_ascii_lowercase();
        self.drop_prefixes.iter().any(|prefix| lower.starts_with(prefix))
    }
}

/// Create a content-stripped copy of a zip release archive
///
/// # Arguments
///
/// * `archive` - Verified zip archive
/// * `scratch` - Directory for the new temporary archive
///
/// # Errors
///
/// Returns `ExtractionError::Unsupported` for non-zip archives and
/// `ExtractionError::Open` if the archive cannot be opened.
pub async fn strip_bundled_content(archive: &Path, scratch: &Path) -> ExtractionResult<TempArchive> {
    if ArchiveFormat::from_path(archive) != Some(ArchiveFormat::Zip) {
        return Err(ExtractionError::Unsupported {
            path: archive.to_path_buf(),
        });
    }

    let (output, stripped) =
        TempArchive::create_in(scratch, ArchiveFormat::Zip).map_err(|source| {
            ExtractionError::Write {
                path: scratch.to_path_buf(),
                source,
            }
        })?;

    let source = archive.to_path_buf();
    let removed = tokio::task::spawn_blocking(move || strip_into(&source, output))
        .await
        .map_err(|e| ExtractionError::Task {
            reason: e.to_string(),
        })??;

    info!("Removed {} bundled theme and plugin entries", removed);
    Ok(stripped)
}

/// Copy every entry except bundled content into `output`, returning the number dropped
fn strip_into(source: &Path, output: File) -> ExtractionResult<usize> {
    let open_err = |reason: String| ExtractionError::Open {
        path: source.to_path_buf(),
        reason,
    };

    let file = File::open(source).map_err(|e| open_err(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| open_err(e.to_string()))?;
    let mut writer = ZipWriter::new(output);
    let rules = StripRules::for_release();
    let mut removed = 0;

    let corrupt = |reason: String| ExtractionError::Corrupt {
        path: source.to_path_buf(),
        reason,
    };

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| corrupt(e.to_string()))?;
        if rules.should_drop(entry.name()) {
            debug!("Dropping {}", entry.name());
            removed += 1;
            continue;
        }
        writer
            .raw_copy_file(entry)
            .map_err(|e| corrupt(e.to_string()))?;
    }

    writer.finish().map_err(|e| corrupt(e.to_string()))?;
    Ok(removed)
}
