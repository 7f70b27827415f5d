//! Release archive handling
//!
//! This module owns the archive files produced during an acquisition and the
//! blocking work done on them.
//!
//! # Module Organization
//!
//! - [`extract`] - Unpacking zip and tar.gz archives over an installation
//! - [`strip`] - Producing a copy of a zip without the bundled themes and plugins
//!
//! Archives downloaded or copied for an acquisition live in uniquely named
//! temporary files. A [`TempArchive`] deletes its file when dropped, so every
//! exit path of the pipeline, including error propagation, cleans up.

use std::fs::File;
use std::path::Path;

use tempfile::TempPath;

use crate::app::models::ArchiveFormat;
use crate::constants::files;

pub mod extract;
pub mod strip;

pub use extract::{extract, ExtractReport};
pub use strip::strip_bundled_content;

/// A temporary archive file removed when dropped
#[derive(Debug)]
pub struct TempArchive {
    path: TempPath,
    format: ArchiveFormat,
}

impl TempArchive {
    /// Create an empty, uniquely named archive file in a scratch directory
    ///
    /// The file name is `fin_<random>.<ext>`, so the declared format survives
    /// in the extension.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the scratch directory is not writable
    pub fn create_in(scratch: &Path, format: ArchiveFormat) -> std::io::Result<(File, Self)> {
        let named = tempfile::Builder::new()
            .prefix(files::TEMP_FILE_PREFIX)
            .suffix(&format!(".{}", format.extension()))
            .tempfile_in(scratch)?;

        let (file, path) = named.into_parts();
        Ok((file, Self { path, format }))
    }

    /// Copy an existing archive into a new temporary file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source cannot be read or the copy fails
    pub async fn copy_of(source: &Path, scratch: &Path, format: ArchiveFormat) -> std::io::Result<Self> {
        let (file, archive) = Self::create_in(scratch, format)?;
        drop(file);
        tokio::fs::copy(source, archive.path()).await?;
        Ok(archive)
    }

    /// Location of the archive on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared archive format
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }
}
