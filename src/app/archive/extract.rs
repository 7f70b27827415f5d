//! Archive extraction over an installation directory
//!
//! Archives are unpacked into a private staging directory first. When the
//! staged tree consists of a single top-level directory (release archives
//! wrap everything in `finpress/`), that directory's contents are what get
//! installed. The staged files are then copied over the target, replacing
//! existing files and leaving unrelated ones alone.
//!
//! The format is taken from the archive's declared extension, never from
//! its content.
//!
//! The blocking work checks a cancellation flag between entries. Dropping the
//! future returned by [`extract`] raises the flag, so an interrupted
//! acquisition stops unpacking early and the staging directory is removed by
//! the blocking thread on its way out.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::app::models::ArchiveFormat;
use crate::errors::{ExtractionError, ExtractionResult};

/// Summary of a completed extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Number of files written into the target
    pub files_written: usize,
    /// Wrapper directory removed from archive paths, if there was one
    pub stripped_root: Option<String>,
}

/// Cancellation flag shared with a blocking extraction
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Ask the extraction to stop at the next entry
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> ExtractionResult<()> {
        if self.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        Ok(())
    }
}

/// Raises the flag when the awaiting future goes away
struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Extract an archive over a target directory
///
/// Runs on the blocking thread pool.
///
/// # Arguments
///
/// * `archive` - Archive file whose extension declares its format
/// * `target` - Installation directory; created if missing
/// * `scratch` - Directory the staging tree is created in
///
/// # Errors
///
/// Returns `ExtractionError` naming the cause when the format is not
/// supported, the archive cannot be read, or writing the target fails.
pub async fn extract(archive: &Path, target: &Path, scratch: &Path) -> ExtractionResult<ExtractReport> {
    let archive = archive.to_path_buf();
    let target = target.to_path_buf();
    let scratch = scratch.to_path_buf();

    let flag = CancelFlag::default();
    let _guard = CancelOnDrop(flag.clone());

    tokio::task::spawn_blocking(move || extract_blocking(&archive, &target, &scratch, &flag))
        .await
        .map_err(|e| ExtractionError::Task {
            reason: e.to_string(),
        })?
}

/// Synchronous extraction, see [`extract`]
pub fn extract_blocking(
    archive: &Path,
    target: &Path,
    scratch: &Path,
    cancel: &CancelFlag,
) -> ExtractionResult<ExtractReport> {
    let format = ArchiveFormat::from_path(archive).ok_or_else(|| ExtractionError::Unsupported {
        path: archive.to_path_buf(),
    })?;

    info!("Extracting {} into {}", archive.display(), target.display());

    let staging = tempfile::Builder::new()
        .prefix("fin_extract_")
        .tempdir_in(scratch)
        .map_err(|source| ExtractionError::Write {
            path: scratch.to_path_buf(),
            source,
        })?;

    match format {
        ArchiveFormat::Zip => unpack_zip(archive, staging.path(), cancel)?,
        ArchiveFormat::TarGz => unpack_tar_gz(archive, staging.path(), cancel)?,
    }

    let (content_root, stripped_root) = content_root(staging.path())?;
    if let Some(root) = &stripped_root {
        debug!("Stripping top-level directory {}/ from archive paths", root);
    }

    fs::create_dir_all(target).map_err(|source| ExtractionError::Write {
        path: target.to_path_buf(),
        source,
    })?;
    let files_written = copy_tree(&content_root, target, cancel)?;

    info!("Extracted {} files", files_written);

    Ok(ExtractReport {
        files_written,
        stripped_root,
    })
}

fn unpack_zip(archive_path: &Path, destination: &Path, cancel: &CancelFlag) -> ExtractionResult<()> {
    let file = File::open(archive_path).map_err(|e| ExtractionError::Open {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractionError::Open {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let corrupt = |reason: String| ExtractionError::Corrupt {
        path: archive_path.to_path_buf(),
        reason,
    };

    for i in 0..archive.len() {
        cancel.check()?;
        let mut entry = archive.by_index(i).map_err(|e| corrupt(e.to_string()))?;
        let outpath = match entry.enclosed_name() {
            Some(path) => destination.join(path),
            None => continue,
        };

        if entry.is_dir() {
            create_dir(&outpath)?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            create_dir(parent)?;
        }
        let mut outfile = File::create(&outpath).map_err(|source| ExtractionError::Write {
            path: outpath.clone(),
            source,
        })?;
        io::copy(&mut entry, &mut outfile).map_err(|e| corrupt(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&outpath, fs::Permissions::from_mode(mode)).map_err(
                    |source| ExtractionError::Write {
                        path: outpath.clone(),
                        source,
                    },
                )?;
            }
        }
    }

    Ok(())
}

fn unpack_tar_gz(archive_path: &Path, destination: &Path, cancel: &CancelFlag) -> ExtractionResult<()> {
    let file = File::open(archive_path).map_err(|e| ExtractionError::Open {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let corrupt = |e: io::Error| ExtractionError::Corrupt {
        path: archive_path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut archive = Archive::new(GzDecoder::new(file));
    for entry in archive.entries().map_err(corrupt)? {
        cancel.check()?;
        let mut entry = entry.map_err(corrupt)?;
        // unpack_in refuses paths escaping the destination
        entry.unpack_in(destination).map_err(corrupt)?;
    }

    Ok(())
}

/// Directory whose contents get installed, plus the wrapper name if stripped
fn content_root(staging: &Path) -> ExtractionResult<(PathBuf, Option<String>)> {
    let read_err = |source| ExtractionError::Write {
        path: staging.to_path_buf(),
        source,
    };

    let entries = fs::read_dir(staging)
        .map_err(read_err)?
        .collect::<io::Result<Vec<_>>>()
        .map_err(read_err)?;

    if let [only] = entries.as_slice() {
        if only.file_type().map_err(read_err)?.is_dir() {
            let name = only.file_name().to_string_lossy().into_owned();
            return Ok((only.path(), Some(name)));
        }
    }

    Ok((staging.to_path_buf(), None))
}

/// Recursively copy `from` over `to`, returning the number of files copied
fn copy_tree(from: &Path, to: &Path, cancel: &CancelFlag) -> ExtractionResult<usize> {
    let mut copied = 0;

    let entries = fs::read_dir(from).map_err(|source| ExtractionError::Write {
        path: from.to_path_buf(),
        source,
    })?;

    for entry in entries {
        cancel.check()?;
        let entry = entry.map_err(|source| ExtractionError::Write {
            path: from.to_path_buf(),
            source,
        })?;
        let source_path = entry.path();
        let dest_path = to.join(entry.file_name());

        let file_type = entry.file_type().map_err(|source| ExtractionError::Write {
            path: source_path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            create_dir(&dest_path)?;
            copied += copy_tree(&source_path, &dest_path, cancel)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|source| ExtractionError::Write {
                path: dest_path.clone(),
                source,
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn create_dir(path: &Path) -> ExtractionResult<()> {
    fs::create_dir_all(path).map_err(|source| ExtractionError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, FileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(data).unwrap();
            }
        }
        writer.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_zip_overwrites_and_strips_root() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_1.zip");
        write_zip(
            &archive,
            &[
                ("finpress/", b""),
                ("finpress/index.php", b"new index"),
                ("finpress/fin-includes/version.php", b"<?php\n$fin_version = '6.7';\n"),
            ],
        );

        let target = temp.path().join("site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("index.php"), b"old index").unwrap();
        fs::write(target.join("fin-config.php"), b"keep me").unwrap();

        let report = extract_blocking(&archive, &target, temp.path(), &CancelFlag::default()).unwrap();

        assert_eq!(report.files_written, 2);
        assert_eq!(report.stripped_root.as_deref(), Some("finpress"));
        assert_eq!(fs::read(target.join("index.php")).unwrap(), b"new index");
        assert!(target.join("fin-includes/version.php").exists());
        assert_eq!(fs::read(target.join("fin-config.php")).unwrap(), b"keep me");
        assert!(!target.join("finpress").exists());
    }

    #[tokio::test]
    async fn test_tar_gz_extraction() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_2.tar.gz");
        write_tar_gz(
            &archive,
            &[
                ("finpress/fin-load.php", b"load"),
                ("finpress/fin-admin/about.php", b"about"),
            ],
        );

        let target = temp.path().join("site");
        let report = extract(&archive, &target, temp.path()).await.unwrap();

        assert_eq!(report.files_written, 2);
        assert_eq!(fs::read(target.join("fin-load.php")).unwrap(), b"load");
        assert_eq!(fs::read(target.join("fin-admin/about.php")).unwrap(), b"about");
    }

    #[test]
    fn test_unsupported_extension() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("release.rar");
        fs::write(&archive, b"whatever").unwrap();

        let result = extract_blocking(&archive, temp.path(), temp.path(), &CancelFlag::default());
        assert!(matches!(result, Err(ExtractionError::Unsupported { .. })));
    }

    #[test]
    fn test_corrupt_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_3.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();

        let result = extract_blocking(
            &archive,
            &temp.path().join("site"),
            temp.path(),
            &CancelFlag::default(),
        );
        assert!(matches!(result, Err(ExtractionError::Open { .. })));
    }

    #[test]
    fn test_corrupt_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_4.tar.gz");
        fs::write(&archive, b"not gzip data at all").unwrap();

        let result = extract_blocking(
            &archive,
            &temp.path().join("site"),
            temp.path(),
            &CancelFlag::default(),
        );
        assert!(matches!(result, Err(ExtractionError::Corrupt { .. })));
    }

    fn staging_dirs(scratch: &Path) -> Vec<String> {
        fs::read_dir(scratch)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("fin_extract_"))
            .collect()
    }

    #[test]
    fn test_staging_created_in_scratch_and_removed() {
        let temp = TempDir::new().unwrap();
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        let archive = temp.path().join("fin_5.zip");
        write_zip(&archive, &[("finpress/index.php", b"index")]);

        let report =
            extract_blocking(&archive, &temp.path().join("site"), &scratch, &CancelFlag::default())
                .unwrap();

        assert_eq!(report.files_written, 1);
        assert!(staging_dirs(&scratch).is_empty());
    }

    #[test]
    fn test_missing_scratch_dir_names_cause() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_6.zip");
        write_zip(&archive, &[("finpress/index.php", b"index")]);

        let result = extract_blocking(
            &archive,
            &temp.path().join("site"),
            &temp.path().join("missing"),
            &CancelFlag::default(),
        );

        let err = result.unwrap_err();
        assert!(matches!(err, ExtractionError::Write { .. }));
        assert!(err.to_string().contains("os error"), "{}", err);
    }

    #[test]
    fn test_cancelled_extraction_leaves_no_staging() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_7.zip");
        write_zip(
            &archive,
            &[("finpress/index.php", b"index"), ("finpress/fin-load.php", b"load")],
        );

        let cancel = CancelFlag::default();
        cancel.cancel();
        let target = temp.path().join("site");
        let result = extract_blocking(&archive, &target, temp.path(), &cancel);

        assert!(matches!(result, Err(ExtractionError::Cancelled)));
        assert!(staging_dirs(temp.path()).is_empty());
        assert!(!target.join("index.php").exists());
    }

    #[test]
    fn test_blocked_directory_error_names_cause() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("fin_8.zip");
        write_zip(&archive, &[("finpress/fin-admin/about.php", b"about")]);

        let target = temp.path().join("site");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("fin-admin"), b"a file where a directory belongs").unwrap();

        let err = extract_blocking(&archive, &target, temp.path(), &CancelFlag::default())
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("fin-admin"), "{}", message);
        assert!(message.contains("os error"), "{}", message);
    }
}
