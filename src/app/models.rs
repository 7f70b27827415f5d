//! Data models for Core Fetcher
//!
//! This module defines the values passed between the pipeline stages: what
//! release is requested, where its archive lives, and the per-file manifests
//! used to reconcile an installation after an upgrade.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::hash::Md5Hash;
use crate::constants::release;

/// Archive container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz`
    TarGz,
}

impl ArchiveFormat {
    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Determine the format from a declared file name
    ///
    /// Returns `None` for names without a recognized extension. The content
    /// of the file is never inspected.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Some(Self::Zip)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// Determine the format of an explicitly supplied archive location
    ///
    /// Anything not ending in `.zip` is treated as a gzip-compressed tarball.
    pub fn from_location(location: &str) -> Self {
        let path_part = location.split(['?', '#']).next().unwrap_or(location);
        if path_part.to_ascii_lowercase().ends_with(".zip") {
            Self::Zip
        } else {
            Self::TarGz
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A requested release: version, locale and archive format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    /// "latest", "nightly" or a dotted version number
    pub version: String,
    /// Locale such as "en_US" or "nl_NL"
    pub locale: String,
    /// Requested archive format
    pub format: ArchiveFormat,
}

impl VersionSpec {
    /// Create a version spec, normalizing the "trunk" alias to "nightly"
    pub fn new(version: impl Into<String>, locale: impl Into<String>, format: ArchiveFormat) -> Self {
        let version = version.into();
        let version = if version.eq_ignore_ascii_case(release::TRUNK)
            || version.eq_ignore_ascii_case(release::NIGHTLY)
        {
            release::NIGHTLY.to_string()
        } else {
            version
        };

        Self {
            version,
            locale: locale.into(),
            format,
        }
    }

    /// Whether this spec names the nightly build
    pub fn is_nightly(&self) -> bool {
        self.version == release::NIGHTLY
    }

    /// Whether this spec still needs resolving through the offer API
    pub fn is_latest(&self) -> bool {
        self.version.eq_ignore_ascii_case(release::LATEST)
    }

    /// Same spec pinned to a concrete version
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self::new(version, self.locale.clone(), self.format)
    }
}

impl std::fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.version, self.locale)
    }
}

/// Concrete location of an archive to acquire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTarget {
    /// HTTP(S) URL or local filesystem path
    pub url: String,
    /// Format the archive is expected to have
    pub format: ArchiveFormat,
}

impl DownloadTarget {
    /// Create a target with an explicit format
    pub fn new(url: impl Into<String>, format: ArchiveFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }

    /// Create a target for an explicitly supplied URL or path
    pub fn explicit(location: impl Into<String>) -> Self {
        let url = location.into();
        let format = ArchiveFormat::from_location(&url);
        Self { url, format }
    }

    /// Location of the detached hash resource
    pub fn hash_url(&self) -> String {
        format!("{}{}", self.url, release::HASH_SUFFIX)
    }

    /// Whether the target is fetched over HTTP(S) rather than read from disk
    pub fn is_remote(&self) -> bool {
        let lower = self.url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }
}

/// Input to the acquisition pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// A published release resolved from version and locale
    Release(VersionSpec),
    /// An archive URL or local path supplied by the caller
    Explicit(String),
}

/// Per-file hashes of one release, keyed by installation-relative path
///
/// Paths keep their original case. A manifest is a read-only snapshot once
/// built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    files: BTreeMap<String, Md5Hash>,
}

impl Manifest {
    /// Create an empty manifest
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash recorded for a path (exact case)
    pub fn get(&self, path: &str) -> Option<&Md5Hash> {
        self.files.get(path)
    }

    /// Whether a path is listed (exact case)
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// All listed paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of listed files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manifest lists no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<(String, Md5Hash)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (String, Md5Hash)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, Md5Hash)> for Manifest {
    fn from_iter<I: IntoIterator<Item = (&'a str, Md5Hash)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(path, hash)| (path.to_string(), hash))
            .collect()
    }
}
