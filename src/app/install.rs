//! Inspection of an existing installation
//!
//! An installation records its version numbers as PHP variable assignments
//! in `fin-includes/version.php`. They are read with a plain text scan for
//! `$name = value;`, without evaluating any PHP.

use std::path::Path;

use tracing::debug;

use crate::constants::{layout, release};

/// Version details of an installed core
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledCore {
    /// Release version, e.g. "6.7"
    pub version: Option<String>,
    /// Database schema revision
    pub db_version: Option<String>,
    /// Bundled TinyMCE version, e.g. "4310-20160418"
    pub tinymce_version: Option<String>,
    /// Locale of a localized package, absent for `en_US`
    pub local_package: Option<String>,
}

impl InstalledCore {
    /// Read the version details of an installation
    ///
    /// Returns `None` if the version file is missing or unreadable.
    pub async fn detect(root: &Path) -> Option<Self> {
        let path = root.join(layout::VERSION_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!("No readable version file at {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self::parse(&content))
    }

    /// Extract the version details from the content of a version file
    pub fn parse(content: &str) -> Self {
        Self {
            version: find_var("fin_version", content),
            db_version: find_var("fin_db_version", content),
            tinymce_version: find_var("tinymce_version", content),
            local_package: find_var("fin_local_package", content),
        }
    }

    /// Package locale, defaulting to `en_US`
    pub fn locale(&self) -> &str {
        self.local_package
            .as_deref()
            .filter(|locale| !locale.is_empty())
            .unwrap_or(release::DEFAULT_LOCALE)
    }

    /// TinyMCE version with a dotted prefix, e.g. "4.310 (4310-20160418)"
    pub fn tinymce_display(&self) -> Option<String> {
        let raw = self.tinymce_version.as_deref()?;
        let build = raw.split('-').next().unwrap_or(raw);

        let dotted = (raw.contains('-') && build.len() >= 2 && build.bytes().all(|b| b.is_ascii_digit()))
            .then(|| format!("{}.{} ({})", &build[..1], &build[1..], raw));

        Some(dotted.unwrap_or_else(|| raw.to_string()))
    }
}

/// Value assigned to `$name` in PHP source, with quotes and spaces trimmed
///
/// # Examples
///
/// ```rust
/// use core_fetcher::app::install::find_var;
///
/// let code = "<?php\n$fin_version = '6.7.1';\n$fin_db_version = 58975;\n";
/// assert_eq!(find_var("fin_version", code).as_deref(), Some("6.7.1"));
/// assert_eq!(find_var("fin_db_version", code).as_deref(), Some("58975"));
/// assert_eq!(find_var("missing", code), None);
/// ```
pub fn find_var(name: &str, code: &str) -> Option<String> {
    let needle = format!("${} = ", name);
    let start = code.find(&needle)? + needle.len();
    let rest = &code[start..];
    let end = rest.find(';')?;

    Some(
        rest[..end]
            .trim_matches(|c: char| c == ' ' || c == '\'')
            .to_string(),
    )
}

/// Whether any file marking an installation exists below `root`
pub async fn is_core_present(root: &Path) -> bool {
    for marker in layout::CORE_MARKERS {
        if tokio::fs::metadata(root.join(marker))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return true;
        }
    }
    false
}
