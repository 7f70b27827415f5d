//! Application constants for Core Fetcher
//!
//! This module centralizes the constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Release naming and hosting
pub mod release {
    /// Host serving release archives
    pub const DOWNLOAD_HOST: &str = "finpress.org";

    /// Base URL of the release API (checksums and version offers)
    pub const API_BASE_URL: &str = "https://api.finpress.org";

    /// Locale whose archives carry no locale decoration
    pub const DEFAULT_LOCALE: &str = "en_US";

    /// Version alias resolved through the release offer API
    pub const LATEST: &str = "latest";

    /// Version alias for nightly builds
    pub const NIGHTLY: &str = "nightly";

    /// Accepted spelling of the nightly alias
    pub const TRUNK: &str = "trunk";

    /// Path of the nightly build archive on the download host
    pub const NIGHTLY_PATH: &str = "nightly-builds/finpress-latest.zip";

    /// Archive file name prefix
    pub const ARCHIVE_PREFIX: &str = "finpress";

    /// Suffix appended to an archive URL to locate its detached hash
    pub const HASH_SUFFIX: &str = ".md5";
}

/// Layout of a core installation and its release archives
pub mod layout {
    /// Top-level directory inside release archives
    pub const ARCHIVE_ROOT: &str = "finpress";

    /// User content directory, relative to the installation root
    pub const CONTENT_DIR: &str = "fin-content";

    /// File holding the version variables, relative to the installation root
    pub const VERSION_FILE: &str = "fin-includes/version.php";

    /// Files whose presence marks an existing installation
    pub const CORE_MARKERS: [&str; 4] = [
        "fin-load.php",
        "fin-mail.php",
        "fin-cron.php",
        "fin-links-opml.php",
    ];

    /// Bundled content directories emptied by content stripping
    pub const BUNDLED_DIRS: [&str; 2] = ["themes", "plugins"];

    /// Placeholder kept in each emptied directory
    pub const PLACEHOLDER: &str = "index.php";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "Core-Fetcher/0.1.0";

    /// Transfer timeout for archive downloads
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Accept header sent with archive downloads
    pub const ACCEPT: &str = "application/json";
}

/// File operation constants
pub mod files {
    /// Prefix of temporary archive files in the scratch directory
    pub const TEMP_FILE_PREFIX: &str = "fin_";

    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Download chunk size for hashing (64KB)
    pub const HASH_CHUNK_SIZE: usize = 64 * 1024;
}

/// Cache layout constants
pub mod cache {
    /// Namespace of core archives inside the cache root
    pub const CORE_NAMESPACE: &str = "core";

    /// Application directory name under the OS cache directory
    pub const APP_DIR: &str = "core-fetcher";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use layout::CONTENT_DIR;
pub use release::DEFAULT_LOCALE;
