//! Command-line argument parsing for Core Fetcher
//!
//! This module defines the CLI structure using clap derive macros: release
//! downloads, updates, post-upgrade cleanup, cache management and version
//! inspection.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::UpdateFilter;
use crate::constants::release;

/// Core Fetcher - Download and install FinPress core releases
#[derive(Parser, Debug)]
#[command(
    name = "core-fetcher",
    version,
    about = "Download, verify and install FinPress core releases",
    long_about = "Downloads FinPress core releases, verifies them against their published md5 hashes,
caches them for reuse and extracts them over an installation. After an upgrade, files
dropped by the new release are cleaned up while user content is left untouched."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Cache directory path
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and install core files
    Download(DownloadArgs),

    /// List updates available for an installation
    CheckUpdate(CheckUpdateArgs),

    /// Update an installation to a newer release
    Update(UpdateArgs),

    /// Remove files left behind by an upgrade
    Cleanup(CleanupArgs),

    /// Cache management
    Cache(CacheArgs),

    /// Show the version of an installation
    Version(VersionArgs),
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Download directly from a URL or local archive instead of a release
    #[arg(value_name = "URL_OR_PATH")]
    pub download_url: Option<String>,

    /// Installation directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Release to download: a version number, "latest" or "nightly"
    #[arg(long)]
    pub version: Option<String>,

    /// Package locale (defaults to the configured locale)
    #[arg(long)]
    pub locale: Option<String>,

    /// Install without the bundled themes and plugins
    #[arg(long)]
    pub skip_content: bool,

    /// Copy the archive into the directory instead of extracting it
    #[arg(long)]
    pub no_extract: bool,

    /// Overwrite an existing installation
    #[arg(short, long)]
    pub force: bool,

    /// Retry without certificate validation if the TLS handshake fails
    #[arg(long)]
    pub insecure: bool,
}

/// Arguments for the check-update command
#[derive(Args, Debug, Clone)]
pub struct CheckUpdateArgs {
    /// Installation directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Package locale (defaults to the configured locale)
    #[arg(long)]
    pub locale: Option<String>,

    /// Only list major updates
    #[arg(long, conflicts_with = "minor")]
    pub major: bool,

    /// Only list minor updates
    #[arg(long)]
    pub minor: bool,
}

impl CheckUpdateArgs {
    /// Which updates to list
    pub fn filter(&self) -> UpdateFilter {
        if self.major {
            UpdateFilter::MajorOnly
        } else if self.minor {
            UpdateFilter::MinorOnly
        } else {
            UpdateFilter::All
        }
    }
}

/// Arguments for the update command
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Installation directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Update to this version, or "nightly", instead of the newest release
    #[arg(long, conflicts_with = "minor")]
    pub version: Option<String>,

    /// Package locale (defaults to the configured locale)
    #[arg(long)]
    pub locale: Option<String>,

    /// Only update to a patch release of the installed version
    #[arg(long)]
    pub minor: bool,

    /// Install even if the target is not newer than the installed version
    #[arg(short, long)]
    pub force: bool,

    /// Retry without certificate validation if the TLS handshake fails
    #[arg(long)]
    pub insecure: bool,
}

/// Arguments for the cleanup command
#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    /// Version the installation was upgraded from
    #[arg(long)]
    pub from: String,

    /// Version the installation was upgraded to
    #[arg(long)]
    pub to: String,

    /// Installation directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Package locale (defaults to the configured locale)
    #[arg(long)]
    pub locale: Option<String>,
}

/// Arguments for cache management
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache management actions
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show cache statistics and information
    Info,

    /// Remove all cached archives
    Clear,
}

/// Arguments for the version command
#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    /// Installation directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub path: PathBuf,

    /// Also show database, TinyMCE and package locale details
    #[arg(long)]
    pub extra: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by the global flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl DownloadArgs {
    /// Reject option combinations that cannot be honoured
    pub fn validate(&self) -> Result<(), String> {
        if self.skip_content && self.no_extract {
            return Err("Cannot use both --skip-content and --no-extract at the same time.".to_string());
        }

        if self.download_url.is_some() {
            if self.version.is_some() {
                return Err("The 'download-url' and 'version' arguments are not compatible.".to_string());
            }

            let custom_locale = self
                .locale
                .as_deref()
                .is_some_and(|locale| locale != release::DEFAULT_LOCALE);
            if self.skip_content || custom_locale {
                return Err("Skip content and locale options are not available for URL downloads.".to_string());
            }
        }

        Ok(())
    }

    /// Requested release, defaulting to the latest one
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(release::LATEST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> DownloadArgs {
        DownloadArgs {
            download_url: None,
            path: PathBuf::from("."),
            version: None,
            locale: None,
            skip_content: false,
            no_extract: false,
            force: false,
            insecure: false,
        }
    }

    #[test]
    fn test_download_args_validation() {
        let args = base_args();
        assert!(args.validate().is_ok());
        assert_eq!(args.version(), "latest");

        let args = DownloadArgs {
            skip_content: true,
            no_extract: true,
            ..base_args()
        };
        assert!(args.validate().is_err());

        let args = DownloadArgs {
            download_url: Some("https://example.com/build.zip".to_string()),
            version: Some("6.7".to_string()),
            ..base_args()
        };
        assert!(args.validate().is_err());

        let args = DownloadArgs {
            download_url: Some("https://example.com/build.zip".to_string()),
            locale: Some("de_DE".to_string()),
            ..base_args()
        };
        assert!(args.validate().is_err());

        let args = DownloadArgs {
            download_url: Some("https://example.com/build.zip".to_string()),
            locale: Some("en_US".to_string()),
            ..base_args()
        };
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_download_command() {
        let cli = Cli::try_parse_from([
            "core-fetcher",
            "download",
            "--version",
            "6.7",
            "--locale",
            "nl_NL",
            "--path",
            "/srv/site",
            "--force",
        ])
        .unwrap();

        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.version(), "6.7");
                assert_eq!(args.locale.as_deref(), Some("nl_NL"));
                assert_eq!(args.path, PathBuf::from("/srv/site"));
                assert!(args.force);
                assert!(!args.no_extract);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_commands() {
        let cli = Cli::try_parse_from(["core-fetcher", "check-update", "--minor"]).unwrap();
        match cli.command {
            Commands::CheckUpdate(args) => assert_eq!(args.filter(), UpdateFilter::MinorOnly),
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Cli::try_parse_from(["core-fetcher", "check-update", "--major", "--minor"]).is_err());

        let cli = Cli::try_parse_from(["core-fetcher", "update", "--minor", "--path", "/srv/site"])
            .unwrap();
        match cli.command {
            Commands::Update(args) => {
                assert!(args.minor);
                assert!(args.version.is_none());
                assert_eq!(args.path, PathBuf::from("/srv/site"));
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(
            Cli::try_parse_from(["core-fetcher", "update", "--minor", "--version", "6.8"]).is_err()
        );
    }

    #[test]
    fn test_log_level() {
        let cli = Cli::try_parse_from(["core-fetcher", "-q", "cache", "info"]).unwrap();
        assert_eq!(cli.log_level(), Some(tracing::Level::ERROR));

        let cli = Cli::try_parse_from(["core-fetcher", "cache", "clear", "--very-verbose"]).unwrap();
        assert_eq!(cli.log_level(), Some(tracing::Level::DEBUG));

        let cli = Cli::try_parse_from(["core-fetcher", "version"]).unwrap();
        assert_eq!(cli.log_level(), None);
    }
}
