//! Configuration management for Core Fetcher
//!
//! This module provides TOML configuration with multi-source loading and
//! zero-config defaults. Every setting is optional; a missing file or section
//! falls back to the built-in values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig, Reconciler};
use crate::constants::{cache, http, layout, logging, release};
use crate::errors::{ConfigError, Result};

/// File name looked up in the working directory
const LOCAL_CONFIG_FILE: &str = "core-fetcher.toml";

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Archive cache settings
    pub cache: CacheConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Release hosting settings
    pub release: ReleaseConfigToml,
    /// Installation settings
    pub install: InstallConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path (OS cache directory if unset)
    pub cache_root: Option<PathBuf>,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Whole-transfer timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Retry TLS handshake failures without certificate validation
    pub insecure: bool,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            user_agent: http::USER_AGENT.to_string(),
            tcp_nodelay: true,
            insecure: false,
        }
    }
}

/// TOML-friendly release hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfigToml {
    /// Host serving release archives, or a full origin such as
    /// `http://127.0.0.1:8080`
    pub download_host: String,
    /// Base URL of the release API
    pub api_base_url: String,
    /// Locale used when none is requested
    pub locale: String,
}

impl Default for ReleaseConfigToml {
    fn default() -> Self {
        Self {
            download_host: release::DOWNLOAD_HOST.to_string(),
            api_base_url: release::API_BASE_URL.to_string(),
            locale: release::DEFAULT_LOCALE.to_string(),
        }
    }
}

impl ReleaseConfigToml {
    /// Origin URL archives are resolved against
    pub fn download_base(&self) -> String {
        let origin = if self.download_host.contains("://") {
            self.download_host.clone()
        } else {
            format!("https://{}", self.download_host)
        };

        if origin.ends_with('/') {
            origin
        } else {
            format!("{}/", origin)
        }
    }
}

/// TOML-friendly installation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfigToml {
    /// Directory never touched by post-upgrade cleanup
    pub protected_prefix: String,
    /// Directory for temporary archives (system temp directory if unset)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for InstallConfigToml {
    fn default() -> Self {
        Self {
            protected_prefix: layout::CONTENT_DIR.to_string(),
            scratch_dir: None,
        }
    }
}

impl InstallConfigToml {
    /// Reconciler protecting the configured prefix
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(self.protected_prefix.clone())
    }

    /// Scratch directory, defaulting to the system temp directory
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level, overridden by command line flags and `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    pub fn to_runtime_config(&self) -> (CacheConfig, ClientConfig) {
        (
            self.cache.to_runtime_config(),
            self.client.to_runtime_config(),
        )
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `./core-fetcher.toml` and
    /// then `<config_dir>/core-fetcher/config.toml` are tried, and the
    /// defaults apply if neither exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the explicit file is missing, or if a found
    /// file cannot be read or parsed
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path }.into());
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found in standard locations, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(cache::APP_DIR).join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::parse(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidFormat` for malformed TOML and
    /// `ConfigError::InvalidValue` for out-of-range settings
    pub fn parse(content: &str) -> std::result::Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.client.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be at least one second.".to_string(),
            });
        }

        if self.release.locale.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "release.locale".to_string(),
                value: self.release.locale.clone(),
                reason: "Locale must not be empty.".to_string(),
            });
        }

        Ok(())
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root: self.cache_root.clone(),
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.user_agent.clone(),
            tcp_nodelay: self.tcp_nodelay,
            insecure: self.insecure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.client.request_timeout_secs, 600);
        assert!(!config.client.insecure);
        assert_eq!(config.release.locale, "en_US");
        assert_eq!(config.release.download_base(), "https://finpress.org/");
        assert_eq!(config.install.protected_prefix, "fin-content");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_download_base_accepts_origin() {
        let release = ReleaseConfigToml {
            download_host: "http://127.0.0.1:8080".to_string(),
            ..Default::default()
        };
        assert_eq!(release.download_base(), "http://127.0.0.1:8080/");
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_config_loading_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let test_config = r#"
[cache]
cache_root = "/var/cache/finpress"

[client]
request_timeout_secs = 120
insecure = true

[release]
locale = "de_DE"

[logging]
level = "debug"
"#;

        tokio::fs::write(&config_path, test_config).await.unwrap();

        let config = AppConfig::load(Some(config_path)).await.unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.release.locale, "de_DE");

        // Unspecified values keep their defaults
        assert_eq!(config.client.connect_timeout_secs, 30);
        assert_eq!(config.release.api_base_url, "https://api.finpress.org");

        let (cache, client) = config.to_runtime_config();
        assert_eq!(cache.cache_root, Some(PathBuf::from("/var/cache/finpress")));
        assert_eq!(client.request_timeout, Duration::from_secs(120));
        assert!(client.fetch_options().insecure);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            AppConfig::parse("[client]\nrequest_timeout_secs = 0\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            AppConfig::parse("[client]\nrequest_timeout_secs = \"soon\"\n"),
            Err(ConfigError::InvalidFormat(_))
        ));
    }
}
