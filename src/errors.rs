//! Error types for Core Fetcher
//!
//! This module defines the error types for every stage of the acquisition
//! pipeline. Errors raised before extraction abort the whole operation;
//! problems found during reconciliation are reported as warnings by the
//! pipeline instead of surfacing here.

use std::path::PathBuf;
use thiserror::Error;

/// Release resolution and transfer errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Invalid combination of requested parameters
    #[error("Invalid request: {reason}")]
    Configuration { reason: String },

    /// The release does not exist at the resolved location
    #[error("Release not found at {url}. Double-check locale or version")]
    NotFound { url: String },

    /// Server answered with a non-2xx, non-404 status
    #[error("Couldn't access download URL {url} (HTTP code {status})")]
    Transfer { url: String, status: u16 },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transfer timed out
    #[error("Download timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// I/O error while writing the temporary file
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Create a configuration error with a message
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::NotFound { .. } => Some(404),
            FetchError::Transfer { status, .. } => Some(*status),
            FetchError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Integrity verification errors
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// The downloaded archive does not match the published hash
    #[error("md5 hash for download ({actual}) is different than the release hash ({expected})")]
    HashMismatch { expected: String, actual: String },

    /// Invalid hash format
    #[error("Invalid hash format: {hash}. Expected MD5 hex string")]
    InvalidHash { hash: String },

    /// The archive could not be read for hashing
    #[error("Failed to read {path} for hashing: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Archive cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory not found or inaccessible
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// Copying an archive into the cache failed
    #[error("Failed to import {key} into the cache: {reason}")]
    ImportFailed { key: String, reason: String },

    /// Cache key escapes the cache root or is empty
    #[error("Invalid cache key: {key}")]
    InvalidKey { key: String },

    /// I/O error during cache maintenance
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Archive transformation and extraction errors
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The archive could not be opened or parsed
    #[error("Failed to open archive {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    /// The archive's declared extension is not a supported format
    #[error("Unsupported archive format: {path}")]
    Unsupported { path: PathBuf },

    /// An entry could not be decompressed
    #[error("Corrupt archive {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Writing extracted content failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking extraction task did not complete
    #[error("Extraction task failed: {reason}")]
    Task { reason: String },

    /// Extraction stopped because the acquisition was abandoned
    #[error("Extraction cancelled")]
    Cancelled,
}

/// Reconciliation errors
///
/// Reconciliation never aborts an acquisition; these are rendered into the
/// warnings of a reconcile report.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A filesystem operation failed while applying an action
    #[error("Failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Release API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request error
    #[error("Release API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be issued
    #[error(transparent)]
    Request(#[from] FetchError),

    /// The API body could not be parsed
    #[error("Failed to parse release API response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Reading the configuration file failed
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Integrity error
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Extraction error
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Release API error
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The operation was abandoned on a shutdown signal
    #[error("Interrupted by {signal}")]
    Interrupted { signal: &'static str },

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    ///
    /// Nothing in the pipeline retries on its own; callers may use this to
    /// layer their own retry policy.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Fetch(FetchError::Timeout { .. })
            | AppError::Fetch(FetchError::Http(_))
            | AppError::Api(ApiError::Http(_)) => true,

            AppError::Fetch(FetchError::Transfer { status, .. }) => *status >= 500,

            AppError::Fetch(FetchError::Configuration { .. })
            | AppError::Fetch(FetchError::NotFound { .. })
            | AppError::Integrity(_)
            | AppError::Config(_) => false,

            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Fetch(FetchError::Configuration { .. }) => "configuration",
            AppError::Fetch(_) => "fetch",
            AppError::Integrity(_) => "integrity",
            AppError::Cache(_) => "cache",
            AppError::Extraction(_) => "extraction",
            AppError::Api(_) => "api",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Interrupted { .. } => "interrupted",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Extraction result type alias
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

/// Release API result type alias
pub type ApiResult<T> = std::result::Result<T, ApiError>;
