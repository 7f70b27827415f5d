//! Core Fetcher Library
//!
//! A Rust library for acquiring FinPress core releases: resolve the archive
//! for a version and locale, download and verify it, cache it, extract it
//! over an installation and clean up files an upgrade leaves behind.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
