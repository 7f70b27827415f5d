//! Command-line interface components
//!
//! This module contains CLI-specific code for the Core Fetcher application,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{
    CacheAction, CacheArgs, CheckUpdateArgs, CleanupArgs, Cli, Commands, DownloadArgs, GlobalArgs,
    UpdateArgs, VersionArgs,
};
pub use commands::{
    handle_cache, handle_check_update, handle_cleanup, handle_download, handle_update,
    handle_version, CommandContext,
};
pub use progress::download_progress_bar;
