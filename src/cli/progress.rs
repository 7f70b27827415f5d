//! Transfer progress display
//!
//! A single indicatif byte counter for archive downloads. It stays hidden in
//! quiet mode and when stderr is not a terminal.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Template for the download bar
const DOWNLOAD_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Create the progress bar shown while an archive downloads
///
/// The length is unknown until the server reports one, so the bar starts
/// empty and the client sets it from the response.
pub fn download_progress_bar(quiet: bool) -> ProgressBar {
    if quiet || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(0);
    bar.set_style(download_style());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn download_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(DOWNLOAD_TEMPLATE)
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}
