//! Core Fetcher CLI application
//!
//! Command-line interface for downloading and installing FinPress core
//! releases, with md5 verification, archive caching and post-upgrade cleanup.

use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use core_fetcher::cli::{
    handle_cache, handle_check_update, handle_cleanup, handle_download, handle_update,
    handle_version, Cli, CommandContext, Commands,
};
use core_fetcher::app::{run_until_shutdown, shutdown_signal};
use core_fetcher::config::AppConfig;
use core_fetcher::errors::{AppError, Result};

/// Exit status after CTRL-C or SIGTERM
const EXIT_INTERRUPTED: u8 = 130;

// Returning instead of calling `process::exit` lets the runtime shut down,
// which waits for blocking extraction tasks to drop their staging trees.
#[tokio::main]
async fn main() -> ExitCode {
    match run_until_shutdown(run(), shutdown_signal()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ AppError::Interrupted { .. }) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_INTERRUPTED)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    if let Some(cache_dir) = &cli.global.cache_dir {
        config.cache.cache_root = Some(cache_dir.clone());
    }

    init_logging(&cli, &config);

    info!("Core Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let ctx = CommandContext::new(config, cli.global.quiet);

    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &ctx).await
        }
        Commands::CheckUpdate(args) => {
            info!("Executing check-update command");
            handle_check_update(args, &ctx).await
        }
        Commands::Update(args) => {
            info!("Executing update command");
            handle_update(args, &ctx).await
        }
        Commands::Cleanup(args) => {
            info!("Executing cleanup command");
            handle_cleanup(args, &ctx).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(args, &ctx).await
        }
        Commands::Version(args) => handle_version(args).await,
    }
}

/// Initialize logging from the CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("core_fetcher={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
