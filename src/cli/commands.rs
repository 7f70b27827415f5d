//! Command handlers for the CLI
//!
//! Each handler builds the components it needs from the loaded
//! configuration, runs one operation and prints a human-readable result.
//! Progress and diagnostics go through `tracing`; results go to stdout.

use std::path::Path;

use indicatif::ProgressBar;
use tracing::{debug, info};

use crate::app::{
    AcquireReport, AcquireRequest, ArchiveCache, CorePipeline, FetchOptions, InstalledCore,
    ReconcileOutcome, ReconcileReport, ReleaseApi, ReleaseClient, UpdateOutcome, Verification,
};
use crate::cli::args::{
    CacheAction, CacheArgs, CheckUpdateArgs, CleanupArgs, DownloadArgs, UpdateArgs, VersionArgs,
};
use crate::cli::progress::download_progress_bar;
use crate::config::AppConfig;
use crate::errors::{AppError, FetchError, Result};

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Loaded configuration, with command line overrides applied
    pub config: AppConfig,
    /// Suppress non-essential output
    pub quiet: bool,
}

impl CommandContext {
    /// Create a context from a loaded configuration
    pub fn new(config: AppConfig, quiet: bool) -> Self {
        Self { config, quiet }
    }

    fn locale<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(&self.config.release.locale)
    }

    /// Assemble a pipeline against the configured hosts and cache
    async fn pipeline(&self, progress: Option<ProgressBar>) -> Result<CorePipeline<ReleaseApi>> {
        let (cache_config, client_config) = self.config.to_runtime_config();

        let mut client = ReleaseClient::with_config(client_config)?;
        if let Some(bar) = progress {
            client = client.with_progress(bar);
        }

        let api = ReleaseApi::with_base_url(client.config(), &self.config.release.api_base_url)?;
        let cache = ArchiveCache::new(cache_config).await?;

        let scratch_dir = self.config.install.scratch_dir();
        tokio::fs::create_dir_all(&scratch_dir).await?;

        Ok(CorePipeline::new(client, cache, api)
            .with_scratch_dir(scratch_dir)
            .with_download_base(self.config.release.download_base())
            .with_reconciler(self.config.install.reconciler()))
    }

    fn fetch_options(&self, insecure: bool) -> FetchOptions {
        self.config
            .client
            .to_runtime_config()
            .fetch_options()
            .with_insecure(insecure || self.config.client.insecure)
    }
}

/// Handle the download command
pub async fn handle_download(args: DownloadArgs, ctx: &CommandContext) -> Result<()> {
    args.validate()
        .map_err(|reason| AppError::from(FetchError::configuration(reason)))?;

    let progress = download_progress_bar(ctx.quiet);
    let pipeline = ctx.pipeline(Some(progress.clone())).await?;

    let options = ctx.fetch_options(args.insecure);

    let request = match &args.download_url {
        Some(location) => AcquireRequest::explicit(location.clone(), &args.path),
        None => AcquireRequest::release(
            args.version(),
            ctx.locale(args.locale.as_deref()),
            args.skip_content,
            &args.path,
        ),
    };
    let request = request
        .with_extract(!args.no_extract)
        .with_force(args.force)
        .with_options(options);

    debug!("Acquisition request: {:?}", request);

    let result = pipeline.acquire(&request).await;
    progress.finish_and_clear();
    let report = result?;

    print_download_report(&report, ctx.quiet);
    println!("Success: FinPress downloaded.");
    Ok(())
}

fn print_download_report(report: &AcquireReport, quiet: bool) {
    if !quiet {
        match &report.verification {
            Some(Verification::Verified(hash)) => println!("md5 hash verified: {}", hash),
            Some(Verification::Unavailable(reason)) => println!("Warning: {}", reason),
            _ => {}
        }

        if report.from_cache {
            println!("Installed from cache.");
        }
        if let Some(extracted) = &report.extracted {
            println!("Extracted {} files.", extracted.files_written);
        }
        if let Some(copied) = &report.copied_to {
            println!("Archive saved to {}.", copied.display());
        }

        if let Some(outcome) = &report.reconcile {
            print_reconcile_outcome(outcome);
        }
    }
}

fn print_reconcile_outcome(outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::Completed(report) => print_reconcile_report(report),
        ReconcileOutcome::Skipped { reason } => {
            println!("Warning: {} Please cleanup files manually.", reason);
        }
    }
}

fn print_reconcile_report(report: &ReconcileReport) {
    for (from, to) in &report.renamed {
        println!("Renamed '{}' => '{}'", from, to);
    }
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
    println!("{}", report.summary());
}

/// Handle the check-update command
pub async fn handle_check_update(args: CheckUpdateArgs, ctx: &CommandContext) -> Result<()> {
    let pipeline = ctx.pipeline(None).await?;
    let locale = ctx.locale(args.locale.as_deref());

    let updates = pipeline.check_updates(&args.path, locale, args.filter()).await?;

    if updates.is_empty() {
        println!("Success: FinPress is at the latest version.");
        return Ok(());
    }

    println!("version\tupdate_type\tpackage_url");
    for update in &updates {
        println!("{}\t{}\t{}", update.version, update.update_type, update.package_url);
    }
    Ok(())
}

/// Handle the update command
pub async fn handle_update(args: UpdateArgs, ctx: &CommandContext) -> Result<()> {
    let progress = download_progress_bar(ctx.quiet);
    let pipeline = ctx.pipeline(Some(progress.clone())).await?;
    let locale = ctx.locale(args.locale.as_deref());
    let options = ctx.fetch_options(args.insecure);

    let result = pipeline
        .update(
            &args.path,
            args.version.as_deref(),
            locale,
            args.minor,
            args.force,
            &options,
        )
        .await;
    progress.finish_and_clear();

    match result? {
        UpdateOutcome::UpToDate { version } => {
            debug!("Installed version {} is current", version);
            println!("Success: FinPress is up to date.");
        }
        UpdateOutcome::AtLatestMinor { version } => {
            debug!("No patch release newer than {}", version);
            println!("Success: FinPress is at the latest minor release.");
        }
        UpdateOutcome::Updated(report) => {
            print_download_report(&report, ctx.quiet);
            println!("Success: FinPress updated successfully.");
        }
    }
    Ok(())
}

/// Handle the cleanup command
pub async fn handle_cleanup(args: CleanupArgs, ctx: &CommandContext) -> Result<()> {
    let pipeline = ctx.pipeline(None).await?;
    let locale = ctx.locale(args.locale.as_deref());

    info!(
        "Cleaning up files left by the upgrade from {} to {}",
        args.from, args.to
    );

    let outcome = pipeline
        .cleanup_extra_files(Some(&args.from), Some(&args.to), locale, &args.path)
        .await;

    match outcome {
        ReconcileOutcome::Completed(report) => {
            for path in &report.removed {
                println!("File removed: {}", path);
            }
            print_reconcile_report(&report);
            Ok(())
        }
        ReconcileOutcome::Skipped { reason } => Err(AppError::generic(format!(
            "{} Please cleanup files manually.",
            reason
        ))),
    }
}

/// Handle cache management commands
pub async fn handle_cache(args: CacheArgs, ctx: &CommandContext) -> Result<()> {
    let (cache_config, _) = ctx.config.to_runtime_config();
    let cache = ArchiveCache::new(cache_config).await?;

    match args.action {
        CacheAction::Info => handle_cache_info(&cache).await,
        CacheAction::Clear => handle_cache_clear(&cache).await,
    }
}

async fn handle_cache_info(cache: &ArchiveCache) -> Result<()> {
    let stats = cache.stats().await;

    println!("Cache Information");
    println!("=================");
    println!("Location: {}", cache.cache_root().display());
    println!("Cached archives: {}", stats.cached_files_count());
    println!("Cache size: {}", stats.format_cache_size());

    for entry in &stats.entries {
        let modified = entry
            .modified
            .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        println!("  {} ({} bytes, {})", entry.key, entry.size, modified);
    }

    Ok(())
}

async fn handle_cache_clear(cache: &ArchiveCache) -> Result<()> {
    let removed = cache.clear().await?;
    println!(
        "Removed {} cached archive{} from {}",
        removed,
        if removed == 1 { "" } else { "s" },
        cache.cache_root().display()
    );
    Ok(())
}

/// Handle the version command
pub async fn handle_version(args: VersionArgs) -> Result<()> {
    let core = detect_installation(&args.path).await?;

    if !args.extra {
        println!("{}", core.version.as_deref().unwrap_or("unknown"));
        return Ok(());
    }

    println!("FinPress version:\t{}", core.version.as_deref().unwrap_or("unknown"));
    println!("Database revision:\t{}", core.db_version.as_deref().unwrap_or("unknown"));
    println!(
        "TinyMCE version:\t{}",
        core.tinymce_display().as_deref().unwrap_or("unknown")
    );
    println!("Package language:\t{}", core.locale());
    Ok(())
}

async fn detect_installation(path: &Path) -> Result<InstalledCore> {
    InstalledCore::detect(path).await.ok_or_else(|| {
        AppError::generic(format!(
            "This does not seem to be a FinPress installation: {}",
            path.display()
        ))
    })
}
