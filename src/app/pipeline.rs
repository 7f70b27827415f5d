//! Acquisition pipeline
//!
//! Materializes a release on disk: resolve the archive location, reuse a
//! cached copy or download and verify a fresh one, optionally strip bundled
//! content, extract over the target directory and, when upgrading an
//! existing installation, reconcile files left behind by the old version.
//!
//! Everything before extraction is fatal. A cached archive that fails to
//! extract is replaced by exactly one fresh download. Reconciliation
//! problems only produce a [`ReconcileOutcome::Skipped`] with a warning.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::app::archive::{self, ExtractReport, TempArchive};
use crate::app::cache::{ArchiveCache, CacheKey};
use crate::app::client::{ChecksumSource, FetchOptions, OfferSource, ReleaseClient, Verification};
use crate::app::install::{is_core_present, InstalledCore};
use crate::app::models::{ArchiveFormat, ArchiveSource, DownloadTarget, VersionSpec};
use crate::app::reconcile::{LocalFs, ReconcileOutcome, Reconciler};
use crate::app::release;
use crate::app::updates::{self, AvailableUpdate, UpdateFilter, UpdateTarget};
use crate::constants::release as release_constants;
use crate::errors::{FetchError, Result};

/// What to acquire and where to put it
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    /// Release or explicit archive
    pub source: ArchiveSource,
    /// Installation directory
    pub target_dir: PathBuf,
    /// Install without the bundled themes and plugins
    pub skip_content: bool,
    /// Extract the archive; otherwise the archive is copied into `target_dir`
    pub extract: bool,
    /// Proceed even if an installation is already present
    pub force: bool,
    /// Transfer settings
    pub options: FetchOptions,
}

impl AcquireRequest {
    /// Request for a published release
    ///
    /// The archive format follows from the request: nightly builds and
    /// content-stripped installs need a zip, everything else uses tar.gz.
    ///
    /// # Arguments
    ///
    /// * `version` - "latest", "nightly"/"trunk" or a version number
    /// * `locale` - Package locale
    /// * `skip_content` - Install without bundled themes and plugins
    /// * `target_dir` - Installation directory
    pub fn release(version: &str, locale: &str, skip_content: bool, target_dir: impl Into<PathBuf>) -> Self {
        let spec = VersionSpec::new(version, locale, ArchiveFormat::Zip);
        let format = if spec.is_nightly() || skip_content {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        };

        Self {
            source: ArchiveSource::Release(VersionSpec::new(version, locale, format)),
            target_dir: target_dir.into(),
            skip_content,
            extract: true,
            force: false,
            options: FetchOptions::default(),
        }
    }

    /// Request for an explicit archive URL or local path
    pub fn explicit(location: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: ArchiveSource::Explicit(location.into()),
            target_dir: target_dir.into(),
            skip_content: false,
            extract: true,
            force: false,
            options: FetchOptions::default(),
        }
    }

    /// Copy the archive instead of extracting it
    pub fn with_extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }

    /// Allow installing over an existing installation
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the transfer settings
    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }
}

/// What an acquisition did
#[derive(Debug, Clone)]
pub struct AcquireReport {
    /// Concrete version installed, when known
    pub version: Option<String>,
    /// Locale of the installed package
    pub locale: String,
    /// Archive location used
    pub archive_url: String,
    /// Whether the installed archive came from the cache
    pub from_cache: bool,
    /// Integrity check of a fresh download
    pub verification: Option<Verification>,
    /// Whether a fresh download was stored in the cache
    pub cached: bool,
    /// Extraction summary, when extracted
    pub extracted: Option<ExtractReport>,
    /// Where the archive was copied, when not extracted
    pub copied_to: Option<PathBuf>,
    /// Version installed before, when upgrading
    pub previous_version: Option<String>,
    /// Reconciliation result, when upgrading
    pub reconcile: Option<ReconcileOutcome>,
}

/// Result of an update request
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// The installation already runs the wanted version
    UpToDate { version: String },
    /// Only patch releases were wanted and none is offered
    AtLatestMinor { version: String },
    /// A release was installed over the existing one
    Updated(AcquireReport),
}

/// Resolved download for one acquisition
struct Plan {
    spec: Option<VersionSpec>,
    target: DownloadTarget,
    cache_key: Option<CacheKey>,
}

impl Plan {
    fn is_nightly(&self) -> bool {
        self.spec.as_ref().is_some_and(VersionSpec::is_nightly)
    }

    fn locale(&self) -> &str {
        self.spec
            .as_ref()
            .map(|spec| spec.locale.as_str())
            .unwrap_or(release_constants::DEFAULT_LOCALE)
    }
}

/// Drives acquisitions against a client, a cache and a release API
#[derive(Debug, Clone)]
pub struct CorePipeline<S> {
    client: ReleaseClient,
    cache: ArchiveCache,
    api: S,
    scratch_dir: PathBuf,
    download_base: String,
    reconciler: Reconciler,
}

impl<S> CorePipeline<S>
where
    S: ChecksumSource + OfferSource + Sync,
{
    /// Create a pipeline using the system temp directory as scratch space
    pub fn new(client: ReleaseClient, cache: ArchiveCache, api: S) -> Self {
        Self {
            client,
            cache,
            api,
            scratch_dir: std::env::temp_dir(),
            download_base: format!("https://{}/", release_constants::DOWNLOAD_HOST),
            reconciler: Reconciler::default(),
        }
    }

    /// Set the directory temporary archives are written to
    pub fn with_scratch_dir(mut self, scratch_dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = scratch_dir.into();
        self
    }

    /// Set the origin serving release archives
    pub fn with_download_base(mut self, download_base: impl Into<String>) -> Self {
        self.download_base = download_base.into();
        self
    }

    /// Set the reconciler used after upgrades
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Archive cache in use
    pub fn cache(&self) -> &ArchiveCache {
        &self.cache
    }

    /// Acquire a release or explicit archive into the target directory
    ///
    /// # Errors
    ///
    /// Returns `AppError` if:
    /// - The request combines incompatible options, or an installation is
    ///   present without `force` (`FetchError::Configuration`)
    /// - The release cannot be found or transferred
    /// - The download does not match its published hash
    /// - A freshly downloaded archive cannot be stripped or extracted
    pub async fn acquire(&self, request: &AcquireRequest) -> Result<AcquireReport> {
        validate(request)?;

        let target_dir = request.target_dir.as_path();
        let core_present = is_core_present(target_dir).await;
        if core_present && !request.force {
            return Err(FetchError::configuration("FinPress files seem to already be present here.").into());
        }

        if !tokio::fs::try_exists(target_dir).await.unwrap_or(false) {
            info!("Creating directory '{}'.", target_dir.display());
            tokio::fs::create_dir_all(target_dir).await?;
        }

        let plan = self.plan(request).await?;

        let previous_version = InstalledCore::detect(target_dir)
            .await
            .and_then(|core| core.version);

        match &plan.spec {
            Some(spec) => info!("Downloading FinPress {} ({})...", spec.version, spec.locale),
            None => info!("Downloading from {} ...", plan.target.url),
        }

        let mut report = AcquireReport {
            version: plan.spec.as_ref().map(|spec| spec.version.clone()),
            locale: plan.locale().to_string(),
            archive_url: plan.target.url.clone(),
            from_cache: false,
            verification: None,
            cached: false,
            extracted: None,
            copied_to: None,
            previous_version: previous_version.clone(),
            reconcile: None,
        };

        let used_cache = match &plan.cache_key {
            Some(key) => self.install_from_cache(key, request, &mut report).await?,
            None => false,
        };

        if !used_cache {
            self.install_fresh(&plan, request, &mut report).await?;
        }

        if core_present && request.extract {
            let to_version = match report.version.clone() {
                Some(version) => Some(version),
                None => InstalledCore::detect(target_dir).await.and_then(|core| core.version),
            };
            let outcome = self
                .cleanup_extra_files(
                    previous_version.as_deref(),
                    to_version.as_deref(),
                    plan.locale(),
                    target_dir,
                )
                .await;
            report.reconcile = Some(outcome);
        }

        Ok(report)
    }

    /// Resolve the download target and cache key for a request
    async fn plan(&self, request: &AcquireRequest) -> Result<Plan> {
        let spec = match &request.source {
            ArchiveSource::Explicit(location) => {
                return Ok(Plan {
                    spec: None,
                    target: DownloadTarget::explicit(location.clone()),
                    cache_key: None,
                });
            }
            ArchiveSource::Release(spec) => spec,
        };

        let (spec, target) = if spec.is_latest() {
            let offer = self
                .api
                .latest_offer(&spec.locale)
                .await?
                .ok_or_else(|| {
                    FetchError::configuration(format!(
                        "The requested locale ({}) was not found.",
                        spec.locale
                    ))
                })?;

            let resolved = spec.with_version(offer.version);
            let target = if offer.download_url.is_empty() {
                release::resolve_with_base(&resolved, &self.download_base)?
            } else if resolved.format == ArchiveFormat::TarGz {
                DownloadTarget::explicit(offer.download_url.replace(".zip", ".tar.gz"))
            } else {
                DownloadTarget::explicit(offer.download_url)
            };
            (resolved, target)
        } else {
            let target = release::resolve_with_base(spec, &self.download_base)?;
            (spec.clone(), target)
        };

        if request.skip_content && target.format != ArchiveFormat::Zip {
            return Err(FetchError::configuration("Skip content is only available for ZIP files.").into());
        }

        let cache_key = CacheKey::new(&spec.version, &spec.locale, target.format)?;

        Ok(Plan {
            spec: Some(spec),
            target,
            cache_key: Some(cache_key),
        })
    }

    /// Install from a cached archive; `false` if there is none or it is unusable
    async fn install_from_cache(
        &self,
        key: &CacheKey,
        request: &AcquireRequest,
        report: &mut AcquireReport,
    ) -> Result<bool> {
        let Some(cached) = self.cache.has(key).await else {
            return Ok(false);
        };

        info!("Using cached file '{}'...", cached.display());

        if !request.extract {
            let name = archive_file_name(&report.archive_url, ArchiveFormat::from_location(&report.archive_url));
            report.copied_to = Some(copy_into(&cached, &request.target_dir, &name).await?);
            report.from_cache = true;
            return Ok(true);
        }

        let attempt = async {
            let stripped = if request.skip_content {
                Some(archive::strip_bundled_content(&cached, &self.scratch_dir).await?)
            } else {
                None
            };
            let source = stripped.as_ref().map(TempArchive::path).unwrap_or(cached.as_path());
            archive::extract(source, &request.target_dir, &self.scratch_dir).await
        };

        match attempt.await {
            Ok(extracted) => {
                report.extracted = Some(extracted);
                report.from_cache = true;
                Ok(true)
            }
            Err(e) => {
                warn!("Extraction failed, downloading a new copy... ({})", e);
                Ok(false)
            }
        }
    }

    /// Download, verify, install and cache a fresh archive
    async fn install_fresh(
        &self,
        plan: &Plan,
        request: &AcquireRequest,
        report: &mut AcquireReport,
    ) -> Result<()> {
        let downloaded = self
            .client
            .fetch(&plan.target, &self.scratch_dir, &request.options)
            .await?;

        if plan.spec.is_some() {
            let verification = self
                .client
                .verify(&downloaded, &plan.target, plan.is_nightly(), &request.options)
                .await;
            report.verification = Some(verification.clone());
            verification.into_result()?;
        }

        if request.extract {
            let stripped = if request.skip_content {
                Some(archive::strip_bundled_content(downloaded.path(), &self.scratch_dir).await?)
            } else {
                None
            };
            let source = stripped.as_ref().unwrap_or(&downloaded);
            let extracted =
                archive::extract(source.path(), &request.target_dir, &self.scratch_dir).await?;
            report.extracted = Some(extracted);
        } else {
            let name = archive_file_name(&plan.target.url, plan.target.format);
            report.copied_to = Some(copy_into(downloaded.path(), &request.target_dir, &name).await?);
        }

        // Explicit sources may name moving targets such as "latest.zip"
        if let (Some(key), false) = (&plan.cache_key, plan.is_nightly()) {
            report.cached = self.cache.import(key, downloaded.path()).await;
        }

        Ok(())
    }

    /// Updates offered for the installation in `root`
    ///
    /// # Errors
    ///
    /// Returns `AppError` if no installation is found or the offer API fails
    pub async fn check_updates(
        &self,
        root: &Path,
        locale: &str,
        filter: UpdateFilter,
    ) -> Result<Vec<AvailableUpdate>> {
        let installed = installed_version(root).await?;
        let offers = self.api.offers(locale).await?;
        Ok(updates::available_updates(&offers, &installed, filter))
    }

    /// Update the installation in `root` to a newer release
    ///
    /// Without `version` the newest offer is installed, or the newest patch
    /// release of the installed line with `minor_only`. A version that is not
    /// newer than the installed one is only installed with `force`.
    /// Reconciliation runs as for any upgrade.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if no installation is found, the offer API fails,
    /// or the acquisition fails
    pub async fn update(
        &self,
        root: &Path,
        version: Option<&str>,
        locale: &str,
        minor_only: bool,
        force: bool,
        options: &FetchOptions,
    ) -> Result<UpdateOutcome> {
        let installed = installed_version(root).await?;

        let offers = match version {
            Some(_) => Vec::new(),
            None => self.api.offers(locale).await?,
        };

        let target = match updates::choose_target(&installed, version, &offers, minor_only, force) {
            UpdateTarget::Version(target) => target,
            UpdateTarget::UpToDate => return Ok(UpdateOutcome::UpToDate { version: installed }),
            UpdateTarget::AtLatestMinor => {
                return Ok(UpdateOutcome::AtLatestMinor { version: installed })
            }
        };

        info!("Updating to version {} ({})...", target, locale);

        let request = AcquireRequest::release(&target, locale, false, root)
            .with_force(true)
            .with_options(*options);
        let report = self.acquire(&request).await?;

        Ok(UpdateOutcome::Updated(report))
    }

    /// Remove files left behind by an upgrade from `from` to `to`
    ///
    /// Never fails: missing versions and unavailable checksums yield
    /// [`ReconcileOutcome::Skipped`] with a warning. Individual files that
    /// cannot be renamed or removed are listed in the report's warnings.
    pub async fn cleanup_extra_files(
        &self,
        from: Option<&str>,
        to: Option<&str>,
        locale: &str,
        root: &Path,
    ) -> ReconcileOutcome {
        let (Some(from), Some(to)) = (from, to) else {
            return skipped("Failed to find FinPress version.".to_string());
        };

        let old = match self.api.manifest(from, locale).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return skipped(checksums_unavailable(from, locale)),
            Err(e) => return skipped(e.to_string()),
        };
        let new = match self.api.manifest(to, locale).await {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return skipped(checksums_unavailable(to, locale)),
            Err(e) => return skipped(e.to_string()),
        };

        let reconciler = self.reconciler.clone();
        let fs = LocalFs::new(root);
        let result =
            tokio::task::spawn_blocking(move || reconciler.reconcile(&old, &new, &fs)).await;

        match result {
            Ok(report) => ReconcileOutcome::Completed(report),
            Err(e) => skipped(format!("Reconciliation task failed: {}", e)),
        }
    }
}

fn validate(request: &AcquireRequest) -> Result<()> {
    if request.skip_content && !request.extract {
        return Err(FetchError::configuration(
            "Cannot use both --skip-content and --no-extract at the same time.",
        )
        .into());
    }

    if let ArchiveSource::Explicit(_) = request.source {
        if request.skip_content {
            return Err(FetchError::configuration(
                "Skip content and locale options are not available for URL downloads.",
            )
            .into());
        }
    }

    Ok(())
}

async fn installed_version(root: &Path) -> Result<String> {
    InstalledCore::detect(root)
        .await
        .and_then(|core| core.version)
        .ok_or_else(|| {
            FetchError::configuration(format!(
                "This does not seem to be a FinPress installation: {}",
                root.display()
            ))
            .into()
        })
}

fn checksums_unavailable(version: &str, locale: &str) -> String {
    format!("Checksums not available for FinPress {}/{}.", version, locale)
}

fn skipped(reason: String) -> ReconcileOutcome {
    warn!("{} Please cleanup files manually.", reason);
    ReconcileOutcome::Skipped { reason }
}

/// File name an archive is saved under when it is not extracted
///
/// The last segment of the download location, without query or fragment.
fn archive_file_name(location: &str, format: ArchiveFormat) -> String {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    match path.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{}.{}", release_constants::ARCHIVE_PREFIX, format.extension()),
    }
}

/// Copy an archive into a directory under the given file name
async fn copy_into(archive: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    let destination = dir.join(name);
    tokio::fs::copy(archive, &destination).await?;
    Ok(destination)
}
