//! Release URL resolution
//!
//! Maps a [`VersionSpec`] onto the location of its published archive. The
//! mapping is pure: no network access, no filesystem access.
//!
//! - Nightly builds exist only as an `en_US` zip at a fixed path.
//! - Versions with two or more dots lose a trailing `.0` (`6.7.0` → `6.7`).
//! - Non-default locales are served from a two-letter subdomain and carry a
//!   `-{locale}` suffix in the file name.

use url::Url;

use crate::app::models::{ArchiveFormat, DownloadTarget, VersionSpec};
use crate::constants::release;
use crate::errors::{FetchError, FetchResult};

/// Resolve the archive location for a version spec
///
/// Uses the public download host.
///
/// # Errors
///
/// Returns `FetchError::Configuration` for nightly requests that are not
/// `en_US` zip archives.
///
/// # Examples
///
/// ```rust
/// use core_fetcher::app::models::{ArchiveFormat, VersionSpec};
/// use core_fetcher::app::release::resolve;
///
/// let spec = VersionSpec::new("6.7.0", "nl_NL", ArchiveFormat::TarGz);
/// let target = resolve(&spec)?;
/// assert_eq!(target.url, "https://nl.finpress.org/finpress-6.7-nl_NL.tar.gz");
/// # Ok::<(), core_fetcher::errors::FetchError>(())
/// ```
pub fn resolve(spec: &VersionSpec) -> FetchResult<DownloadTarget> {
    let base = format!("https://{}/", release::DOWNLOAD_HOST);
    resolve_with_base(spec, &base)
}

/// Resolve the archive location against a specific download origin
///
/// The locale subdomain is prepended to the origin's host.
///
/// # Arguments
///
/// * `spec` - Requested version, locale and format
/// * `base` - Origin serving release archives, e.g. `https://finpress.org/`
///
/// # Errors
///
/// Returns `FetchError::InvalidUrl` if `base` is not an absolute URL with a
/// host, and `FetchError::Configuration` for invalid nightly requests.
pub fn resolve_with_base(spec: &VersionSpec, base: &str) -> FetchResult<DownloadTarget> {
    let invalid = |error: String| FetchError::InvalidUrl {
        url: base.to_string(),
        error,
    };
    let mut origin = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    let host = origin
        .host_str()
        .map(str::to_string)
        .ok_or_else(|| invalid("missing host".to_string()))?;

    if spec.is_nightly() {
        if spec.format != ArchiveFormat::Zip {
            return Err(FetchError::configuration(
                "nightly builds are only available in .zip format",
            ));
        }
        if spec.locale != release::DEFAULT_LOCALE {
            return Err(FetchError::configuration(format!(
                "nightly builds are only available for the {} locale",
                release::DEFAULT_LOCALE
            )));
        }

        origin.set_path(release::NIGHTLY_PATH);
        return Ok(DownloadTarget::new(origin.to_string(), ArchiveFormat::Zip));
    }

    let version = normalize_version(&spec.version);
    let (subdomain, suffix) = locale_decoration(&spec.locale);

    if !subdomain.is_empty() {
        origin
            .set_host(Some(&format!("{}{}", subdomain, host)))
            .map_err(|e| invalid(e.to_string()))?;
    }
    origin.set_path(&format!(
        "{}-{}{}.{}",
        release::ARCHIVE_PREFIX,
        version,
        suffix,
        spec.format.extension()
    ));

    Ok(DownloadTarget::new(origin.to_string(), spec.format))
}

/// Drop a trailing `.0` from versions with more than one dot
pub fn normalize_version(version: &str) -> &str {
    if version.matches('.').count() > 1 {
        version.strip_suffix(".0").unwrap_or(version)
    } else {
        version
    }
}

/// Subdomain and file suffix for a locale
fn locale_decoration(locale: &str) -> (String, String) {
    if locale == release::DEFAULT_LOCALE {
        return (String::new(), String::new());
    }

    let language: String = locale.chars().take(2).collect();
    (format!("{}.", language), format!("-{}", locale))
}
