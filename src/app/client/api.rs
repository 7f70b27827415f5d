//! Release API consumer
//!
//! The release API publishes two things this crate needs:
//!
//! - per-file MD5 checksums of every release, used to reconcile an
//!   installation after an upgrade
//! - version offers, used to turn "latest" into a concrete version and to
//!   find updates for an installation
//!
//! Both are reached through small traits so the pipeline can run against
//! in-memory sources in tests.

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::app::client::config::{ClientConfig, FetchOptions};
use crate::app::client::http::HttpHandler;
use crate::app::hash::Md5Hash;
use crate::app::models::Manifest;
use crate::constants::release;
use crate::errors::{ApiError, ApiResult, FetchError};

const CHECKSUMS_PATH: &str = "core/checksums/1.0/";
const OFFERS_PATH: &str = "core/version-check/1.7/";

/// Source of per-file release manifests
pub trait ChecksumSource {
    /// Manifest of a release, or `None` when the source has none for it
    fn manifest(
        &self,
        version: &str,
        locale: &str,
    ) -> impl Future<Output = ApiResult<Option<Manifest>>> + Send;
}

/// Source of release offers
pub trait OfferSource {
    /// Releases offered for a locale, newest first
    fn offers(&self, locale: &str) -> impl Future<Output = ApiResult<Vec<ReleaseOffer>>> + Send;

    /// Newest release offered for a locale
    fn latest_offer(
        &self,
        locale: &str,
    ) -> impl Future<Output = ApiResult<Option<ReleaseOffer>>> + Send
    where
        Self: Sync,
    {
        async move { Ok(self.offers(locale).await?.into_iter().next()) }
    }
}

/// A release advertised by the offer API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOffer {
    /// Concrete version number
    pub version: String,
    /// Archive URL advertised with the offer
    pub download_url: String,
    /// Locale of the offered package
    pub locale: String,
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    offers: Vec<RawOffer>,
}

#[derive(Debug, Deserialize)]
struct RawOffer {
    #[serde(default)]
    current: String,
    #[serde(default)]
    download: String,
    #[serde(default)]
    locale: String,
}

/// HTTP consumer of the release API
#[derive(Debug, Clone)]
pub struct ReleaseApi {
    http_handler: HttpHandler,
    base_url: Url,
    options: FetchOptions,
}

impl ReleaseApi {
    /// Creates a client for the public release API
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        Self::with_base_url(config, release::API_BASE_URL)
    }

    /// Creates a client for a release API at a custom base URL
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the base URL is invalid or the HTTP client
    /// cannot be built
    pub fn with_base_url(config: &ClientConfig, base_url: &str) -> ApiResult<Self> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| FetchError::InvalidUrl {
            url: base_url.to_string(),
            error: e.to_string(),
        })?;

        Ok(Self {
            http_handler: HttpHandler::new(config)?,
            base_url,
            options: config.fetch_options(),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> ApiResult<Url> {
        let mut url = self.base_url.join(path).map_err(|e| FetchError::InvalidUrl {
            url: format!("{}{}", self.base_url, path),
            error: e.to_string(),
        })?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// GET a JSON document; `None` for non-2xx answers
    async fn get_json(&self, url: &Url) -> ApiResult<Option<Value>> {
        let response = self
            .http_handler
            .get(url.as_str(), "application/json", &self.options)
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} responded with HTTP {}", url, status.as_u16());
            return Ok(None);
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ApiError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

impl ChecksumSource for ReleaseApi {
    async fn manifest(&self, version: &str, locale: &str) -> ApiResult<Option<Manifest>> {
        let url = self.endpoint(CHECKSUMS_PATH, &[("version", version), ("locale", locale)])?;
        let Some(body) = self.get_json(&url).await? else {
            return Ok(None);
        };

        parse_checksums(&body, version).map_err(|reason| ApiError::Parse {
            url: url.to_string(),
            reason,
        })
    }
}

impl OfferSource for ReleaseApi {
    async fn offers(&self, locale: &str) -> ApiResult<Vec<ReleaseOffer>> {
        let url = self.endpoint(OFFERS_PATH, &[("locale", locale)])?;
        let Some(body) = self.get_json(&url).await? else {
            return Ok(Vec::new());
        };

        let parsed: OffersResponse = serde_json::from_value(body).map_err(|e| ApiError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(parsed
            .offers
            .into_iter()
            .filter(|offer| offer.locale == locale && !offer.current.is_empty())
            .map(|offer| ReleaseOffer {
                version: offer.current,
                download_url: offer.download,
                locale: offer.locale,
            })
            .collect())
    }
}

/// Interpret a checksums document
///
/// `checksums` is either `false`, a flat path → hash map, or a map keyed by
/// version holding such maps.
fn parse_checksums(body: &Value, version: &str) -> Result<Option<Manifest>, String> {
    let checksums = match body.get("checksums") {
        Some(Value::Object(map)) => map,
        Some(Value::Bool(false)) | Some(Value::Null) | None => return Ok(None),
        Some(other) => return Err(format!("unexpected checksums value: {}", other)),
    };

    let files = match checksums.get(version) {
        Some(Value::Object(nested)) => nested,
        Some(Value::Bool(false)) => return Ok(None),
        _ => checksums,
    };

    let mut entries = Vec::with_capacity(files.len());
    for (path, hash) in files {
        let Some(hex) = hash.as_str() else {
            warn!("Ignoring non-string checksum for {}", path);
            continue;
        };
        let hash = Md5Hash::from_hex(hex).map_err(|e| e.to_string())?;
        entries.push((path.clone(), hash));
    }

    Ok(Some(entries.into_iter().collect()))
}
