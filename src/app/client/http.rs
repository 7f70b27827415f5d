//! Core HTTP operations with the insecure TLS fallback
//!
//! Requests go through a certificate-validating client. When the caller opts
//! in, a request that fails during the TLS handshake is repeated exactly once
//! with a client that skips certificate validation. No other retries happen.

use std::error::Error as StdError;

use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use crate::app::client::config::{ClientConfig, FetchOptions};
use crate::errors::{FetchError, FetchResult};

/// HTTP operations handler
#[derive(Debug, Clone)]
pub struct HttpHandler {
    client: Client,
    insecure_client: Client,
}

impl HttpHandler {
    /// Creates the validating and non-validating clients from a configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if either client cannot be built
    pub fn new(config: &ClientConfig) -> FetchResult<Self> {
        Ok(Self {
            client: config.build_http_client(true)?,
            insecure_client: config.build_http_client(false)?,
        })
    }

    /// Issue a GET request
    ///
    /// The response is returned whatever its status; status handling is the
    /// caller's concern.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    /// * `accept` - Value of the `Accept` header
    /// * `options` - Timeout and TLS fallback settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for unparseable URLs,
    /// `FetchError::Timeout` if the request times out and `FetchError::Http`
    /// for other transport failures.
    pub async fn get(&self, url: &str, accept: &str, options: &FetchOptions) -> FetchResult<Response> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            error: e.to_string(),
        })?;

        match self.send(&self.client, &parsed, accept, options).await {
            Err(FetchError::Http(e)) if options.insecure && is_tls_failure(&e) => {
                warn!(
                    "TLS handshake with {} failed ({}), retrying without certificate validation",
                    parsed.host_str().unwrap_or_default(),
                    e
                );
                self.send(&self.insecure_client, &parsed, accept, options).await
            }
            other => other,
        }
    }

    async fn send(
        &self,
        client: &Client,
        url: &Url,
        accept: &str,
        options: &FetchOptions,
    ) -> FetchResult<Response> {
        let result = client
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, accept)
            .timeout(options.timeout)
            .send()
            .await;

        match result {
            Ok(response) => {
                debug!("{} responded with {}", url, response.status());
                Ok(response)
            }
            Err(e) if e.is_timeout() => Err(FetchError::Timeout {
                seconds: options.timeout.as_secs(),
            }),
            Err(e) => Err(FetchError::Http(e)),
        }
    }
}

/// Whether a request error was raised while establishing TLS
///
/// reqwest does not expose a dedicated kind for this, so the source chain of a
/// connect error is inspected for TLS wording.
fn is_tls_failure(error: &reqwest::Error) -> bool {
    if !error.is_connect() {
        return false;
    }

    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        let message = cause.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            return true;
        }
        source = cause.source();
    }
    false
}
