//! HTTP client configuration and building logic
//!
//! This module handles the configuration and construction of the HTTP clients
//! used for release downloads and release API calls.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constants::http;
use crate::errors::{FetchError, FetchResult};

/// Per-transfer options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Whole-transfer timeout
    pub timeout: Duration,
    /// Retry once without certificate validation after a TLS handshake failure
    pub insecure: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: http::DEFAULT_TIMEOUT,
            insecure: false,
        }
    }
}

impl FetchOptions {
    /// Set the transfer timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow the insecure TLS fallback
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }
}

/// Configuration for the HTTP clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Request timeout applied to every transfer
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// User agent sent with every request
    pub user_agent: String,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Allow the insecure TLS fallback by default
    pub insecure: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            user_agent: http::USER_AGENT.to_string(),
            tcp_nodelay: true,
            insecure: false,
        }
    }
}

impl ClientConfig {
    /// Default per-transfer options derived from this configuration
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.request_timeout,
            insecure: self.insecure,
        }
    }

    /// Builds an HTTP client
    ///
    /// # Arguments
    ///
    /// * `validate_certs` - Whether TLS certificates are validated
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the TLS backend cannot be initialized
    pub fn build_http_client(&self, validate_certs: bool) -> FetchResult<Client> {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str())
            .tcp_nodelay(self.tcp_nodelay);

        if !validate_certs {
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        client_builder.build().map_err(FetchError::Http)
    }
}
