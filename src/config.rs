//! Client configuration

use std::env;
use std::time::Duration;

use url::Url;

use crate::backoff::BackoffPolicy;
use crate::error::{Error, Result};

/// Host used when none is configured
pub const DEFAULT_HOST: &str = "http://localhost:5622";

/// Page used when none is configured
pub const DEFAULT_PAGE: u64 = 0;

/// Configuration options for the creditdb client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (default: http://localhost:5622)
    pub host: String,
    /// Page attached to every request (default: 0)
    pub page: u64,
    /// How long to wait for response headers before failing the request
    /// (default: 5s). `None` waits indefinitely.
    pub response_timeout: Option<Duration>,
    /// Backoff applied to the health probe during construction
    pub backoff: BackoffPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            page: DEFAULT_PAGE,
            response_timeout: Some(Duration::from_secs(5)),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointed at `host`, other fields default
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Load overrides from `CREDITDB_HOST`, `CREDITDB_PAGE` and
    /// `CREDITDB_RESPONSE_TIMEOUT_MS`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("CREDITDB_HOST") {
            if !host.is_empty() {
                config.host = host;
            }
        }

        if let Ok(page) = env::var("CREDITDB_PAGE") {
            config.page = page
                .trim()
                .parse()
                .map_err(|_| Error::bad_request_with(format_args!("invalid CREDITDB_PAGE {:?}", page)))?;
        }

        if let Ok(ms) = env::var("CREDITDB_RESPONSE_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                Error::bad_request_with(format_args!("invalid CREDITDB_RESPONSE_TIMEOUT_MS {:?}", ms))
            })?;
            config.response_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Check that the host is an absolute http(s) URL
    pub fn validate(&self) -> Result<()> {
        validate_host(&self.host)
    }
}

pub(crate) fn validate_host(host: &str) -> Result<()> {
    let url = Url::parse(host).map_err(|e| Error::bad_request_with(format_args!("invalid host {:?}: {}", host, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::bad_request_with(format_args!(
            "unsupported scheme {:?} in host {:?}",
            scheme, host
        ))),
    }
}
