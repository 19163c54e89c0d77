//! Resilient client for the creditdb server

use std::time::Duration;

use tracing::{info, warn};

use crate::backoff::{self, BackoffPolicy, TokioClock};
use crate::config::ClientConfig;
use crate::context::Context;
use crate::error::{Error, ErrorCategory, Result};
use crate::protocol::{Endpoint, Protocol};
use crate::transport::Transport;
use crate::types::Line;

/// Client for the creditdb paged key-value store
///
/// A `Client` only exists once the server has answered a health probe.
/// Configure it with [`Client::with_host`] and [`Client::with_page`] before
/// sharing it; operations take `&self` and may run concurrently.
///
/// # Example
/// ```rust,no_run
/// use creditdb::{Client, Context};
///
/// #[tokio::main]
/// async fn main() -> Result<(), creditdb::Error> {
///     let client = Client::connect().await?.with_page(3);
///     let ctx = Context::background();
///
///     client.set_line(&ctx, "alice", "100").await?;
///     let line = client.get_line(&ctx, "alice").await?;
///     assert_eq!(line.value, "100");
///
///     client.close();
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Client {
    endpoint: Endpoint,
    transport: Transport,
    response_timeout: Option<Duration>,
    backoff: BackoffPolicy,
}

impl Client {
    /// Connect to the default host (`http://localhost:5622`), page 0
    ///
    /// # Errors
    /// Returns a `ServiceUnavailable` error if the server does not answer
    /// the health probe within the backoff budget.
    pub async fn connect() -> Result<Self> {
        Self::connect_with(ClientConfig::default()).await
    }

    /// Connect using `config`, probing `config.host` with exponential backoff
    ///
    /// The probe runs over its own throwaway connection pool; the returned
    /// client gets a fresh one.
    pub async fn connect_with(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let ClientConfig {
            host,
            page,
            response_timeout,
            backoff: policy,
        } = config;
        let endpoint = Endpoint {
            host,
            current_page: page,
        };

        let probe = Transport::new(response_timeout)?;
        let outcome = backoff::retry(&policy, &TokioClock, |deadline| {
            let ctx = match deadline {
                Some(deadline) => Context::with_deadline(deadline),
                None => Context::background(),
            };
            let probe = &probe;
            let endpoint = &endpoint;
            async move { Protocol::new(probe, endpoint).health(&ctx).await }
        })
        .await;
        drop(probe);

        if let Err(e) = outcome {
            warn!(host = %endpoint.host, error = %e, "Health check failed");
            return Err(Error::with_detail(
                ErrorCategory::ServiceUnavailable,
                format_args!("{} did not pass health check: {}", endpoint.host, e),
            ));
        }

        info!(host = %endpoint.host, page = endpoint.current_page, "Connected to creditdb");
        Ok(Self {
            endpoint,
            transport: Transport::new(response_timeout)?,
            response_timeout,
            backoff: policy,
        })
    }

    /// Point the client at another host; an empty string keeps the current one
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        if !host.is_empty() {
            self.endpoint.host = host;
        }
        self
    }

    /// Select the page attached to subsequent requests
    pub fn with_page(mut self, page: u64) -> Self {
        self.endpoint.current_page = page;
        self
    }

    /// The page attached to every request
    pub fn current_page(&self) -> u64 {
        self.endpoint.current_page
    }

    /// The host requests are sent to
    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    /// Current configuration, reflecting any `with_host`/`with_page` calls
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            host: self.endpoint.host.clone(),
            page: self.endpoint.current_page,
            response_timeout: self.response_timeout,
            backoff: self.backoff.clone(),
        }
    }

    /// Release pooled connections
    ///
    /// Requests must have completed or been cancelled before this is called.
    pub fn close(self) {
        info!(host = %self.endpoint.host, "Closing creditdb client");
        drop(self.transport);
    }

    fn protocol(&self) -> Protocol<'_> {
        Protocol::new(&self.transport, &self.endpoint)
    }

    /// Store `value` under `key` on the current page
    ///
    /// # Errors
    /// `BadRequest` if the key or value is empty or the server rejects the
    /// write; `InternalError` if the request could not be sent.
    pub async fn set_line(&self, ctx: &Context, key: &str, value: &str) -> Result<()> {
        self.protocol().set_line(ctx, key, value).await
    }

    /// Fetch the record stored under `key` on the current page
    ///
    /// # Errors
    /// `NotFound` if the key is absent on this page.
    pub async fn get_line(&self, ctx: &Context, key: &str) -> Result<Line> {
        self.protocol().get_line(ctx, key).await
    }

    /// Fetch every record on the current page, in server order
    pub async fn get_all_lines(&self, ctx: &Context) -> Result<Vec<Line>> {
        self.protocol().get_all_lines(ctx).await
    }

    /// Remove `key` from the current page
    ///
    /// # Errors
    /// `NotFound` if the key is absent on this page.
    pub async fn delete_line(&self, ctx: &Context, key: &str) -> Result<()> {
        self.protocol().delete_line(ctx, key).await
    }

    /// Remove every record on the current page
    pub async fn flush(&self, ctx: &Context) -> Result<()> {
        self.protocol().flush(ctx).await
    }

    /// Ask the server for its ping reply
    pub async fn ping(&self, ctx: &Context) -> Result<String> {
        self.protocol().ping(ctx).await
    }

    /// Check that the host root answers 200
    pub async fn health(&self, ctx: &Context) -> Result<()> {
        self.protocol().health(ctx).await
    }

    /// Returns whether `key` exists on the current page
    pub async fn exists(&self, ctx: &Context, key: &str) -> Result<bool> {
        self.protocol().exists(ctx, key).await
    }
}
