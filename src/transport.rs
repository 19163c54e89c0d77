//! Pooled HTTP transport shared by every operation of a client

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::CONTENT_TYPE;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// Status and fully-read body of a response
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Build a rustls ClientConfig trusting the webpki roots
fn build_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Ok(rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::internal_with(format_args!("TLS error: {}", e)))?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Connection pool plus the response-header timeout applied to every request
pub(crate) struct Transport {
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
    response_timeout: Option<Duration>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("response_timeout", &self.response_timeout)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Build a fresh pool; plaintext and TLS endpoints are both accepted
    pub fn new(response_timeout: Option<Duration>) -> Result<Self> {
        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(build_tls_config()?)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            http_client,
            response_timeout,
        })
    }

    /// Send one request and read the whole response.
    ///
    /// The body is attached with a JSON content type when present. The
    /// response is either fully collected or dropped, on every path.
    pub async fn send(&self, ctx: &Context, method: Method, url: &str, body: Option<Bytes>) -> Result<Reply> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::internal_with(format_args!("invalid request URL {}: {}", url, e)))?;

        let mut builder = Request::builder().method(method.clone()).uri(uri);
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder
            .body(Full::new(body.unwrap_or_default()))
            .map_err(|e| Error::internal_with(format_args!("failed to build request: {}", e)))?;

        debug!("Sending request: {} {}", method, url);

        ctx.run(self.exchange(req)).await
    }

    async fn exchange(&self, req: Request<Full<Bytes>>) -> Result<Reply> {
        let pending = self.http_client.request(req);
        let response = match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| Error::internal_with(format_args!("no response within {}ms", limit.as_millis())))?,
            None => pending.await,
        }
        .map_err(|e| Error::internal_with(format_args!("request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::internal_with(format_args!("failed to read body: {}", e)))?
            .to_bytes();

        Ok(Reply { status, body })
    }
}
