//! Request construction and response classification for each remote operation

use bytes::Bytes;
use hyper::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, ErrorCategory, Result};
use crate::transport::{Reply, Transport};
use crate::types::{DeleteRequest, GetRequest, Line, Page, PageRequest, SetRequest};

/// Host and page every request is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub host: String,
    pub current_page: u64,
}

impl Endpoint {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host.trim_end_matches('/'), path)
    }
}

/// Fail with `BadRequest` unless every field is non-empty
fn require_non_empty(fields: &[(&str, &str)]) -> Result<()> {
    for (name, value) in fields {
        if value.is_empty() {
            return Err(Error::bad_request_with(format_args!("{} cannot be empty", name)));
        }
    }
    Ok(())
}

fn encode<T: Serialize>(body: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(body)?))
}

/// 200 is success, anything else maps to `otherwise`
fn expect_ok(status: StatusCode, otherwise: ErrorCategory) -> Result<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(Error::with_detail(otherwise, format_args!("server returned {}", status)))
    }
}

/// Classification shared by keyed lookups: 404 is `NotFound`, other non-200 `BadRequest`
fn expect_key_found(status: StatusCode) -> Result<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(Error::not_found());
    }
    expect_ok(status, ErrorCategory::BadRequest)
}

fn decode_ping(body: &[u8]) -> Result<String> {
    let fields: Map<String, Value> = serde_json::from_slice(body)?;
    match fields.get("ping") {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(Error::internal_with("ping field is not a string")),
        None => Err(Error::internal_with("ping field missing from response")),
    }
}

/// One call per remote capability, over a borrowed transport and endpoint
pub(crate) struct Protocol<'a> {
    transport: &'a Transport,
    endpoint: &'a Endpoint,
}

impl<'a> Protocol<'a> {
    pub fn new(transport: &'a Transport, endpoint: &'a Endpoint) -> Self {
        Self { transport, endpoint }
    }

    async fn send(&self, ctx: &Context, method: Method, path: &str, body: Option<Bytes>) -> Result<Reply> {
        debug!(page = self.endpoint.current_page, "{} {}", method, path);
        self.transport.send(ctx, method, &self.endpoint.url(path), body).await
    }

    pub async fn set_line(&self, ctx: &Context, key: &str, value: &str) -> Result<()> {
        require_non_empty(&[("key", key), ("value", value)])?;
        let body = encode(&SetRequest {
            key,
            value,
            page: self.endpoint.current_page,
        })?;

        let reply = self.send(ctx, Method::POST, "/set", Some(body)).await?;
        expect_ok(reply.status, ErrorCategory::BadRequest)
    }

    pub async fn get_line(&self, ctx: &Context, key: &str) -> Result<Line> {
        require_non_empty(&[("key", key)])?;
        let body = encode(&GetRequest {
            key,
            page: self.endpoint.current_page,
        })?;

        let reply = self.send(ctx, Method::GET, "/get", Some(body)).await?;
        expect_key_found(reply.status)?;
        Ok(serde_json::from_slice(&reply.body)?)
    }

    /// The payload status, not the HTTP status, decides success here
    pub async fn get_all_lines(&self, ctx: &Context) -> Result<Vec<Line>> {
        let body = encode(&PageRequest {
            page: self.endpoint.current_page,
        })?;

        let reply = self.send(ctx, Method::GET, "/getall", Some(body)).await?;
        let page: Page = serde_json::from_slice(&reply.body)?;
        if !page.is_ok() {
            return Err(Error::bad_request_with(format_args!("page status {:?}", page.status)));
        }
        Ok(page.entries)
    }

    pub async fn delete_line(&self, ctx: &Context, key: &str) -> Result<()> {
        require_non_empty(&[("key", key)])?;
        let body = encode(&DeleteRequest {
            page: self.endpoint.current_page,
            key,
        })?;

        let reply = self.send(ctx, Method::DELETE, "/delete", Some(body)).await?;
        expect_key_found(reply.status)
    }

    pub async fn flush(&self, ctx: &Context) -> Result<()> {
        let body = encode(&PageRequest {
            page: self.endpoint.current_page,
        })?;

        let reply = self.send(ctx, Method::DELETE, "/flush", Some(body)).await?;
        expect_ok(reply.status, ErrorCategory::InternalError)
    }

    pub async fn ping(&self, ctx: &Context) -> Result<String> {
        let reply = self.send(ctx, Method::GET, "/ping", None).await?;
        decode_ping(&reply.body)
    }

    pub async fn health(&self, ctx: &Context) -> Result<()> {
        let reply = self
            .transport
            .send(ctx, Method::GET, &self.endpoint.host, None)
            .await?;
        expect_ok(reply.status, ErrorCategory::InternalError)
    }

    pub async fn exists(&self, ctx: &Context, key: &str) -> Result<bool> {
        match self.get_line(ctx, key).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
