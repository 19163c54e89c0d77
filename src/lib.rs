//! An async client for the creditdb paged key-value store
//!
//! The server speaks JSON over HTTP. Every record lives on a page; the page
//! selected on the client is attached to every request and is never
//! interpreted locally.
//!
//! # Features
//! - Construction waits for the server behind an exponential-backoff health probe
//! - Pooled HTTP/1.1 and HTTP/2 connections, plaintext or TLS
//! - Per-call deadlines and cancellation through [`Context`]
//! - Every failure classified into one of five [`ErrorCategory`] values
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use creditdb::{Client, ClientConfig, Context};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), creditdb::Error> {
//!     let client = Client::connect_with(ClientConfig::from_env()?).await?;
//!     let ctx = Context::background();
//!
//!     client.set_line(&ctx, "alice", "100").await?;
//!     for line in client.get_all_lines(&ctx).await? {
//!         println!("{} = {}", line.key, line.value);
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod backoff;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
mod protocol;
mod transport;
pub mod types;

pub use backoff::{BackoffPolicy, Clock, TokioClock};
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_HOST, DEFAULT_PAGE};
pub use context::Context;
pub use error::{Error, ErrorCategory, Result};
pub use types::{Line, Page};

pub use tokio_util::sync::CancellationToken;
