//! Per-call deadline and cancellation

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorCategory, Result};

/// Deadline and cancellation signal supplied by the caller of an operation
///
/// When the deadline passes the operation fails with
/// [`ErrorCategory::Timeout`]; when the token is cancelled it fails with
/// [`ErrorCategory::InternalError`]. Either way the in-flight request is
/// dropped and its connection is not returned to the pool.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl Context {
    /// A context that never times out and is never cancelled
    pub fn background() -> Self {
        Self::default()
    }

    /// A context whose deadline is `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context with an absolute deadline
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token, replacing the context's own
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token that cancels every call made with this context
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every call made with this context
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drive `fut` until it completes, the deadline passes, or the token fires
    pub(crate) async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::new("request cancelled", ErrorCategory::InternalError)),
            _ = deadline => Err(Error::with_detail(ErrorCategory::Timeout, "deadline exceeded")),
            out = fut => out,
        }
    }
}
