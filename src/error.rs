//! Error types for the creditdb client

use std::fmt;

use hyper::StatusCode;
use thiserror::Error;

/// The fixed set of failure kinds every client operation resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Requested key or resource is absent
    NotFound,
    /// Malformed input, or input rejected by the remote store
    BadRequest,
    /// The caller's deadline elapsed before the operation completed
    Timeout,
    /// The remote store is unreachable or overloaded
    ServiceUnavailable,
    /// Local marshaling or transport failure, or an unexpected response shape
    InternalError,
}

impl ErrorCategory {
    /// Status code reported for this category
    #[inline]
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::Timeout => StatusCode::REQUEST_TIMEOUT,
            ErrorCategory::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message used when no more specific diagnostic is available
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "resource not found",
            ErrorCategory::BadRequest => "bad request",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::ServiceUnavailable => "service unavailable",
            ErrorCategory::InternalError => "internal server error",
        }
    }

    /// Stable name of the category
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::NotFound => "NotFound",
            ErrorCategory::BadRequest => "BadRequest",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::ServiceUnavailable => "ServiceUnavailable",
            ErrorCategory::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error returned by a creditdb operation
///
/// Only [`Error::category`] carries programmatic meaning; the message is
/// diagnostic text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Error {
    message: String,
    category: ErrorCategory,
}

impl Error {
    /// Create an error with an explicit message
    pub fn new(message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            message: message.into(),
            category,
        }
    }

    /// Create an error whose message is the category default followed by `detail`
    pub fn with_detail(category: ErrorCategory, detail: impl fmt::Display) -> Self {
        Self::new(format!("{}: {}", category.default_message(), detail), category)
    }

    /// `NotFound` with the default message
    pub fn not_found() -> Self {
        ErrorCategory::NotFound.into()
    }

    /// `BadRequest` with the default message
    pub fn bad_request() -> Self {
        ErrorCategory::BadRequest.into()
    }

    /// `Timeout` with the default message
    pub fn timeout() -> Self {
        ErrorCategory::Timeout.into()
    }

    /// `ServiceUnavailable` with the default message
    pub fn service_unavailable() -> Self {
        ErrorCategory::ServiceUnavailable.into()
    }

    /// `InternalError` with the default message
    pub fn internal() -> Self {
        ErrorCategory::InternalError.into()
    }

    pub(crate) fn internal_with(detail: impl fmt::Display) -> Self {
        Self::with_detail(ErrorCategory::InternalError, detail)
    }

    pub(crate) fn bad_request_with(detail: impl fmt::Display) -> Self {
        Self::with_detail(ErrorCategory::BadRequest, detail)
    }

    /// The category of this error
    #[inline]
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Diagnostic message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status code mapped from the category
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.category.status_code()
    }

    /// Returns true if the requested key or resource was absent
    pub fn is_not_found(&self) -> bool {
        self.category == ErrorCategory::NotFound
    }
}

impl From<ErrorCategory> for Error {
    fn from(category: ErrorCategory) -> Self {
        Self::new(category.default_message(), category)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::internal_with(format_args!("JSON error: {}", err))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
