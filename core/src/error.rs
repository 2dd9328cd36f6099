//! Error types for the ENF client.
//!
//! # Design
//! `ApiError` is what the remote API (or a failed round trip) reported: it
//! always carries the HTTP status, `0` when no response was received. The
//! crate-level `Error` separates that from failures the caller must treat
//! differently: configuration problems raised before any I/O, cancellation,
//! undecodable success bodies and empty result sets.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;

pub(crate) const TRANSPORT_FAILURE_MESSAGE: &str = "Unable to create api request";

const UNKNOWN_ERROR_MESSAGE: &str =
    "UNKNOWN_ERROR: server did not respond with properly formatted error message.";

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid client configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// A 200/201 response whose body does not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// A singular endpoint answered with an empty `data` array.
    #[error("response envelope contained no data")]
    EmptyResult,

    #[error("failed to serialize request body: {0}")]
    Serialization(#[source] serde_json::Error),
}

impl Error {
    /// HTTP status of an API error. `Some(0)` means the request never got a
    /// response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status()),
            _ => None,
        }
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }
}

/// `{"error": {"code": ..., "text": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodeError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub text: String,
}

/// `{"xiam_error": {"reason": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReasonError {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<CodeError>,
    #[serde(default)]
    xiam_error: Option<ReasonError>,
}

/// An error reported by the ENF API, or a request that produced no response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: u16,
    code_error: Option<CodeError>,
    reason_error: Option<ReasonError>,
    message: Option<String>,
}

impl ApiError {
    /// An error with nothing but a status; renders as `UNKNOWN_ERROR`.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            code_error: None,
            reason_error: None,
            message: None,
        }
    }

    pub fn with_code(status: u16, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            code_error: Some(CodeError {
                code: code.into(),
                text: text.into(),
            }),
            ..Self::new(status)
        }
    }

    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::new(status)
        }
    }

    /// The request could not be completed: no status, fixed message.
    pub fn transport() -> Self {
        Self::with_message(0, TRANSPORT_FAILURE_MESSAGE)
    }

    /// Parse an error body in either of the two shapes the API uses.
    pub(crate) fn from_body(status: u16, body: &str) -> Result<Self, serde_json::Error> {
        let parsed: ErrorBody = serde_json::from_str(body)?;
        Ok(Self {
            code_error: parsed.error,
            reason_error: parsed.xiam_error,
            ..Self::new(status)
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> Option<&str> {
        self.code_error.as_ref().map(|e| e.code.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.code_error.as_ref().map(|e| e.text.as_str())
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason_error.as_ref().map(|e| e.reason.as_str())
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_transport(&self) -> bool {
        self.status == 0
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(CodeError { code, text }) = &self.code_error {
            write!(f, "{}: {}", code.to_uppercase(), text)
        } else if let Some(ReasonError { reason }) = &self.reason_error {
            f.write_str(reason)
        } else if let Some(message) = &self.message {
            f.write_str(message)
        } else {
            f.write_str(UNKNOWN_ERROR_MESSAGE)
        }
    }
}

impl std::error::Error for ApiError {}
