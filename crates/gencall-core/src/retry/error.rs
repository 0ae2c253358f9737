//! Error types for a single attempt and for a whole logical call.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::policy::ErrorKind;

/// What one transport attempt produced when it did not yield a response.
/// Kept separate from `CallError` so the retry loop can classify and decide
/// before anything is surfaced to the caller.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Curl reported a transport-level failure (connect, DNS, timeout, ...).
    #[error("transport: {0}")]
    Curl(#[from] curl::Error),
    /// The service answered with a non-2xx status.
    #[error("HTTP {status}{}", message_suffix(.message))]
    Http {
        status: u32,
        /// Parsed `retry-after` header, if the response carried one.
        retry_after: Option<Duration>,
        /// `error.message` from the JSON error body, if it decoded.
        message: Option<String>,
    },
    /// 2xx response whose body was not a Messages API response.
    #[error("undecodable response body: {0}")]
    Decode(String),
    /// The request could not be serialized.
    #[error("request encoding failed: {0}")]
    Encode(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl TransportError {
    /// Shorthand for an HTTP failure without headers or body.
    pub fn http(status: u32) -> Self {
        TransportError::Http {
            status,
            retry_after: None,
            message: None,
        }
    }

    /// Server-supplied wait hint carried by this failure.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransportError::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u32> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal failure of a logical call, after all retries were spent
/// (or skipped, for client errors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallError {
    kind: ErrorKind,
    attempts: u32,
    status: Option<u32>,
    detail: String,
    queued: bool,
}

impl CallError {
    pub(crate) fn new(
        kind: ErrorKind,
        attempts: u32,
        error: &TransportError,
        queued: bool,
    ) -> Self {
        Self {
            kind,
            attempts,
            status: error.status(),
            detail: error.to_string(),
            queued,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Number of transport attempts made for the request.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// HTTP status of the last attempt, if the service answered at all.
    pub fn status(&self) -> Option<u32> {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// True when the request was moved to the deferral queue and will be
    /// retried by a later call.
    pub fn is_queued(&self) -> bool {
        self.queued
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} attempt(s): {}",
            self.kind, self.attempts, self.detail
        )?;
        if self.queued {
            write!(f, " (request queued for a later call)")?;
        }
        Ok(())
    }
}

impl std::error::Error for CallError {}
