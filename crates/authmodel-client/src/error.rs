//! Error types shared across the client library.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (DNS, TLS, connect, timeout). Fatal per the
    /// error-handling policy: callers abort the run, no retry.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response from {path}: {detail}")]
    Decode { path: String, detail: String },

    /// Non-success status on an operation that requires success. The raw
    /// body is carried for the log; it is not interpreted further.
    #[error("API error on {path} (status {status}): {detail}")]
    Api {
        status: u16,
        path: String,
        detail: String,
    },

    #[error("not connected to the platform")]
    NotConnected,

    /// Caller contract violation when constructing a rule filter, e.g. a
    /// group principal combined with the every-URI scope.
    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("error reading {path}: {detail}")]
    Io { path: String, detail: String },

    #[error("header of {path} does not match expected schema: expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        path: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl ClientError {
    /// Whether this error is scoped to a single item rather than the run.
    ///
    /// Item-scoped errors are logged and the offending item skipped;
    /// everything else aborts the run.
    #[must_use]
    pub fn is_item_scoped(&self) -> bool {
        matches!(self, ClientError::Api { .. } | ClientError::InvalidRule(_))
    }
}
