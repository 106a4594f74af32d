//! Error types for Outreach.
//!
//! Library crates use [`OutreachError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Outreach operations.
#[derive(Debug, thiserror::Error)]
pub enum OutreachError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Model gateway failure that escaped the retry policy.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Input file parsing error (CSV, JSON, TOML).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Run ledger error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (empty input, mismatched resume, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OutreachError>;

impl OutreachError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the failure is a credential problem that should stop a batch.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Gateway(GatewayError::AuthError { .. }))
    }
}

// ---------------------------------------------------------------------------
// Gateway errors
// ---------------------------------------------------------------------------

/// Classified failure of a single model gateway call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The call did not complete within its timeout.
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// 5xx, 429, or a dropped connection. Worth retrying.
    #[error("transient server error (HTTP {status}): {message}")]
    TransientServerError { status: u16, message: String },

    /// 401/403. Credentials are wrong for every prospect, not just this one.
    #[error("authentication failed (HTTP {status}): {message}")]
    AuthError { status: u16, message: String },

    /// 200 response whose envelope could not be read or had no content.
    #[error("malformed gateway response: {message}")]
    MalformedResponse { message: String },

    /// Any other 4xx. The request itself is bad; repeating it will not help.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl GatewayError {
    /// Whether the retry policy may attempt the call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::TransientServerError { .. }
        )
    }

    /// Short stable name for logs and ledger rows.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::TransientServerError { .. } => "transient_server_error",
            Self::AuthError { .. } => "auth_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Final failure reported by the retry policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error} (after {attempts} attempt(s){})", exhausted_suffix(.exhausted))]
pub struct RetryFailure {
    /// The last error observed.
    pub error: GatewayError,
    /// Total attempts made, including the first.
    pub attempts: u32,
    /// True when the error was retryable but the attempt budget ran out.
    pub exhausted: bool,
}

fn exhausted_suffix(exhausted: &bool) -> &'static str {
    if *exhausted { ", retries exhausted" } else { "" }
}
