use serde_json::Value;
use thiserror::Error;

/// Unified error type for the NetSuite client.
///
/// Every failure mode the crate can surface is a variant here, so callers
/// match on the variant (or use the [`Error::status`] / [`Error::code`]
/// accessors) instead of inspecting strings.
#[derive(Debug, Error)]
pub enum Error {
    /// The remote API answered with a non-success status, or a batch flush
    /// was rejected and its failure fanned out to every waiting entry.
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status, when the failure came from an HTTP response.
        status: Option<u16>,
        /// Stable machine-readable code, e.g. `HTTP_ERROR`.
        code: Option<String>,
        /// Raw response body, parsed as JSON when possible.
        details: Option<Value>,
    },

    /// The request exceeded its configured timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transport-level failure below the HTTP status layer (DNS, connect,
    /// TLS, malformed response). Timeouts are split out into [`Error::Timeout`].
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Client configuration failed validation; holds every problem found.
    #[error("invalid client configuration: {}", .errors.join("; "))]
    Config { errors: Vec<String> },

    /// OAuth signing failed before the request was sent.
    #[error("request signing error: {0}")]
    Signing(String),

    /// A URL could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A date string did not match the `YYYY-MM-DD` format.
    #[error("date parse error: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// A batch flush completed but the processor's result map had no entry
    /// for this key.
    #[error("no batch result for key: {key}")]
    BatchKeyMissing { key: String },

    /// A queued batch entry was dropped before its flush completed.
    #[error("batch entry dropped before completion")]
    BatchDropped,
}

impl Error {
    /// API failure constructed by the client when a response carries a
    /// non-success HTTP status.
    pub fn http_failure(status: u16, body: Value) -> Self {
        Error::Api {
            message: format!("request failed with status {status}"),
            status: Some(status),
            code: Some("HTTP_ERROR".to_string()),
            details: Some(body),
        }
    }

    /// Free-form API failure, for callers that normalize their own errors.
    pub fn api(message: impl Into<String>) -> Self {
        Error::Api {
            message: message.into(),
            status: None,
            code: None,
            details: None,
        }
    }

    /// Map a transport failure, splitting timeouts into their own variant.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Error::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }
        } else {
            Error::Http(err)
        }
    }

    /// True when this is an expected API-level failure (the remote service
    /// answered and said no), as opposed to transport or local errors.
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api { .. })
    }

    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Stable machine-readable code for the failure, if it has one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => code.as_deref(),
            Error::Timeout { .. } => Some("TIMEOUT"),
            Error::Http(_) => Some("NETWORK_ERROR"),
            Error::Config { .. } => Some("INVALID_CONFIG"),
            Error::Signing(_) => Some("SIGNING_ERROR"),
            Error::Url(_) => Some("INVALID_URL"),
            Error::Serialization(_) => Some("SERIALIZATION_ERROR"),
            Error::DateParse(_) => Some("INVALID_DATE"),
            Error::BatchKeyMissing { .. } => Some("BATCH_KEY_MISSING"),
            Error::BatchDropped => Some("BATCH_DROPPED"),
        }
    }

    /// Retry policy used by the client: client errors (4xx) are permanent,
    /// everything that reached the network and failed otherwise is worth
    /// another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Api { status, .. } => !matches!(status, Some(s) if (400..500).contains(s)),
            Error::Timeout { .. } | Error::Http(_) => true,
            _ => false,
        }
    }

    /// Owned copy for delivering one failure to several waiters.
    ///
    /// Transport errors are not cloneable, so those degrade to an
    /// [`Error::Api`] preserving message, status and code.
    pub(crate) fn to_shared(&self) -> Error {
        match self {
            Error::Api {
                message,
                status,
                code,
                details,
            } => Error::Api {
                message: message.clone(),
                status: *status,
                code: code.clone(),
                details: details.clone(),
            },
            Error::Timeout { timeout_ms } => Error::Timeout {
                timeout_ms: *timeout_ms,
            },
            Error::Config { errors } => Error::Config {
                errors: errors.clone(),
            },
            Error::Signing(msg) => Error::Signing(msg.clone()),
            Error::Url(e) => Error::Url(*e),
            Error::BatchKeyMissing { key } => Error::BatchKeyMissing { key: key.clone() },
            Error::BatchDropped => Error::BatchDropped,
            other => Error::Api {
                message: other.to_string(),
                status: other.status(),
                code: other.code().map(String::from),
                details: None,
            },
        }
    }
}
