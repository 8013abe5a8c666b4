//! The error type returned by every Kyrazo operation.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::ErrorKind;

/// Why a [`KyrazoError::Network`] failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkCause {
    /// The transport failed before a response arrived.
    Transport,
    /// The per-attempt timeout fired.
    TimedOut,
    /// The caller's cancellation token fired.
    Cancelled,
}

/// Error returned by all client operations.
///
/// Each variant corresponds to one [`ErrorKind`] and carries only the
/// context that kind can have. Match on the variant (or on [`kind`]) rather
/// than on the message.
///
/// ## Examples
///
/// ```rust,ignore
/// use kyrazo::KyrazoError;
///
/// match client.events().publish("proj_1", &payload, Default::default()).await {
///     Ok(queued) => println!("queued {}", queued.event_id),
///     Err(KyrazoError::RateLimit { retry_after, .. }) => {
///         println!("slow down, retry in {retry_after:?}s");
///     }
///     Err(err) => eprintln!("{} ({})", err, err.code()),
/// }
/// ```
///
/// [`kind`]: KyrazoError::kind
#[derive(Debug, Error)]
pub enum KyrazoError {
    /// The API key was missing or rejected.
    #[error("{message}")]
    Authentication {
        message: String,
        request_id: Option<String>,
    },

    /// The request payload or client configuration is invalid.
    #[error("{message}")]
    Validation {
        message: String,
        /// Field-level details supplied by the server.
        details: Option<Value>,
        request_id: Option<String>,
    },

    /// The referenced resource does not exist.
    #[error("{message}")]
    NotFound {
        message: String,
        request_id: Option<String>,
    },

    /// Too many requests in the current rate window.
    #[error("{message}")]
    RateLimit {
        message: String,
        /// Seconds to wait before retrying.
        retry_after: Option<u64>,
        /// Requests left in the current window.
        remaining_requests: Option<u64>,
        request_id: Option<String>,
    },

    /// The account's longer-period usage quota is used up.
    #[error("{message}")]
    QuotaExceeded {
        message: String,
        request_id: Option<String>,
    },

    /// The API failed to process the request.
    #[error("{message}")]
    Server {
        message: String,
        /// The HTTP status the failure arrived with.
        status: u16,
        request_id: Option<String>,
    },

    /// No usable response was obtained.
    #[error("{message}")]
    Network {
        message: String,
        cause: NetworkCause,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A failure the mapper could not classify.
    #[error("{message} (HTTP {status}, code {code})")]
    Unknown {
        message: String,
        /// The machine code from the response, or `UNKNOWN_ERROR`.
        code: String,
        status: u16,
        request_id: Option<String>,
    },
}

impl KyrazoError {
    /// Creates a client-side validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
            request_id: None,
        }
    }

    /// Creates a transport failure with no underlying error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            cause: NetworkCause::Transport,
            source: None,
        }
    }

    /// Wraps a `reqwest` transport failure.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Network {
            message: format!("{}: {err}", ErrorKind::Network.default_message()),
            cause: NetworkCause::Transport,
            source: Some(err),
        }
    }

    /// The error raised when an attempt outlives its timeout.
    pub fn timed_out(after: Duration) -> Self {
        Self::Network {
            message: format!("Request timed out after {}ms", after.as_millis()),
            cause: NetworkCause::TimedOut,
            source: None,
        }
    }

    /// The error raised when the caller cancels an in-flight call.
    pub fn cancelled() -> Self {
        Self::Network {
            message: "Request was cancelled".to_string(),
            cause: NetworkCause::Cancelled,
            source: None,
        }
    }

    /// Returns the kind discriminant.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::Server { .. } => ErrorKind::Server,
            Self::Network { .. } => ErrorKind::Network,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::Validation { message, .. }
            | Self::NotFound { message, .. }
            | Self::RateLimit { message, .. }
            | Self::QuotaExceeded { message, .. }
            | Self::Server { message, .. }
            | Self::Network { message, .. }
            | Self::Unknown { message, .. } => message,
        }
    }

    /// Machine code. Fixed per kind, except `Unknown` which keeps the wire code.
    pub fn code(&self) -> &str {
        match self {
            Self::Unknown { code, .. } => code,
            other => other.kind().default_code(),
        }
    }

    /// HTTP status associated with the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Unknown { status, .. } => Some(*status),
            other => other.kind().default_status(),
        }
    }

    /// Request correlation id, when the server supplied one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Authentication { request_id, .. }
            | Self::Validation { request_id, .. }
            | Self::NotFound { request_id, .. }
            | Self::RateLimit { request_id, .. }
            | Self::QuotaExceeded { request_id, .. }
            | Self::Server { request_id, .. }
            | Self::Unknown { request_id, .. } => request_id.as_deref(),
            Self::Network { .. } => None,
        }
    }

    /// Validation details payload.
    pub fn details(&self) -> Option<&Value> {
        match self {
            Self::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Seconds to wait before retrying a rate-limited call.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Requests remaining in the current rate window.
    pub fn remaining_requests(&self) -> Option<u64> {
        match self {
            Self::RateLimit {
                remaining_requests, ..
            } => *remaining_requests,
            _ => None,
        }
    }

    /// Returns `true` if an attempt ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Network {
                cause: NetworkCause::TimedOut,
                ..
            }
        )
    }

    /// Returns `true` if the caller cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Network {
                cause: NetworkCause::Cancelled,
                ..
            }
        )
    }

    /// Returns `true` if the executor may try the call again.
    ///
    /// Server failures and transport failures are retryable. Client faults,
    /// timeouts and cancellations are not. `Unknown` is retryable only for
    /// statuses of 500 and above.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Server { .. } => true,
            Self::Network { cause, .. } => *cause == NetworkCause::Transport,
            Self::Unknown { status, .. } => *status >= 500,
            other => !other.kind().is_client_fault(),
        }
    }
}
