//! Error kind discriminant.

use strum::{AsRefStr, Display, EnumIter};

/// The closed set of failure categories a Kyrazo call can end in.
///
/// ## Examples
///
/// ```rust
/// use kyrazo::ErrorKind;
///
/// assert_eq!(ErrorKind::RateLimit.default_code(), "RATE_LIMIT_EXCEEDED");
/// assert_eq!(ErrorKind::NotFound.default_status(), Some(404));
/// assert_eq!(ErrorKind::Network.to_string(), "Network");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum ErrorKind {
    /// Missing or invalid credential.
    Authentication,
    /// Malformed request payload or client configuration.
    Validation,
    /// Referenced resource does not exist.
    NotFound,
    /// Short-window request rate exceeded.
    RateLimit,
    /// Long-period usage quota exceeded.
    QuotaExceeded,
    /// Upstream processing failure.
    Server,
    /// No response was obtained (transport failure, timeout, cancellation).
    Network,
    /// Anything the mapper does not recognise.
    Unknown,
}

impl ErrorKind {
    /// Message used when neither the caller nor the server supplied one.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Authentication => "Invalid or missing API key",
            Self::Validation => "Invalid request payload",
            Self::NotFound => "Resource not found",
            Self::RateLimit => "Rate limit exceeded. Please slow down your requests.",
            Self::QuotaExceeded => "Monthly event limit exceeded. Please upgrade your plan.",
            Self::Server => "Internal server error",
            Self::Network => "Network request failed",
            Self::Unknown => "An unexpected error occurred",
        }
    }

    /// Machine code reported for this kind.
    pub fn default_code(self) -> &'static str {
        match self {
            Self::Authentication => "UNAUTHORIZED",
            Self::Validation => "INVALID_PAYLOAD",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimit => "RATE_LIMIT_EXCEEDED",
            Self::QuotaExceeded => "LIMIT_EXCEEDED",
            Self::Server => "INTERNAL_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// The HTTP status this kind usually arrives with.
    pub fn default_status(self) -> Option<u16> {
        match self {
            Self::Authentication => Some(401),
            Self::Validation => Some(400),
            Self::NotFound => Some(404),
            Self::RateLimit => Some(429),
            Self::QuotaExceeded => Some(403),
            Self::Server => Some(500),
            Self::Network | Self::Unknown => None,
        }
    }

    /// Returns `true` if this kind describes a fault on the caller's side.
    ///
    /// Client faults are never retried. `Unknown` is decided per status by
    /// [`KyrazoError::is_retryable`](crate::KyrazoError::is_retryable).
    pub fn is_client_fault(self) -> bool {
        matches!(
            self,
            Self::Authentication
                | Self::Validation
                | Self::NotFound
                | Self::RateLimit
                | Self::QuotaExceeded
        )
    }
}
