//! Maps failed HTTP responses onto [`KyrazoError`].

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{ErrorKind, KyrazoError};

/// Response header carrying the request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response header carrying the requests left in the rate window.
const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Error envelope returned by the API on failure.
///
/// ```json
/// { "success": false, "error": { "code": "NOT_FOUND", "message": "..." } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, deserialize_with = "lenient_flag")]
    pub success: bool,
    pub error: ErrorDetail,
}

/// The `error` object inside an [`ErrorResponse`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    #[serde(default, deserialize_with = "lenient_text")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub retry_after: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub remaining_requests: Option<u64>,
}

/// Accepts strings and numbers (rendered as text); anything else is `None`.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(Value::Bool(true))))
}

/// Accepts integers, non-negative floats and numeric strings; anything else is `None`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(count_from_value))
}

fn count_from_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => parse_count(s),
        _ => None,
    }
}

fn parse_count(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

fn header_count(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_count)
}

/// Builds the error for a response whose status is outside the success range.
///
/// The machine code in the body wins over the status; the status table is
/// consulted only when the code is absent or unrecognised. Anything left
/// becomes [`KyrazoError::Unknown`].
///
/// ## Arguments
///
/// * `status` - The HTTP status code.
/// * `body` - The decoded response body (JSON, or a string for text bodies).
/// * `request_id` - Correlation id taken from the response headers, used when
///   the body does not carry its own.
/// * `headers` - Response headers, consulted for rate-limit hints.
pub fn error_from_response(
    status: u16,
    body: &Value,
    request_id: Option<String>,
    headers: &HeaderMap,
) -> KyrazoError {
    let detail = ErrorResponse::deserialize(body)
        .map(|envelope| envelope.error)
        .unwrap_or_default();

    let message = detail
        .message
        .clone()
        .unwrap_or_else(|| ErrorKind::Unknown.default_message().to_string());
    let request_id = detail.request_id.clone().or(request_id);

    let kind = detail
        .code
        .as_deref()
        .and_then(kind_for_code)
        .or_else(|| kind_for_status(status));

    match kind {
        Some(ErrorKind::Authentication) => KyrazoError::Authentication {
            message,
            request_id,
        },
        Some(ErrorKind::Validation) => KyrazoError::Validation {
            message,
            details: detail.details,
            request_id,
        },
        Some(ErrorKind::NotFound) => KyrazoError::NotFound {
            message,
            request_id,
        },
        Some(ErrorKind::RateLimit) => KyrazoError::RateLimit {
            message,
            retry_after: detail
                .retry_after
                .or_else(|| header_count(headers, RETRY_AFTER.as_str())),
            remaining_requests: detail
                .remaining_requests
                .or_else(|| header_count(headers, RATE_LIMIT_REMAINING_HEADER)),
            request_id,
        },
        Some(ErrorKind::QuotaExceeded) => KyrazoError::QuotaExceeded {
            message,
            request_id,
        },
        Some(ErrorKind::Server) => KyrazoError::Server {
            message,
            status,
            request_id,
        },
        Some(ErrorKind::Network) | Some(ErrorKind::Unknown) | None => KyrazoError::Unknown {
            message,
            code: detail
                .code
                .unwrap_or_else(|| ErrorKind::Unknown.default_code().to_string()),
            status,
            request_id,
        },
    }
}

fn kind_for_code(code: &str) -> Option<ErrorKind> {
    match code {
        "UNAUTHORIZED" => Some(ErrorKind::Authentication),
        "RATE_LIMIT_EXCEEDED" => Some(ErrorKind::RateLimit),
        "RATE_LIMIT_KEY_MISSING" | "INVALID_PAYLOAD" | "BATCH_TOO_LARGE" => {
            Some(ErrorKind::Validation)
        }
        "LIMIT_EXCEEDED" => Some(ErrorKind::QuotaExceeded),
        "NOT_FOUND" => Some(ErrorKind::NotFound),
        "PUBLISH_EVENT_FAILED" | "INTERNAL_ERROR" => Some(ErrorKind::Server),
        _ => None,
    }
}

fn kind_for_status(status: u16) -> Option<ErrorKind> {
    match status {
        400 => Some(ErrorKind::Validation),
        401 => Some(ErrorKind::Authentication),
        403 => Some(ErrorKind::QuotaExceeded),
        404 => Some(ErrorKind::NotFound),
        429 => Some(ErrorKind::RateLimit),
        500 | 502 | 503 | 504 => Some(ErrorKind::Server),
        _ => None,
    }
}
