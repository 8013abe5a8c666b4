//! Per-call request description.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::HttpMethod;
use crate::error::KyrazoError;

/// Header used to make mutation calls idempotent.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Ordered query parameters.
///
/// Entries keep their insertion order. Entries without a value are kept in
/// the list but left out of the URL.
///
/// ## Examples
///
/// ```rust
/// use kyrazo::QueryParams;
///
/// let query = QueryParams::new()
///     .with("a", 1)
///     .with_opt("b", None::<u32>)
///     .with("c", "x");
/// let pairs: Vec<_> = query.iter().collect();
/// assert_eq!(pairs, vec![("a", "1"), ("c", "x")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, Option<String>)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a present value.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, Some(value.to_string()));
        self
    }

    /// Appends a value that may be absent.
    pub fn with_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.push(key, value.map(|v| v.to_string()));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.push((key.into(), value));
    }

    /// Iterates over the entries that will reach the URL, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    /// Returns `true` if no entry will reach the URL.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for QueryParams
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.push(key, value.map(|v| v.to_string()));
        }
        params
    }
}

/// Per-call overrides.
///
/// ## Examples
///
/// ```rust
/// use std::time::Duration;
/// use kyrazo::RequestOptions;
///
/// let options = RequestOptions::new()
///     .header("X-Trace", "abc")
///     .timeout(Duration::from_secs(5))
///     .idempotency_key("order-42");
/// assert_eq!(options.timeout_override(), Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
    idempotency_key: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header that overrides client defaults on name collision.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the configured per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token. Cancelling it aborts the call.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sends an `Idempotency-Key` header with the request.
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }

    pub fn idempotency(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

/// Everything the executor needs for one logical call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub(crate) method: HttpMethod,
    pub(crate) path: String,
    pub(crate) body: Option<Value>,
    pub(crate) query: QueryParams,
    pub(crate) options: RequestOptions,
}

impl RequestSpec {
    /// Creates a spec for `method` on a path relative to the base URL.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: QueryParams::default(),
            options: RequestOptions::default(),
        }
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// ## Errors
    ///
    /// Returns a validation error if `body` cannot be represented as JSON.
    pub fn body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, KyrazoError> {
        let value = serde_json::to_value(body)
            .map_err(|e| KyrazoError::validation(format!("request body is not valid JSON: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Uses an already-built JSON value as the request body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn json_body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}
