//! Request execution with timeout, cancellation, retry and tracing.
//!
//! This module provides [`HttpClient`], which turns a [`RequestSpec`] into
//! exactly one outcome: a [`ResponseEnvelope`] or a [`KyrazoError`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn, Span};
use url::Url;

use super::backoff::backoff_delay;
use super::request::IDEMPOTENCY_KEY_HEADER;
use super::{QueryParams, RequestOptions, RequestSpec, ResponseEnvelope};
use crate::cancel::{CancelReason, CancelSignal};
use crate::config::{validate_header, ClientConfig};
use crate::error::{error_from_response, KyrazoError, REQUEST_ID_HEADER};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// User agent sent with every request.
pub const SDK_USER_AGENT: &str = concat!("kyrazo-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Code reported when a success body does not decode into the requested type.
const INVALID_RESPONSE_CODE: &str = "INVALID_RESPONSE";

/// A response that made it back over the wire, whatever its status.
struct RawResponse {
    status: u16,
    headers: HeaderMap,
    body: Value,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn into_envelope<T: DeserializeOwned>(self) -> Result<ResponseEnvelope<T>, KyrazoError> {
        let data = serde_json::from_value(self.body).map_err(|e| KyrazoError::Unknown {
            message: format!("response body did not match the expected shape: {e}"),
            code: INVALID_RESPONSE_CODE.to_string(),
            status: self.status,
            request_id: header_str(&self.headers, REQUEST_ID_HEADER),
        })?;
        Ok(ResponseEnvelope::new(data, self.status, self.headers))
    }

    fn into_error(self) -> KyrazoError {
        let request_id = header_str(&self.headers, REQUEST_ID_HEADER);
        error_from_response(self.status, &self.body, request_id, &self.headers)
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// How a single attempt ended when it did not produce a response.
enum Interrupted {
    Signal(CancelReason),
    Transport(KyrazoError),
}

/// Async HTTP client for the Kyrazo API.
///
/// Wraps a pooled `reqwest::Client`. Cloning is cheap and clones share the
/// pool; calls never share any other state.
///
/// ## Examples
///
/// ```rust,ignore
/// use kyrazo::{ClientConfig, HttpClient, HttpMethod, RequestSpec};
///
/// let http = HttpClient::new(ClientConfig::new("kz_live_123")?)?;
/// let spec = RequestSpec::new(HttpMethod::Get, "/v1/sources/proj_1");
/// let response = http.execute::<serde_json::Value>(spec).await?;
/// println!("{} -> {}", response.status(), response.data());
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
    base_headers: HeaderMap,
}

impl HttpClient {
    /// Creates a client from a validated configuration.
    ///
    /// ## Errors
    ///
    /// Returns a network error if the underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, KyrazoError> {
        let base_headers = base_headers(&config)?;
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .map_err(KyrazoError::transport)?;

        Ok(Self {
            client,
            config: Arc::new(config),
            base_headers,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Executes one logical call, retrying transient failures.
    ///
    /// Up to `max_retries + 1` attempts are made. Each attempt races the
    /// transport against a fresh timeout and the caller's cancellation
    /// token. Server and transport failures are retried after
    /// `100ms * 2^attempt`; everything else ends the call at once.
    ///
    /// ## Errors
    ///
    /// - [`KyrazoError::Validation`] for headers or URLs that cannot be built,
    ///   or a zero per-call timeout
    /// - [`KyrazoError::Network`] for transport failures, timeouts and cancellation
    /// - the mapped kind for any non-2xx response
    /// - [`KyrazoError::Unknown`] with code `INVALID_RESPONSE` when a 2xx
    ///   body does not decode into `T`
    #[instrument(
        name = "kyrazo_request",
        skip(self, spec),
        fields(
            http.method = %spec.method,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            http.attempts = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    pub async fn execute<T>(&self, spec: RequestSpec) -> Result<ResponseEnvelope<T>, KyrazoError>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(&spec.path, &spec.query)?;
        Span::current().record("http.url", url.as_str());

        let headers = self.build_headers(&spec.options)?;
        let body = spec
            .body
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| KyrazoError::validation(format!("request body is not valid JSON: {e}")))?;
        let timeout = spec
            .options
            .timeout_override()
            .unwrap_or_else(|| self.config.timeout());
        if timeout.is_zero() {
            return Err(KyrazoError::validation("timeout must be greater than zero"));
        }
        let max_retries = self.config.max_retries();

        let mut last_error: Option<KyrazoError> = None;

        for attempt in 0..=max_retries {
            Span::current().record("http.attempts", attempt + 1);
            debug!(attempt, "sending request");

            let mut signal = CancelSignal::new();
            if let Some(token) = spec.options.cancellation() {
                signal = signal.with_token(token.clone());
            }
            let signal = signal.with_timeout(timeout);

            let outcome = tokio::select! {
                biased;
                reason = signal.fired() => Err(Interrupted::Signal(reason)),
                result = self.send_once(&spec, &url, &headers, body.as_deref()) => {
                    result.map_err(Interrupted::Transport)
                }
            };

            let error = match outcome {
                Ok(raw) => {
                    Span::current().record("http.status_code", raw.status);
                    if raw.is_success() {
                        Span::current().record("otel.status_code", "OK");
                        return raw.into_envelope();
                    }
                    raw.into_error()
                }
                Err(Interrupted::Signal(CancelReason::Cancelled)) => {
                    Span::current().record("otel.status_code", "ERROR");
                    debug!(attempt, "request cancelled by caller");
                    return Err(KyrazoError::cancelled());
                }
                Err(Interrupted::Signal(CancelReason::TimedOut(after))) => {
                    Span::current().record("otel.status_code", "ERROR");
                    warn!(attempt, timeout_ms = after.as_millis() as u64, "request timed out");
                    return Err(KyrazoError::timed_out(after));
                }
                Err(Interrupted::Transport(err)) => err,
            };

            if !error.is_retryable() {
                Span::current().record("otel.status_code", "UNSET");
                return Err(error);
            }

            if attempt < max_retries {
                let delay = backoff_delay(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    kind = %error.kind(),
                    error = %error,
                    "retrying request"
                );
                if self.wait(delay, spec.options.cancellation()).await.is_err() {
                    Span::current().record("otel.status_code", "ERROR");
                    return Err(KyrazoError::cancelled());
                }
            }
            last_error = Some(error);
        }

        Span::current().record("otel.status_code", "ERROR");
        Err(last_error.unwrap_or_else(|| KyrazoError::network("Request failed after retries")))
    }

    /// Issues a single transport request and reads the whole body.
    async fn send_once(
        &self,
        spec: &RequestSpec,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&[u8]>,
    ) -> Result<RawResponse, KyrazoError> {
        let mut request = self
            .client
            .request(spec.method.into(), url.clone())
            .headers(headers.clone());
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        let response = request.send().await.map_err(KyrazoError::transport)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let is_json = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        let text = response.text().await.map_err(KyrazoError::transport)?;

        Ok(RawResponse {
            status,
            headers,
            body: decode_body(text, is_json),
        })
    }

    /// Sleeps for the backoff delay unless the caller cancels first.
    async fn wait(
        &self,
        delay: Duration,
        cancel: Option<&tokio_util::sync::CancellationToken>,
    ) -> Result<(), CancelReason> {
        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(CancelReason::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    /// Resolves `path` against the base URL and appends present query values.
    fn build_url(&self, path: &str, query: &QueryParams) -> Result<Url, KyrazoError> {
        let mut url = self
            .config
            .base_url()
            .join(path)
            .map_err(|e| KyrazoError::validation(format!("invalid request path {path:?}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.iter() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Layers per-call headers over the client's base headers.
    fn build_headers(&self, options: &RequestOptions) -> Result<HeaderMap, KyrazoError> {
        let mut headers = self.base_headers.clone();
        for (name, value) in options.headers() {
            let (name, value) = validate_header(name, value)?;
            headers.insert(name, value);
        }
        if let Some(key) = options.idempotency() {
            let (name, value) = validate_header(IDEMPOTENCY_KEY_HEADER, key)?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// Protocol headers, API key, user agent, then configured defaults.
fn base_headers(config: &ClientConfig) -> Result<HeaderMap, KyrazoError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut api_key = HeaderValue::from_str(config.api_key())
        .map_err(|_| KyrazoError::validation("apiKey contains characters not allowed in a header"))?;
    api_key.set_sensitive(true);
    headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);
    headers.insert(USER_AGENT, HeaderValue::from_static(SDK_USER_AGENT));

    for (name, value) in config.default_headers() {
        let (name, value) = validate_header(name, value)?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// JSON bodies are parsed (empty means `null`); everything else stays text.
fn decode_body(text: String, is_json: bool) -> Value {
    if !is_json {
        return Value::String(text);
    }
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
