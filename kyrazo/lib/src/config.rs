//! Client configuration.
//!
//! A [`ClientConfig`] is built once, validated, and never changes afterwards.
//! Use [`ClientConfig::builder`] in code or [`ClientConfig::from_env`] in
//! tools and services.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::error::KyrazoError;

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.kyrazo.com";

/// Default per-attempt timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "KYRAZO_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "KYRAZO_BASE_URL";
/// Environment variable overriding the timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "KYRAZO_TIMEOUT_MS";
/// Environment variable overriding the retry count.
pub const ENV_MAX_RETRIES: &str = "KYRAZO_MAX_RETRIES";

/// Validated, immutable client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    api_key: String,
    base_url: Url,
    timeout: Duration,
    max_retries: u32,
    default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Starts a builder for the given API key.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use kyrazo::ClientConfig;
    ///
    /// let config = ClientConfig::builder("kz_live_123")
    ///     .base_url("http://localhost:4000")
    ///     .timeout(Duration::from_secs(5))
    ///     .max_retries(1)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.base_url().as_str(), "http://localhost:4000/");
    /// ```
    pub fn builder(api_key: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(api_key.into())
    }

    /// Builds a configuration with every default and the given API key.
    ///
    /// ## Errors
    ///
    /// Returns a validation error if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, KyrazoError> {
        Self::builder(api_key).build()
    }

    /// Reads configuration from `KYRAZO_*` environment variables.
    ///
    /// ## Errors
    ///
    /// Returns a validation error if `KYRAZO_API_KEY` is unset or empty, or
    /// if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, KyrazoError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, KyrazoError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_API_KEY).unwrap_or_default();
        let mut builder = Self::builder(api_key);

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            builder = builder.base_url(url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let ms = parse_env_number::<u64>(ENV_TIMEOUT_MS, &raw)?;
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            builder = builder.max_retries(parse_env_number(ENV_MAX_RETRIES, &raw)?);
        }

        builder.build()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn default_headers(&self) -> &[(String, String)] {
        &self.default_headers
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("default_headers", &self.default_headers)
            .finish()
    }
}

fn parse_env_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, KyrazoError> {
    raw.trim()
        .parse()
        .map_err(|_| KyrazoError::validation(format!("{name} must be a non-negative integer, got {raw:?}")))
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
    max_retries: u32,
    default_headers: Vec<(String, String)>,
}

impl ClientConfigBuilder {
    fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            default_headers: Vec::new(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the per-attempt timeout. Each retry gets a fresh window.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Adds a header sent with every request.
    ///
    /// Later calls with the same name (case-insensitive) win.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Validates the settings and builds the [`ClientConfig`].
    ///
    /// ## Errors
    ///
    /// Returns a validation error if:
    /// - the API key is empty or whitespace
    /// - the base URL does not parse or is not http(s)
    /// - the timeout is zero
    /// - a default header has an illegal name or value
    pub fn build(self) -> Result<ClientConfig, KyrazoError> {
        if self.api_key.trim().is_empty() {
            return Err(KyrazoError::validation(
                "apiKey is required and must be a non-empty string",
            ));
        }

        let mut base_url = Url::parse(self.base_url.trim())
            .map_err(|e| KyrazoError::validation(format!("invalid base URL {:?}: {e}", self.base_url)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(KyrazoError::validation(format!(
                "base URL must use http or https, got {:?}",
                base_url.scheme()
            )));
        }
        let trimmed = base_url.path().trim_end_matches('/').to_string();
        base_url.set_path(&trimmed);

        if self.timeout.is_zero() {
            return Err(KyrazoError::validation("timeout must be greater than zero"));
        }

        for (name, value) in &self.default_headers {
            validate_header(name, value)?;
        }

        Ok(ClientConfig {
            api_key: self.api_key,
            base_url,
            timeout: self.timeout,
            max_retries: self.max_retries,
            default_headers: self.default_headers,
        })
    }
}

/// Parses a header pair, mapping failures to validation errors.
pub(crate) fn validate_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), KyrazoError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| KyrazoError::validation(format!("invalid header name {name:?}: {e}")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| KyrazoError::validation(format!("invalid value for header {name:?}: {e}")))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("kz_test").unwrap();
        assert_eq!(config.base_url().as_str(), "https://api.kyrazo.com/");
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.max_retries(), DEFAULT_MAX_RETRIES);
        assert!(config.default_headers().is_empty());
    }

    #[test]
    fn test_empty_api_key_is_validation_error() {
        for key in ["", "   "] {
            let err = ClientConfig::new(key).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = ClientConfig::builder("k")
            .base_url("https://example.com/api/")
            .build()
            .unwrap();
        assert_eq!(config.base_url().path(), "/api");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ClientConfig::builder("k").base_url("not a url").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = ClientConfig::builder("k")
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.message().contains("http or https"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = ClientConfig::builder("k")
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_invalid_default_header_rejected() {
        let err = ClientConfig::builder("k")
            .default_header("bad header", "v")
            .build()
            .unwrap_err();
        assert!(err.message().contains("invalid header name"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::new("kz_super_secret").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("kz_super_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "kz_env"),
            (ENV_BASE_URL, "http://localhost:4000"),
            (ENV_TIMEOUT_MS, "1500"),
            (ENV_MAX_RETRIES, "0"),
        ]))
        .unwrap();
        assert_eq!(config.api_key(), "kz_env");
        assert_eq!(config.base_url().host_str(), Some("localhost"));
        assert_eq!(config.timeout(), Duration::from_millis(1500));
        assert_eq!(config.max_retries(), 0);
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_from_lookup_bad_number() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "kz_env"),
            (ENV_MAX_RETRIES, "three"),
        ]))
        .unwrap_err();
        assert!(err.message().contains(ENV_MAX_RETRIES));
    }
}
