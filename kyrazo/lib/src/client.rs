//! Top-level client.

use crate::config::ClientConfig;
use crate::error::KyrazoError;
use crate::http::HttpClient;
use crate::resources::Events;

/// Entry point to the Kyrazo API.
///
/// ## Examples
///
/// ```rust,ignore
/// use kyrazo::{Kyrazo, PublishEventPayload, EventTarget, PublishOptions};
///
/// let kyrazo = Kyrazo::with_api_key("kz_live_123")?;
/// let queued = kyrazo
///     .events()
///     .publish(
///         "proj_123",
///         &PublishEventPayload {
///             webhook_id: "68c674dd3b96f77d9426a93b".into(),
///             event_type: "user.created".into(),
///             payload: serde_json::json!({ "userId": "u_123" }),
///             targets: vec![EventTarget::url("https://example.com/webhook")],
///             meta: None,
///         },
///         PublishOptions::default(),
///     )
///     .await?;
/// println!("queued {}", queued.event_id);
/// ```
#[derive(Debug, Clone)]
pub struct Kyrazo {
    http: HttpClient,
}

impl Kyrazo {
    /// Creates a client from a validated configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, KyrazoError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    /// Creates a client with default settings.
    ///
    /// ## Errors
    ///
    /// Returns a validation error if `api_key` is empty.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, KyrazoError> {
        Self::new(ClientConfig::new(api_key)?)
    }

    /// Creates a client from `KYRAZO_*` environment variables.
    ///
    /// ## Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, KyrazoError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        self.http.config()
    }

    /// The underlying executor, for endpoints without a typed wrapper.
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Event publishing.
    pub fn events(&self) -> Events<'_> {
        Events::new(&self.http)
    }
}
