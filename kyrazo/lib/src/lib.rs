//! Client library for the Kyrazo webhook delivery API.
//!
//! The crate wraps the REST API in typed, retrying calls:
//!
//! - **Executor**: [`HttpClient::execute`] builds the URL and headers, races
//!   every attempt against a per-attempt timeout and the caller's
//!   cancellation token, and retries server and network failures with
//!   exponential backoff
//! - **Error taxonomy**: every failure is a [`KyrazoError`] of one
//!   [`ErrorKind`], mapped from the response's machine code or status
//! - **Verb helpers**: `get`/`post`/`put`/`patch`/`delete` on [`HttpClient`]
//! - **Resources**: [`Kyrazo::events`] publishes events
//!
//! ## Example
//!
//! ```rust,ignore
//! use kyrazo::{ClientConfig, Kyrazo, RequestOptions};
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder("kz_live_123")
//!     .timeout(Duration::from_secs(10))
//!     .max_retries(2)
//!     .build()?;
//! let kyrazo = Kyrazo::new(config)?;
//!
//! let sources = kyrazo
//!     .http()
//!     .get::<serde_json::Value>("/v1/sources/proj_1", Default::default(), RequestOptions::new())
//!     .await?;
//! ```

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resources;

// Re-exports for convenience
pub use cancel::{CancelReason, CancelSignal};
pub use client::Kyrazo;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ErrorKind, KyrazoError, NetworkCause};
pub use http::{
    ApiResponse, HttpClient, HttpMethod, PaginatedResponse, Pagination, QueryParams,
    RequestOptions, RequestSpec, ResponseEnvelope,
};
pub use resources::events::{
    BatchPublishEventItem, EventMeta, EventPriority, EventTarget, PublishEventPayload,
    PublishEventResponse, PublishOptions,
};
pub use tokio_util::sync::CancellationToken;
