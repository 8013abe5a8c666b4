//! HTTP layer.
//!
//! [`HttpClient::execute`] is the single path every call takes: URL and
//! header construction, per-attempt timeout merged with caller cancellation,
//! bounded retry with exponential backoff, and response decoding. The verb
//! helpers (`get`, `post`, `put`, `patch`, `delete`) only shape arguments
//! into a [`RequestSpec`].
//!
//! ## Examples
//!
//! ```rust,ignore
//! use kyrazo::{ClientConfig, HttpClient, QueryParams, RequestOptions};
//!
//! let http = HttpClient::new(ClientConfig::new("kz_live_123")?)?;
//! let page = http
//!     .get::<serde_json::Value>(
//!         "/v1/sources/proj_1",
//!         QueryParams::new().with("page", 1).with("limit", 20),
//!         RequestOptions::new(),
//!     )
//!     .await?;
//! ```

pub mod backoff;
mod executor;
mod method;
mod request;
mod response;
mod verbs;

pub use executor::{HttpClient, API_KEY_HEADER, SDK_USER_AGENT};
pub use method::HttpMethod;
pub use request::{QueryParams, RequestOptions, RequestSpec, IDEMPOTENCY_KEY_HEADER};
pub use response::{ApiResponse, Pagination, PaginatedResponse, ResponseEnvelope};
