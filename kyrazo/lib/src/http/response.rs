//! Response envelopes.
//!
//! [`ResponseEnvelope`] is what the executor returns for every successful
//! call. [`ApiResponse`] and [`PaginatedResponse`] describe the two body
//! shapes the API uses; decode into them when the raw body is not enough.

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// A successful response: decoded body plus status and headers.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope<T> {
    data: T,
    status: u16,
    headers: HeaderMap,
}

impl<T> ResponseEnvelope<T> {
    pub(crate) fn new(data: T, status: u16, headers: HeaderMap) -> Self {
        Self {
            data,
            status,
            headers,
        }
    }

    /// The decoded body.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the envelope and returns the decoded body.
    pub fn into_data(self) -> T {
        self.data
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Looks up a response header by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Transforms the body, keeping status and headers.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        ResponseEnvelope {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
        }
    }
}

/// Single-item success envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: T,
}

/// Paginated success envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub pagination: Pagination,
    pub data: Vec<T>,
}

/// Pagination block of a [`PaginatedResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}
