//! Event publishing.
//!
//! Events are queued by the platform and delivered asynchronously to their
//! targets; these calls only report that the event was accepted.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::error::KyrazoError;
use crate::http::{HttpClient, RequestOptions};

/// Escapes everything in a path segment except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Delivery priority hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A delivery target for an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl EventTarget {
    /// A target addressed by URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            target_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// A target addressed by a stored target id.
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            target_id: Some(id.into()),
            ..Self::default()
        }
    }
}

/// Optional processing hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<EventPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// Body of a publish call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventPayload {
    pub webhook_id: String,
    /// Dotted `resource.action` name, e.g. `user.created`.
    pub event_type: String,
    pub payload: Value,
    pub targets: Vec<EventTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<EventMeta>,
}

/// Result of publishing one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishEventResponse {
    pub status: String,
    pub event_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default)]
    pub targets_count: Option<u32>,
    #[serde(default, rename = "queued_at")]
    pub queued_at: Option<String>,
    #[serde(default, rename = "processing_time_ms")]
    pub processing_time_ms: Option<u64>,
}

/// One entry of a batch publish result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPublishEventItem {
    pub status: String,
    pub event_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default)]
    pub targets_count: Option<u32>,
}

/// Per-call options for publishing.
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Sent as `Idempotency-Key`; the platform drops duplicates with the same key.
    pub idempotency_key: Option<String>,
    /// Extra request options (headers, timeout, cancellation).
    pub request: RequestOptions,
}

impl PublishOptions {
    pub fn idempotency_key(key: impl Into<String>) -> Self {
        Self {
            idempotency_key: Some(key.into()),
            ..Self::default()
        }
    }

    fn into_request_options(self) -> RequestOptions {
        match self.idempotency_key {
            Some(key) => self.request.idempotency_key(key),
            None => self.request,
        }
    }
}

/// Events resource, borrowed from a [`Kyrazo`](crate::Kyrazo) client.
#[derive(Debug, Clone, Copy)]
pub struct Events<'a> {
    http: &'a HttpClient,
}

impl<'a> Events<'a> {
    pub(crate) fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    /// Publishes a single event.
    ///
    /// ## Errors
    ///
    /// Returns a validation error without touching the network if
    /// `project_id` is empty; otherwise any error from the executor.
    #[instrument(skip(self, payload, options), fields(event_type = %payload.event_type))]
    pub async fn publish(
        &self,
        project_id: &str,
        payload: &PublishEventPayload,
        options: PublishOptions,
    ) -> Result<PublishEventResponse, KyrazoError> {
        let path = format!("/v1/events/{}/publish", project_segment(project_id)?);
        let response = self
            .http
            .post(&path, Some(payload), options.into_request_options())
            .await?;
        Ok(response.into_data())
    }

    /// Publishes several events in one request.
    ///
    /// ## Errors
    ///
    /// Same as [`publish`](Self::publish).
    #[instrument(skip(self, events, options), fields(batch_size = events.len()))]
    pub async fn publish_batch(
        &self,
        project_id: &str,
        events: &[PublishEventPayload],
        options: PublishOptions,
    ) -> Result<Vec<BatchPublishEventItem>, KyrazoError> {
        let path = format!("/v1/events/{}/publish/batch", project_segment(project_id)?);
        let response = self
            .http
            .post(&path, Some(events), options.into_request_options())
            .await?;
        Ok(response.into_data())
    }
}

/// Trims and escapes a project id so it always stays one path segment.
fn project_segment(project_id: &str) -> Result<String, KyrazoError> {
    let trimmed = project_id.trim();
    if trimmed.is_empty() {
        return Err(KyrazoError::validation(
            "projectId is required and must be a non-empty string",
        ));
    }
    if matches!(trimmed, "." | "..") {
        return Err(KyrazoError::validation(format!(
            "projectId {trimmed:?} is not a valid path segment"
        )));
    }
    Ok(utf8_percent_encode(trimmed, PATH_SEGMENT).to_string())
}
