//! HTTP client for the events backend.
//!
//! Thin wrapper over `reqwest` covering the three contracts the coordinators
//! need: event search, single-event lookup and message send. Every non-2xx
//! response is classified by [`classify_status`]; a missing or malformed
//! error body never turns into a parse error.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use tracing::{debug, instrument};

use crate::config::SyncConfig;
use crate::error::{ErrorBody, classify_status};
use crate::types::{
    ChatMessage, Event, EventId, NewMessage, SearchParams, SearchResponse, WriteErrorBody,
};
use crate::{EventideError, Result};

/// Fallback message when a failed send carries no usable error body.
const SEND_FAILED: &str = "Failed to send message";

/// Client for the events backend.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ApiClient {
    /// Create a client from configuration.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        config.validate()?;
        let mut client = Self::with_base_url(&config.base_url, config.request_timeout_duration())?;
        client.api_key = config.api_key.clone();
        Ok(client)
    }

    /// Create a client for `base_url` (useful for testing with wiremock).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| EventideError::Configuration(format!("Invalid base URL: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EventideError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: None,
        })
    }

    /// Set the bearer credential.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Search for events near a location.
    #[instrument(skip(self, params))]
    pub async fn search_events(
        &self,
        params: &SearchParams,
        page: u32,
        page_size: u32,
    ) -> Result<SearchResponse> {
        let url = self.endpoint(&["events", "search"])?;
        let request = self
            .http
            .get(url)
            .query(&params.query_pairs(page, page_size));

        let response = self.send(request).await?;
        let response = Self::check_read(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch a single event by raw or composite id.
    ///
    /// The id is encoded as one path segment, so `abc/def` cannot escape it.
    #[instrument(skip(self, id), fields(id = %id))]
    pub async fn get_event(&self, id: &EventId) -> Result<Event> {
        let url = self.endpoint(&["events", id.as_str()])?;
        let response = self.send(self.http.get(url)).await?;
        let response = Self::check_read(response).await?;
        Ok(response.json().await?)
    }

    /// Post a chat message and return the stored record.
    #[instrument(skip(self, message), fields(conversation_id = message.conversation_id))]
    pub async fn send_message(&self, message: &NewMessage<'_>) -> Result<ChatMessage> {
        let url = self.endpoint(&["messages"])?;
        let response = self.send(self.http.post(url).json(message)).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        // The write path reports `{error}`; tolerate an empty or broken body.
        let bytes = response.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<WriteErrorBody>(&bytes)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| SEND_FAILED.to_string());
        let body = ErrorBody {
            error: Some(message),
            details: None,
        };
        Err(classify_status(status.as_u16(), Some(&body), None))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EventideError::Configuration("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };
        request
            .send()
            .await
            .map_err(|e| EventideError::Network(e.to_string()))
    }

    /// Pass successful responses through, classify the rest.
    async fn check_read(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);
        let bytes = response.bytes().await.unwrap_or_default();
        let body = ErrorBody::parse(&bytes);
        debug!(status = status.as_u16(), parsed_body = body.is_some(), "request failed");

        Err(classify_status(status.as_u16(), body.as_ref(), retry_after))
    }
}
