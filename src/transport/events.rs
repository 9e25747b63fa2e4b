//! Event read transports: paginated search and single-event lookup.

use async_trait::async_trait;

use super::client::ApiClient;
use super::traits::QueryTransport;
use crate::cache::RequestSignature;
use crate::config::SyncConfig;
use crate::sync::CancellationToken;
use crate::types::{
    Event, EventId, LOOKUP_RESOURCE, ResultPage, SEARCH_RESOURCE, SearchMetadata, SearchParams,
};
use crate::{EventideError, Result};

/// Nearby-event search.
pub struct EventSearch {
    client: ApiClient,
    page_size: u32,
    known_sources: Vec<String>,
}

impl EventSearch {
    pub fn new(client: ApiClient, config: &SyncConfig) -> Self {
        Self {
            client,
            page_size: config.page_size,
            known_sources: config.known_sources.clone(),
        }
    }
}

#[async_trait]
impl QueryTransport for EventSearch {
    type Params = SearchParams;
    type Item = Event;
    type Metadata = SearchMetadata;

    fn resource(&self) -> &str {
        SEARCH_RESOURCE
    }

    fn scope(&self, params: &SearchParams) -> RequestSignature {
        params.scope(self.page_size)
    }

    async fn fetch(
        &self,
        params: &SearchParams,
        page: u32,
        token: &CancellationToken,
    ) -> Result<ResultPage<Event, SearchMetadata>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(EventideError::Cancelled),
            response = self.client.search_events(params, page, self.page_size) => {
                Ok(response?.into_page(self.page_size, &self.known_sources))
            }
        }
    }
}

/// Single-event lookup by raw or composite id.
pub struct EventLookup {
    client: ApiClient,
}

impl EventLookup {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryTransport for EventLookup {
    type Params = EventId;
    type Item = Event;
    type Metadata = ();

    fn resource(&self) -> &str {
        LOOKUP_RESOURCE
    }

    fn scope(&self, id: &EventId) -> RequestSignature {
        id.signature()
    }

    async fn fetch(&self, id: &EventId, _page: u32, token: &CancellationToken) -> Result<ResultPage<Event>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(EventideError::Cancelled),
            event = self.client.get_event(id) => Ok(ResultPage::single(event?)),
        }
    }
}
