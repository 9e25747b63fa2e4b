//! Event search types and wire formats

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::page::{Pagination, ResultPage};
use crate::cache::RequestSignature;

/// Resource name for event search signatures.
pub const SEARCH_RESOURCE: &str = "events/search";

/// Resource name for single-event signatures.
pub const LOOKUP_RESOURCE: &str = "events/get";

/// An event as returned by the backend.
///
/// Fields the client does not model are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Parameters for a nearby-event search.
///
/// ```rust
/// # use eventide::SearchParams;
/// let params = SearchParams::new(40.7128, -74.0060)
///     .radius(10.0)
///     .query("jazz")
///     .categories(["music", "nightlife"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: Option<f64>,
    pub categories: Vec<String>,
    pub query: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub platforms: Vec<String>,
}

impl SearchParams {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Self::default()
        }
    }

    /// Search radius, in the backend's distance unit.
    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn date_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_date = Some(start.into());
        self.end_date = Some(end.into());
        self
    }

    /// Free-text query with surrounding whitespace removed; blank counts as absent.
    fn trimmed_query(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Cache scope of this search: every parameter except the page.
    pub fn scope(&self, page_size: u32) -> RequestSignature {
        RequestSignature::builder(SEARCH_RESOURCE)
            .param("lat", self.latitude)
            .param("lon", self.longitude)
            .opt_param("radius", self.radius)
            .list("categories", &self.categories)
            .opt_param("q", self.trimmed_query())
            .opt_param("start_date", self.start_date.as_deref())
            .opt_param("end_date", self.end_date.as_deref())
            .list("platforms", &self.platforms)
            .param("page_size", page_size)
            .build()
    }

    /// Cache signature for `page` of this search.
    pub fn signature(&self, page: u32, page_size: u32) -> RequestSignature {
        self.scope(page_size).page(page)
    }

    /// Query-string pairs for the search endpoint.
    ///
    /// Multi-valued filters are comma-joined in the order given; absent or
    /// empty filters are left out entirely.
    pub fn query_pairs(&self, page: u32, page_size: u32) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("lat", self.latitude.to_string()),
            ("lon", self.longitude.to_string()),
        ];
        if let Some(radius) = self.radius {
            pairs.push(("radius", radius.to_string()));
        }
        if !self.categories.is_empty() {
            pairs.push(("categories", self.categories.join(",")));
        }
        if let Some(q) = self.trimmed_query() {
            pairs.push(("q", q.to_string()));
        }
        if let Some(start) = &self.start_date {
            pairs.push(("start_date", start.clone()));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("end_date", end.clone()));
        }
        if !self.platforms.is_empty() {
            pairs.push(("platforms", self.platforms.join(",")));
        }
        pairs.push(("page", page.to_string()));
        pairs.push(("page_size", page_size.to_string()));
        pairs
    }
}

/// Per-platform outcome of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    #[serde(default)]
    pub searched: bool,
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Search metadata: which platforms were searched and how many hits each gave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchMetadata {
    pub sources: BTreeMap<String, SourceStatus>,
}

impl SearchMetadata {
    /// All known sources, none searched.
    pub fn unsearched<S: AsRef<str>>(known_sources: &[S]) -> Self {
        Self {
            sources: known_sources
                .iter()
                .map(|s| (s.as_ref().to_string(), SourceStatus::default()))
                .collect(),
        }
    }
}

/// Raw search response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub sources: Option<BTreeMap<String, SourceStatus>>,
}

impl SearchResponse {
    /// Normalize into a page, defaulting any missing blocks.
    ///
    /// Missing pagination becomes [`Pagination::first`]; every known source
    /// absent from `sources` is filled with an unsearched record.
    pub fn into_page<S: AsRef<str>>(
        self,
        page_size: u32,
        known_sources: &[S],
    ) -> ResultPage<Event, SearchMetadata> {
        let mut metadata = SearchMetadata::unsearched(known_sources);
        if let Some(sources) = self.sources {
            metadata.sources.extend(sources);
        }
        ResultPage {
            items: self.events,
            pagination: self
                .pagination
                .unwrap_or_else(|| Pagination::first(page_size)),
            metadata,
        }
    }
}

/// Identifier of a single event: a raw id or `externalId:platform`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId(String);

impl EventId {
    pub fn raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Composite identifier for an event imported from an external platform.
    pub fn composite(external_id: &str, platform: &str) -> Self {
        Self(format!("{external_id}:{platform}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn signature(&self) -> RequestSignature {
        RequestSignature::builder(LOOKUP_RESOURCE)
            .param("id", &self.0)
            .build()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        Self::raw(id)
    }
}
