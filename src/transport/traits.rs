//! Transport traits consumed by the coordinators.
//!
//! A coordinator never talks HTTP itself. It drives a transport that knows
//! how to name a request (its signature) and how to perform it:
//!
//! - [`QueryTransport`] - paginated reads for the query coordinator
//! - [`MutationTransport`] - writes for the optimistic mutation coordinator
//!
//! # Cancellation
//!
//! Reads receive the [`CancellationToken`] of their operation. Transports
//! should stop early once [`CancellationToken::cancelled`] resolves, but the
//! coordinator never relies on it: a response whose token is no longer
//! current is discarded however it arrives.

use async_trait::async_trait;

use crate::Result;
use crate::cache::RequestSignature;
use crate::sync::CancellationToken;
use crate::types::ResultPage;

/// A paginated read.
#[async_trait]
pub trait QueryTransport: Send + Sync + 'static {
    /// Parameters that select what to read.
    type Params: Clone + Send + Sync + 'static;
    /// Row type of a page.
    type Item: Clone + Send + Sync + 'static;
    /// Per-page metadata (e.g. which sources were searched).
    type Metadata: Clone + Default + Send + Sync + 'static;

    /// Resource name for logging and metrics.
    fn resource(&self) -> &str;

    /// Cache scope of `params`, shared by all of its pages.
    fn scope(&self, params: &Self::Params) -> RequestSignature;

    /// Cache signature for `page` of `params`.
    fn signature(&self, params: &Self::Params, page: u32) -> RequestSignature {
        self.scope(params).page(page)
    }

    /// Fetch one page.
    async fn fetch(
        &self,
        params: &Self::Params,
        page: u32,
        token: &CancellationToken,
    ) -> Result<ResultPage<Self::Item, Self::Metadata>>;
}

/// A write whose success yields the canonical record.
#[async_trait]
pub trait MutationTransport: Send + Sync + 'static {
    /// The record the backend creates.
    type Output: Clone + Send + Sync + 'static;

    /// Send trimmed, non-empty content.
    async fn send(&self, content: &str) -> Result<Self::Output>;
}
