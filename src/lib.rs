//! Eventide - client-side data synchronization for event search and chat
//!
//! This crate keeps a client's visible state in step with an events backend.
//! Reads go through a [`QueryCoordinator`]: parameter changes are debounced,
//! results are cached by a canonical [`RequestSignature`] with a TTL,
//! superseded requests are cancelled so a stale response can never overwrite
//! newer state, and pages are merged for "load more". Writes go through a
//! [`MutationCoordinator`], which shows an optimistic placeholder at once and
//! lets the user retry or delete it if the send fails.
//!
//! # Search Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use eventide::cache::CacheStore;
//! use eventide::transport::{ApiClient, EventSearch};
//! use eventide::{QueryCoordinator, QueryStatus, SearchParams, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> eventide::Result<()> {
//!     let config = SyncConfig::load(None)?;
//!     let client = ApiClient::new(&config)?;
//!     let cache = Arc::new(CacheStore::new(&config.cache_config()));
//!
//!     let search = QueryCoordinator::new(
//!         Arc::new(EventSearch::new(client, &config)),
//!         cache,
//!         config.query_options(),
//!     );
//!     search.set_params(SearchParams::new(40.7128, -74.0060).query("jazz"));
//!
//!     let mut updates = search.subscribe();
//!     let _ = updates
//!         .wait_for(|s| matches!(s.status, QueryStatus::Succeeded | QueryStatus::Failed))
//!         .await;
//!
//!     for event in search.state().items {
//!         println!("{}", event.title);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Chat Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use eventide::transport::{ApiClient, MessageSender};
//! use eventide::{MutationCoordinator, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> eventide::Result<()> {
//!     let client = ApiClient::new(&SyncConfig::default())?;
//!     let chat = MutationCoordinator::builder(Arc::new(MessageSender::new(client, "conv-1", "user-1")))
//!         .on_success(|message| println!("sent {}", message.id))
//!         .on_error(|error| eprintln!("failed: {error}"))
//!         .build();
//!
//!     if let Some(send) = chat.submit("See you there!") {
//!         send.settled().await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod sync;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheStore, RequestSignature};
pub use config::SyncConfig;
pub use error::{ErrorCode, EventideError, Result};
pub use sync::{
    CancellationToken, MutationCoordinator, PendingSend, QueryCoordinator, QueryOptions,
    QueryState, QueryStatus,
};
pub use transport::{MutationTransport, QueryTransport};

// Re-export all types
pub use types::{
    ChatMessage, Event, EventId, ItemStatus, OptimisticItem, Pagination, ResultPage,
    SearchMetadata, SearchParams, SourceStatus,
};
