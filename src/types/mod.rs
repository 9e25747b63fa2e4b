//! Public types for the Eventide API.

mod event;
mod message;
mod optimistic;
mod page;

pub use event::{
    Event, EventId, LOOKUP_RESOURCE, SEARCH_RESOURCE, SearchMetadata, SearchParams,
    SearchResponse, SourceStatus,
};
pub use message::{ChatMessage, NewMessage};
pub(crate) use message::WriteErrorBody;
pub use optimistic::{ItemStatus, OptimisticItem};
pub use page::{Pagination, ResultPage};
