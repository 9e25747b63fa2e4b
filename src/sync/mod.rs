//! Coordinators that keep visible state in step with the backend.
//!
//! - [`QueryCoordinator`] - debounced, cached, cancellable, paginated reads
//! - [`MutationCoordinator`] - optimistic writes with retry and delete
//!
//! Both are built from the same small pieces: [`TokenSource`] for
//! last-issued-wins ordering and [`Debouncer`] for coalescing bursts.

pub mod debounce;
pub mod mutation;
pub mod query;
pub mod token;

use tokio::task::JoinError;

pub use debounce::Debouncer;
pub use mutation::{
    IdGenerator, MutationCoordinator, MutationCoordinatorBuilder, PendingSend,
    SequentialIdGenerator, UuidIdGenerator, failure_message,
};
pub use query::{PageOf, QueryCoordinator, QueryOptions, QueryState, QueryStatus};
pub use token::{CancellationToken, TokenSource};

/// Text carried by a task's panic, if it panicked with a string payload.
pub(crate) fn panic_text(error: JoinError) -> Option<String> {
    if !error.is_panic() {
        return None;
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        return Some((*message).to_string());
    }
    payload.downcast_ref::<String>().cloned()
}
