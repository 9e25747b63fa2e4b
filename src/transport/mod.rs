//! Request transports.
//!
//! [`ApiClient`] speaks HTTP to the backend; [`EventSearch`], [`EventLookup`]
//! and [`MessageSender`] adapt it to the coordinator traits in [`traits`].

pub mod client;
pub mod events;
pub mod messages;
pub mod traits;

pub use client::ApiClient;
pub use events::{EventLookup, EventSearch};
pub use messages::MessageSender;
pub use traits::{MutationTransport, QueryTransport};
