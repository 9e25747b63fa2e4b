//! Optimistic mutation coordinator.
//!
//! [`MutationCoordinator`] gives a write immediate visible feedback: a
//! pending placeholder is inserted synchronously, the transport runs on a
//! spawned task, and the placeholder is then removed (success) or marked
//! failed (any error, including a panic inside the transport). Failed
//! placeholders stay until the user retries or deletes them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};
use uuid::Uuid;

use super::panic_text;
use crate::telemetry;
use crate::transport::MutationTransport;
use crate::types::{ItemStatus, OptimisticItem};
use crate::{EventideError, Result};

/// Message reported when a failure carries nothing more specific.
const UNKNOWN_FAILURE: &str = "Failed to send message";

/// Source of local placeholder ids.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDs prefixed with `local-`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        format!("local-{}", Uuid::now_v7())
    }
}

/// `local-1`, `local-2`, … for deterministic tests.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        format!("local-{}", self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Builder for [`MutationCoordinator`].
pub struct MutationCoordinatorBuilder<M: MutationTransport> {
    transport: Arc<M>,
    ids: Arc<dyn IdGenerator>,
    on_success: Option<SuccessCallback<M::Output>>,
    on_error: Option<ErrorCallback>,
}

impl<M: MutationTransport> MutationCoordinatorBuilder<M> {
    /// Use a custom id generator (default: [`UuidIdGenerator`]).
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Called with the canonical record once a send is confirmed.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(&M::Output) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Called with a normalized message when a send fails.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> MutationCoordinator<M> {
        let (items, _) = watch::channel(Vec::new());
        MutationCoordinator {
            inner: Arc::new(Inner {
                transport: self.transport,
                ids: self.ids,
                on_success: self.on_success,
                on_error: self.on_error,
                items,
                torn_down: AtomicBool::new(false),
            }),
        }
    }
}

struct Inner<M: MutationTransport> {
    transport: Arc<M>,
    ids: Arc<dyn IdGenerator>,
    on_success: Option<SuccessCallback<M::Output>>,
    on_error: Option<ErrorCallback>,
    items: watch::Sender<Vec<OptimisticItem>>,
    torn_down: AtomicBool,
}

/// Handle to one dispatched send.
#[derive(Debug)]
pub struct PendingSend {
    local_id: String,
    handle: JoinHandle<()>,
}

impl PendingSend {
    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    /// Wait until the placeholder has been confirmed or marked failed.
    pub async fn settled(self) {
        let _ = self.handle.await;
    }
}

/// Coordinator for optimistic writes.
pub struct MutationCoordinator<M: MutationTransport> {
    inner: Arc<Inner<M>>,
}

impl<M: MutationTransport> MutationCoordinator<M> {
    pub fn builder(transport: Arc<M>) -> MutationCoordinatorBuilder<M> {
        MutationCoordinatorBuilder {
            transport,
            ids: Arc::new(UuidIdGenerator),
            on_success: None,
            on_error: None,
        }
    }

    pub fn new(transport: Arc<M>) -> Self {
        Self::builder(transport).build()
    }

    /// Snapshot of the visible placeholders, oldest first.
    pub fn items(&self) -> Vec<OptimisticItem> {
        self.inner.items.borrow().clone()
    }

    /// Receiver notified on every placeholder change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<OptimisticItem>> {
        self.inner.items.subscribe()
    }

    /// Insert a pending placeholder for `content` and send it.
    ///
    /// Blank content is ignored and returns `None`.
    pub fn submit(&self, content: &str) -> Option<PendingSend> {
        if self.inner.is_torn_down() {
            return None;
        }
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let local_id = self.inner.ids.next_id();
        let item = OptimisticItem::pending(local_id.clone(), content.to_string());
        self.inner.items.send_modify(|items| items.push(item));
        debug!(%local_id, "optimistic item inserted");

        Some(Inner::dispatch(&self.inner, local_id, content.to_string()))
    }

    /// Send a failed placeholder again. No-op unless it exists and has failed.
    pub fn retry(&self, local_id: &str) -> Option<PendingSend> {
        if self.inner.is_torn_down() {
            return None;
        }
        let mut content = None;
        self.inner.items.send_if_modified(|items| {
            match items
                .iter_mut()
                .find(|item| item.local_id == local_id && item.status == ItemStatus::Failed)
            {
                Some(item) => {
                    item.status = ItemStatus::Pending;
                    content = Some(item.content.clone());
                    true
                }
                None => false,
            }
        });

        let content = content?;
        debug!(%local_id, "retrying optimistic item");
        Some(Inner::dispatch(&self.inner, local_id.to_string(), content))
    }

    /// Remove a failed placeholder. Returns whether anything was removed.
    pub fn delete(&self, local_id: &str) -> bool {
        if self.inner.is_torn_down() {
            return false;
        }
        self.inner.items.send_if_modified(|items| {
            let before = items.len();
            items.retain(|item| !(item.local_id == local_id && item.status == ItemStatus::Failed));
            items.len() != before
        })
    }

    /// Stop all placeholder changes; in-flight sends settle silently.
    pub fn teardown(&self) {
        self.inner.torn_down.store(true, Ordering::SeqCst);
    }
}

impl<M: MutationTransport> Drop for MutationCoordinator<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<M: MutationTransport> Inner<M> {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn dispatch(this: &Arc<Self>, local_id: String, content: String) -> PendingSend {
        let weak = Arc::downgrade(this);
        let transport = Arc::clone(&this.transport);
        let id = local_id.clone();
        let handle = tokio::spawn(async move {
            // A nested task turns a panicking transport into a JoinError.
            let outcome = tokio::spawn(async move { transport.send(&content).await }).await;
            settle(weak, &id, outcome);
        });
        PendingSend { local_id, handle }
    }

    fn confirm(&self, local_id: &str, record: M::Output) {
        let confirmed = self.items.send_if_modified(|items| {
            match items
                .iter_mut()
                .find(|item| item.local_id == local_id && item.status == ItemStatus::Pending)
            {
                Some(item) => {
                    item.status = ItemStatus::Confirmed;
                    true
                }
                None => false,
            }
        });
        if !confirmed {
            return;
        }

        metrics::counter!(telemetry::OPTIMISTIC_SENDS_TOTAL, "status" => "confirmed").increment(1);
        debug!(%local_id, "optimistic item confirmed");
        if let Some(callback) = &self.on_success {
            callback(&record);
        }
        self.items
            .send_modify(|items| items.retain(|item| item.local_id != local_id));
    }

    fn fail(&self, local_id: &str, message: String) {
        let failed = self.items.send_if_modified(|items| {
            match items
                .iter_mut()
                .find(|item| item.local_id == local_id && item.status == ItemStatus::Pending)
            {
                Some(item) => {
                    item.status = ItemStatus::Failed;
                    true
                }
                None => false,
            }
        });
        if !failed {
            return;
        }

        metrics::counter!(telemetry::OPTIMISTIC_SENDS_TOTAL, "status" => "failed").increment(1);
        warn!(%local_id, error = %message, "optimistic send failed");
        if let Some(callback) = &self.on_error {
            callback(&message);
        }
    }
}

fn settle<M: MutationTransport>(
    weak: Weak<Inner<M>>,
    local_id: &str,
    outcome: std::result::Result<Result<M::Output>, JoinError>,
) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    if inner.is_torn_down() {
        debug!(%local_id, "send settled after teardown; ignoring");
        return;
    }

    match outcome {
        Ok(Ok(record)) => inner.confirm(local_id, record),
        Ok(Err(error)) => inner.fail(local_id, failure_message(&error)),
        Err(join_error) => inner.fail(local_id, join_failure_message(join_error)),
    }
}

/// Human-readable message for a failed send.
pub fn failure_message(error: &EventideError) -> String {
    match error {
        EventideError::Network(message)
        | EventideError::InvalidParams(message)
        | EventideError::Unauthorized(message)
        | EventideError::NotFound(message)
        | EventideError::Server { message, .. }
        | EventideError::Http { message, .. }
            if !message.trim().is_empty() =>
        {
            message.clone()
        }
        EventideError::Cancelled => UNKNOWN_FAILURE.to_string(),
        other => other.to_string(),
    }
}

fn join_failure_message(error: JoinError) -> String {
    panic_text(error).unwrap_or_else(|| UNKNOWN_FAILURE.to_string())
}
