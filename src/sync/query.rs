//! Debounced, cached, cancellable, paginated query coordinator.
//!
//! [`QueryCoordinator`] owns the visible result state of one logical query
//! and guarantees that only the most recently issued operation can change
//! it.
//!
//! # Lifecycle
//!
//! `Idle → Debouncing → Fetching → Succeeded | Failed`. A parameter change
//! may preempt an active fetch at any point; the fetch's token is revoked and
//! its response is dropped whenever it arrives.
//!
//! # Ordering
//!
//! Every state transition happens under one control lock, never held across
//! an `.await`. Token issue, revocation and the is-current check at
//! completion all take that lock, so "last issued wins" holds on
//! multi-threaded runtimes too.
//!
//! # Cache
//!
//! Each page is cached under its own signature. A hit resolves synchronously
//! without touching the loading flags, and also revokes any fetch still in
//! flight. `refresh()` evicts every cached page of the current parameters
//! before re-fetching, so a later "load more" cannot append a stale page.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use super::debounce::Debouncer;
use super::panic_text;
use super::token::{CancellationToken, TokenSource};
use crate::cache::{CacheStore, RequestSignature};
use crate::telemetry;
use crate::transport::QueryTransport;
use crate::types::{Pagination, ResultPage};
use crate::{EventideError, Result};

/// Page type produced by a transport.
pub type PageOf<Q> =
    ResultPage<<Q as QueryTransport>::Item, <Q as QueryTransport>::Metadata>;

/// Per-coordinator options.
///
/// ```rust
/// # use eventide::QueryOptions;
/// # use std::time::Duration;
/// let options = QueryOptions::new()
///     .debounce(Duration::from_millis(250))
///     .cache_enabled(false);
/// ```
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Quiet period before a parameter change is fetched. Default: 300ms.
    pub debounce: Duration,
    /// Whether to read from and write to the cache. Default: true.
    pub cache_enabled: bool,
    /// A disabled coordinator records parameters but never fetches. Default: true.
    pub enabled: bool,
    /// Page size assumed when a response carries no pagination. Default: 20.
    pub page_size: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            cache_enabled: true,
            enabled: true,
            page_size: 20,
        }
    }
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn page_size(mut self, n: u32) -> Self {
        self.page_size = n;
        self
    }
}

/// Where a coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Debouncing,
    Fetching,
    Succeeded,
    Failed,
}

/// Visible result state of a query.
#[derive(Debug, Clone)]
pub struct QueryState<T, M> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub metadata: M,
    pub status: QueryStatus,
    /// A page-1 fetch is in flight.
    pub is_loading: bool,
    /// A next-page fetch is in flight.
    pub is_fetching_next_page: bool,
    /// Last failure. Cleared by the next success, replaced by the next failure.
    pub error: Option<EventideError>,
}

impl<T, M: Default> QueryState<T, M> {
    fn initial(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::first(page_size),
            metadata: M::default(),
            status: QueryStatus::Idle,
            is_loading: false,
            is_fetching_next_page: false,
            error: None,
        }
    }
}

impl<T, M> QueryState<T, M> {
    pub fn has_next_page(&self) -> bool {
        self.pagination.has_next_page
    }

    /// Whether any fetch is in flight.
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_fetching_next_page
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    Replace,
    Append,
}

struct Control<P> {
    params: Option<P>,
    /// Bumped on every parameter change so a stale debounce fire is ignored.
    version: u64,
    enabled: bool,
    torn_down: bool,
}

struct Inner<Q: QueryTransport> {
    transport: Arc<Q>,
    cache: Option<Arc<CacheStore<PageOf<Q>>>>,
    options: QueryOptions,
    tokens: TokenSource,
    debouncer: Debouncer,
    control: Mutex<Control<Q::Params>>,
    state: watch::Sender<QueryState<Q::Item, Q::Metadata>>,
}

/// Coordinator for one logical query.
///
/// Dropping the coordinator tears it down: pending debounces are cancelled
/// and trailing responses are ignored.
pub struct QueryCoordinator<Q: QueryTransport> {
    inner: Arc<Inner<Q>>,
}

impl<Q: QueryTransport> QueryCoordinator<Q> {
    /// Create a coordinator backed by a shared cache.
    pub fn new(transport: Arc<Q>, cache: Arc<CacheStore<PageOf<Q>>>, options: QueryOptions) -> Self {
        Self::build(transport, Some(cache), options)
    }

    /// Create a coordinator that never caches.
    pub fn uncached(transport: Arc<Q>, options: QueryOptions) -> Self {
        Self::build(transport, None, options.cache_enabled(false))
    }

    fn build(
        transport: Arc<Q>,
        cache: Option<Arc<CacheStore<PageOf<Q>>>>,
        options: QueryOptions,
    ) -> Self {
        let (state, _) = watch::channel(QueryState::initial(options.page_size));
        let inner = Inner {
            transport,
            cache,
            debouncer: Debouncer::new(options.debounce),
            tokens: TokenSource::new(),
            control: Mutex::new(Control {
                params: None,
                version: 0,
                enabled: options.enabled,
                torn_down: false,
            }),
            state,
            options,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> QueryState<Q::Item, Q::Metadata> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<QueryState<Q::Item, Q::Metadata>> {
        self.inner.state.subscribe()
    }

    /// State changes as a stream, starting with the current state.
    pub fn updates(&self) -> WatchStream<QueryState<Q::Item, Q::Metadata>> {
        WatchStream::new(self.subscribe())
    }

    /// The parameters most recently set.
    pub fn params(&self) -> Option<Q::Params> {
        self.inner.lock_control().params.clone()
    }

    /// Record new parameters and restart the debounce period.
    ///
    /// Pagination restarts at page 1. Any fetch in flight is revoked.
    pub fn set_params(&self, params: Q::Params) {
        let mut control = self.inner.lock_control();
        if control.torn_down {
            return;
        }
        control.params = Some(params);
        control.version += 1;
        let version = control.version;

        self.inner.preempt();
        if !control.enabled {
            return;
        }

        self.inner
            .state
            .send_modify(|state| state.status = QueryStatus::Debouncing);

        let weak = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(move || {
            if let Some(inner) = weak.upgrade() {
                inner.fire(version);
            }
        });
    }

    /// Fetch the page after the current one and append it.
    ///
    /// Returns whether a fetch (or cache hit) was issued. No-op while any fetch
    /// is in flight, while a parameter change is debouncing, or once the last
    /// page has been reached.
    pub fn fetch_next_page(&self) -> bool {
        let control = self.inner.lock_control();
        if control.torn_down || !control.enabled {
            return false;
        }
        let Some(params) = control.params.clone() else {
            return false;
        };

        let next_page = {
            let state = self.inner.state.borrow();
            if !state.has_next_page() || state.is_busy() || state.status == QueryStatus::Debouncing {
                return false;
            }
            // Page numbers that cannot advance count as exhausted.
            let Some(next) = state.pagination.page.checked_add(1) else {
                return false;
            };
            next
        };

        Inner::execute(&self.inner, &control, params, next_page, Merge::Append);
        true
    }

    /// Re-fetch page 1 now, bypassing the debounce.
    ///
    /// Every cached page of the current parameters is evicted first.
    pub fn refresh(&self) -> bool {
        let mut control = self.inner.lock_control();
        if control.torn_down || !control.enabled {
            return false;
        }
        let Some(params) = control.params.clone() else {
            return false;
        };
        self.inner.debouncer.cancel();
        control.version += 1;

        if let Some(cache) = &self.inner.cache {
            let scope = self.inner.transport.scope(&params);
            let evicted = cache.invalidate(&scope.page_prefix());
            debug!(scope = %scope, evicted, "refresh evicted cached pages");
        }
        Inner::execute(&self.inner, &control, params, 1, Merge::Replace);
        true
    }

    /// Cancel everything and return to the initial state.
    pub fn clear(&self) {
        let mut control = self.inner.lock_control();
        if control.torn_down {
            return;
        }
        self.inner.debouncer.cancel();
        self.inner.tokens.revoke_current();
        control.params = None;
        control.version += 1;
        self.inner
            .state
            .send_replace(QueryState::initial(self.inner.options.page_size));
    }

    /// Pause or resume fetching.
    ///
    /// Re-enabling with parameters present fetches page 1 immediately.
    pub fn set_enabled(&self, enabled: bool) {
        let mut control = self.inner.lock_control();
        if control.torn_down || control.enabled == enabled {
            return;
        }
        control.enabled = enabled;
        control.version += 1;

        if !enabled {
            self.inner.preempt();
            self.inner.state.send_modify(|state| {
                if state.status == QueryStatus::Debouncing {
                    state.status = QueryStatus::Idle;
                }
            });
            return;
        }

        if let Some(params) = control.params.clone() {
            Inner::execute(&self.inner, &control, params, 1, Merge::Replace);
        }
    }

    /// Stop all state transitions for good.
    pub fn teardown(&self) {
        let mut control = self.inner.lock_control();
        if control.torn_down {
            return;
        }
        control.torn_down = true;
        self.inner.debouncer.cancel();
        self.inner.tokens.revoke_current();
        debug!(resource = self.inner.transport.resource(), "query coordinator torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.lock_control().torn_down
    }
}

impl<Q: QueryTransport> Drop for QueryCoordinator<Q> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<Q: QueryTransport> Inner<Q> {
    fn lock_control(&self) -> MutexGuard<'_, Control<Q::Params>> {
        self.control.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Revoke the in-flight fetch, if any, and drop its loading flags.
    fn preempt(&self) {
        self.tokens.revoke_current();
        self.state.send_if_modified(|state| {
            if !state.is_busy() {
                return false;
            }
            debug!(resource = self.transport.resource(), "preempted in-flight fetch");
            state.is_loading = false;
            state.is_fetching_next_page = false;
            true
        });
    }

    /// Debounce timer elapsed.
    fn fire(self: &Arc<Self>, version: u64) {
        let control = self.lock_control();
        if control.torn_down || !control.enabled || control.version != version {
            return;
        }
        let Some(params) = control.params.clone() else {
            return;
        };
        debug!(resource = self.transport.resource(), "debounce fired");
        Self::execute(self, &control, params, 1, Merge::Replace);
    }

    /// Resolve `page` from cache or issue a network fetch.
    ///
    /// Callers hold the control lock.
    fn execute(
        this: &Arc<Self>,
        _control: &MutexGuard<'_, Control<Q::Params>>,
        params: Q::Params,
        page: u32,
        merge: Merge,
    ) {
        let signature = this.transport.signature(&params, page);

        if this.options.cache_enabled {
            if let Some(entry) = this.cache.as_ref().and_then(|cache| cache.get(&signature)) {
                debug!(key = %signature, "resolved from cache");
                this.tokens.revoke_current();
                this.state
                    .send_modify(|state| apply_page(state, entry.payload, merge));
                return;
            }
        }

        let token = this.tokens.issue();
        debug!(key = %signature, "issuing fetch");
        this.state.send_modify(|state| {
            state.status = QueryStatus::Fetching;
            match merge {
                Merge::Replace => state.is_loading = true,
                Merge::Append => state.is_fetching_next_page = true,
            }
        });

        let weak = Arc::downgrade(this);
        let transport = Arc::clone(&this.transport);
        let fetch_token = token.clone();
        // The fetch runs in its own task so a panicking transport still
        // reaches `complete` and clears the loading flags.
        let fetch = tokio::spawn(async move { transport.fetch(&params, page, &fetch_token).await });
        tokio::spawn(async move {
            let result = match fetch.await {
                Ok(result) => result,
                Err(join_error) if join_error.is_panic() => {
                    let text = panic_text(join_error).unwrap_or_else(|| "unknown panic".to_string());
                    Err(EventideError::Network(format!("transport panicked: {text}")))
                }
                Err(_) => Err(EventideError::Cancelled),
            };
            complete(weak, token, signature, merge, result);
        });
    }
}

/// Apply a finished fetch if its token is still current.
fn complete<Q: QueryTransport>(
    weak: Weak<Inner<Q>>,
    token: CancellationToken,
    signature: RequestSignature,
    merge: Merge,
    result: Result<PageOf<Q>>,
) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let resource = inner.transport.resource().to_owned();
    let control = inner.lock_control();

    if control.torn_down || !token.is_current() {
        debug!(key = %signature, "discarding stale response");
        metrics::counter!(telemetry::STALE_RESPONSES_TOTAL, "resource" => resource).increment(1);
        return;
    }

    match result {
        Ok(page) => {
            metrics::counter!(telemetry::REQUESTS_TOTAL,
                "resource" => resource,
                "status" => "ok",
            )
            .increment(1);
            if inner.options.cache_enabled {
                if let Some(cache) = &inner.cache {
                    cache.set(signature, page.clone());
                }
            }
            inner.state.send_modify(|state| apply_page(state, page, merge));
        }
        Err(EventideError::Cancelled) => {
            // Aborted by the transport itself; not an error to report.
            inner.state.send_modify(|state| {
                state.is_loading = false;
                state.is_fetching_next_page = false;
                state.status = QueryStatus::Idle;
            });
        }
        Err(error) => {
            let code = error.code();
            warn!(key = %signature, code = %code, error = %error, "fetch failed");
            metrics::counter!(telemetry::REQUESTS_TOTAL,
                "resource" => resource,
                "status" => code.as_str().into_owned(),
            )
            .increment(1);
            inner.state.send_modify(|state| {
                state.is_loading = false;
                state.is_fetching_next_page = false;
                state.status = QueryStatus::Failed;
                state.error = Some(error);
            });
        }
    }
}

fn apply_page<T, M>(state: &mut QueryState<T, M>, page: ResultPage<T, M>, merge: Merge) {
    match merge {
        Merge::Replace => state.items = page.items,
        Merge::Append => state.items.extend(page.items),
    }
    state.pagination = page.pagination;
    state.metadata = page.metadata;
    state.error = None;
    state.is_loading = false;
    state.is_fetching_next_page = false;
    state.status = QueryStatus::Succeeded;
}
