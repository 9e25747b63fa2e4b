//! Cancellation tokens for last-issued-wins ordering.
//!
//! A [`TokenSource`] hands out one [`CancellationToken`] per operation. Issuing
//! a new token revokes the previous one, so at most one token per source is
//! current. Coordinators compare a response's token against the source at
//! completion time; completion order plays no part.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

/// Handle for one in-flight operation.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    id: u64,
    generation: Arc<AtomicU64>,
    revoked: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// A token owned by no source. It stays current until revoked.
    ///
    /// For calling a transport directly, outside any coordinator.
    pub fn detached() -> Self {
        let (revoked, _) = watch::channel(false);
        Self {
            id: 0,
            generation: Arc::new(AtomicU64::new(0)),
            revoked: Arc::new(revoked),
        }
    }

    /// Mark this operation as aborted and wake anyone awaiting [`cancelled`](Self::cancelled).
    pub fn revoke(&self) {
        self.revoked.send_replace(true);
    }

    pub fn is_revoked(&self) -> bool {
        *self.revoked.borrow()
    }

    /// True while this is the newest token of its source and not revoked.
    pub fn is_current(&self) -> bool {
        !self.is_revoked() && self.generation.load(Ordering::SeqCst) == self.id
    }

    /// Resolves once the token is revoked.
    pub async fn cancelled(&self) {
        let mut rx = self.revoked.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|revoked| *revoked).await;
    }
}

/// Issues tokens for one coordinator.
#[derive(Debug, Default)]
pub struct TokenSource {
    generation: Arc<AtomicU64>,
    current: Mutex<Option<CancellationToken>>,
}

impl TokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token, revoking the previous one.
    pub fn issue(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.take() {
            previous.revoke();
        }
        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (revoked, _) = watch::channel(false);
        let token = CancellationToken {
            id,
            generation: Arc::clone(&self.generation),
            revoked: Arc::new(revoked),
        };
        *current = Some(token.clone());
        token
    }

    /// Revoke the current token, leaving no token current.
    ///
    /// Returns whether a token was outstanding.
    pub fn revoke_current(&self) -> bool {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst);
        match current.take() {
            Some(token) => {
                token.revoke();
                true
            }
            None => false,
        }
    }

    /// The current token, if one is outstanding.
    pub fn current(&self) -> Option<CancellationToken> {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
