//! Optimistic placeholder types

use std::time::SystemTime;

/// Lifecycle of an optimistic placeholder.
///
/// `Pending → Confirmed` and `Pending → Failed → Pending` are the only
/// transitions. A confirmed item is removed as soon as its success callback
/// has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A locally created stand-in for a write the backend has not confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisticItem {
    /// Locally generated id, never equal to a server id.
    pub local_id: String,
    /// Trimmed content as submitted.
    pub content: String,
    pub status: ItemStatus,
    pub created_at: SystemTime,
}

impl OptimisticItem {
    pub(crate) fn pending(local_id: String, content: String) -> Self {
        Self {
            local_id,
            content,
            status: ItemStatus::Pending,
            created_at: SystemTime::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ItemStatus::Failed
    }
}
