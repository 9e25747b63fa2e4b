//! Paginated result types

use serde::{Deserialize, Serialize};

/// Pagination cursor returned alongside a page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub has_next_page: bool,
}

impl Pagination {
    /// Cursor used when a response carries no pagination block.
    pub fn first(page_size: u32) -> Self {
        Self {
            page: 1,
            page_size,
            total_count: 0,
            has_next_page: false,
        }
    }

    /// Cursor for a single-item response.
    pub fn single() -> Self {
        Self {
            page: 1,
            page_size: 1,
            total_count: 1,
            has_next_page: false,
        }
    }
}

/// One page of results plus resource-specific metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage<T, M = ()> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub metadata: M,
}

impl<T, M: Default> ResultPage<T, M> {
    /// Wrap a single item as a one-element page.
    pub fn single(item: T) -> Self {
        Self {
            items: vec![item],
            pagination: Pagination::single(),
            metadata: M::default(),
        }
    }
}
