//! Page/limit normalization and pagination metadata.

use serde::Serialize;

/// A normalized page request: `page >= 1`, `1 <= limit <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Normalize caller-supplied values. Missing or zero values take the
    /// defaults; limits above `max_limit` are capped.
    #[must_use]
    pub fn new(page: Option<u64>, limit: Option<u64>, default_limit: u64, max_limit: u64) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(default_limit)
            .min(max_limit);
        Self { page, limit }
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    #[must_use]
    pub const fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }

    #[must_use]
    pub const fn has_next(&self, total: u64) -> bool {
        self.page.saturating_mul(self.limit) < total
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Pagination block for post and user listings.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: request.total_pages(total),
        }
    }
}

/// A page of items with its pagination block.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
