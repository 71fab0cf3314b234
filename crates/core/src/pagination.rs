//! Page-number pagination for admin listings.
//!
//! Pages are 1-based. Requests are normalized rather than rejected: a missing
//! or non-positive page becomes page 1 and the page size is clamped.

use serde::Serialize;

/// Upper bound for any requested page size.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default page size for the admin user listing.
pub const USERS_PAGE_SIZE: i64 = 10;

/// Default page size for the audit log.
pub const AUDIT_PAGE_SIZE: i64 = 50;

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    /// Normalize raw query values, using `default_size` when no size is given.
    pub fn new(page: Option<i64>, page_size: Option<i64>, default_size: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Number of pages needed for `total` rows.
pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 || page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

/// One page of results plus the metadata a client needs to render pagers.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub page_size: i64,
}

impl<T: Serialize> Page<T> {
    /// Wrap items fetched with `LIMIT/OFFSET` for a known total.
    pub fn new(items: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            current_page: request.page,
            total_pages: total_pages(total_count, request.page_size),
            page_size: request.page_size,
        }
    }

    /// Paginate a fully filtered list in memory.
    pub fn from_vec(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as i64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(request.limit()).unwrap_or(0);
        let items = all.into_iter().skip(offset).take(limit).collect();
        Self::new(items, total_count, request)
    }

    /// Replace the items of this page, keeping its metadata.
    pub fn map<U: Serialize>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> Page<U> {
        Page {
            items: f(self.items),
            total_count: self.total_count,
            current_page: self.current_page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}
