//! Shared query parameter types for API handlers.

use rolegate_core::pagination::PageRequest;
use serde::Deserialize;

/// Page-number pagination parameters (`?page=&page_size=`).
///
/// Values are normalized by [`PageRequest::new`], never rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PageParams {
    pub fn to_request(&self, default_size: i64) -> PageRequest {
        PageRequest::new(self.page, self.page_size, default_size)
    }
}
