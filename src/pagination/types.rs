//! Pagination types
//!
//! Response shape for a single page request.

use crate::session::{Session, SessionId};
use crate::types::Record;
use serde::Serialize;

/// One page of a session's result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// Session the page belongs to
    pub session_id: SessionId,
    /// Records on this page
    pub results: Vec<Record>,
    /// Estimated total number of records
    pub total_count: u64,
    /// Whether `total_count` is authoritative
    pub is_count_exact: bool,
    /// Estimated number of pages
    pub total_pages: u32,
    /// Page number (1-indexed)
    pub current_page: u32,
    /// Records per page
    pub page_size: u32,
    /// Whether another page can be requested
    pub has_next_page: bool,
}

impl PageResult {
    /// Build the result for cached page `number` of `session`.
    ///
    /// Returns `None` if the page has not been produced.
    pub fn from_session(session: &Session, number: u32) -> Option<Self> {
        let results = session.pages.get(number)?.to_vec();
        let total_pages = session.total_pages();
        let is_last_cached = number as usize == session.pages.len();

        Some(Self {
            session_id: session.id.clone(),
            results,
            total_count: session.estimate.count,
            is_count_exact: session.estimate.is_exact,
            total_pages,
            current_page: number,
            page_size: session.query.page_size,
            has_next_page: number < total_pages && !(session.is_complete && is_last_cached),
        })
    }
}
