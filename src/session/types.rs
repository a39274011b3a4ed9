//! Session types
//!
//! A session ties one search query to the pages produced for it so far, the
//! continuation token of every partition, and the count estimate taken when
//! the query started.

use crate::provider::{ContinuationToken, CountEstimate};
use crate::types::{Partition, Record};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Session Id
// ============================================================================

/// Opaque session identifier (128-bit random)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// String form of the id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Search Query
// ============================================================================

/// Validated query parameters, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Partitions in the order their results are concatenated
    pub partitions: Vec<Partition>,
    /// Normalised filter expression
    pub filter: String,
    /// Attribute projection (empty = all attributes)
    pub attributes: Vec<String>,
    /// Records per page
    pub page_size: u32,
}

// ============================================================================
// Cursor Set
// ============================================================================

/// Position of one partition's forward-only search
#[derive(Debug, Default)]
pub enum CursorState {
    /// Not searched yet
    #[default]
    Fresh,
    /// Searched; resume with this token
    InProgress(ContinuationToken),
    /// No more entries
    Exhausted,
}

impl CursorState {
    /// Name used in summaries
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::InProgress(_) => "in_progress",
            Self::Exhausted => "exhausted",
        }
    }

    /// Whether the partition has no more entries
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Token to pass to the next search call
    pub fn token(&self) -> Option<&ContinuationToken> {
        match self {
            Self::InProgress(token) => Some(token),
            Self::Fresh | Self::Exhausted => None,
        }
    }
}

/// Per-session cursor of every partition, in query order
#[derive(Debug)]
pub struct CursorSet {
    cursors: Vec<(Partition, CursorState)>,
}

impl CursorSet {
    /// All partitions fresh
    pub fn new(partitions: &[Partition]) -> Self {
        Self {
            cursors: partitions
                .iter()
                .map(|p| (p.clone(), CursorState::Fresh))
                .collect(),
        }
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    /// Whether there are no partitions
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Partition and cursor at `index`
    pub fn get(&self, index: usize) -> Option<(&Partition, &CursorState)> {
        self.cursors.get(index).map(|(p, s)| (p, s))
    }

    /// Cursor for a partition
    pub fn state(&self, partition: &Partition) -> Option<&CursorState> {
        self.cursors
            .iter()
            .find(|(p, _)| p == partition)
            .map(|(_, s)| s)
    }

    /// Iterate partitions and cursors in query order
    pub fn iter(&self) -> impl Iterator<Item = (&Partition, &CursorState)> {
        self.cursors.iter().map(|(p, s)| (p, s))
    }

    /// Move the cursor at `index` forward.
    ///
    /// `next` replaces the consumed token; `None` exhausts the partition.
    /// An exhausted cursor never reverts.
    pub fn advance(&mut self, index: usize, next: Option<ContinuationToken>) {
        let Some((_, state)) = self.cursors.get_mut(index) else {
            return;
        };
        if state.is_exhausted() {
            return;
        }
        *state = match next {
            Some(token) => CursorState::InProgress(token),
            None => CursorState::Exhausted,
        };
    }

    /// Whether every partition is exhausted
    pub fn is_exhausted(&self) -> bool {
        self.cursors.iter().all(|(_, s)| s.is_exhausted())
    }
}

// ============================================================================
// Page Cache
// ============================================================================

/// Append-only list of materialised pages, index 0 = page 1
#[derive(Debug, Default)]
pub struct PageCache {
    pages: Vec<Vec<Record>>,
}

impl PageCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page `number` (1-indexed)
    pub fn get(&self, number: u32) -> Option<&[Record]> {
        let index = (number as usize).checked_sub(1)?;
        self.pages.get(index).map(Vec::as_slice)
    }

    /// Append the next page
    pub fn push(&mut self, page: Vec<Record>) {
        self.pages.push(page);
    }

    /// Total records across all pages
    pub fn record_count(&self) -> usize {
        self.pages.iter().map(Vec::len).sum()
    }

    /// All records in page order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.pages.iter().flatten()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Server-side state of one paged search
#[derive(Debug)]
pub struct Session {
    /// Session id
    pub id: SessionId,
    /// Query parameters
    pub query: SearchQuery,
    /// Cursor of every partition
    pub cursors: CursorSet,
    /// Pages produced so far
    pub pages: PageCache,
    /// Entries pulled from the provider but not yet placed on a page
    pub carry_over: VecDeque<Record>,
    /// Count estimate taken at creation
    pub estimate: CountEstimate,
    /// Whether every partition is exhausted and nothing is carried over
    pub is_complete: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session for a query
    pub fn new(id: SessionId, query: SearchQuery) -> Self {
        let cursors = CursorSet::new(&query.partitions);
        Self {
            id,
            query,
            cursors,
            pages: PageCache::new(),
            carry_over: VecDeque::new(),
            estimate: CountEstimate::default(),
            is_complete: false,
            created_at: Utc::now(),
        }
    }

    /// Record the count estimate
    pub fn set_estimate(&mut self, estimate: CountEstimate) {
        self.estimate = estimate;
    }

    /// Best-known page count: `ceil(total / page_size)`, at least 1
    pub fn total_pages(&self) -> u32 {
        let page_size = u64::from(self.query.page_size.max(1));
        let pages = self.estimate.count.div_ceil(page_size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Whether page `number` can be answered from the cache
    pub fn has_page(&self, number: u32) -> bool {
        self.pages.get(number).is_some()
    }
}
