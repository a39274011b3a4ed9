//! Provider types and traits
//!
//! Defines the directory search abstraction used by the pagination engine.

use crate::error::Result;
use crate::types::{Partition, Record};
use async_trait::async_trait;
use std::fmt;

/// Opaque, provider-issued marker for resuming a forward-only paged search.
///
/// Tokens are single-use server state. They are handed back to the provider
/// unmodified and are deliberately not `Clone`: a token is moved into the
/// cursor set when issued and replaced when the next one arrives.
#[derive(PartialEq, Eq)]
pub struct ContinuationToken(Vec<u8>);

impl ContinuationToken {
    /// Wrap raw token bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw token bytes, for the provider that issued them
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the token carries no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Token contents stay out of logs.
impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContinuationToken({} bytes)", self.0.len())
    }
}

/// One paged search call
#[derive(Debug)]
pub struct SearchRequest<'a> {
    /// Search scope
    pub partition: &'a Partition,
    /// Filter expression
    pub filter: &'a str,
    /// Attribute projection (empty = all attributes)
    pub attributes: &'a [String],
    /// Maximum entries to return
    pub page_size: u32,
    /// Resume point, `None` to start from the beginning
    pub token: Option<&'a ContinuationToken>,
}

/// Result of one paged search call
#[derive(Debug, Default)]
pub struct SearchPage {
    /// Entries in provider order
    pub entries: Vec<Record>,
    /// Token for the next call, if any
    pub next_token: Option<ContinuationToken>,
    /// Whether the provider has more entries for this partition
    pub has_more: bool,
}

impl SearchPage {
    /// A final page with no continuation
    pub fn last(entries: Vec<Record>) -> Self {
        Self {
            entries,
            next_token: None,
            has_more: false,
        }
    }

    /// A page followed by more data
    pub fn more(entries: Vec<Record>, token: ContinuationToken) -> Self {
        Self {
            entries,
            next_token: Some(token),
            has_more: true,
        }
    }

    /// The token to resume with, if the partition is not exhausted
    pub fn into_continuation(self) -> (Vec<Record>, Option<ContinuationToken>) {
        let token = if self.has_more { self.next_token } else { None };
        (self.entries, token)
    }
}

/// Result of a count estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountEstimate {
    /// Estimated number of matching entries
    pub count: u64,
    /// Whether the count is authoritative
    pub is_exact: bool,
}

impl CountEstimate {
    /// An authoritative count
    pub fn exact(count: u64) -> Self {
        Self {
            count,
            is_exact: true,
        }
    }

    /// A best-effort count
    pub fn approximate(count: u64) -> Self {
        Self {
            count,
            is_exact: false,
        }
    }

    /// Sum two estimates; the result is exact only if both are
    #[must_use]
    pub fn combine(self, other: CountEstimate) -> Self {
        Self {
            count: self.count.saturating_add(other.count),
            is_exact: self.is_exact && other.is_exact,
        }
    }
}

impl Default for CountEstimate {
    fn default() -> Self {
        Self::exact(0)
    }
}

/// Directory search capability.
///
/// Implementations are stateless from the engine's point of view and may be
/// called concurrently for different partitions and sessions.
#[async_trait]
pub trait DirectoryProvider: Send + Sync {
    /// Fetch one page of entries for a partition
    async fn search(&self, request: SearchRequest<'_>) -> Result<SearchPage>;

    /// Estimate how many entries in a partition match a filter
    async fn estimate_count(&self, partition: &Partition, filter: &str) -> Result<CountEstimate>;
}
