//! Pagination engine
//!
//! Drives the per-partition cursors of a session forward and merges partition
//! output into fixed-size pages.

use super::types::PageResult;
use crate::error::{Error, ErrorKind, Result};
use crate::provider::{CountEstimate, DirectoryProvider, SearchRequest};
use crate::session::{SearchQuery, Session};
use crate::types::{Partition, Record};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Produces pages for sessions from a directory provider.
///
/// The engine holds no session state; callers pass the session in under
/// their own lock, which is what serialises page production per session.
#[derive(Clone)]
pub struct PaginationEngine {
    provider: Arc<dyn DirectoryProvider>,
    timeout: Duration,
    count_fallback: u64,
}

impl PaginationEngine {
    /// Create an engine.
    ///
    /// Every provider call is bounded by `timeout`; a failed count for a
    /// partition is replaced by `count_fallback`.
    pub fn new(
        provider: Arc<dyn DirectoryProvider>,
        timeout: Duration,
        count_fallback: u64,
    ) -> Self {
        Self {
            provider,
            timeout,
            count_fallback,
        }
    }

    /// Estimate the total result count of a query.
    ///
    /// Partitions are counted concurrently and summed. A partition whose count
    /// fails contributes the fallback and makes the estimate inexact.
    pub async fn estimate_total(&self, query: &SearchQuery) -> CountEstimate {
        let counts = query.partitions.iter().map(|partition| async move {
            let call = self.provider.estimate_count(partition, &query.filter);
            match self.bounded(partition, "count", call).await {
                Ok(estimate) => estimate,
                Err(e) => {
                    warn!(
                        partition = %partition,
                        error = %e,
                        fallback = self.count_fallback,
                        "Count estimate failed, using fallback"
                    );
                    CountEstimate::approximate(self.count_fallback)
                }
            }
        });

        join_all(counts)
            .await
            .into_iter()
            .fold(CountEstimate::exact(0), CountEstimate::combine)
    }

    /// Return page `number` (1-indexed), producing pages up to it if needed.
    ///
    /// A cached page is returned without calling the provider.
    pub async fn get_page(&self, session: &mut Session, number: u32) -> Result<PageResult> {
        if number == 0 {
            return Err(Error::validation("Page numbers start at 1"));
        }

        let total_pages = session.total_pages();
        if number > total_pages {
            return Err(Error::out_of_range(number, total_pages));
        }

        while !session.has_page(number) {
            if !self.produce_next_page(session).await? {
                return Err(Error::out_of_range(number, total_pages));
            }
        }

        PageResult::from_session(session, number)
            .ok_or_else(|| Error::Other(format!("page {number} missing after production")))
    }

    /// Keep producing pages until the session is complete or at least
    /// `ceiling` records are cached.
    pub async fn drain(&self, session: &mut Session, ceiling: Option<usize>) -> Result<()> {
        while !session.is_complete
            && ceiling.map_or(true, |limit| session.pages.record_count() < limit)
        {
            if !self.produce_next_page(session).await? {
                break;
            }
        }
        Ok(())
    }

    /// Produce and cache the next page of a session.
    ///
    /// Returns `false` when the session is complete and no page was added.
    /// Entries pulled from the provider are queued in the session's carry-over
    /// until the page is cut, so a provider error or a dropped request leaves
    /// them in place for the next attempt.
    pub async fn produce_next_page(&self, session: &mut Session) -> Result<bool> {
        if session.is_complete {
            return Ok(false);
        }

        let page_size = session.query.page_size.max(1) as usize;
        let page_number = session.pages.len() + 1;

        self.fill_from_partitions(session, page_size).await?;

        let take = session.carry_over.len().min(page_size);
        let page: Vec<Record> = session.carry_over.drain(..take).collect();
        let exhausted = session.cursors.is_exhausted() && session.carry_over.is_empty();

        // Page 1 always exists, even when the query matches nothing.
        if page.is_empty() && exhausted && !session.pages.is_empty() {
            session.is_complete = true;
            debug!(session_id = %session.id, "Result set exhausted");
            return Ok(false);
        }

        debug!(
            session_id = %session.id,
            page = page_number,
            records = page.len(),
            complete = exhausted,
            "Produced page"
        );
        session.pages.push(page);
        session.is_complete = exhausted;
        Ok(true)
    }

    /// Pull entries from partitions in query order until the carry-over
    /// holds a full page.
    ///
    /// Each partition is read until it is exhausted or the page is full
    /// before moving to the next one.
    async fn fill_from_partitions(&self, session: &mut Session, page_size: usize) -> Result<()> {
        for index in 0..session.cursors.len() {
            loop {
                let buffered = session.carry_over.len();
                if buffered >= page_size {
                    return Ok(());
                }

                let remaining = (page_size - buffered) as u32;
                let page = {
                    let Some((partition, state)) = session.cursors.get(index) else {
                        break;
                    };
                    if state.is_exhausted() {
                        break;
                    }

                    debug!(
                        session_id = %session.id,
                        partition = %partition,
                        cursor = state.name(),
                        requested = remaining,
                        "Searching partition"
                    );

                    let request = SearchRequest {
                        partition,
                        filter: &session.query.filter,
                        attributes: &session.query.attributes,
                        page_size: remaining,
                        token: state.token(),
                    };
                    self.bounded(partition, "search", self.provider.search(request))
                        .await?
                };

                // Entries and the cursor move together, with no await between.
                let (entries, next) = page.into_continuation();
                let returned = entries.len();
                let has_more = next.is_some();
                session.carry_over.extend(entries);
                session.cursors.advance(index, next);

                // A partition that reports more data but returns nothing is
                // retried on the next page rather than spun on.
                if !has_more || returned == 0 {
                    break;
                }
            }
        }
        Ok(())
    }

    /// Run a provider call under the timeout, attaching partition context to failures
    async fn bounded<T>(
        &self,
        partition: &Partition,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.kind() == ErrorKind::Provider => Err(e),
            Ok(Err(e)) => Err(Error::provider(partition.key(), operation, e.to_string())),
            Err(_) => {
                warn!(
                    partition = %partition,
                    operation,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Directory call timed out"
                );
                Err(Error::provider_timeout(
                    partition.key(),
                    operation,
                    self.timeout.as_millis() as u64,
                ))
            }
        }
    }
}
