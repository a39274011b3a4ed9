//! Directory search service
//!
//! The operations exposed to the HTTP and CLI layers. A service owns the
//! pagination engine and a session store; it validates input, resolves
//! sessions and serialises work on a session through the session's lock.
//!
//! # Overview
//!
//! The service module provides:
//! - `DirectoryService` - StartQuery, GetPage, GetAll, Export and InvalidateSession
//! - Request/response types for those operations
//! - Query validation (`build_query`)

mod types;
mod validation;

pub use types::{
    AllResults, AttributeList, ExportRequest, Health, PartitionProgress, QueryRequest,
    SessionSummary,
};
pub use validation::{build_query, parse_partitions, validate_attributes, validate_search_term};

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::export::{ExportOutput, ExportReplayer};
use crate::pagination::{PageResult, PaginationEngine};
use crate::provider::DirectoryProvider;
use crate::session::{MemorySessionStore, SessionStore};
use crate::types::{ExportFormat, ObjectType};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Paged directory search over cached sessions
#[derive(Clone)]
pub struct DirectoryService {
    engine: PaginationEngine,
    replayer: ExportReplayer,
    store: Arc<dyn SessionStore>,
    config: Arc<ServiceConfig>,
}

impl DirectoryService {
    /// Create a service over a provider and a session store.
    ///
    /// Fails with a config error when `config` does not validate.
    pub fn new(
        provider: Arc<dyn DirectoryProvider>,
        store: Arc<dyn SessionStore>,
        config: ServiceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let engine = PaginationEngine::new(
            provider,
            config.provider_timeout(),
            config.count_fallback,
        );
        let replayer = ExportReplayer::new(
            engine.clone(),
            config.export_ceiling(),
            config.identity_attribute.clone(),
        );

        Ok(Self {
            engine,
            replayer,
            store,
            config: Arc::new(config),
        })
    }

    /// Create a service with an in-process session store
    pub fn in_memory(provider: Arc<dyn DirectoryProvider>, config: ServiceConfig) -> Result<Self> {
        let store = Arc::new(MemorySessionStore::new(config.session_ttl()));
        Self::new(provider, store, config)
    }

    /// Service configuration
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Session store
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Validate a query, open a session for it and return page 1.
    ///
    /// If page 1 cannot be fetched the session is discarded and the error
    /// returned.
    pub async fn start_query(&self, request: &QueryRequest) -> Result<PageResult> {
        let query = build_query(request, &self.config)?;
        let estimate = self.engine.estimate_total(&query).await;

        let handle = self.store.create(query).await?;
        let first_page = {
            let mut session = handle.lock().await;
            session.set_estimate(estimate);
            self.engine.get_page(&mut session, 1).await
        };

        match first_page {
            Ok(page) => {
                handle.touch();
                info!(
                    session_id = %handle.id(),
                    total_count = page.total_count,
                    is_count_exact = page.is_count_exact,
                    total_pages = page.total_pages,
                    "Started query"
                );
                Ok(page)
            }
            Err(e) => {
                warn!(
                    session_id = %handle.id(),
                    error = %e,
                    "First page failed, discarding session"
                );
                self.store.invalidate(handle.id().as_str()).await;
                Err(e)
            }
        }
    }

    /// Return page `page_number` (1-indexed) of a session
    pub async fn get_page(&self, session_id: &str, page_number: u32) -> Result<PageResult> {
        let handle = self.store.get(session_id).await?;
        let page = {
            let mut session = handle.lock().await;
            self.engine.get_page(&mut session, page_number).await
        };
        handle.touch();
        page
    }

    /// Drain a session up to `max_results` records and return them.
    ///
    /// `None` uses the configured default; `Some(0)` means no limit.
    pub async fn get_all(
        &self,
        session_id: &str,
        max_results: Option<usize>,
    ) -> Result<AllResults> {
        let limit = max_results.unwrap_or(self.config.default_max_results);
        let ceiling = (limit > 0).then_some(limit);

        let handle = self.store.get(session_id).await?;
        let all = {
            let mut session = handle.lock().await;
            self.engine.drain(&mut session, ceiling).await?;

            let results: Vec<_> = session
                .pages
                .records()
                .take(ceiling.unwrap_or(usize::MAX))
                .cloned()
                .collect();
            AllResults {
                session_id: session.id.clone(),
                fetched_count: results.len(),
                results,
                is_complete: session.is_complete,
                total_count: session.estimate.count,
                is_count_exact: session.estimate.is_exact,
            }
        };
        handle.touch();
        Ok(all)
    }

    /// Replay a session's results and render them for download
    pub async fn export(&self, session_id: &str, request: &ExportRequest) -> Result<ExportOutput> {
        let format: ExportFormat = request.format.parse()?;

        let handle = self.store.get(session_id).await?;
        let output = {
            let mut session = handle.lock().await;
            self.replayer
                .export(&mut session, format, request.selected_ids.as_deref())
                .await?
        };
        handle.touch();

        info!(
            session_id = %session_id,
            format = ?format,
            records = output.record_count,
            "Exported session"
        );
        Ok(output)
    }

    /// Destroy a session. Invalidating an unknown session is not an error.
    pub async fn invalidate_session(&self, session_id: &str) -> bool {
        self.store.invalidate(session_id).await
    }

    /// Progress of a session
    pub async fn session_summary(&self, session_id: &str) -> Result<SessionSummary> {
        let handle = self.store.get(session_id).await?;
        let session = handle.lock().await;

        Ok(SessionSummary {
            session_id: session.id.clone(),
            filter: session.query.filter.clone(),
            attributes: session.query.attributes.clone(),
            page_size: session.query.page_size,
            cached_pages: session.pages.len(),
            cached_records: session.pages.record_count(),
            is_complete: session.is_complete,
            total_count: session.estimate.count,
            is_count_exact: session.estimate.is_exact,
            total_pages: session.total_pages(),
            partitions: session
                .cursors
                .iter()
                .map(|(partition, state)| PartitionProgress {
                    partition: partition.key().to_string(),
                    cursor: state.name(),
                })
                .collect(),
            created_at: session.created_at,
            last_accessed_at: handle.last_accessed_at(),
            expires_in_secs: handle.expires_in().as_secs(),
        })
    }

    /// Default attributes for an object type
    pub fn attributes(&self, object_type: &str) -> Result<AttributeList> {
        let object_type: ObjectType = object_type.parse()?;
        Ok(AttributeList {
            object_type,
            attributes: object_type
                .default_attributes()
                .iter()
                .map(|a| (*a).to_string())
                .collect(),
        })
    }

    /// Liveness report
    pub async fn health(&self) -> Health {
        Health {
            status: "ok",
            version: crate::VERSION,
            sessions: self.store.len().await,
            timestamp: Utc::now(),
        }
    }
}
