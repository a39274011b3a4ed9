//! Export module
//!
//! Replays a session's full result set and renders it for download.
//!
//! # Overview
//!
//! Export drains every partition of a session through the pagination engine,
//! so pages already produced by earlier page requests are reused and new
//! pages are cached as they are produced. The flattened result set can be
//! narrowed to a selection of record identities before it is rendered.

mod formatters;

pub use formatters::{formatter_for, CsvFormatter, JsonFormatter, RecordFormatter};

use crate::error::Result;
use crate::pagination::PaginationEngine;
use crate::session::Session;
use crate::types::{ExportFormat, Record};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// Rendered export document
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// Document bytes
    pub bytes: Bytes,
    /// Suggested download filename
    pub filename: String,
    /// MIME type
    pub content_type: &'static str,
    /// Number of records rendered
    pub record_count: usize,
}

/// Suggested filename for an export produced at `at`
pub fn export_filename(at: DateTime<Utc>, extension: &str) -> String {
    format!("directory_export_{}.{extension}", at.format("%Y%m%d_%H%M%S"))
}

/// Drains sessions and renders their results
#[derive(Clone)]
pub struct ExportReplayer {
    engine: PaginationEngine,
    max_results: Option<usize>,
    identity_attribute: String,
}

impl ExportReplayer {
    /// Create a replayer. `max_results` of `None` drains without limit.
    pub fn new(
        engine: PaginationEngine,
        max_results: Option<usize>,
        identity_attribute: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            max_results,
            identity_attribute: identity_attribute.into(),
        }
    }

    /// Materialize the session's result set in page order.
    ///
    /// With `selected_ids`, only records whose identity attribute is in the
    /// set are kept; an empty selection yields nothing. A provider error
    /// while draining is returned as is and leaves produced pages cached.
    pub async fn replay(
        &self,
        session: &mut Session,
        selected_ids: Option<&[String]>,
    ) -> Result<Vec<Record>> {
        self.engine.drain(session, self.max_results).await?;

        let limit = self.max_results.unwrap_or(usize::MAX);
        let records = session.pages.records().take(limit);

        let records: Vec<Record> = match selected_ids {
            None => records.cloned().collect(),
            Some(ids) => {
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                records
                    .filter(|record| {
                        record
                            .identity(&self.identity_attribute)
                            .is_some_and(|id| wanted.contains(id))
                    })
                    .cloned()
                    .collect()
            }
        };

        debug!(
            session_id = %session.id,
            records = records.len(),
            complete = session.is_complete,
            "Replayed session for export"
        );
        Ok(records)
    }

    /// Replay and render the session in `format`
    pub async fn export(
        &self,
        session: &mut Session,
        format: ExportFormat,
        selected_ids: Option<&[String]>,
    ) -> Result<ExportOutput> {
        let records = self.replay(session, selected_ids).await?;
        let formatter = formatter_for(format);
        let bytes = formatter.format(&records)?;

        Ok(ExportOutput {
            bytes: Bytes::from(bytes),
            filename: export_filename(Utc::now(), formatter.extension()),
            content_type: formatter.content_type(),
            record_count: records.len(),
        })
    }
}

#[cfg(test)]
mod tests;
