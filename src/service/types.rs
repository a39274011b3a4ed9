//! Service request and response types

use crate::session::SessionId;
use crate::types::{ObjectType, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query submission.
///
/// Give either a raw `filter` or an `object_type` (optionally with a
/// `search` term), not both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Raw LDAP-style filter
    #[serde(default)]
    pub filter: Option<String>,

    /// Object type to search for (`computers`, `users`, `groups`)
    #[serde(default)]
    pub object_type: Option<String>,

    /// Free-text term for object type searches
    #[serde(default, alias = "search_term")]
    pub search: Option<String>,

    /// Attribute projection
    #[serde(default)]
    pub attributes: Option<Vec<String>>,

    /// Partitions to search, in result order (empty = whole directory)
    #[serde(default, alias = "ous")]
    pub partitions: Option<Vec<String>>,

    /// Requested page size (clamped to the configured bounds)
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl QueryRequest {
    /// Query by raw filter
    pub fn filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Self::default()
        }
    }

    /// Query by object type and search term
    pub fn object_type(object_type: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            object_type: Some(object_type.into()),
            search: Some(search.into()),
            ..Self::default()
        }
    }

    /// Set partitions
    #[must_use]
    pub fn with_partitions<I, S>(mut self, partitions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions = Some(partitions.into_iter().map(Into::into).collect());
        self
    }

    /// Set attributes
    #[must_use]
    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    /// Set page size
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Result of a "get all" request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllResults {
    pub session_id: SessionId,
    pub results: Vec<Record>,
    /// Whether every partition was drained
    pub is_complete: bool,
    pub fetched_count: usize,
    pub total_count: u64,
    pub is_count_exact: bool,
}

fn default_export_format() -> String {
    "csv".to_string()
}

/// Export request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// `csv` or `json`
    #[serde(default = "default_export_format")]
    pub format: String,

    /// Identities to keep (absent = everything)
    #[serde(default)]
    pub selected_ids: Option<Vec<String>>,
}

impl Default for ExportRequest {
    fn default() -> Self {
        Self {
            format: default_export_format(),
            selected_ids: None,
        }
    }
}

/// Cursor position of one partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionProgress {
    pub partition: String,
    /// `fresh`, `in_progress` or `exhausted`
    pub cursor: &'static str,
}

/// Read-only view of a session's progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub filter: String,
    pub attributes: Vec<String>,
    pub page_size: u32,
    pub cached_pages: usize,
    pub cached_records: usize,
    pub is_complete: bool,
    pub total_count: u64,
    pub is_count_exact: bool,
    pub total_pages: u32,
    pub partitions: Vec<PartitionProgress>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub expires_in_secs: u64,
}

/// Default attributes for an object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeList {
    pub object_type: ObjectType,
    pub attributes: Vec<String>,
}

/// Liveness report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub sessions: usize,
    pub timestamp: DateTime<Utc>,
}
