//! In-memory directory provider
//!
//! Serves paged searches over a fixed set of entries loaded from YAML.
//! Named partitions are DN subtrees of the directory's base DN; the default
//! partition is the whole directory.

use super::types::{ContinuationToken, CountEstimate, DirectoryProvider, SearchPage, SearchRequest};
use crate::error::{Error, Result};
use crate::filter::{self, Filter};
use crate::types::{JsonValue, Partition, Record};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Attribute every entry must carry
const DN_ATTRIBUTE: &str = "distinguishedName";

/// YAML shape of a directory fixture
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryFixture {
    /// Root of the directory tree (e.g. `DC=example,DC=com`)
    pub base_dn: String,

    /// Counts above this are reported as inexact estimates
    #[serde(default)]
    pub count_limit: Option<u64>,

    /// Directory entries in search order
    #[serde(default)]
    pub entries: Vec<Record>,
}

/// Directory provider backed by in-memory entries
#[derive(Debug)]
pub struct MemoryDirectory {
    base_dn: String,
    count_limit: Option<u64>,
    entries: Vec<Record>,
    latency: Option<Duration>,
    search_calls: AtomicUsize,
}

impl MemoryDirectory {
    /// Create a directory from entries.
    ///
    /// Every entry must have a string `distinguishedName`.
    pub fn new(base_dn: impl Into<String>, entries: Vec<Record>) -> Result<Self> {
        if let Some(position) = entries.iter().position(|e| e.identity(DN_ATTRIBUTE).is_none()) {
            return Err(Error::config(format!(
                "Directory entry #{position} has no {DN_ATTRIBUTE}"
            )));
        }

        Ok(Self {
            base_dn: base_dn.into(),
            count_limit: None,
            entries,
            latency: None,
            search_calls: AtomicUsize::new(0),
        })
    }

    /// Create a directory from a parsed fixture
    pub fn from_fixture(fixture: DirectoryFixture) -> Result<Self> {
        let mut directory = Self::new(fixture.base_dn, fixture.entries)?;
        directory.count_limit = fixture.count_limit;
        Ok(directory)
    }

    /// Parse a fixture from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let fixture: DirectoryFixture = serde_yaml::from_str(yaml)?;
        Self::from_fixture(fixture)
    }

    /// Load a fixture from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read directory file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Report counts above `limit` as inexact
    #[must_use]
    pub fn with_count_limit(mut self, limit: u64) -> Self {
        self.count_limit = Some(limit);
        self
    }

    /// Delay every search call (simulates a slow directory)
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Base DN of the directory
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of search calls served so far
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Entries under `partition` matching `filter`, in directory order
    fn matching(
        &self,
        partition: &Partition,
        filter: &Filter,
        operation: &str,
    ) -> Result<Vec<&Record>> {
        if let Some(base) = partition.base() {
            if !dn_within(base, &self.base_dn) {
                return Err(Error::provider(
                    partition.key(),
                    operation,
                    format!("no such object: '{base}' is outside '{}'", self.base_dn),
                ));
            }
        }

        Ok(self
            .entries
            .iter()
            .filter(|entry| match partition.base() {
                Some(base) => entry
                    .identity(DN_ATTRIBUTE)
                    .is_some_and(|dn| dn_within(dn, base)),
                None => true,
            })
            .filter(|entry| filter.matches(entry))
            .collect())
    }

    fn parse_filter(partition: &Partition, operation: &str, raw: &str) -> Result<Filter> {
        filter::parse(raw).map_err(|e| Error::provider(partition.key(), operation, e.to_string()))
    }

    fn encode_token(partition: &Partition, offset: usize) -> ContinuationToken {
        let state = format!("{}\n{offset}", partition.key());
        ContinuationToken::new(BASE64.encode(state))
    }

    fn decode_token(partition: &Partition, token: &ContinuationToken) -> Result<usize> {
        let invalid = || Error::provider(partition.key(), "search", "invalid continuation token");

        let decoded = BASE64.decode(token.as_bytes()).map_err(|_| invalid())?;
        let text = String::from_utf8(decoded).map_err(|_| invalid())?;
        let (key, offset) = text.rsplit_once('\n').ok_or_else(invalid)?;
        if key != partition.key() {
            return Err(invalid());
        }
        offset.parse().map_err(|_| invalid())
    }
}

#[async_trait]
impl DirectoryProvider for MemoryDirectory {
    async fn search(&self, request: SearchRequest<'_>) -> Result<SearchPage> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let partition = request.partition;
        let filter = Self::parse_filter(partition, "search", request.filter)?;
        let matches = self.matching(partition, &filter, "search")?;

        let start = match request.token {
            Some(token) => Self::decode_token(partition, token)?,
            None => 0,
        };
        let page_size = request.page_size.max(1) as usize;
        let end = (start + page_size).min(matches.len());

        let entries: Vec<Record> = matches
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|entry| project(entry, request.attributes))
            .collect();

        debug!(
            partition = %partition,
            start,
            returned = entries.len(),
            total = matches.len(),
            "Served directory page"
        );

        if end < matches.len() {
            Ok(SearchPage::more(entries, Self::encode_token(partition, end)))
        } else {
            Ok(SearchPage::last(entries))
        }
    }

    async fn estimate_count(&self, partition: &Partition, filter: &str) -> Result<CountEstimate> {
        let filter = Self::parse_filter(partition, "count", filter)?;
        let count = self.matching(partition, &filter, "count")?.len() as u64;

        Ok(match self.count_limit {
            Some(limit) if count > limit => CountEstimate::approximate(limit),
            _ => CountEstimate::exact(count),
        })
    }
}

/// Whether `dn` equals `base` or lies beneath it
fn dn_within(dn: &str, base: &str) -> bool {
    let dn = dn.to_ascii_lowercase();
    let base = base.to_ascii_lowercase();
    dn == base || dn.ends_with(&format!(",{base}"))
}

/// Normalise an entry to the requested attribute set.
///
/// The DN always comes first; requested attributes the entry lacks are null.
fn project(entry: &Record, attributes: &[String]) -> Record {
    if attributes.is_empty() {
        return entry.clone();
    }

    let mut record = Record::new();
    if let Some((name, value)) = entry
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(DN_ATTRIBUTE))
    {
        record.insert(name.clone(), value.clone());
    }
    for attribute in attributes {
        if attribute.eq_ignore_ascii_case(DN_ATTRIBUTE) {
            continue;
        }
        let value = entry
            .get_ignore_case(attribute)
            .cloned()
            .unwrap_or(JsonValue::Null);
        record.insert(attribute.clone(), value);
    }
    record
}
