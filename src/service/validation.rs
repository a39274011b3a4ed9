//! Query validation
//!
//! Turns a [`QueryRequest`] into a [`SearchQuery`]. Everything here runs
//! before any directory call, so a rejected query costs nothing.

use super::types::QueryRequest;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::filter;
use crate::session::SearchQuery;
use crate::types::{ObjectType, Partition, ROOT_PARTITION_KEY};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters allowed in a free-text search term
static SEARCH_TERM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-@._]*$").unwrap());

/// LDAP attribute descriptor
static ATTRIBUTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").unwrap());

/// Build a validated query from a request
pub fn build_query(request: &QueryRequest, config: &ServiceConfig) -> Result<SearchQuery> {
    let (filter, object_type) = resolve_filter(request)?;

    let attributes = match (&request.attributes, object_type) {
        (Some(attributes), _) if !attributes.is_empty() => validate_attributes(attributes)?,
        (_, Some(object_type)) => object_type
            .default_attributes()
            .iter()
            .map(|a| (*a).to_string())
            .collect(),
        _ => Vec::new(),
    };

    Ok(SearchQuery {
        partitions: parse_partitions(request.partitions.as_deref())?,
        filter,
        attributes,
        page_size: config.page_size(request.page_size),
    })
}

/// Work out the filter expression and the object type it came from, if any
fn resolve_filter(request: &QueryRequest) -> Result<(String, Option<ObjectType>)> {
    match (&request.filter, &request.object_type) {
        (Some(_), Some(_)) => Err(Error::validation(
            "Give either a filter or an object type, not both",
        )),
        (None, None) => Err(Error::validation("A filter or an object type is required")),
        (Some(raw), None) => {
            // Round-trip through the parser to normalise and reject bad input
            let parsed = filter::parse(raw)?;
            Ok((parsed.to_string(), None))
        }
        (None, Some(name)) => {
            let object_type: ObjectType = name.parse()?;
            let term = request.search.as_deref().unwrap_or("").trim();
            validate_search_term(term)?;
            Ok((object_type.build_filter(term), Some(object_type)))
        }
    }
}

/// Reject search terms outside the safe character set
pub fn validate_search_term(term: &str) -> Result<()> {
    if SEARCH_TERM_REGEX.is_match(term) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Search term '{term}' contains invalid characters"
        )))
    }
}

/// Check attribute names, dropping case-insensitive duplicates
pub fn validate_attributes(attributes: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(attributes.len());

    for attribute in attributes {
        let attribute = attribute.trim();
        if !ATTRIBUTE_REGEX.is_match(attribute) {
            return Err(Error::validation(format!(
                "Invalid attribute name '{attribute}'"
            )));
        }
        if seen.insert(attribute.to_ascii_lowercase()) {
            valid.push(attribute.to_string());
        }
    }
    Ok(valid)
}

/// Parse partition names. No names means the whole directory.
pub fn parse_partitions(names: Option<&[String]>) -> Result<Vec<Partition>> {
    let names = names.unwrap_or_default();
    if names.is_empty() {
        return Ok(vec![Partition::Default]);
    }

    let mut seen = HashSet::new();
    let mut partitions = Vec::with_capacity(names.len());

    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Partition names must not be blank"));
        }

        let partition = if name == ROOT_PARTITION_KEY {
            Partition::Default
        } else {
            Partition::named(name)
        };
        if !seen.insert(partition.key().to_ascii_lowercase()) {
            return Err(Error::validation(format!("Duplicate partition '{name}'")));
        }
        partitions.push(partition);
    }
    Ok(partitions)
}
