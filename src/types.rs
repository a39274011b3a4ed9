//! Common types used throughout dirsearch
//!
//! This module contains the record shape returned by directory providers,
//! partition identifiers, and the small enums shared by the service and CLI.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Ordered JSON object type (`preserve_order` keeps insertion order)
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Record
// ============================================================================

/// A single directory entry.
///
/// An ordered mapping from attribute name to a nullable value. Providers
/// normalise whatever their backend returns into this shape, so the rest of
/// the crate never has to probe for missing keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(JsonObject);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute (builder style)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// Get an attribute by its exact name
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    /// Get an attribute ignoring ASCII case, as directory attribute names are
    pub fn get_ignore_case(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// Identity of this record (string value of the identity attribute)
    pub fn identity(&self, attribute: &str) -> Option<&str> {
        self.get_ignore_case(attribute).and_then(JsonValue::as_str)
    }

    /// Attribute names in order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Iterate attributes in order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Access the underlying map
    pub fn as_map(&self) -> &JsonObject {
        &self.0
    }
}

impl From<JsonObject> for Record {
    fn from(map: JsonObject) -> Self {
        Self(map)
    }
}

impl TryFrom<JsonValue> for Record {
    type Error = Error;

    fn try_from(value: JsonValue) -> Result<Self> {
        match value {
            JsonValue::Object(map) => Ok(Self(map)),
            other => Err(Error::validation(format!(
                "expected a JSON object for a directory record, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Partition
// ============================================================================

/// Key used for the default partition wherever a string key is needed
pub const ROOT_PARTITION_KEY: &str = "_ROOT_";

/// A bounded search scope within the directory.
///
/// `Default` is the root scope of the directory; `Named` is a base DN.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Root scope
    Default,
    /// Named search base
    Named(String),
}

impl Partition {
    /// Create a named partition
    pub fn named(base: impl Into<String>) -> Self {
        Self::Named(base.into())
    }

    /// Stable string key for maps and logs
    pub fn key(&self) -> &str {
        match self {
            Self::Default => ROOT_PARTITION_KEY,
            Self::Named(base) => base,
        }
    }

    /// Search base, if any
    pub fn base(&self) -> Option<&str> {
        match self {
            Self::Default => None,
            Self::Named(base) => Some(base),
        }
    }

    /// Whether this is the root scope
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// Object Type
// ============================================================================

/// Directory object classes the service knows how to search for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Computer accounts
    Computers,
    /// User accounts
    Users,
    /// Groups
    Groups,
}

impl ObjectType {
    /// All object types
    pub const ALL: [ObjectType; 3] = [Self::Computers, Self::Users, Self::Groups];

    /// Name used in URLs and requests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Computers => "computers",
            Self::Users => "users",
            Self::Groups => "groups",
        }
    }

    /// Attributes offered by default for this object type
    pub fn default_attributes(&self) -> &'static [&'static str] {
        match self {
            Self::Computers => &[
                "Name",
                "OperatingSystem",
                "LastLogonDate",
                "IPv4Address",
                "DistinguishedName",
                "Enabled",
                "ManagedBy",
                "Description",
            ],
            Self::Users => &[
                "Name",
                "SamAccountName",
                "EmailAddress",
                "Enabled",
                "LastLogonDate",
                "DistinguishedName",
                "Department",
                "Title",
            ],
            Self::Groups => &[
                "Name",
                "GroupCategory",
                "GroupScope",
                "Description",
                "DistinguishedName",
                "ManagedBy",
            ],
        }
    }

    /// Build a search filter for a free-text term.
    ///
    /// The term must already have passed search-term validation.
    pub fn build_filter(&self, term: &str) -> String {
        match self {
            Self::Computers => format!("(&(objectClass=computer)(cn=*{term}*))"),
            Self::Users => {
                format!("(&(objectClass=user)(|(cn=*{term}*)(sAMAccountName=*{term}*)))")
            }
            Self::Groups => format!("(&(objectClass=group)(cn=*{term}*))"),
        }
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "computers" => Ok(Self::Computers),
            "users" => Ok(Self::Users),
            "groups" => Ok(Self::Groups),
            _ => Err(Error::validation(format!("Invalid object type: {s}"))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Export Format
// ============================================================================

/// Output format for exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma separated values
    #[default]
    Csv,
    /// Pretty-printed JSON array
    Json,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(Error::validation(format!(
                "Unsupported export format '{s}'. Use 'csv' or 'json'."
            ))),
        }
    }
}
