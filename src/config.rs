//! Service configuration
//!
//! Every field has a default, so an empty YAML document (or no config file
//! at all) yields a working service.

use crate::error::{Error, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for sessions, paging and the directory dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Idle time after which a session expires
    pub session_ttl_secs: u64,

    /// Smallest page size a query may use
    pub min_page_size: u32,

    /// Largest page size a query may use
    pub max_page_size: u32,

    /// Page size when a query gives none
    pub default_page_size: u32,

    /// Count substituted for a partition whose count call fails
    pub count_fallback: u64,

    /// Bound on every directory call
    pub provider_timeout_ms: u64,

    /// Record ceiling for "get all" when the caller gives none (0 = unlimited)
    pub default_max_results: usize,

    /// Record ceiling for exports (0 = unlimited)
    pub max_export_results: usize,

    /// How often expired sessions are swept
    pub sweep_interval_secs: u64,

    /// Attribute used to identify records for export selection
    pub identity_attribute: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 30 * 60,
            min_page_size: 10,
            max_page_size: 200,
            default_page_size: 50,
            count_fallback: 1000,
            provider_timeout_ms: 30_000,
            default_max_results: 10_000,
            max_export_results: 10_000,
            sweep_interval_secs: 60,
            identity_attribute: "distinguishedName".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        // An empty document deserializes as null rather than an empty mapping
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the values are usable together
    pub fn validate(&self) -> Result<()> {
        if self.min_page_size == 0 {
            return Err(Error::config("min_page_size must be at least 1"));
        }
        if self.min_page_size > self.max_page_size {
            return Err(Error::config(format!(
                "min_page_size ({}) exceeds max_page_size ({})",
                self.min_page_size, self.max_page_size
            )));
        }
        if !(self.min_page_size..=self.max_page_size).contains(&self.default_page_size) {
            return Err(Error::config(format!(
                "default_page_size ({}) must be within {}..={}",
                self.default_page_size, self.min_page_size, self.max_page_size
            )));
        }
        if self.session_ttl_secs == 0 {
            return Err(Error::config("session_ttl_secs must be positive"));
        }
        if self.provider_timeout_ms == 0 {
            return Err(Error::config("provider_timeout_ms must be positive"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::config("sweep_interval_secs must be positive"));
        }
        if self.identity_attribute.trim().is_empty() {
            return Err(Error::config("identity_attribute must not be empty"));
        }
        Ok(())
    }

    /// Session idle TTL
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Directory call timeout
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Sweep interval
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Resolve a requested page size: default when absent, clamped otherwise
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested.map_or(self.default_page_size, |size| {
            size.max(self.min_page_size).min(self.max_page_size)
        })
    }

    /// Export ceiling, `None` when unlimited
    pub fn export_ceiling(&self) -> Option<usize> {
        (self.max_export_results > 0).then_some(self.max_export_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.session_ttl(), Duration::from_secs(1800));
        assert_eq!(config.default_page_size, 50);
        assert_eq!(config.count_fallback, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        assert_eq!(ServiceConfig::from_yaml_str("").unwrap(), ServiceConfig::default());
    }

    #[test]
    fn test_partial_yaml() {
        let config =
            ServiceConfig::from_yaml_str("session_ttl_secs: 60\nmax_page_size: 100\n").unwrap();
        assert_eq!(config.session_ttl_secs, 60);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.min_page_size, 10);
    }

    #[test_case(None => 50; "default when absent")]
    #[test_case(Some(1) => 10; "clamped up to min")]
    #[test_case(Some(75) => 75; "within bounds")]
    #[test_case(Some(5000) => 200; "clamped down to max")]
    fn test_page_size(requested: Option<u32>) -> u32 {
        ServiceConfig::default().page_size(requested)
    }

    #[test_case("min_page_size: 0" ; "zero min")]
    #[test_case("min_page_size: 300" ; "min above max")]
    #[test_case("default_page_size: 5" ; "default below min")]
    #[test_case("session_ttl_secs: 0" ; "zero ttl")]
    #[test_case("provider_timeout_ms: 0" ; "zero timeout")]
    #[test_case("identity_attribute: ' '" ; "blank identity")]
    fn test_invalid_config(yaml: &str) {
        let err = ServiceConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "{err}");
    }

    #[test]
    fn test_page_size_with_inverted_bounds() {
        let config = ServiceConfig {
            min_page_size: 300,
            max_page_size: 100,
            ..ServiceConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.page_size(Some(150)), 100);
    }

    #[test]
    fn test_export_ceiling() {
        let mut config = ServiceConfig::default();
        assert_eq!(config.export_ceiling(), Some(10_000));
        config.max_export_results = 0;
        assert_eq!(config.export_ceiling(), None);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "count_fallback: 250").unwrap();

        let config = ServiceConfig::from_file(file.path()).unwrap();
        assert_eq!(config.count_fallback, 250);

        let err = ServiceConfig::from_file("/nonexistent/dirsearch.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
