//! Engine configuration
//!
//! Passed to the orchestrator at construction time. There is no global
//! switch; two orchestrators with different configs can run side by side.
//!
//! ```toml
//! [integrity]
//! enabled = true
//! timeout_ms = 2000
//! concurrent = true
//!
//! [integrity.dependents]
//! AssignmentEntity = false
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Well-formed but unusable value
    #[error("invalid configuration value: {0}")]
    Invalid(String),
}

/// Referential integrity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrityConfig {
    /// Master switch; when off every validation passes without queries
    pub enabled: bool,
    /// Overall timeout for one validation call in milliseconds
    pub timeout_ms: u64,
    /// Run counters concurrently instead of one after another
    pub concurrent: bool,
    /// Per-dependent-type switches; `false` excludes that dependent
    pub dependents: BTreeMap<String, bool>,
}

impl IntegrityConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With master switch
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With overall timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With execution mode
    #[inline]
    #[must_use]
    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Exclude a dependent type from validation
    #[inline]
    #[must_use]
    pub fn without_dependent(mut self, dependent_type: impl Into<String>) -> Self {
        self.dependents.insert(dependent_type.into(), false);
        self
    }

    /// Overall timeout as a duration
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether references held by this dependent type are checked
    #[inline]
    #[must_use]
    pub fn is_dependent_enabled(&self, dependent_type: &str) -> bool {
        self.dependents.get(dependent_type).copied().unwrap_or(true)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` for a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be greater than zero".into()));
        }
        Ok(())
    }

    /// Parse TOML, either at the document root or under `[integrity]`
    ///
    /// # Errors
    /// - `ConfigError::Parse` on malformed TOML or unknown keys
    /// - `ConfigError::Invalid` if [`IntegrityConfig::validate`] fails
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let mut document: toml::Table = toml::from_str(source)?;
        let config: Self = match document.remove("integrity") {
            Some(section) if document.is_empty() => section.try_into()?,
            Some(_) => {
                return Err(ConfigError::Invalid(
                    "unexpected keys next to [integrity]".into(),
                ))
            }
            None => toml::Value::Table(document).try_into()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `ConfigError::Io` if the file cannot be read
    /// - any [`IntegrityConfig::from_toml_str`] error
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
            concurrent: true,
            dependents: BTreeMap::new(),
        }
    }
}
