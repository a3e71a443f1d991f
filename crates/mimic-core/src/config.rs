//! Registry configuration.
//!
//! Loaded from YAML (conventionally `mimic.yml`) with environment overrides:
//!
//! ```yaml
//! default_mode: relaxed
//! max_reported_invocations: 10
//! catch_predicate_panics: true
//! ```

use crate::error::{MockError, Result};
use mimic_proto::MockMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable overriding `default_mode`.
pub const ENV_DEFAULT_MODE: &str = "MIMIC_DEFAULT_MODE";

/// Settings shared by every mock created through a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Mode used by `MockRegistry::mock` when none is given.
    pub default_mode: MockMode,

    /// Maximum invocations listed in a verification mismatch report.
    pub max_reported_invocations: usize,

    /// Report panics inside predicate matchers as evaluation errors
    /// instead of unwinding through the mock.
    pub catch_predicate_panics: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_mode: MockMode::Strict,
            max_reported_invocations: 20,
            catch_predicate_panics: true,
        }
    }
}

impl MockConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| MockError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = ?path, "Loaded mock config");
        Self::parse_yaml(&content)
    }

    /// Parses configuration from a YAML string. Missing keys take defaults.
    pub fn parse_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Applies overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(ENV_DEFAULT_MODE) {
            self.default_mode = raw.parse().map_err(|e: mimic_proto::ParseModeError| {
                MockError::ConfigValue {
                    key: ENV_DEFAULT_MODE.to_string(),
                    message: e.to_string(),
                }
            })?;
            debug!(mode = %self.default_mode, "Default mode overridden from environment");
        }
        Ok(self)
    }
}
