//! TOML configuration.
//!
//! ```toml
//! [source]
//! root = "data"
//!
//! [window]
//! start = "2009-01-01"
//! end = "2019-12-31"
//!
//! [sp500]
//! index_key = "000003"
//! drop_uninformative = false
//! rename_columns = true
//! duplicate_policy = "reject_divergent"
//! ```
//!
//! Every section and key is optional. Dates are quoted `YYYY-MM-DD` strings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compustat::Sp500Options;
use crate::domain::ObservationWindow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrdsConfig {
    pub source: SourceConfig,
    pub window: ObservationWindow,
    pub sp500: Sp500Options,
}

/// Where exported library tables live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub root: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl WrdsConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(start), Some(end)) = (self.window.start, self.window.end) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "window start {start} is after end {end}"
                )));
            }
        }
        if self.sp500.index_key.trim().is_empty() {
            return Err(ConfigError::Invalid("sp500.index_key is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::DuplicatePolicy;
    use chrono::NaiveDate;

    #[test]
    fn empty_config_uses_defaults() {
        let config = WrdsConfig::from_toml("").unwrap();
        assert_eq!(config, WrdsConfig::default());
        assert_eq!(config.source.root, PathBuf::from("data"));
        assert!(config.window.is_unbounded());
        assert_eq!(config.sp500.index_key, "000003");
    }

    #[test]
    fn parses_all_sections() {
        let config = WrdsConfig::from_toml(
            r#"
[source]
root = "/srv/wrds"

[window]
start = "2009-01-01"

[sp500]
drop_uninformative = false
duplicate_policy = "reject_divergent"
"#,
        )
        .unwrap();

        assert_eq!(config.source.root, PathBuf::from("/srv/wrds"));
        assert_eq!(config.window.start, NaiveDate::from_ymd_opt(2009, 1, 1));
        assert_eq!(config.window.end, None);
        assert!(!config.sp500.drop_uninformative);
        assert!(config.sp500.rename_columns);
        assert_eq!(config.sp500.duplicate_policy, DuplicatePolicy::RejectDivergent);
    }

    #[test]
    fn rejects_inverted_window() {
        let result = WrdsConfig::from_toml(
            r#"
[window]
start = "2020-01-01"
end = "2010-01-01"
"#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = WrdsConfig::from_toml("[sp500]\nduplicate_policy = \"keep_first\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = WrdsConfig::default();
        config.window.end = NaiveDate::from_ymd_opt(2019, 12, 31);
        let parsed = WrdsConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
