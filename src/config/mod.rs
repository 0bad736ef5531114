//! Configuration management.
//!
//! Settings come from a TOML file, then environment overrides:
//!
//! ```toml
//! rollback_on_failure = true
//! event_logging = false
//! formatted_field_types = ["gallery"]
//!
//! [logging]
//! format = "pretty"
//! filter = "field_snapshots=debug"
//! file = "/var/log/field-snapshots.log"
//! ```

use crate::io::FormattedKinds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "FIELD_SNAPSHOTS_CONFIG_PATH";
/// Environment override for `rollback_on_failure`.
pub const ROLLBACK_ENV: &str = "FIELD_SNAPSHOTS_ROLLBACK";
/// Environment override for `event_logging`.
pub const EVENT_LOGGING_ENV: &str = "FIELD_SNAPSHOTS_EVENT_LOGGING";

const APP_DIR: &str = "field-snapshots";

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotsConfig {
    /// Roll back applied changes when an import fails.
    pub rollback_on_failure: bool,
    /// Show the event log after an import.
    pub event_logging: bool,
    /// Extra field types read with formatting, on top of the built-in ones.
    pub formatted_field_types: Vec<String>,
    /// Process logging settings.
    pub logging: LoggingSettings,
    /// File the configuration was loaded from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `pretty` or `json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// `EnvFilter` directives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// Append logs to this file instead of stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Roll back on failure.
    pub rollback_on_failure: Option<bool>,
    /// Show the event log.
    pub event_logging: Option<bool>,
    /// Extra formatted field types.
    pub formatted_field_types: Option<Vec<String>>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

impl Default for SnapshotsConfig {
    fn default() -> Self {
        Self {
            rollback_on_failure: true,
            event_logging: false,
            formatted_field_types: Vec::new(),
            logging: LoggingSettings::default(),
            source: None,
        }
    }
}

impl SnapshotsConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::from_config_file(file);
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/field-snapshots/` on macOS)
    /// 2. XDG config dir (`~/.config/field-snapshots/`)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join(APP_DIR).join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join(APP_DIR)
                .join("config.toml"),
        ];

        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable config file"
                ),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `SnapshotsConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(v) = file.rollback_on_failure {
            config.rollback_on_failure = v;
        }
        if let Some(v) = file.event_logging {
            config.event_logging = v;
        }
        if let Some(types) = file.formatted_field_types {
            config.formatted_field_types = types;
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies `FIELD_SNAPSHOTS_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ROLLBACK_ENV).as_deref().and_then(parse_flag) {
            self.rollback_on_failure = v;
        }
        if let Some(v) = lookup(EVENT_LOGGING_ENV).as_deref().and_then(parse_flag) {
            self.event_logging = v;
        }
        self
    }

    /// Field types read with formatting: the built-in set plus configured ones.
    #[must_use]
    pub fn formatted_kinds(&self) -> FormattedKinds {
        FormattedKinds::new().with_types(self.formatted_field_types.iter().cloned())
    }

    /// Renders the effective configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::operation("serialize_config", e))
    }
}

/// Parses a boolean environment value.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!(value = other, "Ignoring unrecognised boolean override");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = SnapshotsConfig::new();
        assert!(config.rollback_on_failure);
        assert!(!config.event_logging);
        assert!(config.formatted_field_types.is_empty());
        assert!(config.source.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
rollback_on_failure = false
event_logging = true
formatted_field_types = ["gallery"]

[logging]
format = "json"
filter = "field_snapshots=trace"
"#
        )
        .unwrap();

        let config = SnapshotsConfig::load_from_file(file.path()).unwrap();
        assert!(!config.rollback_on_failure);
        assert!(config.event_logging);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        assert_eq!(config.source.as_deref(), Some(file.path()));

        let kinds = config.formatted_kinds();
        assert!(kinds.contains("gallery"));
        assert!(kinds.contains("repeater"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "event_logging = true").unwrap();

        let config = SnapshotsConfig::load_from_file(file.path()).unwrap();
        assert!(config.rollback_on_failure);
        assert!(config.event_logging);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "rollback_on_failure = ").unwrap();

        let err = SnapshotsConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse_config_file"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SnapshotsConfig::load_from_file(&dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test_case("true" => Some(true))]
    #[test_case(" ON " => Some(true); "padded on")]
    #[test_case("0" => Some(false))]
    #[test_case("no" => Some(false))]
    #[test_case("maybe" => None)]
    fn test_parse_flag(value: &str) -> Option<bool> {
        parse_flag(value)
    }

    #[test]
    fn test_overrides() {
        let config = SnapshotsConfig::new().with_overrides(|key| match key {
            ROLLBACK_ENV => Some("false".to_string()),
            EVENT_LOGGING_ENV => Some("1".to_string()),
            _ => None,
        });
        assert!(!config.rollback_on_failure);
        assert!(config.event_logging);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = SnapshotsConfig {
            formatted_field_types: vec!["gallery".to_string()],
            ..SnapshotsConfig::default()
        };
        let rendered = config.to_toml().unwrap();
        let file: ConfigFile = toml::from_str(&rendered).unwrap();
        assert_eq!(SnapshotsConfig::from_config_file(file), config);
    }
}
