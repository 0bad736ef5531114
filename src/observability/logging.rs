//! Process logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Environment variable holding filter directives, checked before `RUST_LOG`.
pub const LOG_FILTER_ENV: &str = "FIELD_SNAPSHOTS_LOG";

const DEFAULT_FILTER: &str = "field_snapshots=info";
const VERBOSE_FILTER: &str = "field_snapshots=debug";

/// Output format for process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, multi-line.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to [`LogFormat::Pretty`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directives.
    pub filter: String,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Resolves logging from config settings and the process environment.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let env_filter = std::env::var(LOG_FILTER_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok();
        Self::resolve(settings, verbose, env_filter)
    }

    /// Filter precedence: environment, then `--verbose`, then the config
    /// file, then the default.
    fn resolve(settings: &LoggingSettings, verbose: bool, env_filter: Option<String>) -> Self {
        let filter = env_filter
            .filter(|f| !f.trim().is_empty())
            .or_else(|| verbose.then(|| VERBOSE_FILTER.to_string()))
            .or_else(|| settings.filter.clone())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self {
            format: settings
                .format
                .as_deref()
                .map(LogFormat::parse)
                .unwrap_or_default(),
            filter,
            file: settings.file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json" => LogFormat::Json)]
    #[test_case(" JSON " => LogFormat::Json; "padded upper")]
    #[test_case("pretty" => LogFormat::Pretty)]
    #[test_case("xml" => LogFormat::Pretty)]
    fn test_format_parse(s: &str) -> LogFormat {
        LogFormat::parse(s)
    }

    #[test]
    fn test_filter_precedence() {
        let settings = LoggingSettings {
            filter: Some("field_snapshots=warn".to_string()),
            ..LoggingSettings::default()
        };

        let config = LoggingConfig::resolve(&settings, true, Some("trace".to_string()));
        assert_eq!(config.filter, "trace");

        let config = LoggingConfig::resolve(&settings, true, None);
        assert_eq!(config.filter, VERBOSE_FILTER);

        let config = LoggingConfig::resolve(&settings, false, Some(String::new()));
        assert_eq!(config.filter, "field_snapshots=warn");

        let config = LoggingConfig::resolve(&LoggingSettings::default(), false, None);
        assert_eq!(config, LoggingConfig::default());
    }
}
