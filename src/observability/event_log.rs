//! Import event log.
//!
//! An append-only, in-memory record of what an import did, read by the
//! caller afterwards for operator diagnostics. Formatting happens on read.
//! Every append is mirrored to `tracing`.

use chrono::{DateTime, Local};
use std::fmt;

/// `tracing` target event log appends are mirrored to.
const EVENT_TARGET: &str = "field_snapshots::event_log";

/// Timestamp layout used in display entries (local wall-clock time).
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Timestamp layout used in plain formatting, with the UTC offset.
const OFFSET_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Severity of a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogLevel {
    /// Informational (skips, progress, rollback steps).
    Info,
    /// A failure.
    Error,
    /// A completed write.
    Success,
    /// Any other level key, already sanitized.
    Other(String),
}

impl LogLevel {
    /// Parses a level key.
    ///
    /// The key is sanitized first: lowercased, with everything except
    /// ASCII alphanumerics, `_` and `-` removed.
    #[must_use]
    pub fn parse(key: &str) -> Self {
        let key: String = key
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        match key.as_str() {
            "info" => Self::Info,
            "error" => Self::Error,
            "success" => Self::Success,
            _ => Self::Other(key),
        }
    }

    /// Returns the level key.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Info => "info",
            Self::Error => "error",
            Self::Success => "success",
            Self::Other(key) => key,
        }
    }

    /// Returns the display label; unknown levels show their raw key.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Info => "INFO",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
            Self::Other(key) => key,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for LogLevel {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

/// A single immutable log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    timestamp: DateTime<Local>,
}

impl LogEntry {
    /// Entry level.
    #[must_use]
    pub const fn level(&self) -> &LogLevel {
        &self.level
    }

    /// Entry message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Local time the entry was appended, with its UTC offset.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.level.label(),
            self.timestamp.format(TIME_FORMAT),
            self.message
        )
    }
}

/// Append-only event log owned by one import.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry stamped with the current local time.
    pub fn append(&mut self, level: impl Into<LogLevel>, message: impl Into<String>) {
        let level = level.into();
        let message = message.into();

        match level {
            LogLevel::Error => tracing::error!(target: EVENT_TARGET, "{message}"),
            LogLevel::Success => {
                tracing::info!(target: EVENT_TARGET, outcome = "success", "{message}");
            },
            LogLevel::Info | LogLevel::Other(_) => {
                tracing::debug!(target: EVENT_TARGET, level = level.key(), "{message}");
            },
        }

        self.entries.push(LogEntry {
            level,
            message,
            timestamp: Local::now(),
        });
    }

    /// Appends an `info` entry.
    pub fn info(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Info, message);
    }

    /// Appends an `error` entry.
    pub fn error(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Error, message);
    }

    /// Appends a `success` entry.
    pub fn success(&mut self, message: impl Into<String>) {
        self.append(LogLevel::Success, message);
    }

    /// Formatted entries in insertion order: `[LEVEL] <time>: <message>`.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Raw entries in insertion order.
    #[must_use]
    pub fn records(&self) -> &[LogEntry] {
        &self.entries
    }

    /// All entries as plain lines: `<time><offset> <level> <message>\n`.
    #[must_use]
    pub fn formatted(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{} {} {}\n",
                    e.timestamp.format(OFFSET_TIME_FORMAT),
                    e.level.key(),
                    e.message
                )
            })
            .collect()
    }

    /// Number of entries at a level.
    #[must_use]
    pub fn count(&self, level: &LogLevel) -> usize {
        self.entries.iter().filter(|e| &e.level == level).count()
    }

    /// Whether any `error` entry was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(&LogLevel::Error) > 0
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use test_case::test_case;

    #[test_case("info" => "INFO")]
    #[test_case("ERROR" => "ERROR")]
    #[test_case("success" => "SUCCESS")]
    #[test_case("warning" => "warning"; "unknown passes through")]
    #[test_case("No tice!" => "notice"; "sanitized")]
    fn test_level_labels(key: &str) -> String {
        LogLevel::parse(key).label().to_string()
    }

    #[test]
    fn test_entries_keep_insertion_order_and_format() {
        let mut log = EventLog::new();
        log.info("first");
        log.append("success", "second");
        log.append("custom", "third");

        let entries = log.entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].starts_with("[INFO] "));
        assert!(entries[0].ends_with(": first"));
        assert!(entries[1].starts_with("[SUCCESS] "));
        assert!(entries[2].starts_with("[custom] "));
    }

    #[test]
    fn test_timestamp_layout() {
        let mut log = EventLog::new();
        log.error("boom");
        let line = &log.entries()[0];
        // "[ERROR] YYYY-MM-DD HH:MM:SS: boom"
        let stamp = &line["[ERROR] ".len().."[ERROR] ".len() + 19];
        assert!(NaiveDateTime::parse_from_str(stamp, TIME_FORMAT).is_ok());
    }

    #[test]
    fn test_plain_formatting_carries_offset() {
        let mut log = EventLog::new();
        log.info("a");
        let entry = &log.records()[0];

        let line = log.formatted();
        let (stamp, rest) = line.split_at(25);
        assert_eq!(rest, " info a\n");
        let parsed = DateTime::parse_from_str(stamp, OFFSET_TIME_FORMAT).unwrap();
        assert_eq!(parsed.offset(), entry.timestamp().offset());
        assert_eq!(parsed.timestamp(), entry.timestamp().timestamp());
    }

    #[test]
    fn test_plain_formatting() {
        let mut log = EventLog::new();
        log.info("a");
        log.error("b");
        let text = log.formatted();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" info a"));
        assert!(lines[1].ends_with(" error b"));
    }

    #[test]
    fn test_counts_and_clear() {
        let mut log = EventLog::new();
        log.info("a");
        log.error("b");
        log.error("c");
        assert_eq!(log.count(&LogLevel::Error), 2);
        assert!(log.has_errors());

        log.clear();
        assert!(log.is_empty());
        assert!(!log.has_errors());
    }
}
