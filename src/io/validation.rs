//! Snapshot structure validation.
//!
//! Checks an uploaded document before it reaches the import engine. The
//! engine itself trusts its input shape; this is the gate the CLI runs
//! first.

use crate::models::{PostId, UserId, json_type_name};
use serde_json::{Map, Value};

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Noted, the snapshot can still be imported.
    Warning,
    /// The snapshot must not be imported.
    Error,
}

/// A problem found at a position in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// JSON pointer to the offending entry.
    pub path: String,
    /// Description of the issue.
    pub message: String,
    /// Severity of the issue.
    pub severity: ValidationSeverity,
}

impl ValidationIssue {
    /// Creates a warning issue.
    #[must_use]
    pub fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: ValidationSeverity::Warning,
        }
    }

    /// Creates an error issue.
    #[must_use]
    pub fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            severity: ValidationSeverity::Error,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{path}: {}", self.message)
    }
}

/// Outcome of validating a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Issues in document order.
    pub issues: Vec<ValidationIssue>,
    /// Number of field values found.
    pub value_count: usize,
}

impl ValidationResult {
    /// Whether no error-level issue was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Error-level issues.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Error)
    }

    /// Warning-level issues.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == ValidationSeverity::Warning)
    }

    fn error(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::error(path, message));
    }

    fn warning(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue::warning(path, message));
    }
}

/// Validates snapshot documents.
///
/// Accepted shape:
///
/// - top level: mapping of group key to mapping (an empty list counts as
///   an empty snapshot)
/// - group: mapping of field name to field data
/// - field data: only `options` (or legacy `option`), `users`, `post_types`
/// - `users` and each post type: mapping of positive integer ID to value
/// - values: recursively lists, mappings, strings, integers, booleans and
///   nulls; floating-point numbers are rejected
#[derive(Debug, Clone)]
pub struct SnapshotValidator {
    max_depth: usize,
}

impl Default for SnapshotValidator {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

impl SnapshotValidator {
    /// Creates a validator with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth of a single field value.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Validates snapshot JSON text.
    #[must_use]
    pub fn validate_str(&self, snapshot_json: &str) -> ValidationResult {
        match serde_json::from_str::<Value>(snapshot_json) {
            Ok(value) => self.validate(&value),
            Err(e) => {
                let mut result = ValidationResult::default();
                result.error("", format!("Invalid JSON data: {e}"));
                result
            },
        }
    }

    /// Validates a parsed snapshot document.
    #[must_use]
    pub fn validate(&self, snapshot: &Value) -> ValidationResult {
        let mut result = ValidationResult::default();

        let Some(groups) = mapping_entries(snapshot) else {
            result.error(
                "",
                format!("expected a mapping of field groups, found {}", json_type_name(snapshot)),
            );
            return result;
        };

        for (group_key, fields) in groups {
            let path = pointer("", group_key);
            let Some(fields) = mapping_entries(fields) else {
                result.error(
                    &path,
                    format!("group must be a mapping, found {}", json_type_name(fields)),
                );
                continue;
            };
            if fields.is_empty() {
                result.warning(&path, "group has no fields");
            }

            for (field_name, data) in fields {
                self.validate_field(&pointer(&path, field_name), data, &mut result);
            }
        }

        result
    }

    fn validate_field(&self, path: &str, data: &Value, result: &mut ValidationResult) {
        let Some(contexts) = mapping_entries(data) else {
            result.error(
                path,
                format!("field data must be a mapping, found {}", json_type_name(data)),
            );
            return;
        };

        let has_key = |key: &str| contexts.iter().any(|(k, _)| k.as_str() == key);
        if has_key("option") && has_key("options") {
            result.error(path, "both \"option\" and \"options\" are present");
        }

        for (context, value) in &contexts {
            let context_path = pointer(path, context);
            match context.as_str() {
                "options" => self.validate_value(&context_path, value, 0, result),
                "option" => {
                    result.warning(&context_path, "legacy key \"option\", read as \"options\"");
                    self.validate_value(&context_path, value, 0, result);
                },
                "users" => self.validate_id_map(&context_path, value, "user", result, |k| {
                    UserId::parse(k).is_some()
                }),
                "post_types" => self.validate_post_types(&context_path, value, result),
                other => result.error(&context_path, format!("unknown context \"{other}\"")),
            }
        }
    }

    fn validate_post_types(&self, path: &str, value: &Value, result: &mut ValidationResult) {
        let Some(post_types) = mapping_entries(value) else {
            result.error(
                path,
                format!("post_types must be a mapping, found {}", json_type_name(value)),
            );
            return;
        };
        for (post_type, posts) in post_types {
            self.validate_id_map(&pointer(path, post_type), posts, "post", result, |k| {
                PostId::parse(k).is_some()
            });
        }
    }

    fn validate_id_map(
        &self,
        path: &str,
        value: &Value,
        kind: &str,
        result: &mut ValidationResult,
        valid_id: impl Fn(&str) -> bool,
    ) {
        let Some(entries) = mapping_entries(value) else {
            result.error(
                path,
                format!("{kind} values must be a mapping, found {}", json_type_name(value)),
            );
            return;
        };
        for (key, entry) in entries {
            let entry_path = pointer(path, key);
            if valid_id(key) {
                self.validate_value(&entry_path, entry, 0, result);
            } else {
                result.error(&entry_path, format!("invalid {kind} ID \"{key}\""));
            }
        }
    }

    fn validate_value(
        &self,
        path: &str,
        value: &Value,
        depth: usize,
        result: &mut ValidationResult,
    ) {
        if depth == 0 {
            result.value_count += 1;
        }
        if depth > self.max_depth {
            result.error(path, format!("value nested deeper than {} levels", self.max_depth));
            return;
        }

        match value {
            Value::Number(n) if n.is_f64() => {
                result.error(path, format!("floating-point value {n} is not supported"));
            },
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = pointer(path, &index.to_string());
                    self.validate_value(&item_path, item, depth + 1, result);
                }
            },
            Value::Object(map) => self.validate_map(path, map, depth, result),
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {},
        }
    }

    fn validate_map(
        &self,
        path: &str,
        map: &Map<String, Value>,
        depth: usize,
        result: &mut ValidationResult,
    ) {
        for (key, item) in map {
            self.validate_value(&pointer(path, key), item, depth + 1, result);
        }
    }
}

/// Entries of a mapping position. An empty list is read as an empty
/// mapping, the way PHP encodes an empty associative array.
fn mapping_entries(value: &Value) -> Option<Vec<(&String, &Value)>> {
    match value {
        Value::Object(map) => Some(map.iter().collect()),
        Value::Array(items) if items.is_empty() => Some(Vec::new()),
        _ => None,
    }
}

/// Appends a reference token to a JSON pointer.
fn pointer(base: &str, token: &str) -> String {
    format!("{base}/{}", token.replace('~', "~0").replace('/', "~1"))
}
