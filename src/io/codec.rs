//! Field value codec.
//!
//! Translates between a raw stored field value and its exportable shape.
//! Plain fields pass through unchanged. Structural fields are rebuilt from
//! their declared sub-fields only:
//!
//! | Kind | Input | Output |
//! |------|-------|--------|
//! | Composite | mapping | mapping of declared, non-null sub-fields |
//! | Repeating list | rows | rows of declared sub-fields, keys kept; `null` when empty |
//! | Variant list | tagged rows | rows with the layout tag plus that layout's sub-fields |
//!
//! Sub-field values go back through [`FieldProcessor::process`], so nesting
//! depth is unbounded.

use crate::models::{FLEXIBLE_CONTENT_TYPE, FieldDescriptor, FieldKind, GROUP_TYPE, LAYOUT_TAG};
use crate::models::{Layout, REPEATER_TYPE};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Field type names whose values must be read with formatting applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedKinds(BTreeSet<String>);

impl Default for FormattedKinds {
    fn default() -> Self {
        Self(
            [GROUP_TYPE, REPEATER_TYPE, FLEXIBLE_CONTENT_TYPE]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}

impl FormattedKinds {
    /// Creates the built-in set (group, repeater, flexible content).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field type name to the set.
    #[must_use]
    pub fn with_type(mut self, field_type: impl Into<String>) -> Self {
        self.0.insert(field_type.into());
        self
    }

    /// Adds several field type names to the set.
    #[must_use]
    pub fn with_types<I, S>(mut self, field_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(field_types.into_iter().map(Into::into));
        self
    }

    /// Whether the set contains a type name.
    #[must_use]
    pub fn contains(&self, field_type: &str) -> bool {
        self.0.contains(field_type)
    }

    /// Iterates the type names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Stateless field value processor.
#[derive(Debug, Clone, Default)]
pub struct FieldProcessor {
    formatted_kinds: FormattedKinds,
}

impl FieldProcessor {
    /// Creates a processor with the built-in formatted kinds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a processor with a custom formatted-kinds set.
    #[must_use]
    pub const fn with_formatted_kinds(formatted_kinds: FormattedKinds) -> Self {
        Self { formatted_kinds }
    }

    /// Returns the formatted-kinds set.
    #[must_use]
    pub const fn formatted_kinds(&self) -> &FormattedKinds {
        &self.formatted_kinds
    }

    /// Whether reads of this field must ask for formatted values.
    ///
    /// Unknown fields (`None`) are read unformatted.
    #[must_use]
    pub fn needs_formatted_retrieval(&self, field: Option<&FieldDescriptor>) -> bool {
        field.is_some_and(|f| self.formatted_kinds.contains(f.type_name()))
    }

    /// Processes a field value according to the field's kind.
    #[must_use]
    pub fn process(&self, field: &FieldDescriptor, value: &Value) -> Value {
        match &field.kind {
            FieldKind::Plain(_) => value.clone(),
            FieldKind::Composite(sub_fields) => self.process_composite(sub_fields, value),
            FieldKind::RepeatingList(sub_fields) => {
                let rows = self.process_rows(value, |row| self.process_sub_fields(sub_fields, row));
                if is_empty_container(&rows) {
                    Value::Null
                } else {
                    rows
                }
            },
            FieldKind::VariantList(layouts) => {
                self.process_rows(value, |row| self.process_variant_row(layouts, row))
            },
        }
    }

    /// Processes a value when its descriptor may be unknown.
    #[must_use]
    pub fn process_optional(&self, field: Option<&FieldDescriptor>, value: &Value) -> Value {
        field.map_or_else(|| value.clone(), |f| self.process(f, value))
    }

    fn process_composite(&self, sub_fields: &[FieldDescriptor], value: &Value) -> Value {
        Value::Object(self.process_sub_fields(sub_fields, value))
    }

    /// Keeps the declared sub-fields present (and non-null) in `row`.
    fn process_sub_fields(
        &self,
        sub_fields: &[FieldDescriptor],
        row: &Value,
    ) -> Map<String, Value> {
        let mut processed = Map::new();
        for sub_field in sub_fields {
            if let Some(sub_value) = lookup(row, &sub_field.name) {
                processed.insert(sub_field.name.clone(), self.process(sub_field, sub_value));
            }
        }
        processed
    }

    fn process_variant_row(&self, layouts: &[Layout], row: &Value) -> Map<String, Value> {
        let tag = row.get(LAYOUT_TAG).cloned().unwrap_or(Value::Null);
        let mut processed = Map::new();
        processed.insert(LAYOUT_TAG.to_string(), tag.clone());

        if let Some(layout) = layouts.iter().find(|l| tag.as_str() == Some(l.name.as_str())) {
            processed.extend(self.process_sub_fields(&layout.sub_fields, row));
        }
        processed
    }

    /// Maps every row of a list or keyed mapping, keeping indices and keys.
    ///
    /// Scalars produce an empty list.
    fn process_rows<F>(&self, value: &Value, mut row_fn: F) -> Value
    where
        F: FnMut(&Value) -> Map<String, Value>,
    {
        match value {
            Value::Array(rows) => {
                Value::Array(rows.iter().map(|row| Value::Object(row_fn(row))).collect())
            },
            Value::Object(rows) => Value::Object(
                rows.iter()
                    .map(|(key, row)| (key.clone(), Value::Object(row_fn(row))))
                    .collect(),
            ),
            _ => Value::Array(Vec::new()),
        }
    }
}

/// Looks up a non-null entry by key in a mapping, or by numeric key in a list.
fn lookup<'a>(container: &'a Value, key: &str) -> Option<&'a Value> {
    let found = match container {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    };
    found.filter(|v| !v.is_null())
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
