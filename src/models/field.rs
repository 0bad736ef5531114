//! Field definitions.
//!
//! A [`FieldDescriptor`] describes how a stored value is structured. Most
//! field types hold a scalar (or an opaque array) and are [`FieldKind::Plain`];
//! three structural kinds nest further field definitions and drive the
//! recursive processing in [`crate::io::FieldProcessor`].
//!
//! Descriptors serialize in the familiar field-definition shape:
//!
//! ```json
//! { "name": "slides", "type": "repeater",
//!   "sub_fields": [ { "name": "caption", "type": "text" } ] }
//! ```

use serde::{Deserialize, Serialize};

/// Type name of composite (group) fields.
pub const GROUP_TYPE: &str = "group";
/// Type name of repeating-list fields.
pub const REPEATER_TYPE: &str = "repeater";
/// Type name of variant-list (flexible content) fields.
pub const FLEXIBLE_CONTENT_TYPE: &str = "flexible_content";
/// Row key carrying the layout name inside a flexible content row.
pub const LAYOUT_TAG: &str = "acf_fc_layout";

/// Structural kind of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Any non-structural field; holds its declared type name.
    Plain(String),
    /// A single mapping of named sub-fields.
    Composite(Vec<FieldDescriptor>),
    /// An ordered list of rows, each a mapping of the same sub-fields.
    RepeatingList(Vec<FieldDescriptor>),
    /// An ordered list of rows, each tagged with one of several layouts.
    VariantList(Vec<Layout>),
}

impl FieldKind {
    /// Returns the field type name this kind is stored under.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Plain(name) => name,
            Self::Composite(_) => GROUP_TYPE,
            Self::RepeatingList(_) => REPEATER_TYPE,
            Self::VariantList(_) => FLEXIBLE_CONTENT_TYPE,
        }
    }

    /// Whether the kind nests further field definitions.
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }
}

/// Definition of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawField", into = "RawField")]
pub struct FieldDescriptor {
    /// Field name (the storage key).
    pub name: String,
    /// Structural kind.
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Creates a plain field of the given type.
    pub fn plain(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Plain(field_type.into()),
        }
    }

    /// Creates a composite (group) field.
    pub fn group(name: impl Into<String>, sub_fields: Vec<Self>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Composite(sub_fields),
        }
    }

    /// Creates a repeating-list (repeater) field.
    pub fn repeater(name: impl Into<String>, sub_fields: Vec<Self>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::RepeatingList(sub_fields),
        }
    }

    /// Creates a variant-list (flexible content) field.
    pub fn flexible(name: impl Into<String>, layouts: Vec<Layout>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::VariantList(layouts),
        }
    }

    /// Returns the field type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.kind.type_name()
    }
}

/// One selectable row schema of a flexible content field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Layout name, matched against a row's layout tag.
    pub name: String,
    /// Sub-fields of rows using this layout.
    #[serde(default)]
    pub sub_fields: Vec<FieldDescriptor>,
}

impl Layout {
    /// Creates a layout.
    pub fn new(name: impl Into<String>, sub_fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            sub_fields,
        }
    }
}

/// A named collection of field definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldGroup {
    /// Group key, used as the top-level snapshot key.
    pub key: String,
    /// Human readable title.
    #[serde(default)]
    pub title: String,
    /// Top-level fields of the group.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl FieldGroup {
    /// Creates a field group.
    pub fn new(key: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        let key = key.into();
        Self {
            title: key.clone(),
            key,
            fields,
        }
    }

    /// Finds a top-level field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Wire shape of a field definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type", default = "default_field_type")]
    field_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    sub_fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    layouts: Vec<Layout>,
}

fn default_field_type() -> String {
    "text".to_string()
}

impl From<RawField> for FieldDescriptor {
    fn from(raw: RawField) -> Self {
        let kind = match raw.field_type.as_str() {
            GROUP_TYPE => FieldKind::Composite(raw.sub_fields),
            REPEATER_TYPE => FieldKind::RepeatingList(raw.sub_fields),
            FLEXIBLE_CONTENT_TYPE => FieldKind::VariantList(raw.layouts),
            _ => FieldKind::Plain(raw.field_type),
        };
        Self {
            name: raw.name,
            kind,
        }
    }
}

impl From<FieldDescriptor> for RawField {
    fn from(field: FieldDescriptor) -> Self {
        let field_type = field.kind.type_name().to_string();
        let (sub_fields, layouts) = match field.kind {
            FieldKind::Plain(_) => (Vec::new(), Vec::new()),
            FieldKind::Composite(sub) | FieldKind::RepeatingList(sub) => (sub, Vec::new()),
            FieldKind::VariantList(layouts) => (Vec::new(), layouts),
        };
        Self {
            name: field.name,
            field_type,
            sub_fields,
            layouts,
        }
    }
}
