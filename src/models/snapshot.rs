//! Snapshot document model.
//!
//! ```json
//! {
//!   "group_hero": {
//!     "headline": {
//!       "options": "Site wide",
//!       "users": { "3": "Author bio" },
//!       "post_types": { "post": { "5": "New Title" } }
//!     }
//!   }
//! }
//! ```
//!
//! All maps preserve document order; the import engine traverses them in
//! that order. Every mapping position also accepts `[]`, the encoding PHP
//! uses for an empty associative array. User and post IDs stay as the raw JSON keys here and are
//! coerced when a write is attempted, so an invalid key fails exactly at its
//! position in the traversal.

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::de::value::MapAccessDeserializer;
use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

/// Fields of one group, keyed by field name.
pub type GroupData = IndexMap<String, FieldData>;

/// A snapshot document: group key → field name → field data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(
    #[serde(deserialize_with = "nested_map_or_empty_list")] IndexMap<String, GroupData>,
);

impl Snapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a snapshot from a parsed JSON document.
    ///
    /// An empty JSON array is accepted as an empty snapshot, since some
    /// encoders emit `[]` for an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the document is not a mapping of
    /// groups to fields to field data.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) if items.is_empty() => Ok(Self::new()),
            Value::Object(_) => serde_json::from_value(value)
                .map_err(|e| Error::InvalidInput(e.to_string())),
            other => Err(Error::InvalidInput(format!(
                "expected a mapping of field groups, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Serializes the snapshot as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::operation("serialize_snapshot", e))
    }

    /// Inserts or replaces the fields of a group.
    pub fn insert_group(&mut self, key: impl Into<String>, fields: GroupData) {
        self.0.insert(key.into(), fields);
    }

    /// Returns a group's fields.
    #[must_use]
    pub fn group(&self, key: &str) -> Option<&GroupData> {
        self.0.get(key)
    }

    /// Iterates groups in document order.
    pub fn groups(&self) -> impl Iterator<Item = (&String, &GroupData)> {
        self.0.iter()
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of values across all groups, fields and contexts.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.0
            .values()
            .flat_map(IndexMap::values)
            .map(FieldData::value_count)
            .sum()
    }
}

/// Values of one field across its storage contexts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldData {
    /// Value on the options page. `Some(Value::Null)` is an explicit null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,

    /// Values per user, keyed by user ID.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub users: IndexMap<String, Value>,

    /// Values per post, keyed by post type then post ID.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub post_types: IndexMap<String, IndexMap<String, Value>>,
}

/// Wire shape of [`FieldData`] when given as a mapping.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDataRepr {
    #[serde(default, alias = "option", deserialize_with = "deserialize_present")]
    options: Option<Value>,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    users: IndexMap<String, Value>,
    #[serde(default, deserialize_with = "nested_map_or_empty_list")]
    post_types: IndexMap<String, IndexMap<String, Value>>,
}

impl<'de> Deserialize<'de> for FieldData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr: FieldDataRepr = map_or_empty_list(deserializer)?;
        Ok(Self {
            options: repr.options,
            users: repr.users,
            post_types: repr.post_types,
        })
    }
}

impl FieldData {
    /// Whether no context carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_none()
            && self.users.is_empty()
            && self.post_types.values().all(IndexMap::is_empty)
    }

    /// Number of values carried.
    #[must_use]
    pub fn value_count(&self) -> usize {
        usize::from(self.options.is_some())
            + self.users.len()
            + self.post_types.values().map(IndexMap::len).sum::<usize>()
    }
}

/// Keeps an explicit JSON `null` distinguishable from an absent key.
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Visitor for a mapping that may also arrive as an empty list.
struct MapOrEmptyList<T>(PhantomData<T>);

impl<'de, T> Visitor<'de> for MapOrEmptyList<T>
where
    T: Deserialize<'de> + Default,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping or an empty list")
    }

    fn visit_map<A>(self, map: A) -> std::result::Result<T, A::Error>
    where
        A: MapAccess<'de>,
    {
        T::deserialize(MapAccessDeserializer::new(map))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<T, A::Error>
    where
        A: SeqAccess<'de>,
    {
        if seq.next_element::<IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_type(Unexpected::Seq, &self));
        }
        Ok(T::default())
    }
}

/// A value deserialized through [`map_or_empty_list`].
struct Lenient<T>(T);

impl<'de, T> Deserialize<'de> for Lenient<T>
where
    T: Deserialize<'de> + Default,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        map_or_empty_list(deserializer).map(Lenient)
    }
}

/// Deserializes a mapping, reading `[]` as the empty mapping.
fn map_or_empty_list<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    deserializer.deserialize_any(MapOrEmptyList(PhantomData))
}

/// Two levels of [`map_or_empty_list`].
fn nested_map_or_empty_list<'de, D, V>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, IndexMap<String, V>>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    let outer: IndexMap<String, Lenient<IndexMap<String, V>>> = map_or_empty_list(deserializer)?;
    Ok(outer.into_iter().map(|(key, inner)| (key, inner.0)).collect())
}

/// Short JSON type name for error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_parse_preserves_document_order() {
        let snapshot = Snapshot::from_value(json!({
            "zeta": { "b": { "options": 1 }, "a": { "options": 2 } },
            "alpha": { "c": { "options": 3 } }
        }))
        .unwrap();

        let groups: Vec<_> = snapshot.groups().map(|(k, _)| k.as_str()).collect();
        assert_eq!(groups, vec!["zeta", "alpha"]);
        let fields: Vec<_> = snapshot.group("zeta").unwrap().keys().cloned().collect();
        assert_eq!(fields, vec!["b", "a"]);
    }

    #[test]
    fn test_explicit_null_option_is_present() {
        let snapshot = Snapshot::from_value(json!({
            "g": { "f": { "options": null }, "h": {} }
        }))
        .unwrap();
        let group = snapshot.group("g").unwrap();
        assert_eq!(group["f"].options, Some(Value::Null));
        assert_eq!(group["h"].options, None);
        assert!(group["h"].is_empty());
    }

    #[test]
    fn test_legacy_option_alias() {
        let snapshot = Snapshot::from_value(json!({ "g": { "f": { "option": "x" } } })).unwrap();
        assert_eq!(snapshot.group("g").unwrap()["f"].options, Some(json!("x")));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        assert!(Snapshot::from_value(json!("text")).is_err());
        assert!(Snapshot::from_value(json!([1, 2])).is_err());
        assert!(Snapshot::from_value(json!({ "g": "not fields" })).is_err());
        assert!(Snapshot::from_value(json!({ "g": { "f": { "pages": {} } } })).is_err());
        assert!(Snapshot::from_value(json!({ "g": { "f": { "users": [1] } } })).is_err());
    }

    #[test]
    fn test_empty_array_is_empty_snapshot() {
        let snapshot = Snapshot::from_value(json!([])).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test_case(json!({ "g": [] }); "group")]
    #[test_case(json!({ "g": { "f": [] } }); "field data")]
    #[test_case(json!({ "g": { "f": { "users": [] } } }); "users")]
    #[test_case(json!({ "g": { "f": { "post_types": [] } } }); "post types")]
    #[test_case(json!({ "g": { "f": { "post_types": { "page": [] } } } }); "posts of a type")]
    fn test_empty_array_reads_as_empty_mapping(value: Value) {
        let snapshot = Snapshot::from_value(value).unwrap();
        assert_eq!(snapshot.value_count(), 0);
    }

    #[test_case(json!({ "g": ["f"] }); "group")]
    #[test_case(json!({ "g": { "f": ["x"] } }); "field data")]
    #[test_case(json!({ "g": { "f": { "users": ["x"] } } }); "users")]
    #[test_case(json!({ "g": { "f": { "post_types": { "page": ["x"] } } } }); "posts of a type")]
    fn test_non_empty_array_is_rejected(value: Value) {
        let err = Snapshot::from_value(value).unwrap_err();
        assert!(err.to_string().contains("expected a mapping or an empty list"));
    }

    #[test]
    fn test_empty_array_positions_keep_sibling_values() {
        let snapshot = Snapshot::from_value(json!({
            "g": { "f": { "users": [], "post_types": { "page": [], "post": { "5": "p" } } } }
        }))
        .unwrap();
        let data = &snapshot.group("g").unwrap()["f"];
        assert!(data.users.is_empty());
        assert!(data.post_types["page"].is_empty());
        assert_eq!(data.post_types["post"]["5"], json!("p"));
    }

    #[test]
    fn test_value_count_and_serialization() {
        let snapshot = Snapshot::from_value(json!({
            "g": { "f": {
                "options": "o",
                "users": { "1": "u" },
                "post_types": { "post": { "5": "p", "6": "q" }, "page": {} }
            } }
        }))
        .unwrap();
        assert_eq!(snapshot.value_count(), 4);

        let out: Value = serde_json::from_str(&snapshot.to_json_pretty().unwrap()).unwrap();
        assert_eq!(out["g"]["f"]["post_types"]["post"]["6"], json!("q"));
        assert!(out["g"]["f"].get("option").is_none());
    }
}
