//! Snapshot export service.
//!
//! Walks the same group → field → context structure the importer consumes
//! and produces a [`Snapshot`]:
//!
//! - null reads are skipped
//! - values pass through the field codec
//! - empty post and user values are dropped, then empty post types
//! - groups left without data are removed

use crate::io::codec::FieldProcessor;
use crate::io::traits::{FieldGroupSource, FieldStore};
use crate::models::{FieldData, FieldDescriptor, GroupData, PostId, Snapshot, TargetContext, UserId};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// What to export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    /// Field group keys, in output order.
    pub groups: Vec<String>,
    /// Whether to export options-page values.
    pub options: bool,
    /// Post IDs per post type.
    pub post_types: IndexMap<String, Vec<PostId>>,
    /// User IDs.
    pub users: Vec<UserId>,
}

impl ExportRequest {
    /// Creates a request for the given field groups.
    #[must_use]
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Includes options-page values.
    #[must_use]
    pub const fn with_options(mut self) -> Self {
        self.options = true;
        self
    }

    /// Includes posts of a type.
    #[must_use]
    pub fn with_posts(
        mut self,
        post_type: impl Into<String>,
        ids: impl IntoIterator<Item = PostId>,
    ) -> Self {
        self.post_types
            .entry(post_type.into())
            .or_default()
            .extend(ids);
        self
    }

    /// Includes users.
    #[must_use]
    pub fn with_users(mut self, ids: impl IntoIterator<Item = UserId>) -> Self {
        self.users.extend(ids);
        self
    }

    /// Checks that the request selects at least one group and one target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.groups.is_empty() {
            problems.push("select at least one field group");
        }
        if !self.options && self.post_types.is_empty() && self.users.is_empty() {
            problems.push("select options, at least one post type, or at least one user");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput(problems.join("; ")))
        }
    }
}

/// Exports field values from a site into a snapshot.
pub struct ExportService<'a, S> {
    store: &'a S,
    processor: FieldProcessor,
}

impl<'a, S> ExportService<'a, S>
where
    S: FieldStore + FieldGroupSource,
{
    /// Creates an export service over a store.
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            processor: FieldProcessor::new(),
        }
    }

    /// Replaces the field processor.
    #[must_use]
    pub fn with_processor(mut self, processor: FieldProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Exports the requested values.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or the store fails.
    #[instrument(skip(self, request), fields(groups = request.groups.len()))]
    pub fn export(&self, request: &ExportRequest) -> Result<Snapshot> {
        request.validate()?;

        let mut snapshot = Snapshot::new();
        for group_key in &request.groups {
            let Some(group) = self.store.field_group(group_key)? else {
                warn!(group = %group_key, "Field group not found, skipping");
                continue;
            };

            let mut fields = GroupData::new();
            for field in &group.fields {
                fields.insert(field.name.clone(), self.export_field(field, request)?);
            }

            if fields.values().all(FieldData::is_empty) {
                debug!(group = %group_key, "Field group has no data, skipping");
                continue;
            }
            snapshot.insert_group(group_key.clone(), fields);
        }

        info!(
            groups = snapshot.len(),
            values = snapshot.value_count(),
            "Export finished"
        );
        Ok(snapshot)
    }

    fn export_field(&self, field: &FieldDescriptor, request: &ExportRequest) -> Result<FieldData> {
        let mut data = FieldData::default();

        if request.options {
            data.options = self.read_processed(field, TargetContext::Options)?;
        }

        for &id in &request.users {
            if let Some(value) = self.read_processed(field, TargetContext::User(id))? {
                if !is_empty_value(&value) {
                    data.users.insert(id.to_string(), value);
                }
            }
        }

        for (post_type, ids) in &request.post_types {
            if ids.is_empty() {
                continue;
            }
            let mut posts = IndexMap::new();
            for id in self.store.posts_of_type(post_type, ids)? {
                if let Some(value) = self.read_processed(field, TargetContext::Post(id))? {
                    if !is_empty_value(&value) {
                        posts.insert(id.to_string(), value);
                    }
                }
            }
            if !posts.is_empty() {
                data.post_types.insert(post_type.clone(), posts);
            }
        }

        Ok(data)
    }

    /// Reads a value and runs it through the codec. `None` for null reads.
    fn read_processed(
        &self,
        field: &FieldDescriptor,
        target: TargetContext,
    ) -> Result<Option<Value>> {
        let formatted = self.processor.needs_formatted_retrieval(Some(field));
        let value = self.store.read(&field.name, target, formatted)?;
        Ok(value
            .filter(|v| !v.is_null())
            .map(|v| self.processor.process(field, &v)))
    }
}

/// Values an export leaves out: null, `false`, zero, `""`, `"0"` and
/// empty containers.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() < f64::EPSILON),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldGroup, Layout};
    use crate::storage::SiteStore;
    use serde_json::json;
    use test_case::test_case;

    fn post(id: u64) -> PostId {
        PostId::new(id).unwrap()
    }

    fn site() -> SiteStore {
        let mut site = SiteStore::new();
        site.add_field_group(FieldGroup::new(
            "group_hero",
            vec![
                FieldDescriptor::plain("headline", "text"),
                FieldDescriptor::repeater(
                    "slides",
                    vec![FieldDescriptor::plain("caption", "text")],
                ),
            ],
        ));
        site.add_post(post(5), "post");
        site.add_post(post(6), "post");
        site.add_post(post(7), "page");
        site.set_value("headline", TargetContext::Post(post(5)), json!("Hello"));
        site.set_value("headline", TargetContext::Post(post(6)), json!(""));
        site.set_value(
            "slides",
            TargetContext::Post(post(5)),
            json!([{ "caption": "one", "stray": true }]),
        );
        site.set_value("headline", TargetContext::Options, json!("Site"));
        site
    }

    #[test]
    fn test_export_posts_and_options() {
        let site = site();
        let request = ExportRequest::new(["group_hero"])
            .with_options()
            .with_posts("post", [post(5), post(6)]);

        let snapshot = ExportService::new(&site).export(&request).unwrap();
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(
            value,
            json!({
                "group_hero": {
                    "headline": {
                        "options": "Site",
                        "post_types": { "post": { "5": "Hello" } }
                    },
                    "slides": {
                        "post_types": { "post": { "5": [{ "caption": "one" }] } }
                    }
                }
            })
        );
    }

    #[test]
    fn test_empty_groups_are_removed() {
        let mut site = site();
        site.add_field_group(FieldGroup::new(
            "group_empty",
            vec![FieldDescriptor::flexible("sections", vec![Layout::new("hero", vec![])])],
        ));
        let request = ExportRequest::new(["group_empty", "missing"]).with_posts("page", [post(7)]);

        let snapshot = ExportService::new(&site).export(&request).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_posts_of_other_types_are_ignored() {
        let site = site();
        let request = ExportRequest::new(["group_hero"]).with_posts("page", [post(5)]);
        let snapshot = ExportService::new(&site).export(&request).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_request_validation() {
        assert!(ExportRequest::default().validate().is_err());
        assert!(ExportRequest::new(["g"]).validate().is_err());
        assert!(ExportRequest::new(["g"]).with_options().validate().is_ok());
        assert!(
            ExportRequest::new(["g"])
                .with_users([UserId::new(1).unwrap()])
                .validate()
                .is_ok()
        );
    }

    #[test_case(json!(null) => true; "null")]
    #[test_case(json!(false) => true; "false")]
    #[test_case(json!(0) => true; "zero")]
    #[test_case(json!("0") => true; "zero string")]
    #[test_case(json!([]) => true; "empty list")]
    #[test_case(json!({}) => true; "empty mapping")]
    #[test_case(json!(true) => false; "true")]
    #[test_case(json!("text") => false; "text")]
    #[test_case(json!([0]) => false; "list of zero")]
    fn test_is_empty_value(value: Value) -> bool {
        is_empty_value(&value)
    }
}
