//! In-memory site backed by a JSON file.
//!
//! Holds everything the import and export services need from a site:
//! posts with their type, users, options-page values, field group
//! definitions and the acting principal's edit rights. Values are stored
//! in their formatted (nested) shape, so formatted and unformatted reads
//! return the same value. Writing `null` removes the stored value.
//!
//! ```json
//! {
//!   "field_groups": [{ "key": "group_hero", "fields": [{ "name": "headline", "type": "text" }] }],
//!   "posts": { "5": { "post_type": "post", "fields": { "headline": "Old Title" } } },
//!   "users": { "3": { "fields": {} } },
//!   "options": {},
//!   "principal": { "denied_posts": [6] }
//! }
//! ```

use crate::io::traits::{AccessControl, FieldGroupSource, FieldStore};
use crate::models::{FieldDescriptor, FieldGroup, PostId, TargetContext, UserId};
use crate::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Maximum size of a site file (64 MiB).
const MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Simulated write misbehaviour for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFault {
    /// The value is stored but the write reports failure.
    ReportFailure,
    /// The value is not stored and the write reports failure.
    Reject,
    /// The value is not stored and the write errors.
    Error,
}

/// A post and its field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    /// Post type name.
    pub post_type: String,
    /// Field values by name.
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
}

/// A user and their field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Field values by name.
    #[serde(default)]
    pub fields: IndexMap<String, Value>,
}

/// Edit rights of the acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Whether the principal may edit anything at all.
    #[serde(default = "default_true")]
    pub can_edit: bool,
    /// Posts the principal may not edit.
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub denied_posts: IndexSet<PostId>,
    /// Users the principal may not edit.
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub denied_users: IndexSet<UserId>,
}

impl Default for Principal {
    fn default() -> Self {
        Self {
            can_edit: true,
            denied_posts: IndexSet::new(),
            denied_users: IndexSet::new(),
        }
    }
}

const fn default_true() -> bool {
    true
}

/// In-memory site implementing every collaborator trait.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteStore {
    /// Field group definitions.
    #[serde(default)]
    pub field_groups: Vec<FieldGroup>,
    /// Posts by ID.
    #[serde(default)]
    pub posts: IndexMap<PostId, PostRecord>,
    /// Users by ID.
    #[serde(default)]
    pub users: IndexMap<UserId, UserRecord>,
    /// Options-page values by field name.
    #[serde(default)]
    pub options: IndexMap<String, Value>,
    /// Acting principal.
    #[serde(default)]
    pub principal: Principal,
    /// Simulated write faults by field name.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub write_faults: IndexMap<String, WriteFault>,
}

impl SiteStore {
    /// Creates an empty site.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a site from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not a valid site.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("site file: {e}")))
    }

    /// Loads a site file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, too large, or malformed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| Error::OperationFailed {
            operation: "read_site_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::InvalidInput(format!(
                "site file {} exceeds {MAX_FILE_SIZE} bytes",
                path.display()
            )));
        }

        let json = fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_site_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Self::from_json(&json)
    }

    /// Writes the site to a file as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| Error::operation("serialize_site", e))?;
        fs::write(path, json).map_err(|e| Error::OperationFailed {
            operation: "write_site_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })
    }

    /// Adds a field group definition, replacing one with the same key.
    pub fn add_field_group(&mut self, group: FieldGroup) {
        self.field_groups.retain(|g| g.key != group.key);
        self.field_groups.push(group);
    }

    /// Adds a post of a type.
    pub fn add_post(&mut self, id: PostId, post_type: impl Into<String>) {
        self.posts.insert(
            id,
            PostRecord {
                post_type: post_type.into(),
                fields: IndexMap::new(),
            },
        );
    }

    /// Adds a user.
    pub fn add_user(&mut self, id: UserId) {
        self.users.entry(id).or_default();
    }

    /// Denies the principal edit rights on a post.
    pub fn deny_post(&mut self, id: PostId) {
        self.principal.denied_posts.insert(id);
    }

    /// Denies the principal edit rights on a user.
    pub fn deny_user(&mut self, id: UserId) {
        self.principal.denied_users.insert(id);
    }

    /// Makes writes of a field misbehave.
    pub fn set_write_fault(&mut self, field_name: impl Into<String>, fault: WriteFault) {
        self.write_faults.insert(field_name.into(), fault);
    }

    /// Stores a value directly, bypassing faults.
    ///
    /// A missing post is created with type `post`, a missing user is created.
    pub fn set_value(
        &mut self,
        field_name: impl Into<String>,
        target: TargetContext,
        value: Value,
    ) {
        let field_name = field_name.into();
        match target {
            TargetContext::Options => {
                self.options.insert(field_name, value);
            },
            TargetContext::Post(id) => {
                self.posts
                    .entry(id)
                    .or_insert_with(|| PostRecord {
                        post_type: "post".to_string(),
                        fields: IndexMap::new(),
                    })
                    .fields
                    .insert(field_name, value);
            },
            TargetContext::User(id) => {
                self.users.entry(id).or_default().fields.insert(field_name, value);
            },
        }
    }

    /// Returns a stored value.
    #[must_use]
    pub fn value(&self, field_name: &str, target: TargetContext) -> Option<&Value> {
        self.fields(target).and_then(|fields| fields.get(field_name))
    }

    fn fields(&self, target: TargetContext) -> Option<&IndexMap<String, Value>> {
        match target {
            TargetContext::Options => Some(&self.options),
            TargetContext::Post(id) => self.posts.get(&id).map(|p| &p.fields),
            TargetContext::User(id) => self.users.get(&id).map(|u| &u.fields),
        }
    }

    fn fields_mut(&mut self, target: TargetContext) -> Option<&mut IndexMap<String, Value>> {
        match target {
            TargetContext::Options => Some(&mut self.options),
            TargetContext::Post(id) => self.posts.get_mut(&id).map(|p| &mut p.fields),
            TargetContext::User(id) => self.users.get_mut(&id).map(|u| &mut u.fields),
        }
    }
}

impl FieldStore for SiteStore {
    fn read(
        &self,
        field_name: &str,
        target: TargetContext,
        _formatted: bool,
    ) -> Result<Option<Value>> {
        Ok(self.value(field_name, target).cloned())
    }

    fn write(&mut self, field_name: &str, value: &Value, target: TargetContext) -> Result<bool> {
        let fault = self.write_faults.get(field_name).copied();
        match fault {
            Some(WriteFault::Reject) => return Ok(false),
            Some(WriteFault::Error) => {
                return Err(Error::operation(
                    "write_field",
                    format!("field \"{field_name}\" for {target} is read-only"),
                ));
            },
            Some(WriteFault::ReportFailure) | None => {},
        }

        let Some(fields) = self.fields_mut(target) else {
            return Ok(false);
        };
        if value.is_null() {
            fields.shift_remove(field_name);
        } else {
            fields.insert(field_name.to_string(), value.clone());
        }
        Ok(fault.is_none())
    }

    fn describe(
        &self,
        field_name: &str,
        _target: TargetContext,
    ) -> Result<Option<FieldDescriptor>> {
        Ok(self
            .field_groups
            .iter()
            .find_map(|g| g.field(field_name))
            .cloned())
    }
}

impl AccessControl for SiteStore {
    fn post_exists(&self, id: PostId) -> Result<bool> {
        Ok(self.posts.contains_key(&id))
    }

    fn user_exists(&self, id: UserId) -> Result<bool> {
        Ok(self.users.contains_key(&id))
    }

    fn can_edit_post(&self, id: PostId) -> Result<bool> {
        Ok(self.principal.can_edit && !self.principal.denied_posts.contains(&id))
    }

    fn can_edit_user(&self, id: UserId) -> Result<bool> {
        Ok(self.principal.can_edit && !self.principal.denied_users.contains(&id))
    }
}

impl FieldGroupSource for SiteStore {
    fn field_group(&self, key: &str) -> Result<Option<FieldGroup>> {
        Ok(self.field_groups.iter().find(|g| g.key == key).cloned())
    }

    fn posts_of_type(&self, post_type: &str, ids: &[PostId]) -> Result<Vec<PostId>> {
        let mut seen = IndexSet::new();
        for &id in ids {
            if self.posts.get(&id).is_some_and(|p| p.post_type == post_type) {
                seen.insert(id);
            }
        }
        Ok(seen.into_iter().collect())
    }
}
