//! Collaborator traits for import/export operations.
//!
//! The import engine never talks to a concrete platform. It is handed an
//! object implementing [`FieldStore`] (value reads and writes) and
//! [`AccessControl`] (existence and edit-permission checks). The exporter
//! additionally needs [`FieldGroupSource`]. [`ValueTransform`] and
//! [`ImportHooks`] are the optional interception points.

use crate::Result;
use crate::models::{FieldDescriptor, FieldGroup, PostId, Snapshot, Target, TargetContext, UserId};
use serde_json::Value;

/// Field-storage layer.
///
/// # Unreliable write status
///
/// Implementations may report `Ok(false)` (or an error) from [`write`] even
/// though the value was persisted. The import engine re-reads after every
/// reported failure and only treats the write as failed when the stored
/// value is unchanged.
///
/// [`write`]: FieldStore::write
pub trait FieldStore {
    /// Reads a field value, `None` when no value is stored.
    ///
    /// `formatted` asks the store to return structural fields in their
    /// nested-array shape.
    fn read(&self, field_name: &str, target: TargetContext, formatted: bool)
    -> Result<Option<Value>>;

    /// Writes a field value, returning whether the store reports success.
    fn write(&mut self, field_name: &str, value: &Value, target: TargetContext) -> Result<bool>;

    /// Looks up the definition of a field in a context.
    fn describe(&self, field_name: &str, target: TargetContext)
    -> Result<Option<FieldDescriptor>>;
}

/// Existence and permission checks for import targets.
pub trait AccessControl {
    /// Whether the post exists.
    fn post_exists(&self, id: PostId) -> Result<bool>;

    /// Whether the user exists.
    fn user_exists(&self, id: UserId) -> Result<bool>;

    /// Whether the acting principal may edit the post.
    fn can_edit_post(&self, id: PostId) -> Result<bool>;

    /// Whether the acting principal may edit the user. Defaults to allowed.
    fn can_edit_user(&self, _id: UserId) -> Result<bool> {
        Ok(true)
    }
}

/// Source of field groups and post listings for export.
pub trait FieldGroupSource {
    /// Returns a field group by key.
    fn field_group(&self, key: &str) -> Result<Option<FieldGroup>>;

    /// Returns the existing posts of a type, restricted to `ids`.
    fn posts_of_type(&self, post_type: &str, ids: &[PostId]) -> Result<Vec<PostId>>;
}

impl<T: FieldStore + ?Sized> FieldStore for &mut T {
    fn read(
        &self,
        field_name: &str,
        target: TargetContext,
        formatted: bool,
    ) -> Result<Option<Value>> {
        (**self).read(field_name, target, formatted)
    }

    fn write(&mut self, field_name: &str, value: &Value, target: TargetContext) -> Result<bool> {
        (**self).write(field_name, value, target)
    }

    fn describe(
        &self,
        field_name: &str,
        target: TargetContext,
    ) -> Result<Option<FieldDescriptor>> {
        (**self).describe(field_name, target)
    }
}

impl<T: AccessControl + ?Sized> AccessControl for &mut T {
    fn post_exists(&self, id: PostId) -> Result<bool> {
        (**self).post_exists(id)
    }

    fn user_exists(&self, id: UserId) -> Result<bool> {
        (**self).user_exists(id)
    }

    fn can_edit_post(&self, id: PostId) -> Result<bool> {
        (**self).can_edit_post(id)
    }

    fn can_edit_user(&self, id: UserId) -> Result<bool> {
        (**self).can_edit_user(id)
    }
}

/// Where an incoming value is about to be written.
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    /// Field group key.
    pub group_key: &'a str,
    /// Field name.
    pub field_name: &'a str,
    /// Position inside the snapshot.
    pub target: &'a Target,
}

/// Interception of incoming values before they are compared and written.
///
/// Closures with the matching signature implement this trait.
pub trait ValueTransform {
    /// Returns the value to write in place of `incoming`.
    fn transform(&self, incoming: Value, existing: &Value, context: &WriteContext<'_>) -> Value;
}

/// Leaves incoming values untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ValueTransform for IdentityTransform {
    fn transform(&self, incoming: Value, _existing: &Value, _context: &WriteContext<'_>) -> Value {
        incoming
    }
}

impl<F> ValueTransform for F
where
    F: Fn(Value, &Value, &WriteContext<'_>) -> Value,
{
    fn transform(&self, incoming: Value, existing: &Value, context: &WriteContext<'_>) -> Value {
        self(incoming, existing, context)
    }
}

/// Observer of import lifecycle events. Every method defaults to a no-op.
pub trait ImportHooks {
    /// Called once the snapshot parsed, before any group is processed.
    fn import_started(&self, _snapshot: &Snapshot) {}

    /// Called after a field value was written successfully.
    fn field_imported(&self, _context: &WriteContext<'_>, _value: &Value) {}

    /// Called after a genuine write failure.
    fn field_failed(&self, _context: &WriteContext<'_>, _value: &Value) {}

    /// Called with the final outcome, after any rollback.
    fn import_finished(&self, _success: bool) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ImportHooks for NoHooks {}

impl<H: ImportHooks + ?Sized> ImportHooks for &H {
    fn import_started(&self, snapshot: &Snapshot) {
        (**self).import_started(snapshot);
    }

    fn field_imported(&self, context: &WriteContext<'_>, value: &Value) {
        (**self).field_imported(context, value);
    }

    fn field_failed(&self, context: &WriteContext<'_>, value: &Value) {
        (**self).field_failed(context, value);
    }

    fn import_finished(&self, success: bool) {
        (**self).import_finished(success);
    }
}
