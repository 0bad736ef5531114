//! Snapshot import engine.
//!
//! Applies a snapshot to a site one value at a time, in document order:
//! groups, then fields, then the `options`, `users` and `post_types`
//! contexts of each field. The first genuine failure stops the traversal.
//!
//! # Write protocol
//!
//! For every value:
//!
//! 1. The target ID must be a positive integer naming an existing, editable
//!    post or user. Any violation fails the whole import.
//! 2. The current value is read (formatted for structural fields) and
//!    recorded in [`OriginalData`] before anything is written.
//! 3. The incoming value passes through the [`ValueTransform`].
//! 4. Equal values are skipped.
//! 5. Otherwise the value is written. A reported failure is re-verified by
//!    reading again: the write only failed if the stored value still equals
//!    the value read before the write.
//!
//! When rollback is requested and the import failed, every recorded
//! original value is written back (newest first), best effort.

use crate::io::codec::FieldProcessor;
use crate::io::error::ImportError;
use crate::io::traits::{
    AccessControl, FieldStore, IdentityTransform, ImportHooks, NoHooks, ValueTransform,
    WriteContext,
};
use crate::models::{
    FieldData, FieldDescriptor, GroupData, PostId, Snapshot, Target, TargetContext, UserId,
};
use crate::observability::EventLog;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Where a captured original value came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Field group key.
    pub group: String,
    /// Field name.
    pub field: String,
    /// Position inside the field entry.
    pub target: Target,
}

/// Values observed immediately before each attempted write.
///
/// Entries are recorded in traversal order, before the write they guard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OriginalData {
    entries: IndexMap<Coordinate, Value>,
}

impl OriginalData {
    /// Records the pre-write value of a coordinate.
    ///
    /// A coordinate seen twice keeps its first position and first value.
    pub fn record(&mut self, coordinate: Coordinate, value: Value) {
        self.entries.entry(coordinate).or_insert(value);
    }

    /// Returns the captured value of a coordinate.
    #[must_use]
    pub fn get(&self, group: &str, field: &str, target: &Target) -> Option<&Value> {
        self.entries.get(&Coordinate {
            group: group.to_string(),
            field: field.to_string(),
            target: target.clone(),
        })
    }

    /// Iterates captured values in recording order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&Coordinate, &Value)> {
        self.entries.iter()
    }

    /// Number of captured values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rebuilds the captured values in snapshot shape.
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        let mut groups: IndexMap<String, GroupData> = IndexMap::new();
        for (coordinate, value) in &self.entries {
            let data: &mut FieldData = groups
                .entry(coordinate.group.clone())
                .or_default()
                .entry(coordinate.field.clone())
                .or_default();
            match &coordinate.target {
                Target::Options => data.options = Some(value.clone()),
                Target::User(id) => {
                    data.users.insert(id.to_string(), value.clone());
                },
                Target::Post { post_type, id } => {
                    data.post_types
                        .entry(post_type.clone())
                        .or_default()
                        .insert(id.to_string(), value.clone());
                },
            }
        }

        let mut snapshot = Snapshot::new();
        for (key, fields) in groups {
            snapshot.insert_group(key, fields);
        }
        snapshot
    }
}

/// Counters describing what an import did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Values written.
    pub written: usize,
    /// Values skipped because they already matched.
    pub skipped: usize,
    /// Whether the rollback sweep ran.
    pub rollback_performed: bool,
    /// Values restored by rollback.
    pub rolled_back: usize,
    /// Values rollback could not restore.
    pub rollback_failures: usize,
    /// The failure that stopped the import.
    pub failure: Option<ImportError>,
}

/// State of one import call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSession {
    original_data: OriginalData,
    import_success: bool,
    report: ImportReport,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self {
            original_data: OriginalData::default(),
            import_success: true,
            report: ImportReport::default(),
        }
    }
}

impl ImportSession {
    /// Values captured before each attempted write.
    #[must_use]
    pub const fn original_data(&self) -> &OriginalData {
        &self.original_data
    }

    /// Whether the import succeeded.
    #[must_use]
    pub const fn import_success(&self) -> bool {
        self.import_success
    }

    /// Import counters.
    #[must_use]
    pub const fn report(&self) -> &ImportReport {
        &self.report
    }
}

/// Imports snapshot documents into a site.
///
/// The event log is handed in at construction and read back with
/// [`Importer::log`] or [`Importer::into_parts`].
pub struct Importer<S, T = IdentityTransform, H = NoHooks> {
    store: S,
    log: EventLog,
    processor: FieldProcessor,
    transform: T,
    hooks: H,
    session: ImportSession,
}

impl<S> Importer<S>
where
    S: FieldStore + AccessControl,
{
    /// Creates an importer with the built-in codec, no transform and no hooks.
    #[must_use]
    pub fn new(store: S, log: EventLog) -> Self {
        Self {
            store,
            log,
            processor: FieldProcessor::new(),
            transform: IdentityTransform,
            hooks: NoHooks,
            session: ImportSession::default(),
        }
    }
}

impl<S, T, H> Importer<S, T, H>
where
    S: FieldStore + AccessControl,
    T: ValueTransform,
    H: ImportHooks,
{
    /// Replaces the field processor.
    #[must_use]
    pub fn with_processor(mut self, processor: FieldProcessor) -> Self {
        self.processor = processor;
        self
    }

    /// Installs a value transform.
    #[must_use]
    pub fn with_transform<T2: ValueTransform>(self, transform: T2) -> Importer<S, T2, H> {
        Importer {
            store: self.store,
            log: self.log,
            processor: self.processor,
            transform,
            hooks: self.hooks,
            session: self.session,
        }
    }

    /// Installs lifecycle hooks.
    #[must_use]
    pub fn with_hooks<H2: ImportHooks>(self, hooks: H2) -> Importer<S, T, H2> {
        Importer {
            store: self.store,
            log: self.log,
            processor: self.processor,
            transform: self.transform,
            hooks,
            session: self.session,
        }
    }

    /// The event log.
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// State of the most recent import call.
    pub const fn session(&self) -> &ImportSession {
        &self.session
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consumes the importer, returning the event log.
    pub fn into_log(self) -> EventLog {
        self.log
    }

    /// Consumes the importer, returning the store and the event log.
    pub fn into_parts(self) -> (S, EventLog) {
        (self.store, self.log)
    }

    /// Imports a snapshot given as JSON text.
    ///
    /// Returns whether every value was applied. Failures are reported
    /// through the event log; this method never panics or errors.
    #[instrument(skip(self, snapshot_json), fields(bytes = snapshot_json.len()))]
    pub fn import_field_data(&mut self, snapshot_json: &str, rollback: bool) -> bool {
        self.session = ImportSession::default();

        match parse_snapshot(snapshot_json) {
            Ok(snapshot) => self.apply(&snapshot, rollback),
            Err(err) => {
                self.log.error(err.to_string());
                self.session.import_success = false;
                self.session.report.failure = Some(err);
                metrics::counter!("field_snapshots_imports_total", "status" => "rejected")
                    .increment(1);
                self.hooks.import_finished(false);
                false
            },
        }
    }

    /// Imports an already parsed snapshot.
    pub fn import_snapshot(&mut self, snapshot: &Snapshot, rollback: bool) -> bool {
        self.session = ImportSession::default();
        self.apply(snapshot, rollback)
    }

    fn apply(&mut self, snapshot: &Snapshot, rollback: bool) -> bool {
        self.hooks.import_started(snapshot);
        info!(
            groups = snapshot.len(),
            values = snapshot.value_count(),
            rollback,
            "Starting snapshot import"
        );

        for (group_key, fields) in snapshot.groups() {
            self.log.info(format!("Importing group: \"{group_key}\""));

            if let Err(err) = self.import_group(group_key, fields) {
                warn!(group = %group_key, kind = err.kind(), "Import halted: {err}");
                self.log.error(err.to_string());
                self.session.import_success = false;
                self.session.report.failure = Some(err);
                break;
            }
        }

        let success = self.session.import_success;

        if !success && rollback {
            self.rollback_changes();
            self.log.error("Changes rolled back due to import failure.");
        }

        if success {
            self.log.success("Import process finished. Status: Success");
        } else {
            self.log.error("Import process finished. Status: Failed");
        }

        let status = if success { "success" } else { "failed" };
        metrics::counter!("field_snapshots_imports_total", "status" => status).increment(1);
        info!(
            status,
            written = self.session.report.written,
            skipped = self.session.report.skipped,
            "Snapshot import finished"
        );

        self.hooks.import_finished(success);
        success
    }

    fn import_group(&mut self, group_key: &str, fields: &GroupData) -> Result<(), ImportError> {
        if fields.values().all(FieldData::is_empty) {
            self.log.info("No fields to import, skipping update.");
            return Ok(());
        }

        for (field_name, data) in fields {
            if let Some(value) = &data.options {
                self.import_value(group_key, field_name, &Target::Options, value)?;
            }

            for (key, value) in &data.users {
                let target = self.resolve_user(group_key, field_name, key)?;
                self.import_value(group_key, field_name, &target, value)?;
            }

            for (post_type, posts) in &data.post_types {
                for (key, value) in posts {
                    let target = self.resolve_post(group_key, field_name, post_type, key)?;
                    self.import_value(group_key, field_name, &target, value)?;
                }
            }
        }

        Ok(())
    }

    /// Validates a user key: positive integer, existing, editable.
    fn resolve_user(&self, group: &str, field: &str, key: &str) -> Result<Target, ImportError> {
        let id = UserId::parse(key).ok_or_else(|| ImportError::InvalidUserId {
            key: key.to_string(),
            field: field.to_string(),
            group: group.to_string(),
        })?;
        let target = Target::User(id);
        let storage = |e: crate::Error| storage_error(field, &target, &e);

        if !self.store.user_exists(id).map_err(storage)? {
            return Err(ImportError::UserNotFound {
                id,
                field: field.to_string(),
            });
        }
        if !self.store.can_edit_user(id).map_err(storage)? {
            return Err(ImportError::UserPermissionDenied {
                id,
                field: field.to_string(),
            });
        }
        Ok(target)
    }

    /// Validates a post key: positive integer, existing, editable.
    fn resolve_post(
        &self,
        group: &str,
        field: &str,
        post_type: &str,
        key: &str,
    ) -> Result<Target, ImportError> {
        let id = PostId::parse(key).ok_or_else(|| ImportError::InvalidPostId {
            key: key.to_string(),
            field: field.to_string(),
            group: group.to_string(),
        })?;
        let target = Target::Post {
            post_type: post_type.to_string(),
            id,
        };
        let storage = |e: crate::Error| storage_error(field, &target, &e);

        if !self.store.post_exists(id).map_err(storage)? {
            return Err(ImportError::PostNotFound {
                id,
                field: field.to_string(),
            });
        }
        if !self.store.can_edit_post(id).map_err(storage)? {
            return Err(ImportError::PermissionDenied {
                id,
                field: field.to_string(),
            });
        }
        Ok(target)
    }

    fn import_value(
        &mut self,
        group: &str,
        field: &str,
        target: &Target,
        incoming: &Value,
    ) -> Result<(), ImportError> {
        let context = target.context();
        let storage = |e: crate::Error| storage_error(field, target, &e);

        let descriptor = self.store.describe(field, context).map_err(storage)?;
        let formatted = self.processor.needs_formatted_retrieval(descriptor.as_ref());
        let raw = self.read(field, context, formatted).map_err(storage)?;

        self.session.original_data.record(
            Coordinate {
                group: group.to_string(),
                field: field.to_string(),
                target: target.clone(),
            },
            raw.clone(),
        );

        let existing = self.processor.process_optional(descriptor.as_ref(), &raw);
        let write_context = WriteContext {
            group_key: group,
            field_name: field,
            target,
        };
        let value = self
            .transform
            .transform(incoming.clone(), &existing, &write_context);

        if value == existing {
            self.log.info(format!(
                "Field \"{field}\" for {target} has the same value. Skipping update."
            ));
            self.session.report.skipped += 1;
            metrics::counter!("field_snapshots_writes_total", "outcome" => "skipped").increment(1);
            return Ok(());
        }

        if self.write_verified(field, &value, context, &raw, formatted) {
            self.log
                .success(format!("Successfully updated field \"{field}\" for {target}."));
            self.session.report.written += 1;
            metrics::counter!("field_snapshots_writes_total", "outcome" => "written").increment(1);
            self.hooks.field_imported(&write_context, &value);
            Ok(())
        } else {
            metrics::counter!("field_snapshots_writes_total", "outcome" => "failed").increment(1);
            self.hooks.field_failed(&write_context, &value);
            Err(ImportError::WriteFailed {
                field: field.to_string(),
                target: target.clone(),
            })
        }
    }

    /// Writes a value, re-reading after a reported failure.
    ///
    /// Returns `true` when the write succeeded, or when it reported failure
    /// but the stored value no longer equals `before`.
    fn write_verified(
        &mut self,
        field: &str,
        value: &Value,
        context: TargetContext,
        before: &Value,
        formatted: bool,
    ) -> bool {
        match self.store.write(field, value, context) {
            Ok(true) => return true,
            Ok(false) => debug!(field, target = %context, "Write reported failure, verifying"),
            Err(e) => warn!(field, target = %context, error = %e, "Write errored, verifying"),
        }

        match self.read(field, context, formatted) {
            Ok(current) => {
                let changed = current != *before;
                if changed {
                    debug!(field, target = %context, "Value changed despite reported failure");
                }
                changed
            },
            Err(e) => {
                warn!(field, target = %context, error = %e, "Verification read failed");
                false
            },
        }
    }

    /// Restores every captured value that differs from the stored one.
    fn rollback_changes(&mut self) {
        self.session.report.rollback_performed = true;
        let captured: Vec<(Coordinate, Value)> = self
            .session
            .original_data
            .iter()
            .rev()
            .map(|(c, v)| (c.clone(), v.clone()))
            .collect();

        info!(entries = captured.len(), "Rolling back import");

        for (coordinate, original) in captured {
            let Coordinate { field, target, .. } = &coordinate;
            if self.rollback_value(field, target, &original) {
                continue;
            }
            self.log
                .error(format!("Failed to rollback field \"{field}\" for {target}."));
            self.session.report.rollback_failures += 1;
            metrics::counter!("field_snapshots_rollbacks_total", "outcome" => "failed")
                .increment(1);
        }
    }

    /// Restores one value. Returns `false` only when restoring failed.
    fn rollback_value(&mut self, field: &str, target: &Target, original: &Value) -> bool {
        let context = target.context();
        let descriptor: Option<FieldDescriptor> = match self.store.describe(field, context) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(field, target = %context, error = %e, "Rollback describe failed");
                return false;
            },
        };
        let formatted = self.processor.needs_formatted_retrieval(descriptor.as_ref());
        let current = match self.read(field, context, formatted) {
            Ok(current) => current,
            Err(e) => {
                warn!(field, target = %context, error = %e, "Rollback read failed");
                return false;
            },
        };

        if current == *original {
            return true;
        }

        if !self.write_verified(field, original, context, &current, formatted) {
            return false;
        }

        self.log
            .info(format!("Rolled back field \"{field}\" for {target}."));
        self.session.report.rolled_back += 1;
        metrics::counter!("field_snapshots_rollbacks_total", "outcome" => "restored").increment(1);
        true
    }

    fn read(&self, field: &str, context: TargetContext, formatted: bool) -> crate::Result<Value> {
        Ok(self
            .store
            .read(field, context, formatted)?
            .unwrap_or(Value::Null))
    }
}

/// Parses snapshot JSON, separating syntax errors from shape errors.
fn parse_snapshot(snapshot_json: &str) -> Result<Snapshot, ImportError> {
    let value: Value =
        serde_json::from_str(snapshot_json).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    Snapshot::from_value(value).map_err(|e| ImportError::InvalidFormat(e.to_string()))
}

fn storage_error(field: &str, target: &Target, error: &crate::Error) -> ImportError {
    ImportError::Storage {
        field: field.to_string(),
        target: target.clone(),
        cause: error.to_string(),
    }
}
