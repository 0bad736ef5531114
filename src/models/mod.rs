//! Data models for field snapshots.
//!
//! Field definitions, storage targets and the snapshot document itself.

mod field;
mod snapshot;
mod target;

pub use field::{
    FLEXIBLE_CONTENT_TYPE, FieldDescriptor, FieldGroup, FieldKind, GROUP_TYPE, LAYOUT_TAG, Layout,
    REPEATER_TYPE,
};
pub use snapshot::{FieldData, GroupData, Snapshot, json_type_name};
pub use target::{PostId, Target, TargetContext, UserId};
