//! Import failure taxonomy.
//!
//! The import engine never returns these to its caller. Each one becomes an
//! `error` entry in the event log (its `Display` text is the log message)
//! and a `false` result.

use crate::models::{PostId, Target, UserId};
use thiserror::Error;

/// Why an import stopped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// The snapshot is not valid JSON.
    #[error("Invalid JSON data: {0}")]
    InvalidJson(String),

    /// The snapshot parsed but does not have the snapshot shape.
    #[error("Import failed: Invalid data format. {0}")]
    InvalidFormat(String),

    /// A post ID key does not coerce to a positive integer.
    #[error("Invalid post ID \"{key}\" for field \"{field}\" in group \"{group}\"")]
    InvalidPostId {
        /// Raw snapshot key.
        key: String,
        /// Field name.
        field: String,
        /// Group key.
        group: String,
    },

    /// A user ID key does not coerce to a positive integer.
    #[error("Invalid user ID \"{key}\" for field \"{field}\" in group \"{group}\"")]
    InvalidUserId {
        /// Raw snapshot key.
        key: String,
        /// Field name.
        field: String,
        /// Group key.
        group: String,
    },

    /// The referenced post does not exist.
    #[error("Post with ID {id} does not exist. Cannot update field \"{field}\"")]
    PostNotFound {
        /// Post ID.
        id: PostId,
        /// Field name.
        field: String,
    },

    /// The referenced user does not exist.
    #[error("User with ID {id} does not exist. Cannot update field \"{field}\"")]
    UserNotFound {
        /// User ID.
        id: UserId,
        /// Field name.
        field: String,
    },

    /// The acting principal may not edit the post.
    #[error("Permission denied for post ID {id}. Cannot edit field \"{field}\"")]
    PermissionDenied {
        /// Post ID.
        id: PostId,
        /// Field name.
        field: String,
    },

    /// The acting principal may not edit the user.
    #[error("Permission denied for user ID {id}. Cannot edit field \"{field}\"")]
    UserPermissionDenied {
        /// User ID.
        id: UserId,
        /// Field name.
        field: String,
    },

    /// The write failed and the stored value is unchanged.
    #[error("Failed to update field \"{field}\" for {target}.")]
    WriteFailed {
        /// Field name.
        field: String,
        /// Snapshot position.
        target: Target,
    },

    /// The storage layer failed while reading or checking a target.
    #[error("Storage error while processing field \"{field}\" for {target}: {cause}")]
    Storage {
        /// Field name.
        field: String,
        /// Snapshot position.
        target: Target,
        /// Underlying error text.
        cause: String,
    },
}

impl ImportError {
    /// Short machine-readable kind, used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "invalid_json",
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidPostId { .. } | Self::InvalidUserId { .. } => "invalid_target",
            Self::PostNotFound { .. } | Self::UserNotFound { .. } => "target_not_found",
            Self::PermissionDenied { .. } | Self::UserPermissionDenied { .. } => {
                "permission_denied"
            },
            Self::WriteFailed { .. } => "write_failed",
            Self::Storage { .. } => "storage",
        }
    }

    /// Whether the failure happened before any field was touched.
    #[must_use]
    pub const fn is_malformed_input(&self) -> bool {
        matches!(self, Self::InvalidJson(_) | Self::InvalidFormat(_))
    }
}
