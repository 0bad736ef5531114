//! # Field Snapshots
//!
//! Export and import custom-field data as JSON snapshots.
//!
//! Field values attached to posts, users and the site-wide options page are
//! captured into a snapshot document and can later be replayed against the
//! same or another site. The import pipeline applies every field update in
//! document order, halts on the first genuine failure and can roll back all
//! changes it made.
//!
//! ## Features
//!
//! - Order-preserving snapshot model (`group → field → context → value`)
//! - Structure-aware field codec for groups, repeaters and flexible content
//! - Reverify-on-failure writes for storage layers with unreliable status codes
//! - Best-effort rollback from captured pre-import values
//! - Append-only event log for operator diagnostics
//!
//! ## Example
//!
//! ```rust,ignore
//! use field_snapshots::{EventLog, Importer, SiteStore};
//!
//! let mut site = SiteStore::load_from_file(path)?;
//! let mut importer = Importer::new(&mut site, EventLog::new());
//! let ok = importer.import_field_data(&json, true);
//! for line in importer.log().entries() {
//!     println!("{line}");
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod storage;

pub use config::SnapshotsConfig;
pub use io::{
    AccessControl, ExportRequest, ExportService, FieldGroupSource, FieldProcessor, FieldStore,
    FormattedKinds, ImportError, ImportHooks, ImportReport, ImportSession, Importer,
    SnapshotValidator, ValueTransform,
};
pub use models::{
    FieldData, FieldDescriptor, FieldGroup, FieldKind, Layout, PostId, Snapshot, Target,
    TargetContext, UserId,
};
pub use observability::{EventLog, LogEntry, LogLevel};
pub use storage::SiteStore;

/// Error type for field-snapshot operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed snapshot or site files, bad CLI arguments |
/// | `OperationFailed` | I/O errors, config parsing, logging initialisation |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem I/O errors occur
    /// - A configuration or site file cannot be parsed
    /// - A storage back-end rejects a read
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation name and cause.
    pub fn operation(operation: impl Into<String>, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for field-snapshot operations.
pub type Result<T> = std::result::Result<T, Error>;
