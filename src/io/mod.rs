//! Snapshot import/export subsystem.
//!
//! # Architecture
//!
//! - **Collaborator traits** ([`FieldStore`], [`AccessControl`],
//!   [`FieldGroupSource`]) abstract the site being imported into
//! - **Codec** ([`FieldProcessor`]) shapes structural field values
//! - **Validation** ([`SnapshotValidator`]) gates uploaded documents
//! - **Services** ([`Importer`], [`ExportService`]) drive the traversal
//!
//! # Examples
//!
//! ```rust,ignore
//! use field_snapshots::{EventLog, Importer, SiteStore};
//!
//! let mut site = SiteStore::load_from_file("site.json")?;
//! let mut importer = Importer::new(&mut site, EventLog::new());
//! let ok = importer.import_field_data(&snapshot_json, true);
//! for line in importer.log().entries() {
//!     println!("{line}");
//! }
//! ```

pub mod codec;
pub mod error;
pub mod services;
pub mod traits;
pub mod validation;

pub use codec::{FieldProcessor, FormattedKinds};
pub use error::ImportError;
pub use services::{
    Coordinate, ExportRequest, ExportService, ImportReport, ImportSession, Importer, OriginalData,
};
pub use traits::{
    AccessControl, FieldGroupSource, FieldStore, IdentityTransform, ImportHooks, NoHooks,
    ValueTransform, WriteContext,
};
pub use validation::{SnapshotValidator, ValidationIssue, ValidationResult, ValidationSeverity};
