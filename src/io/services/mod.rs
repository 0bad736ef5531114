//! Import and export services.
//!
//! Both walk the snapshot structure (group, field, context, target) and
//! talk to the site only through the collaborator traits.

pub mod export;
pub mod import;

pub use export::{ExportRequest, ExportService};
pub use import::{Coordinate, ImportReport, ImportSession, Importer, OriginalData};
