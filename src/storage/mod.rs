//! Site storage back-ends.
//!
//! The import and export services only see the collaborator traits in
//! [`crate::io::traits`]. [`SiteStore`] implements all of them over an
//! in-memory site that loads from and saves to a JSON file, which is what
//! the command-line tool operates on.

mod memory;

pub use memory::{PostRecord, Principal, SiteStore, UserRecord, WriteFault};
