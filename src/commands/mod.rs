//! Command handlers.
//!
//! - `io.rs`: `import`, `export` and `validate`
//! - `config.rs`: configuration display

mod config;
mod io;

use clap::Subcommand;

pub use config::cmd_config_show;
pub use io::{cmd_export, cmd_import, cmd_validate, parse_post_selection, parse_user_id};

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
}
