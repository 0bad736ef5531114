//! Binary entry point for field-snapshots.
//!
//! Imports, exports and validates custom-field snapshots against a site
//! file.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    ConfigAction, cmd_config_show, cmd_export, cmd_import, cmd_validate, parse_post_selection,
    parse_user_id,
};
use field_snapshots::config::CONFIG_PATH_ENV;
use field_snapshots::observability::{self, LoggingConfig};
use field_snapshots::{PostId, SnapshotsConfig, UserId};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Field Snapshots - export and import custom-field data as JSON snapshots.
#[derive(Parser)]
#[command(name = "field-snapshots")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import a snapshot into a site.
    Import {
        /// Snapshot file (.json).
        snapshot: PathBuf,

        /// Site file to import into.
        #[arg(short, long)]
        site: PathBuf,

        /// Keep partial changes when the import fails.
        #[arg(long)]
        no_rollback: bool,

        /// Print the event log.
        #[arg(long)]
        show_log: bool,
    },

    /// Export field values from a site into a snapshot.
    Export {
        /// Site file to export from.
        #[arg(short, long)]
        site: PathBuf,

        /// Field group key (repeatable).
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,

        /// Include options-page values.
        #[arg(long)]
        options: bool,

        /// Posts to export as `<post_type>=<id>,<id>` (repeatable).
        #[arg(long = "post-type", value_parser = parse_post_selection)]
        post_types: Vec<(String, Vec<PostId>)>,

        /// User ID to export (repeatable).
        #[arg(long = "user", value_parser = parse_user_id)]
        users: Vec<UserId>,

        /// Output file (default: stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a snapshot's structure without importing it.
    Validate {
        /// Snapshot file.
        snapshot: PathBuf,
    },

    /// Configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config.with_env_overrides(),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let logging = LoggingConfig::from_settings(&config.logging, cli.verbose);
    if let Err(e) = observability::init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command. `Ok(false)` reports a failed import or an
/// invalid snapshot.
fn run_command(command: Commands, config: &SnapshotsConfig) -> field_snapshots::Result<bool> {
    match command {
        Commands::Import {
            snapshot,
            site,
            no_rollback,
            show_log,
        } => cmd_import(config, &snapshot, &site, no_rollback, show_log),

        Commands::Export {
            site,
            groups,
            options,
            post_types,
            users,
            output,
        } => cmd_export(config, &site, groups, options, post_types, users, output).map(|()| true),

        Commands::Validate { snapshot } => cmd_validate(&snapshot),

        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(config).map(|()| true),
    }
}

/// Loads configuration from `--config`, the environment, or the default
/// locations.
fn load_config(path: Option<&Path>) -> field_snapshots::Result<SnapshotsConfig> {
    if let Some(config_path) = path {
        return SnapshotsConfig::load_from_file(config_path);
    }

    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        if !config_path.trim().is_empty() {
            return SnapshotsConfig::load_from_file(Path::new(&config_path));
        }
    }

    Ok(SnapshotsConfig::load_default())
}
