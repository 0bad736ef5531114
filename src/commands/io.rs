//! Import, export and validate command handlers.

use std::path::{Path, PathBuf};

use field_snapshots::io::ValidationResult;
use field_snapshots::{
    Error, EventLog, ExportRequest, ExportService, FieldProcessor, Importer, PostId, Result,
    SiteStore, SnapshotValidator, SnapshotsConfig, UserId,
};

/// Issues printed before the list is truncated.
const MAX_LISTED_ISSUES: usize = 10;

/// Executes the import command. Returns whether the import succeeded.
pub fn cmd_import(
    config: &SnapshotsConfig,
    snapshot: &Path,
    site_path: &Path,
    no_rollback: bool,
    show_log: bool,
) -> Result<bool> {
    let is_json = snapshot
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        return Err(Error::InvalidInput(format!(
            "{}: please upload a valid JSON file",
            snapshot.display()
        )));
    }

    let json = read_snapshot(snapshot)?;
    let validation = SnapshotValidator::new().validate_str(&json);
    print_issues(&validation);
    if !validation.is_valid() {
        return Err(Error::InvalidInput(
            "the uploaded file has an invalid JSON structure".to_string(),
        ));
    }

    let mut site = SiteStore::load_from_file(site_path)?;
    let rollback = config.rollback_on_failure && !no_rollback;
    let processor = FieldProcessor::with_formatted_kinds(config.formatted_kinds());

    let mut importer = Importer::new(&mut site, EventLog::new()).with_processor(processor);
    let success = importer.import_field_data(&json, rollback);
    let report = importer.session().report().clone();
    let log = importer.into_log();

    site.save_to_file(site_path)?;

    let show_log = show_log || config.event_logging;
    if show_log {
        for line in log.entries() {
            println!("{line}");
        }
        println!();
    }

    if success {
        println!("Import completed successfully");
    } else if show_log {
        println!("Import failed. View the event log above for more details.");
    } else {
        println!("Import failed. Enable event logging (--show-log) for more details.");
    }
    println!("  Written:          {}", report.written);
    println!("  Unchanged:        {}", report.skipped);
    if report.rollback_performed {
        println!("  Rolled back:      {}", report.rolled_back);
        println!("  Rollback failures:{}", report.rollback_failures);
    }

    Ok(success)
}

/// Executes the export command.
pub fn cmd_export(
    config: &SnapshotsConfig,
    site_path: &Path,
    groups: Vec<String>,
    options: bool,
    post_types: Vec<(String, Vec<PostId>)>,
    users: Vec<UserId>,
    output: Option<PathBuf>,
) -> Result<()> {
    let site = SiteStore::load_from_file(site_path)?;

    let mut request = ExportRequest::new(groups).with_users(users);
    if options {
        request = request.with_options();
    }
    for (post_type, ids) in post_types {
        request = request.with_posts(post_type, ids);
    }

    let processor = FieldProcessor::with_formatted_kinds(config.formatted_kinds());
    let snapshot = ExportService::new(&site)
        .with_processor(processor)
        .export(&request)?;
    let json = snapshot.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).map_err(|e| Error::OperationFailed {
                operation: "write_snapshot_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;
            eprintln!(
                "Exported {} values from {} groups to {}",
                snapshot.value_count(),
                snapshot.len(),
                path.display()
            );
        },
        None => println!("{json}"),
    }

    Ok(())
}

/// Executes the validate command. Returns whether the snapshot is valid.
pub fn cmd_validate(snapshot: &Path) -> Result<bool> {
    let json = read_snapshot(snapshot)?;
    let validation = SnapshotValidator::new().validate_str(&json);
    print_issues(&validation);

    if validation.is_valid() {
        println!(
            "{}: valid ({} values)",
            snapshot.display(),
            validation.value_count
        );
    } else {
        println!("{}: invalid", snapshot.display());
    }
    Ok(validation.is_valid())
}

/// Parses `--post-type <type>=<id>,<id>`.
pub fn parse_post_selection(s: &str) -> std::result::Result<(String, Vec<PostId>), String> {
    let (post_type, ids) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <post_type>=<id>[,<id>...], got '{s}'"))?;
    let post_type = post_type.trim();
    if post_type.is_empty() {
        return Err("post type must not be empty".to_string());
    }

    let ids = ids
        .split(',')
        .filter(|id| !id.trim().is_empty())
        .map(|id| PostId::parse(id).ok_or_else(|| format!("invalid post ID '{id}'")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(format!("no post IDs given for '{post_type}'"));
    }
    Ok((post_type.to_string(), ids))
}

/// Parses `--user <id>`.
pub fn parse_user_id(s: &str) -> std::result::Result<UserId, String> {
    UserId::parse(s).ok_or_else(|| format!("invalid user ID '{s}'"))
}

fn read_snapshot(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
        operation: "read_snapshot_file".to_string(),
        cause: format!("{}: {e}", path.display()),
    })
}

fn print_issues(validation: &ValidationResult) {
    if validation.issues.is_empty() {
        return;
    }
    eprintln!("Issues ({}):", validation.issues.len());
    for issue in validation.issues.iter().take(MAX_LISTED_ISSUES) {
        eprintln!("  - [{:?}] {issue}", issue.severity);
    }
    if validation.issues.len() > MAX_LISTED_ISSUES {
        eprintln!("  ... and {} more", validation.issues.len() - MAX_LISTED_ISSUES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_post_selection() {
        let (post_type, ids) = parse_post_selection("page=7, 8").unwrap();
        assert_eq!(post_type, "page");
        assert_eq!(ids, vec![PostId::new(7).unwrap(), PostId::new(8).unwrap()]);

        assert!(parse_post_selection("page").is_err());
        assert!(parse_post_selection("=5").is_err());
        assert!(parse_post_selection("page=").is_err());
        assert!(parse_post_selection("page=x").is_err());
    }

    #[test]
    fn test_import_rejects_non_json_extension() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("snapshot.txt");
        std::fs::write(&snapshot, "{}").unwrap();

        let result = cmd_import(
            &SnapshotsConfig::default(),
            &snapshot,
            &dir.path().join("site.json"),
            false,
            false,
        );
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
