//! Property-based tests for the import engine.
//!
//! Uses proptest to verify invariants across random sites and snapshots:
//! - Importing a site's own values writes nothing
//! - Export followed by import is a no-op across options, posts and users
//! - A failing import captures exactly the values before the failure
//! - Rollback restores the site to its prior state

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use field_snapshots::{
    EventLog, ExportRequest, ExportService, FieldDescriptor, FieldGroup, Importer, LogLevel,
    PostId, SiteStore, TargetContext, UserId,
};
use proptest::prelude::*;
use serde_json::{Map, Value, json};

const FIELDS: [&str; 3] = ["headline", "summary", "rating"];

fn post(id: u64) -> PostId {
    PostId::new(id).unwrap()
}

/// Non-null JSON values without floats.
fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
        prop::collection::vec("[a-z]{1,6}", 0..4).prop_map(|items| json!(items)),
    ]
}

/// Values per post: `values[i][f]` is field `FIELDS[f]` of post `i + 1`.
fn site_values_strategy() -> impl Strategy<Value = Vec<Vec<Option<Value>>>> {
    prop::collection::vec(
        prop::collection::vec(prop::option::of(value_strategy()), FIELDS.len()),
        1..6,
    )
}

fn build_site(values: &[Vec<Option<Value>>]) -> SiteStore {
    let mut site = SiteStore::new();
    site.add_field_group(FieldGroup::new(
        "g",
        FIELDS
            .iter()
            .map(|name| FieldDescriptor::plain(*name, "text"))
            .collect(),
    ));
    for (i, fields) in values.iter().enumerate() {
        let id = post(i as u64 + 1);
        site.add_post(id, "post");
        for (name, value) in FIELDS.iter().zip(fields) {
            if let Some(value) = value {
                site.set_value(*name, TargetContext::Post(id), value.clone());
            }
        }
    }
    site
}

/// Snapshot JSON writing `values` to posts `1..`, field by field.
fn snapshot_json(values: &[Vec<Option<Value>>]) -> String {
    let mut group = Map::new();
    for (f, name) in FIELDS.iter().enumerate() {
        let mut posts = Map::new();
        for (i, fields) in values.iter().enumerate() {
            posts.insert(
                (i + 1).to_string(),
                fields[f].clone().unwrap_or(Value::Null),
            );
        }
        group.insert(
            (*name).to_string(),
            json!({ "post_types": { "post": posts } }),
        );
    }
    json!({ "g": group }).to_string()
}

proptest! {
    /// Property: importing the values a site already holds writes nothing.
    #[test]
    fn prop_import_of_current_values_is_noop(values in site_values_strategy()) {
        let mut site = build_site(&values);
        let before = site.clone();
        let mut importer = Importer::new(&mut site, EventLog::new());

        prop_assert!(importer.import_field_data(&snapshot_json(&values), true));
        prop_assert_eq!(importer.session().report().written, 0);
        prop_assert!(!importer.log().has_errors());
        prop_assert!(
            importer
                .log()
                .records()
                .iter()
                .filter(|e| *e.level() == LogLevel::Success)
                .all(|e| !e.message().starts_with("Successfully updated"))
        );
        drop(importer);
        prop_assert_eq!(site, before);
    }

    /// Property: exporting a site and importing the result changes nothing.
    #[test]
    fn prop_export_then_import_is_noop(
        values in site_values_strategy(),
        option in value_strategy(),
        profile in value_strategy(),
    ) {
        let mut site = build_site(&values);
        site.set_value("headline", TargetContext::Options, option);
        let author = UserId::new(3).unwrap();
        site.add_user(author);
        site.set_value("summary", TargetContext::User(author), profile);
        let ids: Vec<PostId> = (1..=values.len() as u64).map(post).collect();

        let request = ExportRequest::new(["g"])
            .with_options()
            .with_posts("post", ids)
            .with_users([author]);
        let json = ExportService::new(&site)
            .export(&request)
            .unwrap()
            .to_json_pretty()
            .unwrap();

        let before = site.clone();
        let mut importer = Importer::new(&mut site, EventLog::new());
        prop_assert!(importer.import_field_data(&json, true));
        prop_assert_eq!(importer.session().report().written, 0);
        drop(importer);
        prop_assert_eq!(site, before);
    }

    /// Property: a failing import captured one value per attempted write.
    #[test]
    fn prop_failure_halts_after_k_values(k in 0usize..8) {
        let mut site = SiteStore::new();
        let mut posts = Map::new();
        for i in 1..=k as u64 {
            site.add_post(post(i), "post");
            posts.insert(i.to_string(), json!(format!("value {i}")));
        }
        posts.insert("999".to_string(), json!("unreachable"));
        let json = json!({ "g": { "f": { "post_types": { "post": posts } } } }).to_string();

        let mut importer = Importer::new(&mut site, EventLog::new());
        prop_assert!(!importer.import_field_data(&json, false));
        prop_assert_eq!(importer.session().original_data().len(), k);
        prop_assert_eq!(importer.session().report().written, k);
    }

    /// Property: a failed import with rollback leaves the site as it was.
    #[test]
    fn prop_rollback_restores_site(
        values in site_values_strategy(),
        incoming in site_values_strategy(),
    ) {
        let mut site = build_site(&values);
        let before = site.clone();

        // Targets beyond the site's posts fail once reached.
        let mut incoming = incoming;
        incoming.push(vec![Some(json!("x")); FIELDS.len()]);
        if incoming.len() <= values.len() {
            incoming.resize(values.len() + 1, vec![Some(json!("x")); FIELDS.len()]);
        }

        let mut importer = Importer::new(&mut site, EventLog::new());
        prop_assert!(!importer.import_field_data(&snapshot_json(&incoming), true));
        prop_assert_eq!(importer.session().report().rollback_failures, 0);
        drop(importer);
        prop_assert_eq!(site, before);
    }
}
