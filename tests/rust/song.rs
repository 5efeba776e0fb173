//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dj Burner.
//! The Dj Burner project belongs to the Dunimd Team.

mod common;

use dj_burner::song::{GENERATE_XMLIDS, SETTINGS};
use dj_burner::settings::settings_entries;
use dj_burner::{
    DjEqualizerConfig, DjEqualizerSet, DjError, DjFieldDescriptor, DjFieldKind,
    DjIdentifierRegistry, DjMemoryStore, DjModelInfo, DjScratchRegistry, DjSong, DjSongContext,
    DjSongOutput, DjXmlidContext,
};
use regex::Regex;
use serde_json::json;

use common::{ALICE, BOB};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn burn(
    store: &mut DjMemoryStore,
    equalizers: &DjEqualizerSet,
    song: &DjSong,
    xmlid: &DjXmlidContext,
) -> DjSongOutput {
    let policy = common::policy();
    let templates = common::templates();
    let catalog = vec![song.clone()];
    let ctx = common::song_context(xmlid, &catalog);
    let mut registry = DjIdentifierRegistry::new(store, &policy, equalizers);
    song.burn(&mut registry, &ctx, &DjScratchRegistry::default(), &templates)
        .unwrap()
}

fn csv_text(output: DjSongOutput) -> (String, String) {
    match output {
        DjSongOutput::Tracks { csv, .. } => (csv.path.clone(), csv.text()),
        other => panic!("expected CSV tracks, got {:?}", other),
    }
}

#[test]
fn test_default_field_names() {
    let policy = common::policy();
    let song = DjSong::new(1, "res.partner");
    let info = common::partner_model();

    let names = song.csv_field_names(&info, &policy, &common::equalizers());
    assert_eq!(
        names,
        strings(&[
            "id",
            "name",
            "active",
            "category_id/id",
            "comment",
            "company_id/id",
            "function",
            "image",
            "lang",
            "parent_id/id",
            "ref",
        ])
    );
    assert_eq!(song.header_exclude(&info, &names), strings(&["parent_id/id"]));
}

#[test]
fn test_whitelist_keeps_company_column() {
    let policy = common::policy();
    let song = DjSong::new(1, "res.partner").with_fields(&["name", "parent_id", "no_such_field"]);

    let names = song.csv_field_names(&common::partner_model(), &policy, &common::equalizers());
    assert_eq!(
        names,
        strings(&["id", "name", "company_id/id", "parent_id/id"])
    );
}

#[test]
fn test_blacklists_remove_columns() {
    let policy = common::policy();
    let equalizers = DjEqualizerSet::new(vec![
        DjEqualizerConfig::new("res.partner").with_field_blacklist(&["ref", "function"])
    ]);
    let song = DjSong::new(1, "res.partner").with_field_blacklist(&["image", "comment"]);

    let names = song.csv_field_names(&common::partner_model(), &policy, &equalizers);
    assert_eq!(
        names,
        strings(&[
            "id",
            "name",
            "active",
            "category_id/id",
            "company_id/id",
            "lang",
            "parent_id/id",
        ])
    );
}

#[test]
fn test_parent_path_never_exported() {
    let policy = common::policy();
    let song = DjSong::new(1, "res.partner.category");

    let names = song.csv_field_names(&common::category_model(), &policy, &common::equalizers());
    assert_eq!(names, strings(&["id", "name", "parent_id/id"]));
}

#[test]
fn test_translation_shadow_exports_translatable_fields() {
    let policy = common::policy();
    let shadow = DjSong::new(1, "res.partner")
        .with_translations(true)
        .translation_shadow("fr_FR");

    let names = shadow.csv_field_names(&common::partner_model(), &policy, &common::equalizers());
    assert_eq!(names, strings(&["id", "company_id/id", "function"]));
}

#[test]
fn test_csv_track_is_fully_quoted() {
    let mut store = common::store();
    let song = DjSong::new(1, "res.partner").with_fields(&["name", "parent_id"]);

    let output = burn(&mut store, &common::equalizers(), &song, &common::setup_ctx());
    let (path, text) = csv_text(output);

    assert_eq!(path, "install/generated/base/partners/res.partner.csv");
    assert_eq!(
        text,
        concat!(
            "\"id\",\"name\",\"company_id/id\",\"parent_id/id\"\n",
            "\"__setup__.res_partner_alice\",\"Alice\",\"__setup__.res_company_foo_inc\",\"\"\n",
            "\"__setup__.res_partner_bob\",\"Bob\",\"__setup__.res_company_foo_inc\",\"__setup__.res_partner_alice\"\n",
        )
    );
}

#[test]
fn test_side_car_files_follow_csv() {
    let mut store = common::store();
    let song = DjSong::new(1, "res.partner");

    let output = burn(&mut store, &common::equalizers(), &song, &common::setup_ctx());
    let DjSongOutput::Tracks { csv, blobs } = output else {
        panic!("expected CSV tracks");
    };

    let paths: Vec<&str> = blobs.iter().map(|b| b.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "install/generated/base/partners/binaries/res.partner/__setup__.res_partner_alice__image.png",
            "install/generated/base/partners/binaries/res.partner/__setup__.res_partner_alice__comment.html",
        ]
    );
    assert_eq!(blobs[0].content, common::PNG.to_vec());
    assert_eq!(blobs[1].text(), "<p>Hello</p>");
    assert!(csv.text().contains(
        "\"dj_path:install/generated/base/partners/binaries/res.partner/__setup__.res_partner_alice__image.png\""
    ));
}

#[test]
fn test_random_identifiers_only_differ_in_disambiguator() {
    let mut store = common::store();
    let song = DjSong::new(1, "res.partner.bank");
    let ctx = common::setup_ctx().with_persist(false);
    let disambiguator = Regex::new(r"_[0-9a-f]{8}\x22").unwrap();

    let (_, first) = csv_text(burn(&mut store, &common::equalizers(), &song, &ctx));
    let (_, second) = csv_text(burn(&mut store, &common::equalizers(), &song, &ctx));

    assert!(disambiguator.is_match(&first), "{}", first);
    assert_eq!(
        disambiguator.replace_all(&first, "\""),
        disambiguator.replace_all(&second, "\"")
    );
    assert!(store.assignments().is_empty());
}

#[test]
fn test_domain_and_record_blacklist() {
    let store = common::store();
    let equalizers = common::equalizers();

    let bob_only = DjSong::new(1, "res.partner").with_domain(json!([["name", "=", "Bob"]]));
    assert_eq!(
        bob_only.select_records(&store, &equalizers, &[], None).unwrap(),
        vec![BOB]
    );

    let blacklisted = DjEqualizerSet::new(vec![
        DjEqualizerConfig::new("res.partner").with_record_blacklist(&[ALICE])
    ]);
    let everyone = DjSong::new(2, "res.partner");
    assert_eq!(
        everyone.select_records(&store, &blacklisted, &[], None).unwrap(),
        vec![BOB]
    );
    assert_eq!(
        everyone
            .select_records(&store, &equalizers, &[], Some("name desc"))
            .unwrap(),
        vec![BOB, ALICE]
    );
}

#[test]
fn test_blacklist_by_unknown_identifier_fails() {
    let store = common::store();
    let equalizers = DjEqualizerSet::new(vec![
        DjEqualizerConfig::new("res.partner").with_record_blacklist_xmlids(&["__setup__.ghost"])
    ]);

    let err = DjSong::new(1, "res.partner")
        .select_records(&store, &equalizers, &[], None)
        .unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_selection_code_extends_domain() {
    let store = common::store();
    let equalizers = common::equalizers();

    let song = DjSong::new(1, "res.partner")
        .with_domain(json!([["name", "=", "Bob"]]))
        .with_selection_code("# add Alice\nrecords = search(\"res.partner\", [[\"name\", \"=\", \"Alice\"]])");
    assert_eq!(
        song.select_records(&store, &equalizers, &[], None).unwrap(),
        vec![BOB, ALICE]
    );

    let categories = DjSong::new(2, "res.partner.category")
        .with_domain(json!([["id", "in", []]]))
        .with_selection_code("search(\"res.partner\", [[\"name\", \"=\", \"Alice\"]]).category_id");
    assert_eq!(
        categories.select_records(&store, &equalizers, &[], None).unwrap(),
        vec![1, 2]
    );

    let wrong = DjSong::new(3, "res.partner").with_selection_code("search(\"res.partner.category\")");
    let err = wrong.select_records(&store, &equalizers, &[], None).unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_dependencies_replace_domain() {
    let store = common::store();
    let equalizers = common::equalizers();
    let master = DjSong::new(1, "res.partner").with_domain(json!([["name", "=", "Alice"]]));
    let lonely = DjSong::new(2, "res.partner").with_domain(json!([["name", "=", "Bob"]]));
    let categories = DjSong::new(3, "res.partner.category")
        .with_domain(json!([["name", "=", "nothing"]]))
        .with_dependency(1, "category_id");
    let catalog = vec![master.clone(), lonely.clone(), categories.clone()];

    assert_eq!(
        categories.select_records(&store, &equalizers, &catalog, None).unwrap(),
        vec![1, 2]
    );

    let empty = DjSong::new(4, "res.partner.category").with_dependency(2, "category_id");
    assert!(empty
        .select_records(&store, &equalizers, &catalog, None)
        .unwrap()
        .is_empty());

    let mismatch = DjSong::new(5, "res.partner.bank").with_dependency(1, "category_id");
    let err = mismatch
        .select_records(&store, &equalizers, &catalog, None)
        .unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));

    let orphan = DjSong::new(6, "res.partner.category").with_dependency(99, "category_id");
    let err = orphan
        .select_records(&store, &equalizers, &catalog, None)
        .unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_overlapping_sources_yield_each_record_once() {
    let store = common::store();
    let equalizers = common::equalizers();

    let everyone = DjSong::new(1, "res.partner")
        .with_selection_code("search(\"res.partner\", [[\"name\", \"=\", \"Alice\"]])");
    assert_eq!(
        everyone.select_records(&store, &equalizers, &[], None).unwrap(),
        vec![ALICE, BOB]
    );

    let alice = DjSong::new(2, "res.partner").with_domain(json!([["name", "=", "Alice"]]));
    let bob = DjSong::new(3, "res.partner").with_domain(json!([["name", "=", "Bob"]]));
    let categories = DjSong::new(4, "res.partner.category")
        .with_dependency(2, "category_id")
        .with_dependency(3, "parent_id.category_id");
    let catalog = vec![alice, bob, categories.clone()];
    assert_eq!(
        categories.select_records(&store, &equalizers, &catalog, None).unwrap(),
        vec![1, 2]
    );
}

#[test]
fn test_cyclic_dependencies_are_refused() {
    let store = common::store();
    let first = DjSong::new(1, "res.partner").with_dependency(2, "parent_id");
    let second = DjSong::new(2, "res.partner").with_dependency(1, "parent_id");
    let catalog = vec![first.clone(), second];

    let err = first
        .select_records(&store, &common::equalizers(), &catalog, None)
        .unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_duplicated_songs_get_positional_names() {
    let policy = common::policy();
    let xmlid = common::setup_ctx();
    let song = DjSong::new(1, "res.partner");
    let ctx = DjSongContext {
        position: 2,
        duplicated: true,
        ..common::song_context(&xmlid, &[])
    };

    assert_eq!(song.name(&policy, &ctx), "load_res_partner_2");
    assert_eq!(
        song.real_csv_path(&ctx),
        "install/generated/base/partners/res.partner_2.csv"
    );
    assert_eq!(
        song.real_binaries_path(&ctx),
        "install/generated/base/partners/binaries/res_2.partner"
    );
    assert_eq!(
        song.anthem_path(&policy, &ctx),
        "songs.install.generated.base.partners::load_res_partner_2"
    );
}

#[test]
fn test_disc_entry_renders_loader() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let templates = common::templates();
    let xmlid = common::setup_ctx();
    let song = DjSong::new(1, "res.partner").with_fields(&["name", "parent_id"]);
    let catalog = vec![song.clone()];
    let ctx = common::song_context(&xmlid, &catalog);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let entry = song.disc_entry(&mut registry, &ctx, &templates).unwrap();

    assert_eq!(entry["name"], json!("load_res_partner"));
    assert_eq!(entry["header_exclude"], json!("['parent_id/id']"));
    assert_eq!(entry["calls"], json!(["load_res_partner"]));
    let body = entry["body"].as_str().unwrap();
    assert!(body.contains("def load_res_partner(ctx):"));
    assert!(body.contains("with_context({'tracking_disable': True})"));
    assert!(body.contains("'data/install/generated/base/partners/res.partner.csv'"));
}

fn settings_store() -> DjMemoryStore {
    let mut store = common::store();
    store.set_identifier("res.company", 1, "base.main_company");
    store
}

#[test]
fn test_settings_song_renders_company_values() {
    let mut store = settings_store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let templates = common::templates();
    let xmlid = common::setup_ctx();
    let song = DjSong::of_type(7, SETTINGS, &policy)
        .unwrap()
        .with_model("res.config.settings");
    let catalog = vec![song.clone()];
    let ctx = common::song_context(&xmlid, &catalog);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let output = song
        .burn(&mut registry, &ctx, &DjScratchRegistry::default(), &templates)
        .unwrap();
    assert!(
        matches!(output, DjSongOutput::ConfigNotice { ref song, .. } if song == "res_config_settings")
    );

    let entries = settings_entries(&song, "res_config_settings", &mut registry, &ctx).unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.name, "res_config_settings_FOO");
    assert_eq!(entry.aka, "FOO");
    assert_eq!(entry.company_xmlid, "base.main_company");
    let values: Vec<(&str, &str, &str)> = entry
        .values
        .iter()
        .map(|v| (v.field.as_str(), v.label.as_str(), v.val.as_str()))
        .collect();
    assert_eq!(
        values,
        vec![
            ("company_id", "company id", "ctx.env.ref('base.main_company').id"),
            ("group_multi_currency", "group multi currency", "True"),
            ("paperformat", "paperformat: A4", "'a4'"),
            ("report_footer", "report footer", "'Thanks'"),
        ]
    );

    let disc = song.disc_entry(&mut registry, &ctx, &templates).unwrap();
    assert_eq!(disc["calls"], json!(["res_config_settings_FOO"]));
    let body = disc["body"].as_str().unwrap();
    assert!(body.contains("def res_config_settings_FOO(ctx):"));
    assert!(body.contains("with switch_company(ctx, 'base.main_company') as ctx:"));
    assert!(body.contains("'paperformat': 'a4',"));
}

#[test]
fn test_settings_follow_companies() {
    let mut store = settings_store();
    let bar = common::add_company(&mut store, "Bar Ltd", Some("BAR"));
    store.set_identifier("res.company", bar, "__setup__.bar");
    store.set_defaults("res.config.settings", Some(bar), json!({"paperformat": "us_letter"}));
    store.add_model(
        DjModelInfo::new("res.config.global")
            .with_field(DjFieldDescriptor::new("default_lang", DjFieldKind::Char))
            .transient(),
    );
    store.set_defaults("res.config.global", None, json!({"default_lang": "en_US"}));
    let policy = common::policy();
    let equalizers = common::equalizers();
    let xmlid = common::setup_ctx();
    let per_company = DjSong::of_type(7, SETTINGS, &policy)
        .unwrap()
        .with_model("res.config.settings");
    let global = DjSong::of_type(8, SETTINGS, &policy)
        .unwrap()
        .with_model("res.config.global");
    let ctx = common::song_context(&xmlid, &[]);
    let restricted = vec!["__setup__.bar".to_string()];
    let only_bar = DjSongContext {
        settings_company_xmlids: &restricted,
        ..ctx.clone()
    };

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);

    let entries = settings_entries(&per_company, "cfg", &mut registry, &ctx).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["cfg_FOO", "cfg_BAR"]);
    let bar_paper = entries[1]
        .values
        .iter()
        .find(|v| v.field == "paperformat")
        .map(|v| v.val.as_str());
    assert_eq!(bar_paper, Some("'us_letter'"));

    let entries = settings_entries(&per_company, "cfg", &mut registry, &only_bar).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].company_xmlid, "__setup__.bar");

    let entries = settings_entries(&global, "glob", &mut registry, &ctx).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "glob_FOO");
    assert_eq!(entries[0].company_xmlid, "");
    assert_eq!(entries[0].values[0].val, "'en_US'");

    let unknown = vec!["__setup__.res_partner_alice".to_string()];
    let bad = DjSongContext {
        settings_company_xmlids: &unknown,
        ..ctx.clone()
    };
    let err = settings_entries(&per_company, "cfg", &mut registry, &bad).unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_settings_text_and_company_codes_stay_valid_python() {
    let mut store = settings_store();
    let bar = common::add_company(&mut store, "Bar Ltd", Some("BAR-2.x"));
    store.set_defaults(
        "res.config.settings",
        Some(bar),
        json!({"report_footer": "Say \"\"\"hi\"\"\"\nit's done"}),
    );
    let policy = common::policy();
    let equalizers = common::equalizers();
    let xmlid = common::setup_ctx();
    let song = DjSong::of_type(7, SETTINGS, &policy)
        .unwrap()
        .with_model("res.config.settings");
    let ctx = common::song_context(&xmlid, &[]);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let entries = settings_entries(&song, "cfg", &mut registry, &ctx).unwrap();

    assert_eq!(entries[1].name, "cfg_BAR_2_x");
    assert_eq!(entries[1].aka, "BAR-2.x");
    let footer = entries[1]
        .values
        .iter()
        .find(|v| v.field == "report_footer")
        .map(|v| v.val.as_str());
    assert_eq!(footer, Some("'Say \"\"\"hi\"\"\"\\nit\\'s done'"));
}

#[test]
fn test_generate_xmlids_song_lists_lookup_domains() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let templates = common::templates();
    let xmlid = common::setup_ctx();
    let song = DjSong::of_type(8, GENERATE_XMLIDS, &policy)
        .unwrap()
        .with_model("res.partner");
    let catalog = vec![song.clone()];
    let ctx = common::song_context(&xmlid, &catalog);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let output = song
        .burn(&mut registry, &ctx, &DjScratchRegistry::default(), &templates)
        .unwrap();
    assert!(output.into_tracks().is_empty());

    let entry = song.disc_entry(&mut registry, &ctx, &templates).unwrap();
    assert_eq!(entry["name"], json!("add_xmlid_to_existing_res_partner"));
    assert_eq!(
        entry["xmlids"],
        json!([
            {"xmlid": "__setup__.res_partner_alice", "domain": "[['name', '=', 'Alice']]"},
            {"xmlid": "__setup__.res_partner_bob", "domain": "[['name', '=', 'Bob']]"},
        ])
    );
    assert!(entry["body"]
        .as_str()
        .unwrap()
        .contains("('__setup__.res_partner_alice', [['name', '=', 'Alice']]),"));
}

#[test]
fn test_installed_addons_scratch() {
    let mut store = common::store();
    let policy = common::policy();
    let song = DjSong::of_type(9, "scratch_installed_addons", &policy).unwrap();

    let output = burn(&mut store, &common::equalizers(), &song, &common::setup_ctx());
    let DjSongOutput::Scratched(track) = output else {
        panic!("expected a scratch track");
    };

    assert_eq!(track.path, "installed_addons.txt");
    let text = track.text();
    assert!(text.starts_with("# Installed addons, 3 in total.\n"), "{}", text);
    assert!(text.contains("# core\nsale\n"), "{}", text);
    assert!(text.contains("# dj-tools\ndj_burner\n"), "{}", text);
    assert!(text.contains("# oca-contract\ncontract\n"), "{}", text);
    assert!(!text.contains("website"));
}

#[test]
fn test_unknown_scratch_type_fails() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let templates = common::templates();
    let xmlid = common::setup_ctx();
    let mut song = DjSong::new(1, "res.partner");
    song.song_type = "scratch_unknown".to_string();
    let ctx = common::song_context(&xmlid, &[]);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let err = song
        .burn(&mut registry, &ctx, &DjScratchRegistry::default(), &templates)
        .unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_song_without_model_is_inert() {
    let mut store = common::store();
    let song = DjSong::default();

    let output = burn(&mut store, &common::equalizers(), &song, &common::setup_ctx());
    assert!(matches!(output, DjSongOutput::Inert));
}

#[test]
fn test_songs_deserialize_with_defaults() {
    let song: DjSong = serde_json::from_value(json!({
        "id": 3,
        "model": "res.partner",
        "exec_hook": "pre",
    }))
    .unwrap();

    assert_eq!(song.sequence, 10);
    assert_eq!(song.song_type, "load_csv");
    assert_eq!(song.records_order, "id asc");
    assert_eq!(song.exec_hook.as_str(), "pre");
    assert_eq!(song.model_context.get("tracking_disable"), Some(&json!(true)));
}
