//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dj Burner.
//! The Dj Burner project belongs to the Dunimd Team.

mod common;

use std::fs;

use dj_burner::codec::blob::encode_base64;
use dj_burner::{
    DjBurnOptions, DjBurnResult, DjCompilation, DjCompilationAssembler, DjCsvImporter, DjError,
    DjMemoryStore, DjSong, DjTrack,
};
use serde_json::json;

const PARTNER_CSV: &str = "install/generated/base/partners/res.partner.csv";

fn burn_partners(store: &mut DjMemoryStore, song: DjSong) -> DjBurnResult {
    let policy = common::policy();
    let equalizers = common::equalizers();
    let templates = common::templates();
    let compilation = DjCompilation::new(1, "Partners", "base").with_song(song);
    let mut assembler = DjCompilationAssembler::new(store, &policy, &equalizers, &templates)
        .with_compilation(compilation);
    assembler.burn(&[1], &DjBurnOptions::default()).unwrap()
}

#[test]
fn test_burned_rows_decode_to_live_values() {
    let mut store = common::store();
    let song = DjSong::new(1, "res.partner").with_fields(&[
        "name",
        "active",
        "lang",
        "company_id",
        "category_id",
        "parent_id",
    ]);
    let result = burn_partners(&mut store, song);
    let track = result.track(PARTNER_CSV).unwrap();

    let policy = common::policy();
    let rows = DjCsvImporter::new(&policy)
        .decode_track(&store, "res.partner", track)
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].xmlid, "__setup__.res_partner_alice");
    assert_eq!(rows[0].values["name"], json!("Alice"));
    assert_eq!(rows[0].values["active"], json!(true));
    assert_eq!(rows[0].values["lang"], json!("en_US"));
    assert_eq!(rows[0].values["company_id"], json!(1));
    assert_eq!(rows[0].values["category_id"], json!([1, 2]));
    assert_eq!(rows[0].values["parent_id"], json!(null));
    assert!(rows[0].is_complete());

    assert_eq!(rows[1].xmlid, "__setup__.res_partner_bob");
    assert_eq!(rows[1].values["active"], json!(false));
    assert_eq!(rows[1].values["category_id"], json!([]));
    assert_eq!(rows[1].values["parent_id"], json!(common::ALICE));
}

#[test]
fn test_side_car_files_are_read_back_from_disk() {
    let mut store = common::store();
    let song = DjSong::new(1, "res.partner").with_fields(&["name", "image", "comment"]);
    let result = burn_partners(&mut store, song);

    let dir = tempfile::tempdir().unwrap();
    for track in &result.tracks {
        let path = dir.path().join(&track.path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, &track.content).unwrap();
    }

    let policy = common::policy().with_data_root(dir.path());
    let rows = DjCsvImporter::new(&policy)
        .decode_file(&store, "res.partner", &dir.path().join(PARTNER_CSV))
        .unwrap();

    assert_eq!(rows[0].values["image"], json!(encode_base64(common::PNG)));
    assert_eq!(rows[0].values["comment"], json!("<p>Hello</p>"));
    assert_eq!(rows[1].values["image"], json!(null));
    assert_eq!(rows[1].values["comment"], json!(null));
}

#[test]
fn test_unknown_references_are_reported_per_row() {
    let store = common::store();
    let policy = common::policy();
    let track = DjTrack::new(
        "res.partner.csv",
        concat!(
            "\"id\",\"name\",\"parent_id/id\"\n",
            "\"__setup__.res_partner_carol\",\"Carol\",\"__setup__.res_partner_ghost\"\n",
        ),
    );

    let rows = DjCsvImporter::new(&policy)
        .decode_track(&store, "res.partner", &track)
        .unwrap();

    assert_eq!(rows[0].values["name"], json!("Carol"));
    assert_eq!(rows[0].values["parent_id"], json!(null));
    assert_eq!(
        rows[0].unresolved,
        vec![(
            "parent_id".to_string(),
            "__setup__.res_partner_ghost".to_string()
        )]
    );
    assert!(!rows[0].is_complete());
}

#[test]
fn test_columns_must_match_model_fields() {
    let store = common::store();
    let policy = common::policy();
    let importer = DjCsvImporter::new(&policy);

    let track = DjTrack::new("x.csv", "\"id\",\"nickname\"\n\"a\",\"b\"\n");
    let err = importer.decode_track(&store, "res.partner", &track).unwrap_err();
    assert!(matches!(err, DjError::Validation { .. }));

    let err = importer.decode_track(&store, "res.nowhere", &track).unwrap_err();
    assert!(matches!(err, DjError::Configuration { .. }));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let store = common::store();
    let policy = common::policy();
    let dir = tempfile::tempdir().unwrap();
    let err = DjCsvImporter::new(&policy)
        .decode_file(&store, "res.partner", &dir.path().join("absent.csv"))
        .unwrap_err();
    assert!(matches!(err, DjError::Io(_)));
}
