//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dj Burner.
//! The Dj Burner project belongs to the Dunimd Team.

mod common;

use std::fs;

use dj_burner::codec::blob::encode_base64;
use dj_burner::{
    DjEncodeContext, DjError, DjFieldCodec, DjFieldDescriptor, DjFieldKind, DjIdentifierRegistry,
    DjModelInfo, DjPolicyConfig, DjRecord, DjRecordStore, DjValues,
};
use serde_json::json;

use common::{ALICE, BOB};

fn read(registry: &DjIdentifierRegistry<'_>, model: &str, id: i64) -> DjRecord {
    registry
        .store()
        .read(model, &[id], &[], None)
        .unwrap()
        .remove(0)
}

fn encode_context<'a>(
    xmlid: &'a dj_burner::DjXmlidContext,
    binaries_path: &'a str,
    field_names: &'a [String],
) -> DjEncodeContext<'a> {
    DjEncodeContext {
        xmlid,
        binaries_path,
        lang: None,
        field_names,
    }
}

#[test]
fn test_relations_export_identifiers() {
    let mut store = common::store();
    store.set_identifier("res.company", 1, "base.main_company");
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let info = common::partner_model();
    let codec = DjFieldCodec::new(&policy);
    let enc = encode_context(&ctx, "binaries/res.partner", &[]);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let alice = read(&registry, "res.partner", ALICE);
    let bob = read(&registry, "res.partner", BOB);

    let parent = codec
        .encode_field(&mut registry, &bob, info.field("parent_id").unwrap(), &enc)
        .unwrap();
    assert_eq!(parent, "__setup__.res_partner_alice");

    let categories = codec
        .encode_field(&mut registry, &alice, info.field("category_id").unwrap(), &enc)
        .unwrap();
    assert_eq!(
        categories,
        "__setup__.res_partner_category_customers,__setup__.res_partner_category_vip"
    );

    let company = codec
        .encode_field(&mut registry, &alice, info.field("company_id").unwrap(), &enc)
        .unwrap();
    assert_eq!(company, "base.main_company");

    let no_parent = codec
        .encode_field(&mut registry, &alice, info.field("parent_id").unwrap(), &enc)
        .unwrap();
    assert_eq!(no_parent, "");
}

#[test]
fn test_scalars_keep_raw_values() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let info = common::partner_model();
    let codec = DjFieldCodec::new(&policy);
    let enc = encode_context(&ctx, "binaries/res.partner", &[]);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let alice = read(&registry, "res.partner", ALICE);
    let bob = read(&registry, "res.partner", BOB);
    let mut encode = |record: &DjRecord, field: &str| {
        codec
            .encode_field(&mut registry, record, info.field(field).unwrap(), &enc)
            .unwrap()
    };

    assert_eq!(encode(&alice, "active"), "True");
    assert_eq!(encode(&bob, "active"), "False");
    assert_eq!(encode(&bob, "lang"), "fr_FR");
    assert_eq!(encode(&alice, "ref"), "A1");
    assert_eq!(encode(&bob, "ref"), "");
}

#[test]
fn test_binary_fields_become_side_car_references() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let info = common::partner_model();
    let codec = DjFieldCodec::new(&policy);
    let enc = encode_context(&ctx, "binaries/res.partner", &[]);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let alice = read(&registry, "res.partner", ALICE);
    let image = info.field("image").unwrap();

    let reference = codec
        .encode_field(&mut registry, &alice, image, &enc)
        .unwrap();
    assert_eq!(
        reference,
        "dj_path:binaries/res.partner/__setup__.res_partner_alice__image.png"
    );

    let (path, blob) = codec.blob_path(&mut registry, &alice, image, &enc).unwrap();
    assert_eq!(
        path,
        "binaries/res.partner/__setup__.res_partner_alice__image.png"
    );
    assert_eq!(blob.extension, "png");
    assert_eq!(blob.content, common::PNG.to_vec());

    let comment = codec
        .encode_field(&mut registry, &alice, info.field("comment").unwrap(), &enc)
        .unwrap();
    assert_eq!(
        comment,
        "dj_path:binaries/res.partner/__setup__.res_partner_alice__comment.html"
    );
}

#[test]
fn test_translated_side_cars_carry_language() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let info = common::partner_model();
    let codec = DjFieldCodec::new(&policy);
    let enc = DjEncodeContext {
        xmlid: &ctx,
        binaries_path: "binaries/res.partner",
        lang: Some("fr_FR"),
        field_names: &[],
    };

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let alice = read(&registry, "res.partner", ALICE);
    let comment = codec
        .encode_field(&mut registry, &alice, info.field("comment").unwrap(), &enc)
        .unwrap();
    assert_eq!(
        comment,
        "dj_path:binaries/res.partner/__setup__.res_partner_alice__comment_fr_FR.html"
    );
}

#[test]
fn test_special_fields_limited_to_exported_ones() {
    let policy = common::policy();
    let ctx = common::setup_ctx();
    let info = common::partner_model();
    let codec = DjFieldCodec::new(&policy);
    let names = vec!["name".to_string(), "image".to_string()];
    let enc = encode_context(&ctx, "binaries/res.partner", &names);

    let specials: Vec<&str> = codec
        .special_fields(&info, &enc)
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(specials, vec!["image"]);
}

#[test]
fn test_xml_views_are_wrapped() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let info = common::view_model();
    let codec = DjFieldCodec::new(&policy);
    let enc = encode_context(&ctx, "binaries/ir.ui.view", &[]);

    let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
    let view = read(&registry, "ir.ui.view", 1);
    let arch = codec
        .encode_field(&mut registry, &view, info.field("arch_db").unwrap(), &enc)
        .unwrap();
    assert_eq!(
        arch,
        "<odoo><path>dj_path:binaries/ir.ui.view/__setup__.ir_ui_view_partner_form__arch_db.xml</path></odoo>"
    );
}

#[test]
fn test_decode_resolves_identifiers() {
    let mut store = common::store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let info = common::partner_model();
    {
        let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
        registry.identifiers("res.partner", &[ALICE, BOB], &ctx).unwrap();
        registry
            .identifiers("res.partner.category", &[1, 2], &ctx)
            .unwrap();
    }
    let codec = DjFieldCodec::new(&policy);
    let row = DjValues::new();
    let decode = |field: &str, text: &str| {
        codec.decode_field(&store, "res.partner", info.field(field).unwrap(), text, &row)
    };

    assert_eq!(
        decode("parent_id", "__setup__.res_partner_alice").unwrap(),
        json!(ALICE)
    );
    assert_eq!(
        decode(
            "category_id",
            "__setup__.res_partner_category_customers,__setup__.res_partner_category_vip"
        )
        .unwrap(),
        json!([1, 2])
    );
    assert_eq!(decode("category_id", "").unwrap(), json!([]));
    assert_eq!(decode("parent_id", "").unwrap(), json!(null));
    assert_eq!(decode("active", "True").unwrap(), json!(true));
    assert_eq!(decode("active", "").unwrap(), json!(false));
    assert_eq!(decode("lang", "fr_FR").unwrap(), json!("fr_FR"));

    let err = decode("parent_id", "__setup__.nobody").unwrap_err();
    assert!(
        matches!(err, DjError::UnresolvableReference { ref identifier } if identifier == "__setup__.nobody")
    );
}

#[test]
fn test_decode_rejects_malformed_numbers() {
    let store = common::store();
    let policy = common::policy();
    let codec = DjFieldCodec::new(&policy);
    let color = DjFieldDescriptor::new("color", DjFieldKind::Integer);

    assert_eq!(
        codec
            .decode_field(&store, "res.partner", &color, "7", &DjValues::new())
            .unwrap(),
        json!(7)
    );
    let err = codec
        .decode_field(&store, "res.partner", &color, "seven", &DjValues::new())
        .unwrap_err();
    assert!(matches!(err, DjError::Validation { .. }));
}

#[test]
fn test_decode_reads_side_car_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("binaries/res.partner")).unwrap();
    fs::write(dir.path().join("binaries/res.partner/a__image.png"), common::PNG).unwrap();
    fs::create_dir_all(dir.path().join("binaries/ir.ui.view")).unwrap();
    fs::write(
        dir.path().join("binaries/ir.ui.view/v__arch_db.xml"),
        "<form/>",
    )
    .unwrap();

    let store = common::store();
    let policy = DjPolicyConfig::default().with_data_root(dir.path());
    let codec = DjFieldCodec::new(&policy);
    let row = DjValues::new();

    let image = codec
        .decode_field(
            &store,
            "res.partner",
            common::partner_model().field("image").unwrap(),
            "dj_path:binaries/res.partner/a__image.png",
            &row,
        )
        .unwrap();
    assert_eq!(image, json!(encode_base64(common::PNG)));

    let arch = codec
        .decode_field(
            &store,
            "ir.ui.view",
            common::view_model().field("arch_db").unwrap(),
            "<odoo><path>dj_path:binaries/ir.ui.view/v__arch_db.xml</path></odoo>",
            &row,
        )
        .unwrap();
    assert_eq!(arch, json!("<form/>"));

    let err = codec
        .decode_field(
            &store,
            "res.partner",
            common::partner_model().field("image").unwrap(),
            "dj_path:binaries/missing.png",
            &row,
        )
        .unwrap_err();
    assert!(matches!(err, DjError::Io(_)));
}

fn property_store() -> dj_burner::DjMemoryStore {
    let mut store = common::store();
    store.add_model(
        DjModelInfo::new("ir.property")
            .with_field(DjFieldDescriptor::new("name", DjFieldKind::Char))
            .with_field(DjFieldDescriptor::new("res_id", DjFieldKind::Char))
            .with_field(DjFieldDescriptor::new("value_reference", DjFieldKind::Char)),
    );
    store.add_model(
        DjModelInfo::new("ir.model.fields")
            .with_field(DjFieldDescriptor::new("model", DjFieldKind::Char))
            .with_field(DjFieldDescriptor::new("name", DjFieldKind::Char)),
    );
    store.add_model(
        DjModelInfo::new("ir.default")
            .with_field(DjFieldDescriptor::relation(
                "field_id",
                DjFieldKind::Many2one,
                "ir.model.fields",
            ))
            .with_field(DjFieldDescriptor::new("json_value", DjFieldKind::Char)),
    );
    store.insert(
        "ir.property",
        json!({"name": "property_parent", "res_id": "res.partner,2", "value_reference": "res.partner,1"}),
    );
    store.insert("ir.model.fields", json!({"model": "res.partner", "name": "company_id"}));
    store.insert("ir.default", json!({"field_id": 1, "json_value": "1"}));
    store.insert("ir.model.fields", json!({"model": "res.partner", "name": "category_id"}));
    store.insert("ir.default", json!({"field_id": 2, "json_value": "[2]"}));
    store
}

#[test]
fn test_property_references_round_trip() {
    let mut store = property_store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let codec = DjFieldCodec::new(&policy);
    let info = store.model("ir.property").unwrap();
    let enc = encode_context(&ctx, "binaries/ir.property", &[]);

    {
        let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
        let property = read(&registry, "ir.property", 1);
        let value = codec
            .encode_field(&mut registry, &property, info.field("value_reference").unwrap(), &enc)
            .unwrap();
        assert_eq!(value, "__setup__.res_partner_alice");
        let res_id = codec
            .encode_field(&mut registry, &property, info.field("res_id").unwrap(), &enc)
            .unwrap();
        assert_eq!(res_id, "__setup__.res_partner_bob");
    }

    let decoded = codec
        .decode_field(
            &store,
            "ir.property",
            info.field("value_reference").unwrap(),
            "__setup__.res_partner_alice",
            &DjValues::new(),
        )
        .unwrap();
    assert_eq!(decoded, json!("res.partner,1"));
}

#[test]
fn test_relational_defaults_round_trip() {
    let mut store = property_store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let codec = DjFieldCodec::new(&policy);
    let info = store.model("ir.default").unwrap();
    let enc = encode_context(&ctx, "binaries/ir.default", &[]);

    {
        let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
        let default = read(&registry, "ir.default", 1);
        let value = codec
            .encode_field(&mut registry, &default, info.field("json_value").unwrap(), &enc)
            .unwrap();
        assert_eq!(value, "__setup__.res_company_foo_inc");
    }

    let mut row = DjValues::new();
    row.insert("field_id".to_string(), json!(1));
    let decoded = codec
        .decode_field(
            &store,
            "ir.default",
            info.field("json_value").unwrap(),
            "__setup__.res_company_foo_inc",
            &row,
        )
        .unwrap();
    assert_eq!(decoded, json!("1"));
}

#[test]
fn test_single_tag_default_keeps_its_list() {
    let mut store = property_store();
    let policy = common::policy();
    let equalizers = common::equalizers();
    let ctx = common::setup_ctx();
    let codec = DjFieldCodec::new(&policy);
    let info = store.model("ir.default").unwrap();
    let enc = encode_context(&ctx, "binaries/ir.default", &[]);

    {
        let mut registry = DjIdentifierRegistry::new(&mut store, &policy, &equalizers);
        let default = read(&registry, "ir.default", 2);
        let value = codec
            .encode_field(&mut registry, &default, info.field("json_value").unwrap(), &enc)
            .unwrap();
        assert_eq!(value, "__setup__.res_partner_category_vip");
    }

    let mut row = DjValues::new();
    row.insert("field_id".to_string(), json!(2));
    let field = info.field("json_value").unwrap();
    let decoded = codec
        .decode_field(&store, "ir.default", field, "__setup__.res_partner_category_vip", &row)
        .unwrap();
    assert_eq!(decoded, json!("[2]"));
}
