//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dj Burner.
//! The Dj Burner project belongs to the Dunimd Team.

//! Shared fixtures for the integration suites: a small partner database
//! with companies, categories, bank accounts, modules and settings.

#![allow(dead_code)]

use dj_burner::codec::blob::encode_base64;
use dj_burner::{
    DjEqualizerSet, DjFieldDescriptor, DjFieldKind, DjMemoryStore, DjModelInfo, DjPolicyConfig,
    DjSong, DjSongContext, DjTemplateRegistry, DjXmlidContext,
};
use serde_json::json;

pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub const ALICE: i64 = 1;
pub const BOB: i64 = 2;

fn char_field(name: &str) -> DjFieldDescriptor {
    DjFieldDescriptor::new(name, DjFieldKind::Char)
}

pub fn company_model() -> DjModelInfo {
    DjModelInfo::new("res.company")
        .with_field(char_field("name"))
        .with_field(char_field("aka"))
}

pub fn category_model() -> DjModelInfo {
    DjModelInfo::new("res.partner.category")
        .with_field(char_field("name"))
        .with_field(DjFieldDescriptor::relation(
            "parent_id",
            DjFieldKind::Many2one,
            "res.partner.category",
        ))
        .with_field(char_field("parent_path"))
}

pub fn partner_model() -> DjModelInfo {
    DjModelInfo::new("res.partner")
        .with_field(char_field("name"))
        .with_field(char_field("ref"))
        .with_field(char_field("function").translatable())
        .with_field(DjFieldDescriptor::new("active", DjFieldKind::Boolean))
        .with_field(
            DjFieldDescriptor::new("lang", DjFieldKind::Selection)
                .with_selection(&[("en_US", "English"), ("fr_FR", "French")]),
        )
        .with_field(DjFieldDescriptor::relation(
            "company_id",
            DjFieldKind::Many2one,
            "res.company",
        ))
        .with_field(DjFieldDescriptor::relation(
            "category_id",
            DjFieldKind::Many2many,
            "res.partner.category",
        ))
        .with_field(DjFieldDescriptor::relation(
            "parent_id",
            DjFieldKind::Many2one,
            "res.partner",
        ))
        .with_field(DjFieldDescriptor::relation(
            "child_ids",
            DjFieldKind::One2many,
            "res.partner",
        ))
        .with_field(DjFieldDescriptor::new("image", DjFieldKind::Binary))
        .with_field(DjFieldDescriptor::new("comment", DjFieldKind::Html))
        .with_field(char_field("display_name").computed())
}

pub fn bank_model() -> DjModelInfo {
    DjModelInfo::new("res.partner.bank")
        .with_field(char_field("acc_number"))
        .with_field(DjFieldDescriptor::relation(
            "partner_id",
            DjFieldKind::Many2one,
            "res.partner",
        ))
}

pub fn module_model() -> DjModelInfo {
    DjModelInfo::new("ir.module.module")
        .with_field(char_field("name"))
        .with_field(char_field("state"))
        .with_field(char_field("repository"))
}

pub fn settings_model() -> DjModelInfo {
    DjModelInfo::new("res.config.settings")
        .with_field(DjFieldDescriptor::relation(
            "company_id",
            DjFieldKind::Many2one,
            "res.company",
        ))
        .with_field(DjFieldDescriptor::new("group_multi_currency", DjFieldKind::Boolean))
        .with_field(
            DjFieldDescriptor::new("paperformat", DjFieldKind::Selection)
                .with_selection(&[("a4", "A4"), ("us_letter", "US Letter")]),
        )
        .with_field(DjFieldDescriptor::new("report_footer", DjFieldKind::Text))
        .transient()
}

pub fn view_model() -> DjModelInfo {
    DjModelInfo::new("ir.ui.view")
        .with_field(char_field("name"))
        .with_field(DjFieldDescriptor::new("arch_db", DjFieldKind::Text))
}

/// One company, two categories, two partners, one bank account.
pub fn store() -> DjMemoryStore {
    let mut store = DjMemoryStore::new()
        .with_model(company_model())
        .with_model(category_model())
        .with_model(partner_model())
        .with_model(bank_model())
        .with_model(module_model())
        .with_model(settings_model())
        .with_model(view_model());

    store.insert("res.company", json!({"name": "Foo Inc.", "aka": "FOO"}));

    store.insert(
        "res.partner.category",
        json!({"name": "Customers", "parent_id": null, "parent_path": "1/"}),
    );
    store.insert(
        "res.partner.category",
        json!({"name": "VIP", "parent_id": 1, "parent_path": "1/2/"}),
    );

    store.insert(
        "res.partner",
        json!({
            "name": "Alice",
            "ref": "A1",
            "function": "Director",
            "active": true,
            "lang": "en_US",
            "company_id": 1,
            "category_id": [1, 2],
            "parent_id": null,
            "image": encode_base64(PNG),
            "comment": "<p>Hello</p>",
            "display_name": "Alice",
        }),
    );
    store.insert(
        "res.partner",
        json!({
            "name": "Bob",
            "ref": null,
            "function": null,
            "active": false,
            "lang": "fr_FR",
            "company_id": 1,
            "category_id": [],
            "parent_id": ALICE,
            "image": null,
            "comment": null,
            "display_name": "Alice, Bob",
        }),
    );
    store.set_translation("res.partner", ALICE, "function", "fr_FR", json!("Directrice"));

    store.insert("res.partner.bank", json!({"acc_number": "56789", "partner_id": ALICE}));

    for (name, state, repository) in [
        ("base", "installed", json!("addons")),
        ("sale", "installed", json!("addons")),
        ("dj_burner", "installed", json!("dj-tools")),
        ("website", "uninstalled", json!("addons")),
        ("contract", "installed", json!("oca-contract")),
    ] {
        store.insert(
            "ir.module.module",
            json!({"name": name, "state": state, "repository": repository}),
        );
    }

    store.insert(
        "ir.ui.view",
        json!({"name": "partner form", "arch_db": "<form><field name=\"name\"/></form>"}),
    );

    store.set_defaults(
        "res.config.settings",
        None,
        json!({"group_multi_currency": true, "paperformat": "a4", "report_footer": "Thanks"}),
    );
    store
}

/// Adds a second company, switching the store to multi-company mode.
pub fn add_company(store: &mut DjMemoryStore, name: &str, aka: Option<&str>) -> i64 {
    store.insert("res.company", json!({"name": name, "aka": aka}))
}

pub fn policy() -> DjPolicyConfig {
    DjPolicyConfig::default()
}

pub fn equalizers() -> DjEqualizerSet {
    DjEqualizerSet::default()
}

pub fn templates() -> DjTemplateRegistry {
    DjTemplateRegistry::new()
}

pub fn setup_ctx() -> DjXmlidContext {
    DjXmlidContext::new("__setup__")
}

/// Context of a song placed first in the `partners` compilation.
pub fn song_context<'a>(xmlid: &'a DjXmlidContext, catalog: &'a [DjSong]) -> DjSongContext<'a> {
    DjSongContext {
        compilation: "partners",
        genre: "base",
        data_mode: "install",
        disc_path: "songs/install/generated/base/partners.py",
        position: 1,
        duplicated: false,
        xmlid,
        catalog,
        settings_company_xmlids: &[],
    }
}
