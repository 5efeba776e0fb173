//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dj Burner.
//! The Dj Burner project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Dj Config Module
//!
//! The policy tables that drive a burn: framework-internal field and addon
//! blacklists, replaceable identifier namespaces, special file fields and the
//! song type registry. A [`DjPolicyConfig`] is built once and handed to the
//! assembler; nothing here is process-wide state.
//!
//! Configuration can be loaded from JSON or YAML. Keys missing from the
//! document fall back to [`DjPolicyConfig::default`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{DjDomain, DjOperator};
use crate::errors::{DjError, Result};

/// Fields never exported from the "all fields" list.
const FIELD_BLACKLIST: &[&str] = &[
    "display_name",
    "__last_update",
    "parent_left",
    "parent_right",
    "message_ids",
    "message_follower_ids",
    "message_follower",
    "message_last_post",
    "message_unread",
    "message_unread_counter",
    "message_needaction_counter",
    "website_message_ids",
    "create_uid",
    "create_date",
    "write_uid",
    "write_date",
];

/// Modules not worth tracking amongst installed addons.
const ADDONS_BLACKLIST: &[&str] = &[
    "base",
    "base_setup",
    "base_action_rule",
    "base_import",
    "board",
    "bus",
    "calendar",
    "grid",
    "maintenance",
    "report",
    "resource",
    "web",
    "web_calendar",
    "web_editor",
    "web_enterprise",
    "web_gantt",
    "web_kanban",
    "web_kanban_gauge",
    "web_mobile",
    "web_planner",
    "web_settings_dashboard",
    "web_tour",
];

const REPLACEABLE_NAMESPACES: &[&str] =
    &["__sample__", "__setup__", "__test__", "__import__", "__export__"];

/// Defaults carried by one song type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DjSongTypeSpec {
    pub label: String,
    pub prefix: String,
    pub suffix: String,
    pub sequence: i64,
    pub only_config: bool,
    pub has_records: bool,
    pub template_path: String,
    /// Forced target model, if the type always exports the same model.
    pub model: Option<String>,
    /// Default selection filter as a JSON domain.
    pub domain: Option<Value>,
}

impl DjSongTypeSpec {
    fn new(label: &str, prefix: &str, sequence: i64, template: &str) -> Self {
        DjSongTypeSpec {
            label: label.to_string(),
            prefix: prefix.to_string(),
            sequence,
            has_records: true,
            template_path: template.to_string(),
            ..Default::default()
        }
    }

    fn config_only(mut self) -> Self {
        self.only_config = true;
        self
    }

    fn without_records(mut self) -> Self {
        self.has_records = false;
        self
    }
}

/// Explicit policy value passed into the assembler.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DjPolicyConfig {
    pub field_blacklist: Vec<String>,
    pub addons_blacklist: Vec<String>,
    pub replaceable_namespaces: Vec<String>,
    /// Namespace used for install compilations.
    pub default_namespace: String,
    /// Namespace used for sample compilations.
    pub sample_namespace: String,
    pub file_field_kinds: Vec<String>,
    pub file_field_names: Vec<String>,
    /// Fields whose path reference must stay well-formed XML.
    pub xml_wrapped_field_names: Vec<String>,
    pub path_prefix: String,
    pub default_binaries_dir: String,
    pub mimetype_extensions: BTreeMap<String, String>,
    pub extension_aliases: BTreeMap<String, String>,
    /// Language values are exported in; never shadowed.
    pub main_language: String,
    /// Base directory used when reading `dj_path:` references on import.
    pub data_root: PathBuf,
    pub song_types: BTreeMap<String, DjSongTypeSpec>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_song_types() -> BTreeMap<String, DjSongTypeSpec> {
    let mut types = BTreeMap::new();
    types.insert(
        "settings".to_string(),
        DjSongTypeSpec::new("Config settings", "", 0, "base_dj:discs/song_settings.tmpl")
            .config_only()
            .without_records(),
    );
    types.insert(
        "load_csv".to_string(),
        DjSongTypeSpec::new("Load CSV", "load_", 10, "base_dj:discs/song.tmpl"),
    );
    types.insert(
        "load_csv_defer_parent".to_string(),
        DjSongTypeSpec::new(
            "Load CSV defer parent computation",
            "load_",
            20,
            "base_dj:discs/song_defer_parent.tmpl",
        ),
    );
    let mut compute_parent = DjSongTypeSpec::new(
        "Parent computation",
        "load_",
        20,
        "base_dj:discs/song_compute_parent.tmpl",
    );
    compute_parent.suffix = "_compute_parent".to_string();
    types.insert("compute_parent".to_string(), compute_parent);
    types.insert(
        "generate_xmlids".to_string(),
        DjSongTypeSpec::new(
            "Generate xmlids (for existing records)",
            "add_xmlid_to_existing_",
            30,
            "base_dj:discs/song_add_xmlids.tmpl",
        )
        .config_only()
        .without_records(),
    );
    let mut addons = DjSongTypeSpec::new(
        "List installed addons",
        "",
        40,
        "base_dj:discs/song_addons.tmpl",
    )
    .config_only();
    addons.model = Some("ir.module.module".to_string());
    addons.domain = Some(
        DjDomain::leaf("state", DjOperator::Eq, Value::from("installed"))
            .and(DjDomain::leaf(
                "name",
                DjOperator::NotIn,
                Value::from(strings(ADDONS_BLACKLIST)),
            ))
            .to_value(),
    );
    types.insert("scratch_installed_addons".to_string(), addons);
    types
}

impl Default for DjPolicyConfig {
    fn default() -> Self {
        let mut mimetype_extensions = BTreeMap::new();
        mimetype_extensions.insert("image/x-icon".to_string(), "ico".to_string());
        let mut extension_aliases = BTreeMap::new();
        extension_aliases.insert("jpe".to_string(), "jpg".to_string());
        extension_aliases.insert("jpeg".to_string(), "jpg".to_string());

        DjPolicyConfig {
            field_blacklist: strings(FIELD_BLACKLIST),
            addons_blacklist: strings(ADDONS_BLACKLIST),
            replaceable_namespaces: strings(REPLACEABLE_NAMESPACES),
            default_namespace: "__setup__".to_string(),
            sample_namespace: "__sample__".to_string(),
            file_field_kinds: strings(&["html", "binary"]),
            file_field_names: strings(&["arch_db"]),
            xml_wrapped_field_names: strings(&["arch_db"]),
            path_prefix: "dj_path:".to_string(),
            default_binaries_dir: "binaries".to_string(),
            mimetype_extensions,
            extension_aliases,
            main_language: "en_US".to_string(),
            data_root: PathBuf::new(),
            song_types: default_song_types(),
        }
    }
}

impl DjPolicyConfig {
    pub fn is_replaceable(&self, namespace: &str) -> bool {
        self.replaceable_namespaces.iter().any(|n| n == namespace)
    }

    pub fn song_type(&self, key: &str) -> Option<&DjSongTypeSpec> {
        self.song_types.get(key)
    }

    /// Song types sorted by `(sequence, key)`, as offered to administrators.
    pub fn song_type_choices(&self) -> Vec<(&str, &str)> {
        let mut choices: Vec<(i64, &str, &str)> = self
            .song_types
            .iter()
            .map(|(key, spec)| (spec.sequence, key.as_str(), spec.label.as_str()))
            .collect();
        choices.sort();
        choices.into_iter().map(|(_, k, l)| (k, l)).collect()
    }

    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    pub fn with_main_language(mut self, lang: impl Into<String>) -> Self {
        self.main_language = lang.into();
        self
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let builder: DjPolicyConfigBuilder = serde_json::from_value(value.clone())?;
        Ok(builder.build())
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let builder: DjPolicyConfigBuilder = serde_yaml::from_str(text)?;
        Ok(builder.build())
    }

    /// Loads `.json`, `.yaml` or `.yml` files.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&serde_json::from_str(&text)?),
            Some("yaml") | Some("yml") => Self::from_yaml(&text),
            other => Err(DjError::configuration(format!(
                "unsupported policy file extension {:?} for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Partial policy document; absent keys keep their defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DjPolicyConfigBuilder {
    pub field_blacklist: Option<Vec<String>>,
    pub addons_blacklist: Option<Vec<String>>,
    pub replaceable_namespaces: Option<Vec<String>>,
    pub default_namespace: Option<String>,
    pub sample_namespace: Option<String>,
    pub file_field_kinds: Option<Vec<String>>,
    pub file_field_names: Option<Vec<String>>,
    pub xml_wrapped_field_names: Option<Vec<String>>,
    pub path_prefix: Option<String>,
    pub default_binaries_dir: Option<String>,
    pub mimetype_extensions: Option<BTreeMap<String, String>>,
    pub extension_aliases: Option<BTreeMap<String, String>>,
    pub main_language: Option<String>,
    pub data_root: Option<PathBuf>,
    /// Merged over the built-in song types.
    pub song_types: Option<BTreeMap<String, DjSongTypeSpec>>,
}

impl DjPolicyConfigBuilder {
    pub fn build(self) -> DjPolicyConfig {
        let base = DjPolicyConfig::default();
        let mut song_types = base.song_types;
        if let Some(extra) = self.song_types {
            song_types.extend(extra);
        }
        DjPolicyConfig {
            field_blacklist: self.field_blacklist.unwrap_or(base.field_blacklist),
            addons_blacklist: self.addons_blacklist.unwrap_or(base.addons_blacklist),
            replaceable_namespaces: self
                .replaceable_namespaces
                .unwrap_or(base.replaceable_namespaces),
            default_namespace: self.default_namespace.unwrap_or(base.default_namespace),
            sample_namespace: self.sample_namespace.unwrap_or(base.sample_namespace),
            file_field_kinds: self.file_field_kinds.unwrap_or(base.file_field_kinds),
            file_field_names: self.file_field_names.unwrap_or(base.file_field_names),
            xml_wrapped_field_names: self
                .xml_wrapped_field_names
                .unwrap_or(base.xml_wrapped_field_names),
            path_prefix: self.path_prefix.unwrap_or(base.path_prefix),
            default_binaries_dir: self
                .default_binaries_dir
                .unwrap_or(base.default_binaries_dir),
            mimetype_extensions: self
                .mimetype_extensions
                .unwrap_or(base.mimetype_extensions),
            extension_aliases: self.extension_aliases.unwrap_or(base.extension_aliases),
            main_language: self.main_language.unwrap_or(base.main_language),
            data_root: self.data_root.unwrap_or(base.data_root),
            song_types,
        }
    }
}
