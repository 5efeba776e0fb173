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

//! # Dj Settings Module
//!
//! Settings songs do not export records. For each company they materialize
//! the values a settings model would start with, through the store's default
//! rules, and format them as Python literals for the installer script.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DjDomain;
use crate::errors::{DjError, Result};
use crate::identity::{slugify, DjIdentifierRegistry, DjXmlidContext};
use crate::record::{is_truthy, relation_ids, value_to_text, DjValues};
use crate::schema::{DjFieldDescriptor, DjFieldKind};
use crate::song::{DjSong, DjSongContext};
use crate::store::{read_one, require_model, DjRecordStore};
use crate::template::{py_literal, py_string};

const COMPANY_MODEL: &str = "res.company";

/// One field assignment of a settings entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DjSettingValue {
    pub field: String,
    /// Field label, annotated with the selection display value.
    pub label: String,
    /// Python source of the value.
    pub val: String,
}

/// Settings of one company, rendered as one installer function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DjSettingsEntry {
    pub name: String,
    pub aka: String,
    /// Company to switch to, empty for global settings.
    pub company_xmlid: String,
    pub values: Vec<DjSettingValue>,
}

/// Company code as part of a Python function name.
fn function_suffix(aka: &str) -> String {
    aka.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// `ctx.env.ref('<xmlid>').id`
pub fn anthem_xmlid_value(xmlid: &str) -> String {
    format!("ctx.env.ref('{}').id", xmlid)
}

fn target_companies(
    store: &dyn DjRecordStore,
    per_company: bool,
    xmlids: &[String],
) -> Result<Vec<i64>> {
    if !xmlids.is_empty() {
        return xmlids
            .iter()
            .map(|xmlid| {
                store
                    .resolve_identifier(xmlid)
                    .filter(|r| r.model == COMPANY_MODEL)
                    .map(|r| r.id)
                    .ok_or_else(|| {
                        DjError::configuration(format!("'{}' is not a known company", xmlid))
                    })
            })
            .collect();
    }
    let mut ids = store.search(COMPANY_MODEL, &DjDomain::All, Some("id asc"))?;
    if !per_company {
        ids.truncate(1);
    }
    Ok(ids)
}

/// Python source of one settings value and its (possibly annotated) label.
pub fn format_setting(
    registry: &mut DjIdentifierRegistry<'_>,
    field: &DjFieldDescriptor,
    value: &Value,
    ctx: &DjXmlidContext,
) -> Result<(String, String)> {
    let mut label = field.label.clone();
    if !is_truthy(value) {
        let val = match value {
            Value::Null => "False".to_string(),
            other => py_literal(other),
        };
        return Ok((label, val));
    }
    let val = match field.kind {
        DjFieldKind::Selection => {
            if let Some(display) = field.selection_label(&value_to_text(value)) {
                label = format!("{}: {}", label, display);
            }
            match value {
                Value::String(text) => py_string(text),
                other => py_literal(other),
            }
        }
        DjFieldKind::Many2one | DjFieldKind::Many2many => {
            let target = field.relation.as_deref().ok_or_else(|| {
                DjError::configuration(format!("settings field {} has no target model", field.name))
            })?;
            let refs: Vec<String> = registry
                .identifiers(target, &relation_ids(value), ctx)?
                .iter()
                .map(|xmlid| anthem_xmlid_value(xmlid))
                .collect();
            if field.kind == DjFieldKind::Many2one {
                refs.into_iter().next().unwrap_or_else(|| "False".to_string())
            } else {
                format!("[(6, 0, [{}])]", refs.join(", "))
            }
        }
        DjFieldKind::Char | DjFieldKind::Text | DjFieldKind::Date | DjFieldKind::Datetime => {
            py_string(&value_to_text(value))
        }
        _ => py_literal(value),
    };
    Ok((label, val))
}

/// Entries of a settings song, one per target company.
pub fn settings_entries(
    song: &DjSong,
    song_name: &str,
    registry: &mut DjIdentifierRegistry<'_>,
    ctx: &DjSongContext<'_>,
) -> Result<Vec<DjSettingsEntry>> {
    let Some(model) = song.model.as_deref() else {
        return Ok(Vec::new());
    };
    let policy = registry.policy();
    let info = require_model(registry.store(), model)?;
    let per_company = info.has_field("company_id");
    let companies = target_companies(registry.store(), per_company, ctx.settings_company_xmlids)?;

    let company_fields = vec!["name".to_string(), "aka".to_string()];
    let mut entries = Vec::with_capacity(companies.len());
    for company_id in companies {
        let Some(company) = read_one(registry.store(), COMPANY_MODEL, company_id, &company_fields)?
        else {
            continue;
        };
        let aka = if is_truthy(company.get("aka")) {
            value_to_text(company.get("aka"))
        } else {
            slugify(&value_to_text(company.get("name")))
        };
        let mut partial = DjValues::new();
        if per_company {
            partial.insert("company_id".to_string(), Value::from(company_id));
        }
        let defaults = registry.store().apply_defaults(model, &partial)?;

        let mut values = Vec::new();
        for field in &info.fields {
            if field.name == "id" || policy.field_blacklist.contains(&field.name) {
                continue;
            }
            let Some(value) = defaults.get(&field.name) else {
                continue;
            };
            let (label, val) = format_setting(registry, field, value, ctx.xmlid)?;
            values.push(DjSettingValue {
                field: field.name.clone(),
                label,
                val,
            });
        }
        let company_xmlid = if per_company {
            registry.identifier(COMPANY_MODEL, company_id, ctx.xmlid)?
        } else {
            String::new()
        };
        debug!(
            "settings {} for company {}: {} values",
            model,
            aka,
            values.len()
        );
        entries.push(DjSettingsEntry {
            name: format!("{}_{}", song_name, function_suffix(&aka)),
            aka,
            company_xmlid,
            values,
        });
    }
    Ok(entries)
}
