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

//! # Dj Field Codec
//!
//! Per-kind conversion between stored values and their portable text form.
//! Export and import dispatch on the same [`DjFieldKind`]:
//!
//! | kind | export | import |
//! |---|---|---|
//! | many2one | `namespace.name` | record id |
//! | many2many | comma-joined identifiers | id list |
//! | selection | raw stored key | raw key |
//! | boolean | `True` / `False` | bool |
//! | float | shortest repr, at least one decimal | f64 |
//! | special file fields | `dj_path:<dir>/<xmlid>__<field>.<ext>` | file content |
//!
//! Empty values export as an empty string and import as `null`.

use std::fs;

use serde_json::Value;

use super::adapters::{default_adapters, DjValueAdapter};
use super::blob::{encode_base64, sniff, DjBlob};
use crate::config::DjPolicyConfig;
use crate::errors::{DjError, Result};
use crate::identity::{DjIdentifierRegistry, DjXmlidContext};
use crate::record::{is_truthy, relation_ids, value_to_text, DjRecord, DjValues};
use crate::schema::{DjFieldDescriptor, DjFieldKind, DjModelInfo};
use crate::store::DjRecordStore;

const WRAP_OPEN: &str = "<odoo><path>";
const WRAP_CLOSE: &str = "</path></odoo>";

/// Export-side parameters shared by all fields of one song.
#[derive(Clone, Debug)]
pub struct DjEncodeContext<'a> {
    pub xmlid: &'a DjXmlidContext,
    /// Directory side-car files are written to, without prefix.
    pub binaries_path: &'a str,
    pub lang: Option<&'a str>,
    /// Field names exported by the song; file handling is limited to these.
    pub field_names: &'a [String],
}

/// Field conversion rules for one policy.
pub struct DjFieldCodec<'p> {
    policy: &'p DjPolicyConfig,
    adapters: Vec<Box<dyn DjValueAdapter>>,
}

impl<'p> DjFieldCodec<'p> {
    pub fn new(policy: &'p DjPolicyConfig) -> Self {
        DjFieldCodec {
            policy,
            adapters: default_adapters(),
        }
    }

    /// Registers an additional adapter; later ones take precedence.
    pub fn with_adapter(mut self, adapter: Box<dyn DjValueAdapter>) -> Self {
        self.adapters.insert(0, adapter);
        self
    }

    pub fn policy(&self) -> &DjPolicyConfig {
        self.policy
    }

    fn adapter(&self, model: &str, field: &str) -> Option<&dyn DjValueAdapter> {
        self.adapters
            .iter()
            .find(|a| a.model() == model && a.handles(field))
            .map(|a| a.as_ref())
    }

    /// Kind or name marks the field as stored in a side-car file.
    pub fn is_file_field(&self, field: &DjFieldDescriptor) -> bool {
        self.policy
            .file_field_kinds
            .iter()
            .any(|k| k == field.kind.as_str())
            || self.policy.file_field_names.contains(&field.name)
    }

    fn is_special(&self, field: &DjFieldDescriptor, ctx: &DjEncodeContext<'_>) -> bool {
        self.is_file_field(field)
            && (ctx.field_names.is_empty() || ctx.field_names.contains(&field.name))
    }

    /// File fields of `info` that the song exports.
    pub fn special_fields<'m>(
        &self,
        info: &'m DjModelInfo,
        ctx: &DjEncodeContext<'_>,
    ) -> Vec<&'m DjFieldDescriptor> {
        info.fields
            .iter()
            .filter(|f| self.is_special(f, ctx))
            .collect()
    }

    /// Text form of one field of `record`.
    pub fn encode_field(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        record: &DjRecord,
        field: &DjFieldDescriptor,
        ctx: &DjEncodeContext<'_>,
    ) -> Result<String> {
        let value = record.get(&field.name);
        if let Some(adapter) = self.adapter(&record.model, &field.name) {
            if let Some(text) = adapter.encode(registry, record, &field.name, ctx.xmlid)? {
                return Ok(text);
            }
        }
        if !is_truthy(value) && field.kind != DjFieldKind::Boolean {
            return Ok(match value {
                Value::Number(_) => value_to_text(value),
                _ => String::new(),
            });
        }
        if self.is_special(field, ctx) {
            return self.blob_reference(registry, record, field, ctx);
        }

        match field.kind {
            DjFieldKind::Many2one | DjFieldKind::Many2many | DjFieldKind::One2many => {
                let target = field.relation.as_deref().ok_or_else(|| {
                    DjError::configuration(format!(
                        "relational field {}.{} has no target model",
                        record.model, field.name
                    ))
                })?;
                let mut ids = relation_ids(value);
                if field.kind == DjFieldKind::Many2one {
                    ids.truncate(1);
                }
                Ok(registry.identifiers(target, &ids, ctx.xmlid)?.join(","))
            }
            DjFieldKind::Boolean => Ok(if is_truthy(value) { "True" } else { "False" }.to_string()),
            _ => Ok(value_to_text(value)),
        }
    }

    /// Path of the side-car file of a special field, without prefix.
    pub fn blob_path(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        record: &DjRecord,
        field: &DjFieldDescriptor,
        ctx: &DjEncodeContext<'_>,
    ) -> Result<(String, DjBlob)> {
        let xmlid = registry.identifier(&record.model, record.id, ctx.xmlid)?;
        let blob = sniff(field, record.get(&field.name), self.policy)?;
        let mut path = format!("{}/{}__{}", ctx.binaries_path, xmlid, field.name);
        if let Some(lang) = ctx.lang.filter(|l| !l.is_empty()) {
            path.push('_');
            path.push_str(lang);
        }
        path.push('.');
        path.push_str(&blob.extension);
        Ok((path, blob))
    }

    fn blob_reference(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        record: &DjRecord,
        field: &DjFieldDescriptor,
        ctx: &DjEncodeContext<'_>,
    ) -> Result<String> {
        let (path, _) = self.blob_path(registry, record, field, ctx)?;
        let reference = format!("{}{}", self.policy.path_prefix, path);
        if self.policy.xml_wrapped_field_names.contains(&field.name) {
            Ok(format!("{}{}{}", WRAP_OPEN, reference, WRAP_CLOSE))
        } else {
            Ok(reference)
        }
    }

    /// Live value of one imported field.
    ///
    /// `row` holds the already decoded values of the same row, used by
    /// adapters whose meaning depends on sibling fields.
    pub fn decode_field(
        &self,
        store: &dyn DjRecordStore,
        model: &str,
        field: &DjFieldDescriptor,
        text: &str,
        row: &DjValues,
    ) -> Result<Value> {
        if let Some(adapter) = self.adapter(model, &field.name) {
            if let Some(value) = adapter.decode(store, row, &field.name, text)? {
                return Ok(value);
            }
        }
        if text.is_empty() {
            return Ok(match field.kind {
                DjFieldKind::Boolean => Value::Bool(false),
                DjFieldKind::Many2many | DjFieldKind::One2many => Value::Array(Vec::new()),
                _ => Value::Null,
            });
        }
        if self.is_file_field(field) {
            if let Some(value) = self.read_path_reference(field, text)? {
                return Ok(value);
            }
        }

        match field.kind {
            DjFieldKind::Many2one => Ok(Value::from(resolve(store, text.trim())?)),
            DjFieldKind::Many2many | DjFieldKind::One2many => {
                let ids = text
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|identifier| resolve(store, identifier))
                    .collect::<Result<Vec<i64>>>()?;
                Ok(Value::from(ids))
            }
            DjFieldKind::Boolean => Ok(Value::Bool(matches!(
                text.trim(),
                "True" | "true" | "1" | "yes"
            ))),
            DjFieldKind::Integer => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| DjError::validation(format!("{}: invalid integer '{}': {}", field.name, text, e))),
            DjFieldKind::Float | DjFieldKind::Monetary => text
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|e| DjError::validation(format!("{}: invalid number '{}': {}", field.name, text, e))),
            _ => Ok(Value::from(text)),
        }
    }

    /// Reads a `dj_path:` reference relative to the data root.
    fn read_path_reference(&self, field: &DjFieldDescriptor, text: &str) -> Result<Option<Value>> {
        let unwrapped = text.replace(WRAP_OPEN, "").replace(WRAP_CLOSE, "");
        let Some(relative) = unwrapped.strip_prefix(self.policy.path_prefix.as_str()) else {
            return Ok(None);
        };
        let path = self.policy.data_root.join(relative);
        let bytes = fs::read(&path)
            .map_err(|e| DjError::Io(format!("{}: {}", path.display(), e)))?;
        if field.kind == DjFieldKind::Binary {
            return Ok(Some(Value::from(encode_base64(&bytes))));
        }
        let content = String::from_utf8(bytes).map_err(|e| {
            DjError::validation(format!("{} is not valid UTF-8: {}", path.display(), e))
        })?;
        Ok(Some(Value::from(content)))
    }
}

/// Id of the record named by `identifier`.
pub fn resolve(store: &dyn DjRecordStore, identifier: &str) -> Result<i64> {
    store
        .resolve_identifier(identifier)
        .map(|r| r.id)
        .ok_or_else(|| DjError::unresolvable(identifier))
}
