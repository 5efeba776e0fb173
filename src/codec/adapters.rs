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

//! # Dj Value Adapters
//!
//! Some framework records keep references inside serialized values instead
//! of relational columns. Adapters decode such a value, substitute ids with
//! identifiers (or back) and re-encode it.

use serde_json::Value;

use super::field::resolve;
use crate::errors::{DjError, Result};
use crate::identity::{DjIdentifierRegistry, DjXmlidContext};
use crate::record::{relation_ids, value_to_text, DjRecord, DjValues};
use crate::schema::DjFieldKind;
use crate::store::{read_one, DjRecordStore};

/// Decode-substitute-re-encode rule for fields of one model.
pub trait DjValueAdapter {
    fn model(&self) -> &str;

    fn handles(&self, field: &str) -> bool;

    /// Portable text, or `None` to fall back to the generic rule.
    fn encode(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        record: &DjRecord,
        field: &str,
        ctx: &DjXmlidContext,
    ) -> Result<Option<String>>;

    /// Stored value, or `None` to fall back to the generic rule.
    fn decode(
        &self,
        store: &dyn DjRecordStore,
        row: &DjValues,
        field: &str,
        text: &str,
    ) -> Result<Option<Value>>;
}

pub fn default_adapters() -> Vec<Box<dyn DjValueAdapter>> {
    vec![Box::new(DjDefaultValueAdapter), Box::new(DjPropertyAdapter)]
}

/// `ir.default.json_value`: JSON ids of relational defaults.
#[derive(Debug, Default)]
pub struct DjDefaultValueAdapter;

impl DjDefaultValueAdapter {
    /// Target model and kind of the defaulted field, when it is relational.
    fn relation_of(
        store: &dyn DjRecordStore,
        field_id: Option<i64>,
    ) -> Result<Option<(String, DjFieldKind)>> {
        let Some(field_id) = field_id else {
            return Ok(None);
        };
        let names = vec!["model".to_string(), "name".to_string()];
        let Some(meta) = read_one(store, "ir.model.fields", field_id, &names)? else {
            return Ok(None);
        };
        let model = value_to_text(meta.get("model"));
        let name = value_to_text(meta.get("name"));
        Ok(store
            .model(&model)
            .and_then(|info| info.field(&name).cloned())
            .filter(|f| f.kind.is_relational())
            .and_then(|f| {
                let kind = f.kind;
                f.relation.map(|target| (target, kind))
            }))
    }
}

impl DjValueAdapter for DjDefaultValueAdapter {
    fn model(&self) -> &str {
        "ir.default"
    }

    fn handles(&self, field: &str) -> bool {
        field == "json_value"
    }

    fn encode(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        record: &DjRecord,
        field: &str,
        ctx: &DjXmlidContext,
    ) -> Result<Option<String>> {
        let raw = value_to_text(record.get(field));
        if raw.is_empty() {
            return Ok(None);
        }
        let field_id = relation_ids(record.get("field_id")).first().copied();
        let Some((target, _)) = Self::relation_of(registry.store(), field_id)? else {
            return Ok(None);
        };
        let decoded: Value = serde_json::from_str(&raw)?;
        let ids = relation_ids(&decoded);
        if ids.is_empty() {
            return Ok(None);
        }
        Ok(Some(registry.identifiers(&target, &ids, ctx)?.join(",")))
    }

    fn decode(
        &self,
        store: &dyn DjRecordStore,
        row: &DjValues,
        _field: &str,
        text: &str,
    ) -> Result<Option<Value>> {
        if text.is_empty() {
            return Ok(None);
        }
        let field_id = row.get("field_id").and_then(Value::as_i64);
        let Some((_, kind)) = Self::relation_of(store, field_id)? else {
            return Ok(None);
        };
        let ids = text
            .split(',')
            .map(|identifier| resolve(store, identifier.trim()))
            .collect::<Result<Vec<i64>>>()?;
        let encoded = match (kind, ids.as_slice()) {
            (DjFieldKind::Many2one, [id]) => Value::from(*id),
            _ => Value::from(ids),
        };
        Ok(Some(Value::from(encoded.to_string())))
    }
}

/// `ir.property.value_reference` / `res_id`: `model,ID` references.
#[derive(Debug, Default)]
pub struct DjPropertyAdapter;

fn parse_reference(text: &str) -> Option<(&str, i64)> {
    let (model, id) = text.split_once(',')?;
    Some((model.trim(), id.trim().parse().ok()?))
}

impl DjValueAdapter for DjPropertyAdapter {
    fn model(&self) -> &str {
        "ir.property"
    }

    fn handles(&self, field: &str) -> bool {
        matches!(field, "value_reference" | "res_id")
    }

    fn encode(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        record: &DjRecord,
        field: &str,
        ctx: &DjXmlidContext,
    ) -> Result<Option<String>> {
        let raw = value_to_text(record.get(field));
        let Some((model, id)) = parse_reference(&raw) else {
            return Ok(None);
        };
        Ok(Some(registry.identifier(model, id, ctx)?))
    }

    fn decode(
        &self,
        store: &dyn DjRecordStore,
        _row: &DjValues,
        _field: &str,
        text: &str,
    ) -> Result<Option<Value>> {
        let identifier = text.trim();
        if identifier.is_empty() || parse_reference(identifier).is_some() {
            return Ok(None);
        }
        let reference = store
            .resolve_identifier(identifier)
            .ok_or_else(|| DjError::unresolvable(identifier))?;
        Ok(Some(Value::from(reference.to_string())))
    }
}
