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

//! # Dj Memory Store
//!
//! In-memory [`DjRecordStore`]. Records, identifier assignments,
//! translations and default rules live in ordered maps, so searches and
//! reads are deterministic.
//!
//! ```rust
//! use dj_burner::schema::{DjFieldDescriptor, DjFieldKind, DjModelInfo};
//! use dj_burner::store::DjMemoryStore;
//! use serde_json::json;
//!
//! let mut store = DjMemoryStore::new().with_model(
//!     DjModelInfo::new("res.company")
//!         .with_field(DjFieldDescriptor::new("name", DjFieldKind::Char)),
//! );
//! let id = store.insert("res.company", json!({"name": "Foo Inc."}));
//! assert_eq!(id, 1);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::{split_identifier, DjIdentifierAssignment, DjRecordStore};
use crate::domain::DjDomain;
use crate::errors::{DjError, Result};
use crate::record::{DjRecord, DjRecordRef, DjValues};
use crate::schema::DjModelInfo;

type TranslationKey = (String, i64, String, String);

/// Deterministic in-memory record store.
#[derive(Clone, Debug, Default)]
pub struct DjMemoryStore {
    models: BTreeMap<String, DjModelInfo>,
    records: BTreeMap<String, BTreeMap<i64, DjValues>>,
    by_record: HashMap<DjRecordRef, DjIdentifierAssignment>,
    by_name: HashMap<(String, String), DjRecordRef>,
    translations: HashMap<TranslationKey, Value>,
    defaults: HashMap<(String, Option<i64>), DjValues>,
    languages: Vec<String>,
}

impl DjMemoryStore {
    pub fn new() -> Self {
        DjMemoryStore {
            languages: vec!["en_US".to_string()],
            ..Default::default()
        }
    }

    pub fn with_model(mut self, info: DjModelInfo) -> Self {
        self.add_model(info);
        self
    }

    pub fn add_model(&mut self, info: DjModelInfo) {
        self.records.entry(info.name.clone()).or_default();
        self.models.insert(info.name.clone(), info);
    }

    /// Inserts a record with the next free id and returns that id.
    pub fn insert(&mut self, model: &str, values: Value) -> i64 {
        let next = self
            .records
            .get(model)
            .and_then(|rows| rows.keys().next_back().copied())
            .unwrap_or(0)
            + 1;
        self.insert_with_id(model, next, values);
        next
    }

    pub fn insert_with_id(&mut self, model: &str, id: i64, values: Value) {
        let values = match values {
            Value::Object(map) => map,
            _ => DjValues::new(),
        };
        self.records
            .entry(model.to_string())
            .or_default()
            .insert(id, values);
    }

    /// Updates fields of an existing record.
    pub fn update(&mut self, model: &str, id: i64, values: Value) {
        if let (Some(row), Value::Object(map)) = (
            self.records.get_mut(model).and_then(|rows| rows.get_mut(&id)),
            values,
        ) {
            row.extend(map);
        }
    }

    /// Registers `namespace.name` for a record, bypassing conflict checks.
    pub fn set_identifier(&mut self, model: &str, id: i64, identifier: &str) {
        let (namespace, name) = split_identifier(identifier);
        let row = DjIdentifierAssignment::new(model, id, namespace, name);
        self.store_assignment(row);
    }

    pub fn set_translation(&mut self, model: &str, id: i64, field: &str, lang: &str, value: Value) {
        self.translations.insert(
            (model.to_string(), id, field.to_string(), lang.to_string()),
            value,
        );
    }

    /// Default rule values for `model`, optionally scoped to one company.
    pub fn set_defaults(&mut self, model: &str, company_id: Option<i64>, values: Value) {
        if let Value::Object(map) = values {
            self.defaults
                .entry((model.to_string(), company_id))
                .or_default()
                .extend(map);
        }
    }

    pub fn set_languages(&mut self, languages: &[&str]) {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
    }

    /// All stored assignments, sorted by record.
    pub fn assignments(&self) -> Vec<DjIdentifierAssignment> {
        let mut rows: Vec<DjIdentifierAssignment> = self.by_record.values().cloned().collect();
        rows.sort_by(|a, b| (&a.model, a.res_id).cmp(&(&b.model, b.res_id)));
        rows
    }

    fn store_assignment(&mut self, row: DjIdentifierAssignment) {
        let reference = DjRecordRef::new(row.model.clone(), row.res_id);
        if let Some(old) = self.by_record.remove(&reference) {
            self.by_name.remove(&(old.namespace, old.name));
        }
        self.by_name
            .insert((row.namespace.clone(), row.name.clone()), reference.clone());
        self.by_record.insert(reference, row);
    }

    fn rows(&self, model: &str) -> Result<&BTreeMap<i64, DjValues>> {
        self.records
            .get(model)
            .ok_or_else(|| DjError::configuration(format!("unknown model '{}'", model)))
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn parse_order(order: &str) -> Vec<(String, bool)> {
    order
        .split(',')
        .filter_map(|term| {
            let mut parts = term.split_whitespace();
            let field = parts.next()?.to_string();
            let descending = parts
                .next()
                .map(|dir| dir.eq_ignore_ascii_case("desc"))
                .unwrap_or(false);
            Some((field, descending))
        })
        .collect()
}

impl DjRecordStore for DjMemoryStore {
    fn model(&self, name: &str) -> Option<DjModelInfo> {
        self.models.get(name).cloned()
    }

    fn search(&self, model: &str, domain: &DjDomain, order: Option<&str>) -> Result<Vec<i64>> {
        let rows = self.rows(model)?;
        let mut hits: Vec<(i64, &DjValues)> = rows
            .iter()
            .filter(|(id, values)| domain.matches(**id, values))
            .map(|(id, values)| (*id, values))
            .collect();

        let terms = parse_order(order.unwrap_or("id asc"));
        hits.sort_by(|(id_a, a), (id_b, b)| {
            for (field, descending) in &terms {
                let ordering = if field == "id" {
                    id_a.cmp(id_b)
                } else {
                    compare_values(
                        a.get(field).unwrap_or(&Value::Null),
                        b.get(field).unwrap_or(&Value::Null),
                    )
                };
                let ordering = if *descending { ordering.reverse() } else { ordering };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            id_a.cmp(id_b)
        });
        Ok(hits.into_iter().map(|(id, _)| id).collect())
    }

    fn read(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[String],
        lang: Option<&str>,
    ) -> Result<Vec<DjRecord>> {
        let rows = self.rows(model)?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(row) = rows.get(id) else {
                continue;
            };
            let mut values = if fields.is_empty() {
                row.clone()
            } else {
                fields
                    .iter()
                    .filter(|f| f.as_str() != "id")
                    .map(|f| (f.clone(), row.get(f).cloned().unwrap_or(Value::Null)))
                    .collect()
            };
            if let Some(lang) = lang {
                for (field, value) in values.iter_mut() {
                    let key = (model.to_string(), *id, field.clone(), lang.to_string());
                    if let Some(translated) = self.translations.get(&key) {
                        *value = translated.clone();
                    }
                }
            }
            out.push(DjRecord::new(model, *id, values));
        }
        Ok(out)
    }

    fn resolve_identifier(&self, identifier: &str) -> Option<DjRecordRef> {
        let (namespace, name) = split_identifier(identifier);
        self.by_name
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    fn batched_lookup_identifiers(
        &self,
        model: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, DjIdentifierAssignment>> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.by_record
                    .get(&DjRecordRef::new(model, *id))
                    .map(|row| (*id, row.clone()))
            })
            .collect())
    }

    fn insert_identifier_assignments(&mut self, rows: &[DjIdentifierAssignment]) -> Result<()> {
        let mut claimed: HashMap<(String, String), DjRecordRef> = HashMap::new();
        let mut conflicts = Vec::new();
        for row in rows {
            let key = (row.namespace.clone(), row.name.clone());
            let reference = DjRecordRef::new(row.model.clone(), row.res_id);
            let taken = matches!(
                claimed.get(&key).or_else(|| self.by_name.get(&key)),
                Some(other) if other != &reference
            );
            if taken {
                conflicts.push(row.res_id);
            } else {
                claimed.insert(key, reference);
            }
        }
        if !conflicts.is_empty() {
            let model = rows.first().map(|r| r.model.clone()).unwrap_or_default();
            return Err(DjError::identity_conflict(model, conflicts));
        }
        for row in rows {
            self.store_assignment(row.clone());
        }
        Ok(())
    }

    fn apply_defaults(&self, model: &str, partial: &DjValues) -> Result<DjValues> {
        if !self.models.contains_key(model) {
            return Err(DjError::configuration(format!("unknown model '{}'", model)));
        }
        let company = partial.get("company_id").and_then(Value::as_i64);
        let mut values = DjValues::new();
        for key in [(model.to_string(), None), (model.to_string(), company)] {
            if let Some(defaults) = self.defaults.get(&key) {
                values.extend(defaults.clone());
            }
        }
        values.extend(partial.clone());
        Ok(values)
    }

    fn installed_languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}
