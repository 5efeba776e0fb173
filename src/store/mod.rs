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

//! # Dj Store Module
//!
//! The record store is the persistence collaborator of the burner: model
//! metadata, search, read, identifier assignments and default-value
//! materialization. The burner never writes records; the only mutation it
//! requests is [`DjRecordStore::insert_identifier_assignments`].
//!
//! [`memory::DjMemoryStore`] is the reference implementation used by the
//! test suites and by embedders without a database.

pub mod memory;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DjDomain;
use crate::errors::{DjError, Result};
use crate::record::{is_truthy, relation_ids, value_to_text, DjRecord, DjRecordRef, DjValues};
use crate::schema::DjModelInfo;

pub use memory::DjMemoryStore;

/// One `(model, res_id) -> namespace.name` row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DjIdentifierAssignment {
    pub model: String,
    pub res_id: i64,
    pub namespace: String,
    pub name: String,
}

impl DjIdentifierAssignment {
    pub fn new(
        model: impl Into<String>,
        res_id: i64,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        DjIdentifierAssignment {
            model: model.into(),
            res_id,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// `namespace.name`, or the bare name when the namespace is empty.
    pub fn full_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

/// Joins a namespace and a local name.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Splits `namespace.name` at the first dot.
pub fn split_identifier(identifier: &str) -> (&str, &str) {
    match identifier.split_once('.') {
        Some((namespace, name)) => (namespace, name),
        None => ("", identifier),
    }
}

/// Persistence collaborator consumed by the burner.
pub trait DjRecordStore {
    /// Static description of `name`, `None` for unknown models.
    fn model(&self, name: &str) -> Option<DjModelInfo>;

    /// Ids matching `domain`, sorted by `order` (`"field asc, other desc"`).
    fn search(&self, model: &str, domain: &DjDomain, order: Option<&str>) -> Result<Vec<i64>>;

    /// Reads `fields` of `ids` (all fields when empty), translated into
    /// `lang` when given.
    fn read(
        &self,
        model: &str,
        ids: &[i64],
        fields: &[String],
        lang: Option<&str>,
    ) -> Result<Vec<DjRecord>>;

    fn resolve_identifier(&self, identifier: &str) -> Option<DjRecordRef>;

    /// Existing assignments of `ids`, in one lookup.
    fn batched_lookup_identifiers(
        &self,
        model: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, DjIdentifierAssignment>>;

    /// Atomically stores `rows`, replacing the current assignment of each
    /// record. Fails the whole batch with `IdentityConflict` when any
    /// `(namespace, name)` is already held by another record.
    fn insert_identifier_assignments(&mut self, rows: &[DjIdentifierAssignment]) -> Result<()>;

    /// Plays the model's default rules over `partial` and returns the full
    /// value set.
    fn apply_defaults(&self, model: &str, partial: &DjValues) -> Result<DjValues>;

    fn installed_languages(&self) -> Vec<String> {
        vec!["en_US".to_string()]
    }
}

/// Model metadata or a configuration error naming the missing model.
pub fn require_model(store: &dyn DjRecordStore, name: &str) -> Result<DjModelInfo> {
    store
        .model(name)
        .ok_or_else(|| DjError::configuration(format!("unknown model '{}'", name)))
}

/// Reads a single record, `None` when it does not exist.
pub fn read_one(
    store: &dyn DjRecordStore,
    model: &str,
    id: i64,
    fields: &[String],
) -> Result<Option<DjRecord>> {
    Ok(store.read(model, &[id], fields, None)?.into_iter().next())
}

/// Follows a dotted relational path from `ids` of `model`.
///
/// Returns the model reached and the deduplicated ids found there, in
/// discovery order. Every segment must be a relational field.
pub fn follow_path(
    store: &dyn DjRecordStore,
    model: &str,
    ids: &[i64],
    path: &str,
) -> Result<(String, Vec<i64>)> {
    let mut current_model = model.to_string();
    let mut current_ids = ids.to_vec();
    for segment in path.split('.') {
        let info = require_model(store, &current_model)?;
        let field = info.field(segment).ok_or_else(|| {
            DjError::configuration(format!(
                "'{}' is not a field of {} (path '{}')",
                segment, current_model, path
            ))
        })?;
        let target = match (&field.relation, field.kind.is_relational()) {
            (Some(target), true) => target.clone(),
            _ => {
                return Err(DjError::configuration(format!(
                    "'{}' on {} is not a relation (path '{}')",
                    segment, current_model, path
                )))
            }
        };
        let records = store.read(&current_model, &current_ids, &[segment.to_string()], None)?;
        let mut next = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();
        for record in &records {
            for id in relation_ids(record.get(segment)) {
                if seen.insert(id) {
                    next.push(id);
                }
            }
        }
        current_model = target;
        current_ids = next;
    }
    Ok((current_model, current_ids))
}

/// Value of a possibly dotted field on one record, as used for identifier
/// derivation. Relational end values contribute the related `name`.
pub fn follow_record_value(
    store: &dyn DjRecordStore,
    record: &DjRecordRef,
    path: &str,
) -> Result<Value> {
    let (head, last) = match path.rsplit_once('.') {
        Some((head, last)) => (Some(head), last),
        None => (None, path),
    };
    let (model, ids) = match head {
        Some(head) => follow_path(store, &record.model, &[record.id], head)?,
        None => (record.model.clone(), vec![record.id]),
    };
    let Some(&id) = ids.first() else {
        return Ok(Value::Null);
    };
    let info = require_model(store, &model)?;
    let Some(field) = info.field(last) else {
        return Err(DjError::configuration(format!(
            "'{}' is not a field of {}",
            last, model
        )));
    };
    let value = match read_one(store, &model, id, &[last.to_string()])? {
        Some(rec) => rec.get(last).clone(),
        None => return Ok(Value::Null),
    };
    match (&field.relation, field.kind.is_relational()) {
        (Some(target), true) => {
            let related = relation_ids(&value);
            if related.is_empty() {
                return Ok(Value::Null);
            }
            let names: Vec<String> = store
                .read(target, &related, &["name".to_string()], None)?
                .iter()
                .map(|r| r.get("name"))
                .filter(|v| is_truthy(v))
                .map(value_to_text)
                .collect();
            Ok(if names.is_empty() {
                Value::Null
            } else {
                Value::from(names.join(","))
            })
        }
        _ => Ok(value),
    }
}
