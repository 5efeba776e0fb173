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

//! # Dj Identifier Registry
//!
//! Assigns identifiers to records for one burn. The registry looks up
//! existing assignments in one batch, decides which records need a new
//! identifier, computes candidates through the policy and persists them in
//! a single atomic insert.
//!
//! Local names are memoized per record for the registry's lifetime, so the
//! random fallback stays stable within a run.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};
use serde_json::Value;

use super::policy::compute_identifier;
use crate::config::DjPolicyConfig;
use crate::equalizer::DjEqualizerSet;
use crate::errors::{DjError, Result};
use crate::record::{is_truthy, value_to_text, DjRecordRef};
use crate::schema::DjModelInfo;
use crate::store::{
    follow_record_value, qualify, read_one, require_model, DjIdentifierAssignment, DjRecordStore,
};

/// Per-call options of [`DjIdentifierRegistry::ensure_identifiers`].
#[derive(Clone, Debug)]
pub struct DjXmlidContext {
    /// Namespace new identifiers are created in.
    pub namespace: String,
    /// Regenerate identifiers living in replaceable namespaces.
    pub force: bool,
    /// Store new identifiers; when false they are returned only.
    pub persist: bool,
    /// Prefix identifiers with the owning company's short code.
    pub multicompany: bool,
    /// Identifier fields per model, taking precedence over equalizers.
    pub fields_map: HashMap<String, Vec<String>>,
}

impl DjXmlidContext {
    pub fn new(namespace: impl Into<String>) -> Self {
        DjXmlidContext {
            namespace: namespace.into(),
            force: false,
            persist: true,
            multicompany: false,
            fields_map: HashMap::new(),
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_multicompany(mut self, multicompany: bool) -> Self {
        self.multicompany = multicompany;
        self
    }

    pub fn with_fields(mut self, model: &str, fields: &[&str]) -> Self {
        self.fields_map.insert(
            model.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        );
        self
    }
}

/// Identifier assignment for one burn.
pub struct DjIdentifierRegistry<'s> {
    store: &'s mut dyn DjRecordStore,
    policy: &'s DjPolicyConfig,
    equalizers: &'s DjEqualizerSet,
    local_names: HashMap<DjRecordRef, String>,
    resolved: HashMap<(String, DjRecordRef), String>,
}

impl<'s> DjIdentifierRegistry<'s> {
    pub fn new(
        store: &'s mut dyn DjRecordStore,
        policy: &'s DjPolicyConfig,
        equalizers: &'s DjEqualizerSet,
    ) -> Self {
        DjIdentifierRegistry {
            store,
            policy,
            equalizers,
            local_names: HashMap::new(),
            resolved: HashMap::new(),
        }
    }

    pub fn store(&self) -> &dyn DjRecordStore {
        &*self.store
    }

    pub fn policy(&self) -> &'s DjPolicyConfig {
        self.policy
    }

    pub fn equalizers(&self) -> &'s DjEqualizerSet {
        self.equalizers
    }

    /// Identifier fields used for `info`, in precedence order.
    pub fn xmlid_fields(&self, info: &DjModelInfo, ctx: &DjXmlidContext) -> Vec<String> {
        if let Some(fields) = ctx.fields_map.get(&info.name).filter(|f| !f.is_empty()) {
            return fields.clone();
        }
        let configured = self.equalizers.xmlid_fields(&info.name);
        if !configured.is_empty() {
            return configured.to_vec();
        }
        if info.has_field("name") {
            return vec!["name".to_string()];
        }
        Vec::new()
    }

    /// Memoized local name (identifier without namespace) of one record.
    pub fn local_name(&mut self, model: &str, id: i64, ctx: &DjXmlidContext) -> Result<String> {
        let reference = DjRecordRef::new(model, id);
        if let Some(name) = self.local_names.get(&reference) {
            return Ok(name.clone());
        }
        let info = require_model(&*self.store, model)?;
        let name = self.compute_local_name(&info, &reference, ctx)?;
        self.local_names.insert(reference, name.clone());
        Ok(name)
    }

    fn compute_local_name(
        &self,
        info: &DjModelInfo,
        reference: &DjRecordRef,
        ctx: &DjXmlidContext,
    ) -> Result<String> {
        let mut values: Vec<Value> = Vec::new();
        for key in self.xmlid_fields(info, ctx) {
            let value = follow_record_value(&*self.store, reference, &key)?;
            if is_truthy(&value) {
                values.push(value);
            }
        }
        let table = self
            .equalizers
            .xmlid_table_name(&info.name)
            .unwrap_or(&info.table);
        let prefix = if ctx.multicompany {
            self.company_code(info, reference)?
        } else {
            None
        };
        Ok(compute_identifier(
            table,
            reference.id,
            &values,
            self.equalizers.xmlid_policy(&info.name),
            prefix.as_deref(),
        ))
    }

    /// Short code of the record's company, if it carries one.
    fn company_code(&self, info: &DjModelInfo, reference: &DjRecordRef) -> Result<Option<String>> {
        if !info.has_field("company_id") {
            return Ok(None);
        }
        let company_field = vec!["company_id".to_string()];
        let company_id = match read_one(&*self.store, &info.name, reference.id, &company_field)? {
            Some(record) => record.get("company_id").as_i64(),
            None => None,
        };
        let Some(company_id) = company_id else {
            return Ok(None);
        };
        let fields = vec!["name".to_string(), "aka".to_string()];
        let company = read_one(&*self.store, "res.company", company_id, &fields)?;
        match company {
            Some(company) if is_truthy(company.get("aka")) => {
                Ok(Some(value_to_text(company.get("aka"))))
            }
            Some(company) => Err(DjError::configuration(format!(
                "company '{}' misses the `aka` short code required in multi-company mode",
                value_to_text(company.get("name"))
            ))),
            None => Ok(None),
        }
    }

    /// Returns `namespace.localname` for every id, creating missing ones.
    pub fn ensure_identifiers(
        &mut self,
        model: &str,
        ids: &[i64],
        ctx: &DjXmlidContext,
    ) -> Result<BTreeMap<i64, String>> {
        let mut result = BTreeMap::new();
        if ids.is_empty() {
            return Ok(result);
        }
        let info = require_model(&*self.store, model)?;
        if info.transient {
            return Err(DjError::configuration(format!(
                "cannot assign identifiers to {}: its table is not an ordinary table",
                model
            )));
        }

        let mut wanted: Vec<i64> = Vec::with_capacity(ids.len());
        let mut seen: HashSet<i64> = HashSet::with_capacity(ids.len());
        for &id in ids {
            if !seen.insert(id) {
                continue;
            }
            let key = (ctx.namespace.clone(), DjRecordRef::new(model, id));
            match self.resolved.get(&key) {
                Some(identifier) => {
                    result.insert(id, identifier.clone());
                }
                None => wanted.push(id),
            }
        }
        if wanted.is_empty() {
            return Ok(result);
        }

        let existing = self.store.batched_lookup_identifiers(model, &wanted)?;
        let mut pending: Vec<DjIdentifierAssignment> = Vec::new();
        for &id in &wanted {
            let current = existing.get(&id);
            let missing = match current {
                None => true,
                Some(row) if ctx.force && self.policy.is_replaceable(&row.namespace) => {
                    let fresh = qualify(&ctx.namespace, &self.local_name(model, id, ctx)?);
                    row.full_name() != fresh
                }
                Some(_) => false,
            };
            match (missing, current) {
                (false, Some(row)) => {
                    result.insert(id, row.full_name());
                }
                _ => {
                    let name = self.local_name(model, id, ctx)?;
                    result.insert(id, qualify(&ctx.namespace, &name));
                    pending.push(DjIdentifierAssignment::new(model, id, ctx.namespace.clone(), name));
                }
            }
        }

        if !pending.is_empty() {
            if ctx.persist {
                let batch: Vec<i64> = pending.iter().map(|row| row.res_id).collect();
                self.store
                    .insert_identifier_assignments(&pending)
                    .map_err(|err| match err {
                        DjError::IdentityConflict { .. } => DjError::identity_conflict(model, batch),
                        other => other,
                    })?;
                info!(
                    "created {} identifiers for {} in namespace '{}'",
                    pending.len(),
                    model,
                    ctx.namespace
                );
            } else {
                debug!(
                    "computed {} identifiers for {} without storing them",
                    pending.len(),
                    model
                );
            }
        }

        for &id in &wanted {
            if let Some(identifier) = result.get(&id) {
                self.resolved.insert(
                    (ctx.namespace.clone(), DjRecordRef::new(model, id)),
                    identifier.clone(),
                );
            }
        }
        Ok(result)
    }

    /// Identifier of a single record.
    pub fn identifier(&mut self, model: &str, id: i64, ctx: &DjXmlidContext) -> Result<String> {
        self.ensure_identifiers(model, &[id], ctx)?
            .remove(&id)
            .ok_or_else(|| DjError::internal(format!("no identifier computed for {},{}", model, id)))
    }

    /// Identifiers of `ids` in the given order.
    pub fn identifiers(
        &mut self,
        model: &str,
        ids: &[i64],
        ctx: &DjXmlidContext,
    ) -> Result<Vec<String>> {
        let map = self.ensure_identifiers(model, ids, ctx)?;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }
}
