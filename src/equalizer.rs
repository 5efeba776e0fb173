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

//! # Dj Equalizer Module
//!
//! Per-model settings that tune identifier derivation and record/field
//! filtering. Equalizers are looked up by exact model name.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{DjError, Result};
use crate::store::DjRecordStore;

/// How identifier values become the local name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DjXmlidPolicy {
    /// Slugify each value and join them after the table prefix.
    #[default]
    #[serde(alias = "normal")]
    Join,
    /// Hash the raw values and use the digest as the sole suffix.
    Hash,
}

/// Settings for one model.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DjEqualizerConfig {
    pub model: String,
    pub xmlid_fields: Vec<String>,
    pub xmlid_policy: DjXmlidPolicy,
    /// Shorter prefix to use instead of the table name.
    pub xmlid_table_name: Option<String>,
    pub model_context: Map<String, Value>,
    pub field_blacklist: Vec<String>,
    pub record_blacklist: Vec<i64>,
    /// Blacklisted records given by identifier, resolved lazily.
    pub record_blacklist_xmlids: Vec<String>,
}

impl DjEqualizerConfig {
    pub fn new(model: impl Into<String>) -> Self {
        DjEqualizerConfig {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_xmlid_fields(mut self, fields: &[&str]) -> Self {
        self.xmlid_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_policy(mut self, policy: DjXmlidPolicy) -> Self {
        self.xmlid_policy = policy;
        self
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.xmlid_table_name = Some(table.into());
        self
    }

    pub fn with_field_blacklist(mut self, fields: &[&str]) -> Self {
        self.field_blacklist = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_record_blacklist(mut self, ids: &[i64]) -> Self {
        self.record_blacklist = ids.to_vec();
        self
    }

    pub fn with_record_blacklist_xmlids(mut self, xmlids: &[&str]) -> Self {
        self.record_blacklist_xmlids = xmlids.iter().map(|x| x.to_string()).collect();
        self
    }
}

/// All equalizers of a burn, with resolved blacklists cached per model.
#[derive(Debug, Default)]
pub struct DjEqualizerSet {
    configs: Vec<DjEqualizerConfig>,
    cache: RefCell<HashMap<(String, &'static str), Vec<i64>>>,
}

impl DjEqualizerSet {
    pub fn new(configs: Vec<DjEqualizerConfig>) -> Self {
        DjEqualizerSet {
            configs,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        let configs: Vec<DjEqualizerConfig> = serde_json::from_value(value.clone())?;
        Ok(Self::new(configs))
    }

    /// Adds `config`, replacing any config of the same model.
    pub fn push(&mut self, config: DjEqualizerConfig) {
        self.cache.borrow_mut().retain(|(model, _), _| model != &config.model);
        match self.configs.iter().position(|c| c.model == config.model) {
            Some(index) => self.configs[index] = config,
            None => self.configs.push(config),
        }
    }

    pub fn get(&self, model: &str) -> Option<&DjEqualizerConfig> {
        self.configs.iter().find(|c| c.model == model)
    }

    pub fn xmlid_fields(&self, model: &str) -> &[String] {
        self.get(model).map(|c| c.xmlid_fields.as_slice()).unwrap_or(&[])
    }

    pub fn xmlid_policy(&self, model: &str) -> DjXmlidPolicy {
        self.get(model).map(|c| c.xmlid_policy).unwrap_or_default()
    }

    pub fn xmlid_table_name(&self, model: &str) -> Option<&str> {
        self.get(model)
            .and_then(|c| c.xmlid_table_name.as_deref())
            .filter(|t| !t.is_empty())
    }

    pub fn field_blacklist(&self, model: &str) -> &[String] {
        self.get(model).map(|c| c.field_blacklist.as_slice()).unwrap_or(&[])
    }

    pub fn model_context(&self, model: &str) -> Map<String, Value> {
        self.get(model).map(|c| c.model_context.clone()).unwrap_or_default()
    }

    /// Blacklisted ids of `model`: explicit ids plus resolved identifiers.
    pub fn record_blacklist(&self, model: &str, store: &dyn DjRecordStore) -> Result<Vec<i64>> {
        let key = (model.to_string(), "record_blacklist");
        if let Some(ids) = self.cache.borrow().get(&key) {
            return Ok(ids.clone());
        }
        let mut ids = Vec::new();
        if let Some(config) = self.get(model) {
            ids.extend(config.record_blacklist.iter().copied());
            for xmlid in &config.record_blacklist_xmlids {
                let reference = store.resolve_identifier(xmlid).ok_or_else(|| {
                    DjError::configuration(format!(
                        "blacklisted record '{}' of {} does not exist",
                        xmlid, model
                    ))
                })?;
                ids.push(reference.id);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        self.cache.borrow_mut().insert(key, ids.clone());
        Ok(ids)
    }
}
