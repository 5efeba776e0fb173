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

//! # Dj Record Module
//!
//! This module provides the data structures for records read from the
//! record store. A [`DjRecord`] is a typed row: model name, numeric id and a
//! map of field values.
//!
//! ## Value Conventions
//!
//! Field values use `serde_json::Value` and follow the host framework's wire
//! shapes:
//!
//! - `null` or `false`: empty value
//! - many2one: integer id of the referenced record
//! - many2many / one2many: array of integer ids
//! - binary: base64 encoded string
//! - selection: the raw stored key, never the display label
//!
//! ## Usage Example
//!
//! ```rust
//! use dj_burner::record::{DjRecord, DjValues};
//! use serde_json::json;
//!
//! let mut values = DjValues::new();
//! values.insert("name".into(), json!("Foo Inc."));
//! let record = DjRecord::new("res.company", 1, values);
//! assert_eq!(record.get("name"), &json!("Foo Inc."));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field values of one record keyed by field name.
pub type DjValues = Map<String, Value>;

static NULL: Value = Value::Null;

/// Lightweight pointer to a record: model name plus numeric id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DjRecordRef {
    pub model: String,
    pub id: i64,
}

impl DjRecordRef {
    pub fn new(model: impl Into<String>, id: i64) -> Self {
        Self {
            model: model.into(),
            id,
        }
    }
}

impl fmt::Display for DjRecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.model, self.id)
    }
}

/// A record read from the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DjRecord {
    /// Model (record type) name, e.g. `res.partner`.
    pub model: String,

    /// Numeric row id.
    pub id: i64,

    /// Field values as read; only the requested fields are present.
    #[serde(default)]
    pub values: DjValues,
}

impl DjRecord {
    /// Constructs a record from its model, id and values.
    pub fn new(model: impl Into<String>, id: i64, values: DjValues) -> Self {
        DjRecord {
            model: model.into(),
            id,
            values,
        }
    }

    /// Returns the pointer to this record.
    pub fn reference(&self) -> DjRecordRef {
        DjRecordRef::new(self.model.clone(), self.id)
    }

    /// Value of `field`, `null` when the field was not read.
    pub fn get(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }

    /// True when `field` holds a non-empty value.
    pub fn is_set(&self, field: &str) -> bool {
        is_truthy(self.get(field))
    }
}

/// Convenience alias for working on batches of records.
pub type DjRecordBatch = Vec<DjRecord>;

/// Host-framework truthiness: `null`, `false`, `0`, `""` and `[]` are empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Extracts referenced ids from a relational value (single id or id list).
pub fn relation_ids(value: &Value) -> Vec<i64> {
    match value {
        Value::Number(n) => n.as_i64().filter(|id| *id > 0).into_iter().collect(),
        Value::Array(items) => items.iter().filter_map(Value::as_i64).collect(),
        _ => Vec::new(),
    }
}

/// Renders a scalar value the way the host framework stringifies it.
///
/// Floats keep at least one decimal (`1.0`), booleans become `True`/`False`,
/// empty values become an empty string.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(f) = n.as_f64() {
                float_to_text(f)
            } else {
                n.to_string()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn float_to_text(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}
