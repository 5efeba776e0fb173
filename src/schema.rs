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

//! # Dj Schema Module
//!
//! Static model and field descriptors. The record store publishes one
//! [`DjModelInfo`] per model; the codec and the songs receive these values
//! explicitly instead of introspecting models at call time.

use serde::{Deserialize, Serialize};

/// Storage kind of a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DjFieldKind {
    Char,
    Text,
    Html,
    Binary,
    Integer,
    Float,
    Monetary,
    Boolean,
    Date,
    Datetime,
    Selection,
    Many2one,
    Many2many,
    One2many,
    Reference,
}

impl DjFieldKind {
    /// Name used by the host framework (`many2one`, `html`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            DjFieldKind::Char => "char",
            DjFieldKind::Text => "text",
            DjFieldKind::Html => "html",
            DjFieldKind::Binary => "binary",
            DjFieldKind::Integer => "integer",
            DjFieldKind::Float => "float",
            DjFieldKind::Monetary => "monetary",
            DjFieldKind::Boolean => "boolean",
            DjFieldKind::Date => "date",
            DjFieldKind::Datetime => "datetime",
            DjFieldKind::Selection => "selection",
            DjFieldKind::Many2one => "many2one",
            DjFieldKind::Many2many => "many2many",
            DjFieldKind::One2many => "one2many",
            DjFieldKind::Reference => "reference",
        }
    }

    /// Relations exported as xmlids (`<field>/id` columns).
    pub fn is_xmlid_relation(&self) -> bool {
        matches!(self, DjFieldKind::Many2one | DjFieldKind::Many2many)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            DjFieldKind::Many2one | DjFieldKind::Many2many | DjFieldKind::One2many
        )
    }
}

/// Static description of one field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DjFieldDescriptor {
    pub name: String,
    pub kind: DjFieldKind,
    /// Target model for relational fields.
    #[serde(default)]
    pub relation: Option<String>,
    /// Human label, used when rendering settings.
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub stored: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub translatable: bool,
    /// Selection options as `(value, label)` pairs.
    #[serde(default)]
    pub selection: Vec<(String, String)>,
}

fn default_true() -> bool {
    true
}

impl DjFieldDescriptor {
    pub fn new(name: impl Into<String>, kind: DjFieldKind) -> Self {
        let name = name.into();
        DjFieldDescriptor {
            label: name.replace('_', " "),
            name,
            kind,
            relation: None,
            stored: true,
            computed: false,
            translatable: false,
            selection: Vec::new(),
        }
    }

    pub fn relation(name: impl Into<String>, kind: DjFieldKind, target: impl Into<String>) -> Self {
        let mut field = Self::new(name, kind);
        field.relation = Some(target.into());
        field
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.stored = false;
        self
    }

    pub fn translatable(mut self) -> Self {
        self.translatable = true;
        self
    }

    pub fn with_selection(mut self, options: &[(&str, &str)]) -> Self {
        self.selection = options
            .iter()
            .map(|(v, l)| (v.to_string(), l.to_string()))
            .collect();
        self
    }

    /// Display label of a selection key.
    pub fn selection_label(&self, value: &str) -> Option<&str> {
        self.selection
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, l)| l.as_str())
    }

    /// Stored, non-computed and not a one2many: eligible for CSV export.
    pub fn is_exportable(&self) -> bool {
        self.stored && !self.computed && self.kind != DjFieldKind::One2many
    }
}

/// Static description of one model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DjModelInfo {
    pub name: String,
    /// Storage table, used as xmlid prefix.
    pub table: String,
    pub fields: Vec<DjFieldDescriptor>,
    /// Transient (wizard) models have no ordinary table and no xmlids.
    #[serde(default)]
    pub transient: bool,
}

impl DjModelInfo {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        DjModelInfo {
            table: name.replace('.', "_"),
            name,
            fields: Vec::new(),
            transient: false,
        }
    }

    pub fn with_field(mut self, field: DjFieldDescriptor) -> Self {
        self.fields.retain(|f| f.name != field.name);
        self.fields.push(field);
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&DjFieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
