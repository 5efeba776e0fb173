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

//! # Dj Identifier Policy
//!
//! Pure derivation of local identifier names from record values.
//!
//! - `Join`: `<table>_<slug(v1)>_<slug(v2)>...`
//! - `Hash`: `<table>_<blake3 hex of the raw values>`
//! - no values: `<table>_<id>_<8 random hex>`, stable only within one run
//!
//! With a multi-company prefix the slugified company code comes first.

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;
use serde_json::Value;

use crate::record::value_to_text;

pub use crate::equalizer::DjXmlidPolicy;

fn separators() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"))
}

/// Lowercase, non-alphanumerics to `_`, runs collapsed, ends trimmed.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    separators()
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Deterministic full-length digest of the raw value tuple.
pub fn hash_values(values: &[Value]) -> String {
    let payload = Value::Array(values.to_vec()).to_string();
    blake3::hash(payload.as_bytes()).to_hex().to_string()
}

fn disambiguator() -> String {
    format!("{:08x}", rand::thread_rng().gen::<u32>())
}

/// Computes the local name of one record.
///
/// `values` are the resolved identifier field values, falsy ones already
/// skipped. An empty slice selects the random fallback.
pub fn compute_identifier(
    table: &str,
    record_id: i64,
    values: &[Value],
    policy: DjXmlidPolicy,
    multicompany_prefix: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(values.len() + 2);
    if let Some(prefix) = multicompany_prefix {
        parts.push(slugify(prefix));
    }
    parts.push(table.to_string());

    if values.is_empty() {
        parts.push(record_id.to_string());
        parts.push(disambiguator());
    } else {
        match policy {
            DjXmlidPolicy::Join => {
                parts.extend(values.iter().map(|v| slugify(&value_to_text(v))));
            }
            DjXmlidPolicy::Hash => parts.push(hash_values(values)),
        }
    }
    parts.join("_")
}
