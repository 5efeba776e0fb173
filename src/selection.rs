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

//! # Dj Selection Module
//!
//! Extra record selection for songs, written in a small expression
//! language instead of executable code:
//!
//! ```text
//! # journals' sequences
//! records = search("account.journal", [["type", "=", "sale"]]).sequence_id
//! ```
//!
//! `search` takes a model name and an optional JSON domain; each `.field`
//! step follows a relation. Lines starting with `#` are comments.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::domain::DjDomain;
use crate::errors::{DjError, Result};
use crate::store::{follow_path, DjRecordStore};

fn path_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("path pattern is valid")
    })
}

/// Parsed selection expression.
#[derive(Clone, Debug, PartialEq)]
pub struct DjSelectionCode {
    pub model: String,
    pub domain: DjDomain,
    pub path: Vec<String>,
}

fn invalid(code: &str, reason: &str) -> DjError {
    DjError::configuration(format!("invalid selection code '{}': {}", code, reason))
}

/// Index of the parenthesis closing the one opened just before `text`.
fn closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.checked_sub(1)?,
            ')' if depth == 0 => return Some(idx),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

impl DjSelectionCode {
    /// Parses `code`; blank or comment-only code yields `None`.
    pub fn parse(code: &str) -> Result<Option<Self>> {
        let body: String = code
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect::<Vec<_>>()
            .join(" ");
        if body.is_empty() {
            return Ok(None);
        }

        let mut expr = body.trim();
        if let Some(rest) = expr.strip_prefix("records") {
            expr = rest
                .trim_start()
                .strip_prefix('=')
                .ok_or_else(|| invalid(&body, "expected '=' after 'records'"))?
                .trim_start();
        }
        let args_start = expr
            .strip_prefix("search")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('('))
            .ok_or_else(|| invalid(&body, "expression must start with search(...)"))?;
        let close = closing_paren(args_start).ok_or_else(|| invalid(&body, "unbalanced parentheses"))?;

        let args: Vec<Value> = serde_json::from_str(&format!("[{}]", &args_start[..close]))
            .map_err(|e| invalid(&body, &format!("bad search arguments: {}", e)))?;
        let model = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(&body, "search needs a model name"))?
            .to_string();
        let domain = match args.get(1) {
            Some(value) => DjDomain::parse(value).map_err(|e| invalid(&body, &e.to_string()))?,
            None => DjDomain::All,
        };
        if args.len() > 2 {
            return Err(invalid(&body, "search takes at most two arguments"));
        }

        let tail: String = args_start[close + 1..].split_whitespace().collect();
        if !path_pattern().is_match(&tail) {
            return Err(invalid(&body, "only '.field' steps may follow search(...)"));
        }
        let path = tail
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Some(DjSelectionCode { model, domain, path }))
    }

    /// Evaluates the expression; the result must be records of `expected_model`.
    pub fn evaluate(&self, store: &dyn DjRecordStore, expected_model: &str) -> Result<Vec<i64>> {
        let ids = store.search(&self.model, &self.domain, None)?;
        let (model, ids) = if self.path.is_empty() {
            (self.model.clone(), ids)
        } else {
            follow_path(store, &self.model, &ids, &self.path.join("."))?
        };
        if model != expected_model {
            return Err(DjError::configuration(format!(
                "wrong recordset model: selection code must return records of {}, got {} instead",
                expected_model, model
            )));
        }
        Ok(ids)
    }
}
