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

//! # Dj Domain Module
//!
//! Record selection filters. A domain is written in the host framework's
//! prefix ("polish") notation as a JSON list:
//!
//! ```text
//! ["|", ["state", "=", "installed"], ["name", "in", ["base", "web"]]]
//! ```
//!
//! Terms left on the stack after parsing are joined with an implicit AND; an
//! empty list matches everything.

use std::cmp::Ordering;

use serde_json::Value;

use crate::errors::{DjError, Result};
use crate::record::{is_truthy, DjValues};

/// Comparison operator of a domain leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DjOperator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    NotIn,
    Like,
    ILike,
}

impl DjOperator {
    pub fn parse(op: &str) -> Result<Self> {
        Ok(match op {
            "=" | "==" => DjOperator::Eq,
            "!=" | "<>" => DjOperator::Ne,
            "<" => DjOperator::Lt,
            ">" => DjOperator::Gt,
            "<=" => DjOperator::Le,
            ">=" => DjOperator::Ge,
            "in" => DjOperator::In,
            "not in" => DjOperator::NotIn,
            "like" => DjOperator::Like,
            "ilike" => DjOperator::ILike,
            other => {
                return Err(DjError::validation(format!(
                    "unsupported domain operator '{}'",
                    other
                )))
            }
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DjOperator::Eq => "=",
            DjOperator::Ne => "!=",
            DjOperator::Lt => "<",
            DjOperator::Gt => ">",
            DjOperator::Le => "<=",
            DjOperator::Ge => ">=",
            DjOperator::In => "in",
            DjOperator::NotIn => "not in",
            DjOperator::Like => "like",
            DjOperator::ILike => "ilike",
        }
    }
}

/// Boolean expression over record fields.
#[derive(Clone, Debug, PartialEq)]
pub enum DjDomain {
    All,
    Leaf {
        field: String,
        op: DjOperator,
        value: Value,
    },
    And(Vec<DjDomain>),
    Or(Vec<DjDomain>),
    Not(Box<DjDomain>),
}

impl Default for DjDomain {
    fn default() -> Self {
        DjDomain::All
    }
}

impl DjDomain {
    pub fn leaf(field: impl Into<String>, op: DjOperator, value: Value) -> Self {
        DjDomain::Leaf {
            field: field.into(),
            op,
            value,
        }
    }

    /// `id in ids`.
    pub fn ids_in(ids: &[i64]) -> Self {
        Self::leaf("id", DjOperator::In, Value::from(ids.to_vec()))
    }

    /// `id not in ids`.
    pub fn ids_not_in(ids: &[i64]) -> Self {
        Self::leaf("id", DjOperator::NotIn, Value::from(ids.to_vec()))
    }

    /// Conjunction, flattening nested ANDs and dropping `All`.
    pub fn and(self, other: DjDomain) -> DjDomain {
        let mut terms = Vec::new();
        for term in [self, other] {
            match term {
                DjDomain::All => {}
                DjDomain::And(inner) => terms.extend(inner),
                other => terms.push(other),
            }
        }
        match terms.len() {
            0 => DjDomain::All,
            1 => terms.remove(0),
            _ => DjDomain::And(terms),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DjDomain::All)
    }

    /// Parses a domain from its JSON text form. Blank text is `All`.
    pub fn parse_str(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(DjDomain::All);
        }
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| DjError::validation(format!("invalid domain '{}': {}", trimmed, e)))?;
        Self::parse(&value)
    }

    /// Parses a domain from a JSON prefix-notation list.
    pub fn parse(value: &Value) -> Result<Self> {
        let items = match value {
            Value::Null => return Ok(DjDomain::All),
            Value::Array(items) => items,
            _ => return Err(DjError::validation("domain must be a list")),
        };

        let mut stack: Vec<DjDomain> = Vec::new();
        for item in items.iter().rev() {
            match item {
                Value::String(op) if op == "!" => {
                    let term = pop_term(&mut stack, "!")?;
                    stack.push(DjDomain::Not(Box::new(term)));
                }
                Value::String(op) if op == "&" || op == "|" => {
                    let left = pop_term(&mut stack, op)?;
                    let right = pop_term(&mut stack, op)?;
                    stack.push(if op == "&" {
                        DjDomain::And(vec![left, right])
                    } else {
                        DjDomain::Or(vec![left, right])
                    });
                }
                Value::Array(leaf) if leaf.len() == 3 => {
                    let field = leaf[0]
                        .as_str()
                        .ok_or_else(|| DjError::validation("domain leaf field must be a string"))?;
                    let op = leaf[1]
                        .as_str()
                        .ok_or_else(|| DjError::validation("domain leaf operator must be a string"))?;
                    stack.push(DjDomain::leaf(field, DjOperator::parse(op)?, leaf[2].clone()));
                }
                other => {
                    return Err(DjError::validation(format!(
                        "invalid domain term {}",
                        other
                    )))
                }
            }
        }

        stack.reverse();
        Ok(match stack.len() {
            0 => DjDomain::All,
            1 => stack.remove(0),
            _ => DjDomain::And(stack),
        })
    }

    /// Serializes back into prefix notation.
    pub fn to_value(&self) -> Value {
        let mut items = Vec::new();
        self.push_terms(&mut items);
        Value::Array(items)
    }

    fn push_terms(&self, items: &mut Vec<Value>) {
        match self {
            DjDomain::All => {}
            DjDomain::Leaf { field, op, value } => items.push(Value::Array(vec![
                Value::from(field.as_str()),
                Value::from(op.as_str()),
                value.clone(),
            ])),
            DjDomain::And(terms) | DjDomain::Or(terms) => {
                let marker = if matches!(self, DjDomain::And(_)) { "&" } else { "|" };
                let terms: Vec<&DjDomain> = terms.iter().filter(|t| !t.is_all()).collect();
                for _ in 1..terms.len() {
                    items.push(Value::from(marker));
                }
                for term in terms {
                    term.push_terms(items);
                }
            }
            DjDomain::Not(inner) => {
                items.push(Value::from("!"));
                inner.push_terms(items);
            }
        }
    }

    /// Evaluates the domain against one record.
    pub fn matches(&self, id: i64, values: &DjValues) -> bool {
        match self {
            DjDomain::All => true,
            DjDomain::Leaf { field, op, value } => {
                let id_value = Value::from(id);
                let actual = if field == "id" {
                    &id_value
                } else {
                    values.get(field).unwrap_or(&Value::Null)
                };
                leaf_matches(actual, *op, value)
            }
            DjDomain::And(terms) => terms.iter().all(|t| t.matches(id, values)),
            DjDomain::Or(terms) => terms.iter().any(|t| t.matches(id, values)),
            DjDomain::Not(inner) => !inner.matches(id, values),
        }
    }
}

fn pop_term(stack: &mut Vec<DjDomain>, op: &str) -> Result<DjDomain> {
    stack
        .pop()
        .ok_or_else(|| DjError::validation(format!("domain operator '{}' lacks operands", op)))
}

fn leaf_matches(actual: &Value, op: DjOperator, expected: &Value) -> bool {
    // x2many values match when any related id satisfies the leaf
    if let Value::Array(items) = actual {
        return match op {
            DjOperator::Ne | DjOperator::NotIn => {
                let positive = if op == DjOperator::Ne {
                    DjOperator::Eq
                } else {
                    DjOperator::In
                };
                !items.iter().any(|item| leaf_matches(item, positive, expected))
            }
            _ if items.is_empty() => leaf_matches(&Value::Null, op, expected),
            _ => items.iter().any(|item| leaf_matches(item, op, expected)),
        };
    }

    match op {
        DjOperator::Eq => loose_eq(actual, expected),
        DjOperator::Ne => !loose_eq(actual, expected),
        DjOperator::In => as_list(expected).iter().any(|v| loose_eq(actual, v)),
        DjOperator::NotIn => !as_list(expected).iter().any(|v| loose_eq(actual, v)),
        DjOperator::Lt => compare(actual, expected) == Some(Ordering::Less),
        DjOperator::Gt => compare(actual, expected) == Some(Ordering::Greater),
        DjOperator::Le => matches!(
            compare(actual, expected),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        DjOperator::Ge => matches!(
            compare(actual, expected),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
        DjOperator::Like => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.contains(e.trim_matches('%')),
            _ => false,
        },
        DjOperator::ILike => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a
                .to_lowercase()
                .contains(&e.trim_matches('%').to_lowercase()),
            _ => false,
        },
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Equality where `null` and `false` are both the empty value.
fn loose_eq(a: &Value, b: &Value) -> bool {
    let empty = |v: &Value| matches!(v, Value::Null | Value::Bool(false));
    if empty(a) && empty(b) {
        return true;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if !is_truthy(a) && !a.is_number() {
        return None;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
