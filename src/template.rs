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

//! # Dj Template Module
//!
//! Installer scripts and the developer readme are rendered through a
//! [`DjTemplateRenderer`]. [`DjTemplateRegistry`] is the built-in renderer:
//! a keyed set of templates understanding
//!
//! - `{{ a.b }}` variable paths
//! - `{% for x in list %}...{% endfor %}`
//! - `{% if path %}...{% endif %}` (and `{% if not path %}`)
//!
//! A newline directly after a `{% ... %}` tag is dropped.

use std::collections::HashMap;

use serde_json::Value;

use crate::errors::{DjError, Result};
use crate::record::{is_truthy, value_to_text};

/// Templating collaborator.
pub trait DjTemplateRenderer {
    fn render(&self, template_ref: &str, vars: &Value) -> Result<String>;
}

pub const DISC_TEMPLATE: &str = "base_dj:discs/disc.tmpl";
pub const DEV_README_TEMPLATE: &str = "base_dj:discs/DEV_README.tmpl";

const BUILTIN: &[(&str, &str)] = &[
    (DISC_TEMPLATE, include_str!("../templates/discs/disc.tmpl")),
    ("base_dj:discs/song.tmpl", include_str!("../templates/discs/song.tmpl")),
    (
        "base_dj:discs/song_settings.tmpl",
        include_str!("../templates/discs/song_settings.tmpl"),
    ),
    (
        "base_dj:discs/song_defer_parent.tmpl",
        include_str!("../templates/discs/song_defer_parent.tmpl"),
    ),
    (
        "base_dj:discs/song_compute_parent.tmpl",
        include_str!("../templates/discs/song_compute_parent.tmpl"),
    ),
    (
        "base_dj:discs/song_add_xmlids.tmpl",
        include_str!("../templates/discs/song_add_xmlids.tmpl"),
    ),
    (
        "base_dj:discs/song_addons.tmpl",
        include_str!("../templates/discs/song_addons.tmpl"),
    ),
    (DEV_README_TEMPLATE, include_str!("../templates/discs/DEV_README.tmpl")),
];

#[derive(Debug)]
enum Token<'t> {
    Text(&'t str),
    Var(&'t str),
    Block(&'t str),
}

#[derive(Debug)]
enum Node {
    Text(String),
    Var(String),
    For {
        var: String,
        list: String,
        body: Vec<Node>,
    },
    If {
        cond: String,
        negate: bool,
        body: Vec<Node>,
    },
}

fn syntax(template_ref: &str, message: impl std::fmt::Display) -> DjError {
    DjError::validation(format!("template {}: {}", template_ref, message))
}

fn tokenize<'t>(template_ref: &str, src: &'t str) -> Result<Vec<Token<'t>>> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while !rest.is_empty() {
        let next = match (rest.find("{{"), rest.find("{%")) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let Some(start) = next else {
            tokens.push(Token::Text(rest));
            break;
        };
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let is_var = rest[start..].starts_with("{{");
        let close = if is_var { "}}" } else { "%}" };
        let end = rest[start + 2..]
            .find(close)
            .map(|e| e + start + 2)
            .ok_or_else(|| syntax(template_ref, format!("unclosed tag near byte {}", start)))?;
        let inner = rest[start + 2..end].trim();
        rest = &rest[end + 2..];
        if is_var {
            tokens.push(Token::Var(inner));
        } else {
            tokens.push(Token::Block(inner));
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }
    }
    Ok(tokens)
}

fn parse_nodes(
    template_ref: &str,
    tokens: &[Token<'_>],
    pos: &mut usize,
    closing: Option<&str>,
) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while *pos < tokens.len() {
        let token = &tokens[*pos];
        *pos += 1;
        match token {
            Token::Text(text) => nodes.push(Node::Text(text.to_string())),
            Token::Var(path) => nodes.push(Node::Var(path.to_string())),
            Token::Block(stmt) => {
                let words: Vec<&str> = stmt.split_whitespace().collect();
                match words.as_slice() {
                    ["for", var, "in", list] => {
                        let body = parse_nodes(template_ref, tokens, pos, Some("endfor"))?;
                        nodes.push(Node::For {
                            var: var.to_string(),
                            list: list.to_string(),
                            body,
                        });
                    }
                    ["if", "not", cond] | ["if", cond] => {
                        let negate = words.len() == 3;
                        let body = parse_nodes(template_ref, tokens, pos, Some("endif"))?;
                        nodes.push(Node::If {
                            cond: cond.to_string(),
                            negate,
                            body,
                        });
                    }
                    [end] if Some(*end) == closing => return Ok(nodes),
                    _ => return Err(syntax(template_ref, format!("unexpected tag '{}'", stmt))),
                }
            }
        }
    }
    match closing {
        Some(end) => Err(syntax(template_ref, format!("missing {{% {} %}}", end))),
        None => Ok(nodes),
    }
}

struct Scope<'v> {
    root: &'v Value,
    locals: Vec<(String, Value)>,
}

impl Scope<'_> {
    fn lookup(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let head = segments.next().unwrap_or_default();
        let mut current = match self.locals.iter().rev().find(|(name, _)| name == head) {
            Some((_, value)) => value,
            None => self.root.get(head).unwrap_or(&Value::Null),
        };
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment).unwrap_or(&Value::Null),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .unwrap_or(&Value::Null),
                _ => &Value::Null,
            };
        }
        current.clone()
    }
}

fn render_nodes(nodes: &[Node], scope: &mut Scope<'_>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(path) => out.push_str(&value_to_text(&scope.lookup(path))),
            Node::For { var, list, body } => {
                let items = match scope.lookup(list) {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => vec![other],
                };
                for item in items {
                    scope.locals.push((var.clone(), item));
                    render_nodes(body, scope, out);
                    scope.locals.pop();
                }
            }
            Node::If { cond, negate, body } => {
                if is_truthy(&scope.lookup(cond)) != *negate {
                    render_nodes(body, scope, out);
                }
            }
        }
    }
}

/// Renders `src` directly, without registering it.
pub fn render_str(template_ref: &str, src: &str, vars: &Value) -> Result<String> {
    let tokens = tokenize(template_ref, src)?;
    let mut pos = 0;
    let nodes = parse_nodes(template_ref, &tokens, &mut pos, None)?;
    let mut scope = Scope {
        root: vars,
        locals: Vec::new(),
    };
    let mut out = String::with_capacity(src.len());
    render_nodes(&nodes, &mut scope, &mut out);
    Ok(out)
}

/// Python source literal of a JSON value, for installer scripts.
pub fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(_) => value_to_text(value),
        Value::String(s) => py_string(s),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(py_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", py_string(k), py_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Single-quoted Python string.
pub fn py_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Keyed template set.
#[derive(Clone, Debug)]
pub struct DjTemplateRegistry {
    templates: HashMap<String, String>,
}

impl Default for DjTemplateRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (key, text) in BUILTIN {
            registry.register(key, text);
        }
        registry
    }
}

impl DjTemplateRegistry {
    /// Registry preloaded with the built-in installer templates.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        DjTemplateRegistry {
            templates: HashMap::new(),
        }
    }

    pub fn register(&mut self, template_ref: &str, text: &str) {
        self.templates.insert(template_ref.to_string(), text.to_string());
    }

    pub fn with_template(mut self, template_ref: &str, text: &str) -> Self {
        self.register(template_ref, text);
        self
    }

    pub fn contains(&self, template_ref: &str) -> bool {
        self.templates.contains_key(template_ref)
    }
}

impl DjTemplateRenderer for DjTemplateRegistry {
    fn render(&self, template_ref: &str, vars: &Value) -> Result<String> {
        let src = self
            .templates
            .get(template_ref)
            .ok_or_else(|| DjError::TemplateNotFound(template_ref.to_string()))?;
        render_str(template_ref, src, vars)
    }
}
