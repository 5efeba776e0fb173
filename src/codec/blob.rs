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

//! # Dj Blob Module
//!
//! Content sniffing for side-car files. The extension of a blob must be the
//! same on every burn, so detection runs through a fixed order and the
//! configured alias table.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::config::DjPolicyConfig;
use crate::errors::{DjError, Result};
use crate::record::value_to_text;
use crate::schema::{DjFieldDescriptor, DjFieldKind};

/// Bytes of a side-car file and their extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DjBlob {
    pub extension: String,
    pub content: Vec<u8>,
}

/// True when `text` looks like a single XML document.
pub fn is_xml(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.starts_with("<?xml") {
        return true;
    }
    if !(trimmed.starts_with('<') && trimmed.ends_with('>')) {
        return false;
    }
    let Some(tag) = trimmed[1..]
        .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .next()
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_alphanumeric() || "_-:.".contains(c)))
    else {
        return false;
    };
    trimmed.ends_with("/>") || trimmed.ends_with(&format!("</{}>", tag))
}

/// Decodes base64 payloads, ignoring embedded line breaks.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DjError::validation(format!("invalid base64 content: {}", e)))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Raw bytes of a stored value: binary fields are base64 decoded, other
/// kinds are taken as UTF-8 text.
pub fn field_bytes(field: &DjFieldDescriptor, value: &Value) -> Result<Vec<u8>> {
    let text = value_to_text(value);
    if field.kind == DjFieldKind::Binary {
        decode_base64(&text)
    } else {
        Ok(text.into_bytes())
    }
}

/// Detects the side-car extension of `value` and returns its bytes.
pub fn sniff(field: &DjFieldDescriptor, value: &Value, policy: &DjPolicyConfig) -> Result<DjBlob> {
    let content = field_bytes(field, value)?;
    let extension = sniff_extension(field, &content, policy);
    Ok(DjBlob { extension, content })
}

fn sniff_extension(field: &DjFieldDescriptor, content: &[u8], policy: &DjPolicyConfig) -> String {
    if policy.xml_wrapped_field_names.contains(&field.name) {
        return "xml".to_string();
    }
    if field.kind == DjFieldKind::Html {
        return "html".to_string();
    }
    let text = std::str::from_utf8(content).ok();
    if text.map(is_xml).unwrap_or(false) {
        return "xml".to_string();
    }
    if let Some(kind) = infer::get(content) {
        let extension = policy
            .mimetype_extensions
            .get(kind.mime_type())
            .map(String::as_str)
            .unwrap_or_else(|| kind.extension());
        return policy
            .extension_aliases
            .get(extension)
            .cloned()
            .unwrap_or_else(|| extension.to_string());
    }
    if text.is_some() {
        return "txt".to_string();
    }
    "unknown".to_string()
}
