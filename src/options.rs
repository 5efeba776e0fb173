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

//! # Dj Options Module
//!
//! Flags controlling one burn. They usually arrive as request parameters,
//! so [`DjBurnOptions::from_params`] parses the string form:
//!
//! | parameter | meaning |
//! |---|---|
//! | `dj_exclude_core` | do not add core compilations |
//! | `dj_xmlid_force` | regenerate identifiers in replaceable namespaces |
//! | `dj_xmlid_skip_create` | compute identifiers without storing them |
//! | `dj_force_data_mode` | `install` or `sample` for every compilation |
//! | `dj_settings_company_xmlids` | comma-separated companies for settings songs |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::compilation::DjDataMode;
use crate::errors::{DjError, Result};

/// Options of [`crate::compilation::DjCompilationAssembler::burn`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DjBurnOptions {
    pub exclude_core: bool,
    pub xmlid_force: bool,
    pub xmlid_skip_create: bool,
    pub force_data_mode: Option<DjDataMode>,
    pub settings_company_xmlids: Vec<String>,
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DjError::validation(format!(
            "{}: expected a boolean flag, got '{}'",
            key, other
        ))),
    }
}

impl DjBurnOptions {
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self> {
        let mut options = DjBurnOptions::default();
        for (key, value) in params {
            match key.as_str() {
                "dj_exclude_core" => options.exclude_core = parse_flag(key, value)?,
                "dj_xmlid_force" => options.xmlid_force = parse_flag(key, value)?,
                "dj_xmlid_skip_create" => options.xmlid_skip_create = parse_flag(key, value)?,
                "dj_force_data_mode" if value.trim().is_empty() => {}
                "dj_force_data_mode" => {
                    options.force_data_mode = Some(DjDataMode::parse(value.trim())?)
                }
                "dj_settings_company_xmlids" => {
                    options.settings_company_xmlids = value
                        .split(',')
                        .map(str::trim)
                        .filter(|x| !x.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                // unrelated request parameters
                _ => {}
            }
        }
        Ok(options)
    }

    pub fn with_exclude_core(mut self, exclude: bool) -> Self {
        self.exclude_core = exclude;
        self
    }

    pub fn with_xmlid_force(mut self, force: bool) -> Self {
        self.xmlid_force = force;
        self
    }

    pub fn with_skip_create(mut self, skip: bool) -> Self {
        self.xmlid_skip_create = skip;
        self
    }

    pub fn with_data_mode(mut self, mode: DjDataMode) -> Self {
        self.force_data_mode = Some(mode);
        self
    }

    pub fn with_settings_companies(mut self, xmlids: &[&str]) -> Self {
        self.settings_company_xmlids = xmlids.iter().map(|x| x.to_string()).collect();
        self
    }
}
