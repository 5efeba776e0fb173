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

//! # Dj Scratch Module
//!
//! Songs whose type starts with `scratch_` produce a free-form track
//! instead of a CSV. Each such type is served by a handler registered under
//! the type key.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::info;
use serde_json::{json, Value};

use crate::errors::{DjError, Result};
use crate::identity::DjIdentifierRegistry;
use crate::package::DjTrack;
use crate::record::{is_truthy, value_to_text};
use crate::song::{DjSong, DjSongContext};
use crate::template::DjTemplateRenderer;

pub const INSTALLED_ADDONS: &str = "scratch_installed_addons";

/// Repository name of modules shipped with the framework itself.
const CORE_REPOSITORY: &str = "addons";

/// Produces the track of a scratch song.
pub type DjScratchHandler = fn(
    &DjSong,
    &mut DjIdentifierRegistry<'_>,
    &DjSongContext<'_>,
    &dyn DjTemplateRenderer,
) -> Result<DjTrack>;

/// Scratch handlers keyed by song type.
pub struct DjScratchRegistry {
    inner: HashMap<String, DjScratchHandler>,
}

impl fmt::Debug for DjScratchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.inner.keys().collect();
        keys.sort();
        f.debug_struct("DjScratchRegistry").field("types", &keys).finish()
    }
}

impl Default for DjScratchRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(INSTALLED_ADDONS, scratch_installed_addons);
        registry
    }
}

impl DjScratchRegistry {
    /// Registry with the built-in handlers.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        DjScratchRegistry {
            inner: HashMap::new(),
        }
    }

    pub fn register(&mut self, song_type: &str, handler: DjScratchHandler) {
        self.inner.insert(song_type.to_string(), handler);
    }

    pub fn contains(&self, song_type: &str) -> bool {
        self.inner.contains_key(song_type)
    }

    pub fn get(&self, song_type: &str) -> Result<DjScratchHandler> {
        self.inner.get(song_type).copied().ok_or_else(|| {
            DjError::configuration(format!("no scratch handler for song type '{}'", song_type))
        })
    }
}

/// Lists installed modules grouped by repository.
pub fn scratch_installed_addons(
    song: &DjSong,
    registry: &mut DjIdentifierRegistry<'_>,
    ctx: &DjSongContext<'_>,
    templates: &dyn DjTemplateRenderer,
) -> Result<DjTrack> {
    let Some(model) = song.model.as_deref() else {
        return Err(DjError::configuration(format!("song {} has no model", song.id)));
    };
    let store = registry.store();
    let ids = song.select_records(store, registry.equalizers(), ctx.catalog, Some("name asc"))?;
    let fields = vec!["name".to_string(), "repository".to_string()];
    let modules = store.read(model, &ids, &fields, None)?;

    let mut addons: Vec<String> = Vec::with_capacity(modules.len());
    let mut core: Vec<String> = Vec::new();
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for module in &modules {
        let name = value_to_text(module.get("name"));
        if name.is_empty() {
            continue;
        }
        addons.push(name.clone());
        let repository = module.get("repository");
        if !is_truthy(repository) || value_to_text(repository) == CORE_REPOSITORY {
            core.push(name);
        } else {
            grouped.entry(value_to_text(repository)).or_default().push(name);
        }
    }
    let grouped_by_repo: Vec<Value> = grouped
        .into_iter()
        .map(|(name, addons)| json!({"name": name, "addons": addons}))
        .collect();
    let content = templates.render(
        &song.template_path,
        &json!({
            "song": {"id": song.id, "model": model},
            "addons": addons,
            "addons_count": addons.len(),
            "core_addons": core,
            "grouped_by_repo": grouped_by_repo,
        }),
    )?;
    info!(
        "listed {} installed addons ({} from core)",
        addons.len(),
        core.len()
    );
    Ok(DjTrack::new("installed_addons.txt", content))
}
