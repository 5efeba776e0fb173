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

//! # Dj Compilation Module
//!
//! A compilation groups the songs of one genre and data mode. The
//! [`DjCompilationAssembler`] burns a selection of compilations into a flat
//! list of tracks:
//!
//! 1. core compilations join the selection unless excluded
//! 2. shadow songs are added for translations and deferred parents
//! 3. songs burn in `(sequence, id)` order
//! 4. the installer script of each compilation follows its songs, then the
//!    package markers of its directories
//! 5. a developer readme closes the burn
//!
//! Any error aborts the burn; no partial track list is returned.

use std::collections::{BTreeSet, HashMap};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DjPolicyConfig;
use crate::domain::DjDomain;
use crate::equalizer::DjEqualizerSet;
use crate::errors::{DjError, Result};
use crate::identity::{slugify, DjIdentifierRegistry, DjXmlidContext};
use crate::options::DjBurnOptions;
use crate::package::{DjPackager, DjTrack};
use crate::record::{is_truthy, value_to_text};
use crate::scratch::DjScratchRegistry;
use crate::song::{DjExecHook, DjSong, DjSongContext, DjSongOutput, LOAD_CSV_DEFER_PARENT};
use crate::store::DjRecordStore;
use crate::template::{DjTemplateRenderer, DEV_README_TEMPLATE, DISC_TEMPLATE};

const DEFAULT_DISC_PATH: &str = "songs/{data_mode}/generated/{genre}/{name}.py";
const COMPANY_MODEL: &str = "res.company";
const PACKAGE_MARKER: &str = "#\n";
pub const DEV_README_PATH: &str = "DEV_README.rst";

/// Whether the burned data is meant for installation or for demos.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DjDataMode {
    #[default]
    Install,
    Sample,
}

impl DjDataMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DjDataMode::Install => "install",
            DjDataMode::Sample => "sample",
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        match text {
            "install" => Ok(DjDataMode::Install),
            "sample" => Ok(DjDataMode::Sample),
            other => Err(DjError::validation(format!("unknown data mode '{}'", other))),
        }
    }

    /// Identifier namespace of records burned in this mode.
    pub fn namespace<'p>(&self, policy: &'p DjPolicyConfig) -> &'p str {
        match self {
            DjDataMode::Install => &policy.default_namespace,
            DjDataMode::Sample => &policy.sample_namespace,
        }
    }
}

/// Ordered group of songs burned into one installer script.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DjCompilation {
    pub id: i64,
    pub name: String,
    pub sequence: i64,
    pub genre: String,
    pub data_mode: DjDataMode,
    /// Core compilations join every burn.
    pub core: bool,
    pub exclude_core: bool,
    pub songs: Vec<DjSong>,
    pub disc_path: String,
}

impl Default for DjCompilation {
    fn default() -> Self {
        DjCompilation {
            id: 0,
            name: String::new(),
            sequence: 10,
            genre: String::new(),
            data_mode: DjDataMode::Install,
            core: false,
            exclude_core: false,
            songs: Vec::new(),
            disc_path: DEFAULT_DISC_PATH.to_string(),
        }
    }
}

impl DjCompilation {
    /// Name and genre are slugified.
    pub fn new(id: i64, name: &str, genre: &str) -> Self {
        DjCompilation {
            id,
            name: slugify(name),
            genre: slugify(genre),
            ..Default::default()
        }
    }

    pub fn with_song(mut self, song: DjSong) -> Self {
        self.songs.push(song);
        self
    }

    pub fn with_songs(mut self, songs: Vec<DjSong>) -> Self {
        self.songs.extend(songs);
        self
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_data_mode(mut self, mode: DjDataMode) -> Self {
        self.data_mode = mode;
        self
    }

    pub fn with_disc_path(mut self, pattern: impl Into<String>) -> Self {
        self.disc_path = pattern.into();
        self
    }

    pub fn core(mut self) -> Self {
        self.core = true;
        self
    }

    pub fn exclude_core(mut self) -> Self {
        self.exclude_core = true;
        self
    }

    /// Installer script path for `mode`.
    pub fn disc_full_path(&self, mode: DjDataMode) -> String {
        self.disc_path
            .replace("{data_mode}", mode.as_str())
            .replace("{genre}", &self.genre)
            .replace("{name}", &self.name)
    }

    /// `module.path::main` reference used to run the script.
    pub fn anthem_path(&self, mode: DjDataMode) -> String {
        format!(
            "{}::main",
            self.disc_full_path(mode).replace('/', ".").replace(".py", "")
        )
    }

    fn models(&self) -> BTreeSet<String> {
        self.songs.iter().filter_map(|s| s.model.clone()).collect()
    }
}

/// Counters of one burn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjBurnStats {
    pub compilations: usize,
    pub songs: usize,
    pub inert_songs: usize,
    pub config_songs: usize,
    pub scratched_songs: usize,
    pub csv_files: usize,
    pub side_car_files: usize,
    pub tracks: usize,
}

impl DjBurnStats {
    fn record(&mut self, output: &DjSongOutput) {
        self.songs += 1;
        match output {
            DjSongOutput::Inert => self.inert_songs += 1,
            DjSongOutput::ConfigNotice { .. } => self.config_songs += 1,
            DjSongOutput::Scratched(_) => self.scratched_songs += 1,
            DjSongOutput::Tracks { blobs, .. } => {
                self.csv_files += 1;
                self.side_car_files += blobs.len();
            }
        }
    }
}

/// Tracks of a burn, in output order.
#[derive(Clone, Debug)]
pub struct DjBurnResult {
    pub tracks: Vec<DjTrack>,
    pub stats: DjBurnStats,
    /// Base name of the archive.
    pub title: String,
}

impl DjBurnResult {
    pub fn track(&self, path: &str) -> Option<&DjTrack> {
        self.tracks.iter().find(|t| t.path == path)
    }
}

/// A packed burn.
#[derive(Clone, Debug)]
pub struct DjBurnArchive {
    pub file_name: String,
    pub content: Vec<u8>,
    pub stats: DjBurnStats,
}

/// Findings shown to administrators before burning.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjSanityReport {
    /// Models exported by this compilation and by a core compilation.
    pub duplicated_models: Vec<String>,
    /// Songs whose identifiers would fall back to random names.
    pub unsafe_xmlid_songs: Vec<i64>,
}

impl DjSanityReport {
    pub fn is_ok(&self) -> bool {
        self.duplicated_models.is_empty() && self.unsafe_xmlid_songs.is_empty()
    }
}

/// Song of an expanded compilation with its naming position.
struct DjPlacedSong {
    song: DjSong,
    position: usize,
    duplicated: bool,
}

/// `<name>_<data mode>` for one compilation, `multiple_compilations`
/// otherwise.
pub fn album_title(compilations: &[DjCompilation]) -> String {
    match compilations {
        [single] => slugify(&format!("{}_{}", single.name, single.data_mode.as_str())),
        _ => slugify("multiple_compilations"),
    }
}

/// Parent directories of `path` that need a package marker, deepest first.
fn package_markers(path: &str) -> Vec<String> {
    let mut markers = Vec::new();
    let mut mid = match path.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => return markers,
    };
    while mid.contains('/') {
        markers.push(format!("{}/__init__.py", mid));
        mid = match mid.rsplit_once('/') {
            Some((dir, _)) => dir,
            None => break,
        };
    }
    markers
}

/// Burns compilations of songs into tracks.
pub struct DjCompilationAssembler<'a> {
    store: &'a mut dyn DjRecordStore,
    policy: &'a DjPolicyConfig,
    equalizers: &'a DjEqualizerSet,
    templates: &'a dyn DjTemplateRenderer,
    scratches: DjScratchRegistry,
    compilations: Vec<DjCompilation>,
}

impl<'a> DjCompilationAssembler<'a> {
    pub fn new(
        store: &'a mut dyn DjRecordStore,
        policy: &'a DjPolicyConfig,
        equalizers: &'a DjEqualizerSet,
        templates: &'a dyn DjTemplateRenderer,
    ) -> Self {
        DjCompilationAssembler {
            store,
            policy,
            equalizers,
            templates,
            scratches: DjScratchRegistry::default(),
            compilations: Vec::new(),
        }
    }

    pub fn with_scratches(mut self, scratches: DjScratchRegistry) -> Self {
        self.scratches = scratches;
        self
    }

    pub fn add_compilation(&mut self, compilation: DjCompilation) {
        self.compilations.retain(|c| c.id != compilation.id);
        self.compilations.push(compilation);
    }

    pub fn with_compilation(mut self, compilation: DjCompilation) -> Self {
        self.add_compilation(compilation);
        self
    }

    pub fn compilations(&self) -> &[DjCompilation] {
        &self.compilations
    }

    pub fn compilation(&self, id: i64) -> Result<&DjCompilation> {
        self.compilations
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| DjError::configuration(format!("unknown compilation {}", id)))
    }

    fn core_compilations(&self) -> impl Iterator<Item = &DjCompilation> {
        self.compilations.iter().filter(|c| c.core)
    }

    /// Selected compilations plus core ones, in burn order.
    pub fn select(&self, ids: &[i64], options: &DjBurnOptions) -> Result<Vec<DjCompilation>> {
        let mut selected: Vec<DjCompilation> = Vec::with_capacity(ids.len());
        for &id in ids {
            if selected.iter().any(|c| c.id == id) {
                continue;
            }
            selected.push(self.compilation(id)?.clone());
        }
        let exclude_core = options.exclude_core || selected.iter().any(|c| c.exclude_core);
        if !exclude_core {
            for core in self.core_compilations() {
                if !selected.iter().any(|c| c.id == core.id) {
                    selected.push(core.clone());
                }
            }
        }
        selected.sort_by(|a, b| {
            (a.sequence, a.core, &a.name).cmp(&(b.sequence, b.core, &b.name))
        });
        Ok(selected)
    }

    /// More than one company lives in the store.
    pub fn is_multicompany(&self) -> Result<bool> {
        if self.store.model(COMPANY_MODEL).is_none() {
            return Ok(false);
        }
        Ok(self.store.search(COMPANY_MODEL, &DjDomain::All, None)?.len() > 1)
    }

    /// Every company must carry the `aka` short code.
    pub fn check_company_codes(&self) -> Result<()> {
        let ids = self.store.search(COMPANY_MODEL, &DjDomain::All, Some("id asc"))?;
        let fields = vec!["name".to_string(), "aka".to_string()];
        let missing: Vec<String> = self
            .store
            .read(COMPANY_MODEL, &ids, &fields, None)?
            .iter()
            .filter(|c| !is_truthy(c.get("aka")))
            .map(|c| value_to_text(c.get("name")))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DjError::configuration(format!(
                "companies miss `aka` unique code: {}",
                missing.join(", ")
            )))
        }
    }

    /// Warnings about duplicated models and unstable identifiers.
    pub fn sanity_check(&self, compilation_id: i64) -> Result<DjSanityReport> {
        let compilation = self.compilation(compilation_id)?;
        let mut report = DjSanityReport::default();
        if !compilation.core {
            let core_models: BTreeSet<String> = self
                .core_compilations()
                .flat_map(|c| c.models())
                .collect();
            report.duplicated_models = compilation
                .models()
                .intersection(&core_models)
                .cloned()
                .collect();
        }
        for song in compilation.songs.iter().filter(|s| s.has_records) {
            let Some(model) = song.model.as_deref() else {
                continue;
            };
            let Some(info) = self.store.model(model) else {
                warn!("song {} targets unknown model {}", song.id, model);
                continue;
            };
            if info.transient {
                continue;
            }
            if self.equalizers.xmlid_fields(model).is_empty()
                && song.declared_xmlid_fields(&info).is_empty()
                && !info.has_field("name")
            {
                report.unsafe_xmlid_songs.push(song.id);
            }
        }
        Ok(report)
    }

    /// Songs of `compilation` with shadows, in burn order.
    fn expand_songs(&self, compilation: &DjCompilation) -> Result<Vec<DjPlacedSong>> {
        let mut base: Vec<&DjSong> = compilation.songs.iter().collect();
        base.sort_by_key(|s| (s.sequence, s.id));
        let mut counts: HashMap<(Option<&str>, &str), usize> = HashMap::new();
        for song in &base {
            *counts
                .entry((song.model.as_deref(), song.song_type.as_str()))
                .or_default() += 1;
        }
        let languages: Vec<String> = self
            .store
            .installed_languages()
            .into_iter()
            .filter(|l| *l != self.policy.main_language)
            .collect();

        let mut placed = Vec::new();
        for (index, song) in base.iter().enumerate() {
            let position = index + 1;
            let duplicated = counts
                .get(&(song.model.as_deref(), song.song_type.as_str()))
                .copied()
                .unwrap_or(0)
                > 1;
            placed.push(DjPlacedSong {
                song: (*song).clone(),
                position,
                duplicated,
            });
            if song.export_translations {
                for lang in &languages {
                    placed.push(DjPlacedSong {
                        song: song.translation_shadow(lang),
                        position,
                        duplicated,
                    });
                }
            }
            if song.song_type == LOAD_CSV_DEFER_PARENT {
                placed.push(DjPlacedSong {
                    song: song.compute_parent_shadow(self.policy)?,
                    position,
                    duplicated,
                });
            }
        }
        placed.sort_by_key(|p| (p.song.sequence, p.song.id));
        Ok(placed)
    }

    /// Burns `compilation_ids` (plus core compilations) into tracks.
    pub fn burn(&mut self, compilation_ids: &[i64], options: &DjBurnOptions) -> Result<DjBurnResult> {
        let compilations = self.select(compilation_ids, options)?;
        if compilations.is_empty() {
            return Err(DjError::configuration("no compilation to burn"));
        }
        let multicompany = self.is_multicompany()?;
        if multicompany {
            self.check_company_codes()?;
        }
        let mut expanded = Vec::with_capacity(compilations.len());
        for compilation in &compilations {
            expanded.push(self.expand_songs(compilation)?);
        }
        let catalog: Vec<DjSong> = compilations
            .iter()
            .flat_map(|c| c.songs.iter().cloned())
            .collect();

        let policy = self.policy;
        let templates = self.templates;
        let scratches = &self.scratches;
        let mut registry = DjIdentifierRegistry::new(&mut *self.store, policy, self.equalizers);
        let mut stats = DjBurnStats {
            compilations: compilations.len(),
            ..Default::default()
        };
        let mut tracks: Vec<DjTrack> = Vec::new();
        let mut markers: BTreeSet<String> = BTreeSet::new();
        let mut readme_entries: Vec<Value> = Vec::with_capacity(compilations.len());

        for (compilation, songs) in compilations.iter().zip(&expanded) {
            let mode = options.force_data_mode.unwrap_or(compilation.data_mode);
            let namespace = mode.namespace(policy).to_string();
            let mut xmlid = DjXmlidContext::new(namespace.clone())
                .with_force(options.xmlid_force)
                .with_persist(!options.xmlid_skip_create)
                .with_multicompany(multicompany);
            for song in &compilation.songs {
                let Some(model) = song.model.as_deref() else {
                    continue;
                };
                if let Some(info) = registry.store().model(model) {
                    let fields = song.declared_xmlid_fields(&info);
                    if !fields.is_empty() {
                        xmlid.fields_map.insert(model.to_string(), fields);
                    }
                }
            }
            let disc_path = compilation.disc_full_path(mode);
            info!(
                "burning compilation {} ({}, namespace {}) with {} songs",
                compilation.name,
                mode.as_str(),
                namespace,
                songs.len()
            );

            let mut entries: Vec<Value> = Vec::new();
            for placed in songs {
                let ctx = DjSongContext {
                    compilation: &compilation.name,
                    genre: &compilation.genre,
                    data_mode: mode.as_str(),
                    disc_path: &disc_path,
                    position: placed.position,
                    duplicated: placed.duplicated,
                    xmlid: &xmlid,
                    catalog: &catalog,
                    settings_company_xmlids: &options.settings_company_xmlids,
                };
                let output = placed.song.burn(&mut registry, &ctx, scratches, templates)?;
                stats.record(&output);
                tracks.extend(output.into_tracks());
                if placed.song.model.is_some() && !placed.song.is_scratchable() {
                    entries.push(placed.song.disc_entry(&mut registry, &ctx, templates)?);
                }
            }

            let hook_songs = |hook: DjExecHook| -> Vec<Value> {
                entries
                    .iter()
                    .filter(|e| e["exec_hook"] == hook.as_str())
                    .cloned()
                    .collect()
            };
            let vars = json!({
                "compilation": {
                    "name": compilation.name,
                    "genre": compilation.genre,
                    "data_mode": mode.as_str(),
                    "namespace": namespace,
                    "disc_path": disc_path,
                    "anthem_path": compilation.anthem_path(mode),
                },
                "pre_songs": hook_songs(DjExecHook::Pre),
                "post_songs": hook_songs(DjExecHook::Post),
                "songs": entries,
            });
            let disc = templates.render(DISC_TEMPLATE, &vars)?;
            tracks.push(DjTrack::new(disc_path.clone(), disc));
            for marker in package_markers(&disc_path) {
                if markers.insert(marker.clone()) {
                    tracks.push(DjTrack::new(marker, PACKAGE_MARKER));
                }
            }
            readme_entries.push(json!({
                "name": compilation.name,
                "data_mode": mode.as_str(),
                "genre": compilation.genre,
                "disc_path": disc_path,
                "anthem_path": compilation.anthem_path(mode),
            }));
        }

        let readme = templates.render(
            DEV_README_TEMPLATE,
            &json!({ "compilations": readme_entries }),
        )?;
        tracks.push(DjTrack::new(DEV_README_PATH, readme));
        stats.tracks = tracks.len();
        let title = album_title(&compilations);
        info!(
            "burned {} as {} tracks from {} songs",
            title, stats.tracks, stats.songs
        );
        Ok(DjBurnResult {
            tracks,
            stats,
            title,
        })
    }

    /// Burns and packs the tracks into one archive.
    pub fn burn_archive(
        &mut self,
        compilation_ids: &[i64],
        options: &DjBurnOptions,
        packager: &dyn DjPackager,
    ) -> Result<DjBurnArchive> {
        let result = self.burn(compilation_ids, options)?;
        let content = packager.package(&result.tracks)?;
        Ok(DjBurnArchive {
            file_name: format!("{}.zip", result.title),
            content,
            stats: result.stats,
        })
    }
}
