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

//! # Dj Song Module
//!
//! A song exports the records of one model: it selects them, writes a CSV
//! track plus side-car files, and contributes a function to the installer
//! script of its compilation.
//!
//! ## Burn States
//!
//! | state | when |
//! |---|---|
//! | [`DjSongOutput::Inert`] | the song has no model |
//! | [`DjSongOutput::Scratched`] | the song type starts with `scratch_` |
//! | [`DjSongOutput::ConfigNotice`] | the song only configures the script |
//! | [`DjSongOutput::Tracks`] | regular CSV export |
//!
//! ## Record Selection
//!
//! Records come from the song domain minus the equalizer blacklist, joined
//! with the result of the selection code. A song depending on master songs
//! replaces its domain with the ids reachable from the master records.

use std::collections::HashSet;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::codec::{DjEncodeContext, DjFieldCodec};
use crate::config::{DjPolicyConfig, DjSongTypeSpec};
use crate::domain::DjDomain;
use crate::equalizer::DjEqualizerSet;
use crate::errors::{DjError, Result};
use crate::identity::{DjIdentifierRegistry, DjXmlidContext};
use crate::package::DjTrack;
use crate::record::{is_truthy, relation_ids};
use crate::schema::{DjFieldDescriptor, DjModelInfo};
use crate::scratch::DjScratchRegistry;
use crate::selection::DjSelectionCode;
use crate::settings::settings_entries;
use crate::store::{follow_path, require_model, DjRecordStore};
use crate::template::{py_literal, DjTemplateRenderer};

pub const SETTINGS: &str = "settings";
pub const LOAD_CSV: &str = "load_csv";
pub const LOAD_CSV_DEFER_PARENT: &str = "load_csv_defer_parent";
pub const COMPUTE_PARENT: &str = "compute_parent";
pub const GENERATE_XMLIDS: &str = "generate_xmlids";

const DEFAULT_CSV_PATH: &str = "{data_mode}/generated/{genre}/{comp_name}/{model}.csv";
const DEFAULT_BINARIES_PATH: &str = "{data_mode}/generated/{genre}/{comp_name}/binaries/{model}";
const DEFAULT_TEMPLATE: &str = "base_dj:discs/song.tmpl";

/// Master songs are followed at most this deep.
const MAX_DEPENDENCY_DEPTH: usize = 16;

/// When the song runs relative to the module upgrade.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DjExecHook {
    Pre,
    #[default]
    Post,
}

impl DjExecHook {
    pub fn as_str(&self) -> &'static str {
        match self {
            DjExecHook::Pre => "pre",
            DjExecHook::Post => "post",
        }
    }
}

/// Records of a master song feeding the selection of a dependent song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjSongDependency {
    pub master_song_id: i64,
    /// Relational path from the master model, e.g. `product_id.seller_ids`.
    pub field_path: String,
}

impl DjSongDependency {
    pub fn new(master_song_id: i64, field_path: impl Into<String>) -> Self {
        DjSongDependency {
            master_song_id,
            field_path: field_path.into(),
        }
    }

    fn reachable_ids(
        &self,
        song_model: &str,
        store: &dyn DjRecordStore,
        equalizers: &DjEqualizerSet,
        catalog: &[DjSong],
        depth: usize,
    ) -> Result<Vec<i64>> {
        let master = catalog
            .iter()
            .find(|s| s.id == self.master_song_id)
            .ok_or_else(|| {
                DjError::configuration(format!("master song {} not found", self.master_song_id))
            })?;
        let master_model = master.model.as_deref().ok_or_else(|| {
            DjError::configuration(format!("master song {} has no model", master.id))
        })?;
        if self.field_path.trim().is_empty() {
            return Err(DjError::configuration(format!(
                "dependency on song {} needs a relation field path",
                master.id
            )));
        }
        let master_ids = master.collect_records(store, equalizers, catalog, None, depth + 1)?;
        let (target, ids) = follow_path(store, master_model, &master_ids, self.field_path.trim())?;
        if target != song_model {
            return Err(DjError::configuration(format!(
                "path '{}' from {} leads to {}, expected {}",
                self.field_path, master_model, target, song_model
            )));
        }
        Ok(ids)
    }
}

/// Export unit for one model inside a compilation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DjSong {
    pub id: i64,
    pub sequence: i64,
    /// `None` makes the song inert.
    pub model: Option<String>,
    pub song_type: String,
    /// JSON domain in prefix notation.
    pub domain: Value,
    pub selection_code: String,
    pub model_context: Map<String, Value>,
    /// Identifier fields for this model, overriding the equalizer.
    pub xmlid_fields: Vec<String>,
    pub field_whitelist: Vec<String>,
    pub field_blacklist: Vec<String>,
    pub only_config: bool,
    pub has_records: bool,
    pub records_order: String,
    pub depends_on: Vec<DjSongDependency>,
    pub export_translations: bool,
    pub export_lang: Option<String>,
    pub exec_hook: DjExecHook,
    pub csv_path: String,
    pub binaries_path: String,
    pub template_path: String,
}

impl Default for DjSong {
    fn default() -> Self {
        let mut model_context = Map::new();
        model_context.insert("tracking_disable".to_string(), Value::Bool(true));
        DjSong {
            id: 0,
            sequence: 10,
            model: None,
            song_type: LOAD_CSV.to_string(),
            domain: Value::Array(Vec::new()),
            selection_code: String::new(),
            model_context,
            xmlid_fields: Vec::new(),
            field_whitelist: Vec::new(),
            field_blacklist: Vec::new(),
            only_config: false,
            has_records: true,
            records_order: "id asc".to_string(),
            depends_on: Vec::new(),
            export_translations: false,
            export_lang: None,
            exec_hook: DjExecHook::Post,
            csv_path: DEFAULT_CSV_PATH.to_string(),
            binaries_path: DEFAULT_BINARIES_PATH.to_string(),
            template_path: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Compilation-level facts a song needs while burning.
#[derive(Clone, Debug)]
pub struct DjSongContext<'a> {
    pub compilation: &'a str,
    pub genre: &'a str,
    pub data_mode: &'a str,
    /// Final path of the compilation's installer script.
    pub disc_path: &'a str,
    /// 1-based position of the song in its compilation.
    pub position: usize,
    /// Another song of the compilation shares model and type.
    pub duplicated: bool,
    pub xmlid: &'a DjXmlidContext,
    /// Every song of the burn, for dependency lookups.
    pub catalog: &'a [DjSong],
    /// Companies settings songs are restricted to, by identifier.
    pub settings_company_xmlids: &'a [String],
}

/// Result of burning one song.
#[derive(Clone, Debug)]
pub enum DjSongOutput {
    Inert,
    ConfigNotice { song: String, notice: String },
    Tracks { csv: DjTrack, blobs: Vec<DjTrack> },
    Scratched(DjTrack),
}

impl DjSongOutput {
    pub fn into_tracks(self) -> Vec<DjTrack> {
        match self {
            DjSongOutput::Inert | DjSongOutput::ConfigNotice { .. } => Vec::new(),
            DjSongOutput::Tracks { csv, blobs } => {
                let mut tracks = Vec::with_capacity(blobs.len() + 1);
                tracks.push(csv);
                tracks.extend(blobs);
                tracks
            }
            DjSongOutput::Scratched(track) => vec![track],
        }
    }
}

/// Python `os.path.splitext`: the extension starts at the last dot of the
/// last path component, leading dots excluded.
fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(dot) => path.split_at(name_start + leading + dot),
        None => (path, ""),
    }
}

impl DjSong {
    pub fn new(id: i64, model: impl Into<String>) -> Self {
        DjSong {
            id,
            model: Some(model.into()),
            ..Default::default()
        }
    }

    /// Song of a registered type, with the type defaults applied.
    pub fn of_type(id: i64, song_type: &str, policy: &DjPolicyConfig) -> Result<Self> {
        let spec = policy.song_type(song_type).ok_or_else(|| {
            DjError::configuration(format!("unknown song type '{}'", song_type))
        })?;
        let mut song = DjSong {
            id,
            ..Default::default()
        };
        song.apply_type(song_type, spec)?;
        Ok(song)
    }

    fn apply_type(&mut self, key: &str, spec: &DjSongTypeSpec) -> Result<()> {
        self.song_type = key.to_string();
        self.only_config = spec.only_config;
        self.has_records = spec.has_records;
        if !spec.template_path.is_empty() {
            self.template_path = spec.template_path.clone();
        }
        if let Some(model) = &spec.model {
            self.model = Some(model.clone());
        }
        if let Some(domain) = &spec.domain {
            DjDomain::parse(domain)?;
            self.domain = domain.clone();
        }
        Ok(())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_domain(mut self, domain: Value) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_selection_code(mut self, code: impl Into<String>) -> Self {
        self.selection_code = code.into();
        self
    }

    pub fn with_xmlid_fields(mut self, fields: &[&str]) -> Self {
        self.xmlid_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.field_whitelist = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_field_blacklist(mut self, fields: &[&str]) -> Self {
        self.field_blacklist = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_records_order(mut self, order: impl Into<String>) -> Self {
        self.records_order = order.into();
        self
    }

    pub fn with_dependency(mut self, master_song_id: i64, field_path: &str) -> Self {
        self.depends_on.push(DjSongDependency::new(master_song_id, field_path));
        self
    }

    pub fn with_translations(mut self, export: bool) -> Self {
        self.export_translations = export;
        self
    }

    pub fn with_exec_hook(mut self, hook: DjExecHook) -> Self {
        self.exec_hook = hook;
        self
    }

    pub fn with_model_context(mut self, context: Map<String, Value>) -> Self {
        self.model_context = context;
        self
    }

    pub fn with_csv_path(mut self, pattern: impl Into<String>) -> Self {
        self.csv_path = pattern.into();
        self
    }

    pub fn with_binaries_path(mut self, pattern: impl Into<String>) -> Self {
        self.binaries_path = pattern.into();
        self
    }

    /// Scratch songs delegate their output to a registered handler.
    pub fn is_scratchable(&self) -> bool {
        self.song_type.starts_with("scratch_")
    }

    /// Copy exporting translatable fields in `lang`.
    pub fn translation_shadow(&self, lang: &str) -> DjSong {
        let mut shadow = self.clone();
        shadow.export_translations = false;
        shadow.export_lang = Some(lang.to_string());
        let mut context = Map::new();
        context.insert("lang".to_string(), Value::from(lang));
        shadow.model_context = context;
        let (stem, ext) = split_extension(&self.csv_path);
        shadow.csv_path = format!("{}.{}{}", stem, lang, ext);
        shadow.sequence = self.sequence + 1;
        shadow
    }

    /// Copy recomputing parent paths after a deferred import.
    pub fn compute_parent_shadow(&self, policy: &DjPolicyConfig) -> Result<DjSong> {
        let spec = policy.song_type(COMPUTE_PARENT).ok_or_else(|| {
            DjError::configuration(format!("song type '{}' is not registered", COMPUTE_PARENT))
        })?;
        let mut shadow = self.clone();
        shadow.apply_type(COMPUTE_PARENT, spec)?;
        // the base song already carries the CSV track
        shadow.only_config = true;
        Ok(shadow)
    }

    /// Identifier fields declared by the song that exist on `info`.
    pub fn declared_xmlid_fields(&self, info: &DjModelInfo) -> Vec<String> {
        self.xmlid_fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| {
                let head = f.split('.').next().unwrap_or_default();
                !head.is_empty() && info.has_field(head)
            })
            .map(str::to_string)
            .collect()
    }

    pub fn name(&self, policy: &DjPolicyConfig, ctx: &DjSongContext<'_>) -> String {
        let (prefix, suffix) = match policy.song_type(&self.song_type) {
            Some(spec) => (spec.prefix.as_str(), spec.suffix.as_str()),
            None => ("load_", ""),
        };
        let mut name = format!(
            "{}{}{}",
            prefix,
            self.model.as_deref().unwrap_or_default().replace('.', "_"),
            suffix
        );
        if ctx.duplicated {
            name.push_str(&format!("_{}", ctx.position));
        }
        if let Some(lang) = &self.export_lang {
            name.push('_');
            name.push_str(lang);
        }
        name
    }

    fn real_path(&self, pattern: &str, ctx: &DjSongContext<'_>) -> String {
        let path = pattern
            .replace("{data_mode}", ctx.data_mode)
            .replace("{genre}", ctx.genre)
            .replace("{comp_name}", ctx.compilation)
            .replace("{model}", self.model.as_deref().unwrap_or_default());
        if !ctx.duplicated {
            return path;
        }
        let (stem, ext) = split_extension(&path);
        format!("{}_{}{}", stem, ctx.position, ext)
    }

    pub fn real_csv_path(&self, ctx: &DjSongContext<'_>) -> String {
        self.real_path(&self.csv_path, ctx)
    }

    pub fn real_binaries_path(&self, ctx: &DjSongContext<'_>) -> String {
        self.real_path(&self.binaries_path, ctx)
    }

    /// `module.path::function` reference used to run the song alone.
    pub fn anthem_path(&self, policy: &DjPolicyConfig, ctx: &DjSongContext<'_>) -> String {
        format!(
            "{}::{}",
            ctx.disc_path.replace('/', ".").replace(".py", ""),
            self.name(policy, ctx)
        )
    }

    /// Equalizer context of the model overridden by the song's own.
    pub fn effective_model_context(&self, equalizers: &DjEqualizerSet) -> Map<String, Value> {
        let mut context = self
            .model
            .as_deref()
            .map(|m| equalizers.model_context(m))
            .unwrap_or_default();
        for (key, value) in &self.model_context {
            context.insert(key.clone(), value.clone());
        }
        context
    }

    fn data_fields<'m>(
        &self,
        info: &'m DjModelInfo,
        policy: &DjPolicyConfig,
    ) -> Vec<&'m DjFieldDescriptor> {
        if !self.field_whitelist.is_empty() {
            return self
                .field_whitelist
                .iter()
                .filter_map(|name| {
                    let field = info.field(name);
                    if field.is_none() {
                        warn!("song {}: {} has no field '{}'", self.id, info.name, name);
                    }
                    field
                })
                .filter(|f| f.is_exportable())
                .collect();
        }
        info.fields
            .iter()
            .filter(|f| f.is_exportable())
            .filter(|f| !policy.field_blacklist.contains(&f.name))
            .filter(|f| self.export_lang.is_none() || f.translatable)
            .collect()
    }

    /// CSV header: `id` first, `name` second, relations suffixed `/id`.
    pub fn csv_field_names(
        &self,
        info: &DjModelInfo,
        policy: &DjPolicyConfig,
        equalizers: &DjEqualizerSet,
    ) -> Vec<String> {
        let blacklisted = |name: &str| {
            name == "parent_path"
                || self.field_blacklist.iter().any(|f| f == name)
                || equalizers.field_blacklist(&info.name).iter().any(|f| f == name)
        };
        let mut names = vec!["id".to_string()];
        for field in self.data_fields(info, policy) {
            if blacklisted(&field.name) {
                continue;
            }
            if field.kind.is_xmlid_relation() {
                names.push(format!("{}/id", field.name));
            } else {
                names.push(field.name.clone());
            }
        }
        if info.has_field("company_id") {
            names.push("company_id/id".to_string());
        }
        names.sort();
        names.dedup();
        names.retain(|n| n != "id");
        names.insert(0, "id".to_string());
        if let Some(pos) = names.iter().position(|n| n == "name") {
            let name = names.remove(pos);
            names.insert(1, name);
        }
        names
    }

    /// Relation columns pointing at the song's own model, imported in a
    /// second pass.
    pub fn header_exclude(&self, info: &DjModelInfo, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|name| {
                name.strip_suffix("/id")
                    .and_then(|base| info.field(base))
                    .and_then(|f| f.relation.as_deref())
                    == Some(info.name.as_str())
            })
            .cloned()
            .collect()
    }

    /// Ids exported by the song, in export order.
    pub fn select_records(
        &self,
        store: &dyn DjRecordStore,
        equalizers: &DjEqualizerSet,
        catalog: &[DjSong],
        order: Option<&str>,
    ) -> Result<Vec<i64>> {
        self.collect_records(store, equalizers, catalog, order, 0)
    }

    fn collect_records(
        &self,
        store: &dyn DjRecordStore,
        equalizers: &DjEqualizerSet,
        catalog: &[DjSong],
        order: Option<&str>,
        depth: usize,
    ) -> Result<Vec<i64>> {
        let Some(model) = self.model.as_deref() else {
            return Ok(Vec::new());
        };
        if depth > MAX_DEPENDENCY_DEPTH {
            return Err(DjError::configuration(format!(
                "song {} has cyclic dependencies",
                self.id
            )));
        }
        let mut domain = if self.depends_on.is_empty() {
            DjDomain::parse(&self.domain)?
        } else {
            let mut ids: Vec<i64> = Vec::new();
            let mut seen: HashSet<i64> = HashSet::new();
            for dependency in &self.depends_on {
                for id in dependency.reachable_ids(model, store, equalizers, catalog, depth)? {
                    if seen.insert(id) {
                        ids.push(id);
                    }
                }
            }
            DjDomain::ids_in(&ids)
        };
        let blacklist = equalizers.record_blacklist(model, store)?;
        if !blacklist.is_empty() {
            domain = domain.and(DjDomain::ids_not_in(&blacklist));
        }
        let order = order.unwrap_or(self.records_order.as_str());
        let mut ids = store.search(model, &domain, Some(order))?;
        if let Some(code) = DjSelectionCode::parse(&self.selection_code)? {
            let mut seen: HashSet<i64> = ids.iter().copied().collect();
            for id in code.evaluate(store, model)? {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    /// Burns the song into its output tracks.
    pub fn burn(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        ctx: &DjSongContext<'_>,
        scratches: &DjScratchRegistry,
        templates: &dyn DjTemplateRenderer,
    ) -> Result<DjSongOutput> {
        if self.model.is_none() {
            debug!("song {} has no model, skipping", self.id);
            return Ok(DjSongOutput::Inert);
        }
        if self.is_scratchable() {
            let handler = scratches.get(&self.song_type)?;
            return Ok(DjSongOutput::Scratched(handler(self, registry, ctx, templates)?));
        }
        if self.only_config {
            let song = self.name(registry.policy(), ctx);
            let notice = format!("{} only contributes to the installer script", song);
            return Ok(DjSongOutput::ConfigNotice { song, notice });
        }
        self.make_csv(registry, ctx)
    }

    fn model_name(&self) -> Result<&str> {
        self.model
            .as_deref()
            .ok_or_else(|| DjError::configuration(format!("song {} has no model", self.id)))
    }

    /// Writes the CSV track and collects the side-car files.
    pub fn make_csv(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        ctx: &DjSongContext<'_>,
    ) -> Result<DjSongOutput> {
        let model = self.model_name()?;
        let policy = registry.policy();
        let equalizers = registry.equalizers();
        let info = require_model(registry.store(), model)?;
        let header = self.csv_field_names(&info, policy, equalizers);
        let field_names: Vec<String> = header
            .iter()
            .map(|n| n.strip_suffix("/id").unwrap_or(n).to_string())
            .collect();
        let ids = self.select_records(registry.store(), equalizers, ctx.catalog, None)?;
        let read_fields: Vec<String> = field_names.iter().filter(|n| *n != "id").cloned().collect();
        let records = registry
            .store()
            .read(model, &ids, &read_fields, self.export_lang.as_deref())?;

        // one lookup per model instead of one per cell
        registry.ensure_identifiers(model, &ids, ctx.xmlid)?;
        for name in &read_fields {
            let Some(field) = info.field(name) else {
                continue;
            };
            let (Some(target), true) = (field.relation.as_deref(), field.kind.is_relational()) else {
                continue;
            };
            let mut related: Vec<i64> = Vec::new();
            for record in &records {
                related.extend(relation_ids(record.get(name)));
            }
            related.sort_unstable();
            related.dedup();
            registry.ensure_identifiers(target, &related, ctx.xmlid)?;
        }

        let binaries_path = self.real_binaries_path(ctx);
        let codec = DjFieldCodec::new(policy);
        let encode = DjEncodeContext {
            xmlid: ctx.xmlid,
            binaries_path: &binaries_path,
            lang: self.export_lang.as_deref(),
            field_names: &field_names,
        };
        let specials: Vec<DjFieldDescriptor> = codec
            .special_fields(&info, &encode)
            .into_iter()
            .cloned()
            .collect();

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&header)?;
        let mut blobs = Vec::new();
        for record in &records {
            let mut row: Vec<String> = Vec::with_capacity(header.len());
            for name in &field_names {
                if name == "id" {
                    row.push(registry.identifier(model, record.id, ctx.xmlid)?);
                    continue;
                }
                let text = match info.field(name) {
                    Some(field) => codec.encode_field(registry, record, field, &encode)?,
                    None => String::new(),
                };
                row.push(text.replace("\r\n", "\n"));
            }
            writer.write_record(&row)?;
            for field in &specials {
                if !is_truthy(record.get(&field.name)) {
                    continue;
                }
                let (path, blob) = codec.blob_path(registry, record, field, &encode)?;
                blobs.push(DjTrack::new(path, blob.content));
            }
        }
        let data = writer
            .into_inner()
            .map_err(|e| DjError::Csv(e.to_string()))?;
        let csv_path = self.real_csv_path(ctx);
        info!(
            "song {} wrote {} records to {} ({} side-car files)",
            self.name(policy, ctx),
            records.len(),
            csv_path,
            blobs.len()
        );
        Ok(DjSongOutput::Tracks {
            csv: DjTrack::new(csv_path, data),
            blobs,
        })
    }

    /// Variables the song contributes to the installer script.
    pub fn template_vars(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        ctx: &DjSongContext<'_>,
    ) -> Result<Value> {
        let policy = registry.policy();
        let equalizers = registry.equalizers();
        let name = self.name(policy, ctx);
        let mut header_exclude: Vec<String> = Vec::new();
        if let Some(info) = self.model.as_deref().and_then(|m| registry.store().model(m)) {
            let header = self.csv_field_names(&info, policy, equalizers);
            header_exclude = self.header_exclude(&info, &header);
        }
        let mut vars = json!({
            "name": name,
            "model": self.model.clone().unwrap_or_default(),
            "song_type": self.song_type,
            "sequence": self.sequence,
            "exec_hook": self.exec_hook.as_str(),
            "csv_path": self.real_csv_path(ctx),
            "binaries_path": self.real_binaries_path(ctx),
            "anthem_path": self.anthem_path(policy, ctx),
            "model_context": py_literal(&Value::Object(self.effective_model_context(equalizers))),
            "header_exclude": py_literal(&json!(header_exclude)),
            "header_exclude_list": header_exclude,
            "calls": [name],
        });
        match self.song_type.as_str() {
            SETTINGS => {
                let entries = settings_entries(self, &name, registry, ctx)?;
                let calls: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
                vars["settings"] = serde_json::to_value(&entries)?;
                vars["calls"] = json!(calls);
            }
            GENERATE_XMLIDS => {
                vars["xmlids"] = Value::Array(self.xmlid_entries(registry, ctx)?);
            }
            _ => {}
        }
        Ok(vars)
    }

    /// `(identifier, lookup domain)` pairs for records that exist in the
    /// target database without an identifier.
    fn xmlid_entries(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        ctx: &DjSongContext<'_>,
    ) -> Result<Vec<Value>> {
        let model = self.model_name()?;
        let info = require_model(registry.store(), model)?;
        let ids = self.select_records(registry.store(), registry.equalizers(), ctx.catalog, None)?;
        let identifiers = registry.ensure_identifiers(model, &ids, ctx.xmlid)?;
        let keys: Vec<String> = registry
            .xmlid_fields(&info, ctx.xmlid)
            .into_iter()
            .filter(|k| {
                info.field(k)
                    .map(|f| !f.kind.is_relational())
                    .unwrap_or(false)
            })
            .collect();
        let records = if keys.is_empty() {
            Vec::new()
        } else {
            registry.store().read(model, &ids, &keys, None)?
        };
        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(xmlid) = identifiers.get(id) else {
                continue;
            };
            let leaves: Vec<Value> = match records.iter().find(|r| r.id == *id) {
                Some(record) => keys
                    .iter()
                    .map(|k| json!([k, "=", record.get(k)]))
                    .collect(),
                None => vec![json!(["id", "=", id])],
            };
            entries.push(json!({
                "xmlid": xmlid,
                "domain": py_literal(&Value::Array(leaves)),
            }));
        }
        Ok(entries)
    }

    /// Template variables plus the rendered function body.
    pub fn disc_entry(
        &self,
        registry: &mut DjIdentifierRegistry<'_>,
        ctx: &DjSongContext<'_>,
        templates: &dyn DjTemplateRenderer,
    ) -> Result<Value> {
        let mut vars = self.template_vars(registry, ctx)?;
        let body = templates.render(&self.template_path, &json!({ "song": vars.clone() }))?;
        vars["body"] = Value::from(body);
        Ok(vars)
    }
}
