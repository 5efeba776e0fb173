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

//! # Dj Burner Library
//!
//! Export engine producing portable data fixtures with stable external
//! identifiers ("xmlids"). Administrators describe *songs* (a model, a
//! record selection and a field policy) grouped into *compilations*; a
//! *burn* turns them into fully quoted CSV files, side-car files for large
//! values and an installer script that replays the data elsewhere.
//!
//! ## Module Overview
//!
//! - **identity**: identifier derivation ([`identity::policy`]) and
//!   assignment ([`identity::registry`])
//! - **codec**: per-kind field encoding and decoding, side-car files
//! - **song**: export unit, with [`selection`], [`settings`] and [`scratch`]
//! - **compilation**: the assembler burning compilations into tracks
//! - **store**: the record store interface and its in-memory implementation
//! - **domain**: record selection filters
//! - **equalizer**: per-model identifier and filtering settings
//! - **config**: policy tables and song types
//! - **template**: installer script rendering
//! - **package**: archive packaging
//! - **options**: burn flags
//! - **import**: decoding burned CSV files
//!
//! ## Feature Flags
//!
//! - `package` (default): ZIP packaging through [`package::DjZipPackager`]
//!
//! ## Quick Start
//!
//! ```rust
//! use dj_burner::{
//!     DjBurnOptions, DjCompilation, DjCompilationAssembler, DjEqualizerSet,
//!     DjMemoryStore, DjPolicyConfig, DjSong, DjTemplateRegistry,
//! };
//!
//! let mut store = DjMemoryStore::new();
//! let policy = DjPolicyConfig::default();
//! let equalizers = DjEqualizerSet::default();
//! let templates = DjTemplateRegistry::new();
//!
//! let mut assembler = DjCompilationAssembler::new(&mut store, &policy, &equalizers, &templates)
//!     .with_compilation(DjCompilation::new(1, "Base", "setup").with_song(DjSong::new(1, "res.partner")));
//! let result = assembler.burn(&[1], &DjBurnOptions::default());
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, DjError>`. Any error raised while
//! burning aborts the whole burn.

pub mod codec;
pub mod compilation;
pub mod config;
pub mod domain;
pub mod equalizer;
pub mod errors;
pub mod identity;
pub mod import;
pub mod options;
pub mod package;
pub mod record;
pub mod schema;
pub mod scratch;
pub mod selection;
pub mod settings;
pub mod song;
pub mod store;
pub mod template;

pub use errors::{DjError, Result};
pub use record::{DjRecord, DjRecordBatch, DjRecordRef, DjValues};
pub use schema::{DjFieldDescriptor, DjFieldKind, DjModelInfo};
pub use domain::{DjDomain, DjOperator};
pub use config::{DjPolicyConfig, DjPolicyConfigBuilder, DjSongTypeSpec};
pub use equalizer::{DjEqualizerConfig, DjEqualizerSet, DjXmlidPolicy};
pub use store::{DjIdentifierAssignment, DjMemoryStore, DjRecordStore};
pub use identity::{compute_identifier, slugify, DjIdentifierRegistry, DjXmlidContext};
pub use codec::{DjEncodeContext, DjFieldCodec, DjValueAdapter};
pub use selection::DjSelectionCode;
pub use song::{DjExecHook, DjSong, DjSongContext, DjSongDependency, DjSongOutput};
pub use settings::{DjSettingValue, DjSettingsEntry};
pub use scratch::{DjScratchHandler, DjScratchRegistry};
pub use compilation::{
    album_title, DjBurnArchive, DjBurnResult, DjBurnStats, DjCompilation, DjCompilationAssembler,
    DjDataMode, DjSanityReport,
};
pub use options::DjBurnOptions;
pub use template::{DjTemplateRegistry, DjTemplateRenderer};
pub use package::{DjPackager, DjTrack};
#[cfg(feature = "package")]
pub use package::DjZipPackager;
pub use import::{DjCsvImporter, DjDecodedRow};
