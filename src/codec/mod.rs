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

//! # Dj Codec Module
//!
//! Field serialization for export and import: the per-kind [`field`] rules,
//! side-car [`blob`] sniffing and the serialized-value [`adapters`].

pub mod adapters;
pub mod blob;
pub mod field;

pub use adapters::{DjDefaultValueAdapter, DjPropertyAdapter, DjValueAdapter};
pub use blob::{is_xml, sniff, DjBlob};
pub use field::{DjEncodeContext, DjFieldCodec};
