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

//! # Dj Identity Module
//!
//! Stable external identifiers ("xmlids"): [`policy`] derives local names
//! from record values, [`registry`] tracks and persists assignments.

pub mod policy;
pub mod registry;

pub use policy::{compute_identifier, hash_values, slugify, DjXmlidPolicy};
pub use registry::{DjIdentifierRegistry, DjXmlidContext};
