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

//! # Dj Error Module
//!
//! This module defines the error types used throughout the burner for
//! consistent error handling and reporting.
//!
//! ## Error Categories
//!
//! - **Configuration**: Songs, equalizers or companies that are set up in a way
//!   the burner cannot honor (missing company short code, invalid selection
//!   code, dependency pointing at an unknown relation)
//! - **IdentityConflict**: A batch of computed xmlids collides with existing
//!   ones; the whole batch is refused
//! - **UnresolvableReference**: An xmlid found in an import payload does not
//!   resolve to a record; recovered per field by the importer
//! - **TemplateNotFound**: A required installer-script template is missing
//! - **Io / Csv / Serde / Zip**: Wrapped collaborator failures
//!
//! ## Propagation
//!
//! Identity and codec errors abort the enclosing song, which aborts the whole
//! burn. No partial archive is ever produced.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience result type used throughout the burner.
pub type Result<T> = std::result::Result<T, DjError>;

/// Canonical error enumeration for the burner.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum DjError {
    /// User-visible configuration problems, fatal for the current operation.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Computed identifiers collide with existing assignments.
    #[error("writing xmlids for {model} failed, probably your xmlids aren't unique; ids in the batch: {ids:?}")]
    IdentityConflict { model: String, ids: Vec<i64> },

    /// An identifier in an import payload does not resolve.
    #[error("unresolvable reference: {identifier}")]
    UnresolvableReference { identifier: String },

    /// A template required at burn time is missing.
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Validation errors triggered by invalid parameters or inputs.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Errors originating from filesystem IO.
    #[error("io error: {0}")]
    Io(String),

    /// CSV writing or parsing failures.
    #[error("csv error: {0}")]
    Csv(String),

    /// Wrapper for serde-style serialization issues.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Errors originating from ZIP file operations.
    #[error("zip error: {0}")]
    Zip(String),

    /// Catch-all variant for unexpected situations.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for DjError {
    fn from(err: io::Error) -> Self {
        DjError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DjError {
    fn from(err: serde_json::Error) -> Self {
        DjError::Serde(err.to_string())
    }
}

impl From<serde_yaml::Error> for DjError {
    fn from(err: serde_yaml::Error) -> Self {
        DjError::Serde(err.to_string())
    }
}

impl From<csv::Error> for DjError {
    fn from(err: csv::Error) -> Self {
        DjError::Csv(err.to_string())
    }
}

#[cfg(feature = "package")]
impl From<zip::result::ZipError> for DjError {
    fn from(err: zip::result::ZipError) -> Self {
        DjError::Zip(err.to_string())
    }
}

impl DjError {
    /// Helper to construct configuration errors.
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        DjError::Configuration {
            message: message.into(),
        }
    }

    /// Helper to construct identity conflicts for a model and its batch ids.
    pub fn identity_conflict(model: impl Into<String>, ids: Vec<i64>) -> Self {
        DjError::IdentityConflict {
            model: model.into(),
            ids,
        }
    }

    /// Helper to construct unresolvable reference errors.
    pub fn unresolvable<T: Into<String>>(identifier: T) -> Self {
        DjError::UnresolvableReference {
            identifier: identifier.into(),
        }
    }

    /// Helper to construct simple validation errors.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        DjError::Validation {
            message: message.into(),
        }
    }

    /// Helper to construct internal errors.
    pub fn internal<T: Into<String>>(message: T) -> Self {
        DjError::Internal(message.into())
    }

    /// True for failures the importer recovers from on a single field.
    pub fn is_recoverable_on_import(&self) -> bool {
        matches!(self, DjError::UnresolvableReference { .. })
    }
}
