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

//! # Dj Import Module
//!
//! Reads burned CSV tracks back into live values. Each row keeps its
//! identifier (the `id` column) and the decoded field values; relation
//! columns (`<field>/id`) are resolved through the record store.
//!
//! A reference that does not resolve leaves the field `null`. The row
//! records the identifier in [`DjDecodedRow::unresolved`] and the import
//! goes on.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::DjFieldCodec;
use crate::config::DjPolicyConfig;
use crate::errors::{DjError, Result};
use crate::package::DjTrack;
use crate::record::DjValues;
use crate::schema::DjModelInfo;
use crate::store::{require_model, DjRecordStore};

/// One decoded CSV row.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DjDecodedRow {
    /// Identifier of the row, empty when the column is missing.
    pub xmlid: String,
    pub values: DjValues,
    /// `(field, identifier)` pairs left unresolved.
    pub unresolved: Vec<(String, String)>,
}

impl DjDecodedRow {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// CSV track decoder.
pub struct DjCsvImporter<'p> {
    codec: DjFieldCodec<'p>,
}

impl<'p> DjCsvImporter<'p> {
    pub fn new(policy: &'p DjPolicyConfig) -> Self {
        DjCsvImporter {
            codec: DjFieldCodec::new(policy),
        }
    }

    pub fn with_codec(codec: DjFieldCodec<'p>) -> Self {
        DjCsvImporter { codec }
    }

    /// Field behind each header column, `None` for the identifier column.
    fn bind_columns(info: &DjModelInfo, headers: &[String]) -> Result<Vec<Option<String>>> {
        headers
            .iter()
            .map(|header| {
                if header == "id" {
                    return Ok(None);
                }
                let name = header.strip_suffix("/id").unwrap_or(header);
                match info.field(name) {
                    Some(field) => Ok(Some(field.name.clone())),
                    None => Err(DjError::validation(format!(
                        "column '{}' is not a field of {}",
                        header, info.name
                    ))),
                }
            })
            .collect()
    }

    /// Decodes the rows of a CSV document for `model`.
    pub fn decode_csv<R: Read>(
        &self,
        store: &dyn DjRecordStore,
        model: &str,
        reader: R,
    ) -> Result<Vec<DjDecodedRow>> {
        let info = require_model(store, model)?;
        let mut csv_reader = csv::Reader::from_reader(reader);
        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| DjError::validation(format!("CSV headers error: {}", e)))?
            .iter()
            .map(|s| s.to_string())
            .collect();
        let columns = Self::bind_columns(&info, &headers)?;

        let mut rows = Vec::new();
        for (idx, result) in csv_reader.records().enumerate() {
            let record = result?;
            let mut row = DjDecodedRow::default();
            for (column, text) in columns.iter().zip(record.iter()) {
                let Some(name) = column else {
                    row.xmlid = text.to_string();
                    continue;
                };
                let Some(field) = info.field(name) else {
                    continue;
                };
                match self.codec.decode_field(store, model, field, text, &row.values) {
                    Ok(value) => {
                        row.values.insert(name.clone(), value);
                    }
                    Err(DjError::UnresolvableReference { identifier }) => {
                        warn!(
                            "{} row {} ({}): field {} references unknown '{}'",
                            model, idx, row.xmlid, name, identifier
                        );
                        row.values.insert(name.clone(), Value::Null);
                        row.unresolved.push((name.clone(), identifier));
                    }
                    Err(err) => return Err(err),
                }
            }
            rows.push(row);
        }
        debug!("decoded {} rows of {}", rows.len(), model);
        Ok(rows)
    }

    pub fn decode_track(
        &self,
        store: &dyn DjRecordStore,
        model: &str,
        track: &DjTrack,
    ) -> Result<Vec<DjDecodedRow>> {
        self.decode_csv(store, model, track.content.as_slice())
    }

    pub fn decode_file(
        &self,
        store: &dyn DjRecordStore,
        model: &str,
        path: &Path,
    ) -> Result<Vec<DjDecodedRow>> {
        let file = File::open(path)
            .map_err(|e| DjError::Io(format!("{}: {}", path.display(), e)))?;
        self.decode_csv(store, model, file)
    }
}
