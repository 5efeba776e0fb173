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

//! # Dj Package Module
//!
//! Burn output is a list of [`DjTrack`]s (path plus bytes). A
//! [`DjPackager`] turns the list into an archive; [`DjZipPackager`] writes
//! deflated ZIP files and reads them back.

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// One output file of a burn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DjTrack {
    pub path: String,
    pub content: Vec<u8>,
}

impl DjTrack {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        DjTrack {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Content as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Archive collaborator.
pub trait DjPackager {
    fn package(&self, tracks: &[DjTrack]) -> Result<Vec<u8>>;
}

#[cfg(feature = "package")]
pub use zip_packager::DjZipPackager;

#[cfg(feature = "package")]
mod zip_packager {
    use std::io::{Cursor, Read, Write};

    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipArchive, ZipWriter};

    use super::{DjPackager, DjTrack};
    use crate::errors::Result;

    /// Deflated ZIP archives.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct DjZipPackager;

    impl DjZipPackager {
        pub fn new() -> Self {
            DjZipPackager
        }

        /// Reads every file of an archive, in archive order.
        pub fn unpack(&self, archive: &[u8]) -> Result<Vec<DjTrack>> {
            let mut zip = ZipArchive::new(Cursor::new(archive))?;
            let mut tracks = Vec::with_capacity(zip.len());
            for index in 0..zip.len() {
                let mut file = zip.by_index(index)?;
                if file.is_dir() {
                    continue;
                }
                let mut content = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut content)?;
                tracks.push(DjTrack::new(file.name(), content));
            }
            Ok(tracks)
        }
    }

    impl DjPackager for DjZipPackager {
        fn package(&self, tracks: &[DjTrack]) -> Result<Vec<u8>> {
            let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            for track in tracks {
                zip.start_file(track.path.as_str(), options)?;
                zip.write_all(&track.content)?;
            }
            Ok(zip.finish()?.into_inner())
        }
    }

}
