//! Archive bundling of converted wavetables
//!
//! Only used when a batch produced more than one file.

use crate::error::BundleError;
use crate::pipeline::ConversionResult;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Packs named files into one archive blob
pub trait ArchiveBundler: Send + Sync {
    /// Archive file extension, without the dot
    fn extension(&self) -> &'static str;

    fn bundle(&self, entries: &[(&str, &[u8])]) -> Result<Vec<u8>, BundleError>;

    /// Bundle conversion results under their output names
    fn bundle_results(&self, results: &[ConversionResult]) -> Result<Vec<u8>, BundleError> {
        let entries: Vec<(&str, &[u8])> = results
            .iter()
            .map(|r| (r.output_name.as_str(), r.audio.as_slice()))
            .collect();
        self.bundle(&entries)
    }
}

/// Zip archive with uncompressed (stored) entries
///
/// WAV data barely compresses, and stored entries can be read by any unzip
/// tool on the synth's host computer.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipBundler;

impl ZipBundler {
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveBundler for ZipBundler {
    fn extension(&self) -> &'static str {
        "zip"
    }

    fn bundle(&self, entries: &[(&str, &[u8])]) -> Result<Vec<u8>, BundleError> {
        if entries.is_empty() {
            return Err(BundleError::Empty);
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut used = HashSet::new();

        for (name, bytes) in entries {
            let entry_name = unique_entry_name(name, &mut used);
            writer
                .start_file(entry_name.as_str(), options)
                .map_err(|e| BundleError::Archive(e.to_string()))?;
            writer.write_all(bytes)?;
            debug!(entry = %entry_name, bytes = bytes.len(), "Added archive entry");
        }

        let cursor = writer
            .finish()
            .map_err(|e| BundleError::Archive(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

/// `name`, or `stem_2.ext`, `stem_3.ext`, ... if already taken
fn unique_entry_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{}", ext)),
        None => (name, String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}{}", stem, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
