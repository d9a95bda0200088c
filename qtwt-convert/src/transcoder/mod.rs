//! Transcoder seam
//!
//! A transcoder turns arbitrary input audio into a normalized WAV (mono,
//! 44.1 kHz, 16-bit PCM, no metadata) that the WAV decoder can read.
//!
//! Implementations:
//! - [`SymphoniaTranscoder`]: in-process decode + downmix + resample
//! - [`FfmpegTranscoder`]: external `ffmpeg` process with on-disk scratch files
//!
//! Engines are wrapped in a [`TranscoderEngine`] which owns the one-time
//! load and serializes conversions.

pub mod engine;
pub mod ffmpeg;
pub mod native;

use crate::error::{CleanupError, TranscoderError};
use async_trait::async_trait;
use qtwt_common::config::{EngineKind, Settings};
use qtwt_common::params::TARGET_SAMPLE_RATE;
use std::path::{Path, PathBuf};

pub use engine::{EngineState, TranscoderEngine};
pub use ffmpeg::FfmpegTranscoder;
pub use native::SymphoniaTranscoder;

/// Normalization applied by every transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeParams {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub strip_metadata: bool,
}

impl TranscodeParams {
    /// Mono, 44.1 kHz, 16-bit, metadata stripped
    pub fn qtpy() -> Self {
        Self {
            channels: 1,
            sample_rate: TARGET_SAMPLE_RATE,
            bits_per_sample: 16,
            strip_metadata: true,
        }
    }
}

impl Default for TranscodeParams {
    fn default() -> Self {
        Self::qtpy()
    }
}

/// Transcoder output
#[derive(Debug, Clone, Default)]
pub struct TranscodeOutput {
    /// Normalized WAV bytes
    pub wav: Vec<u8>,

    /// Temporary files left behind, to be released by the caller
    pub artifacts: Vec<PathBuf>,
}

impl TranscodeOutput {
    pub fn in_memory(wav: Vec<u8>) -> Self {
        Self {
            wav,
            artifacts: Vec::new(),
        }
    }
}

/// Audio transcoder
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Engine name for logs and events
    fn name(&self) -> &'static str;

    /// One-time initialization, run before the first transcode
    async fn load(&self) -> Result<(), TranscoderError>;

    /// Normalize `input` according to `params`
    ///
    /// `file_name_hint` is the original file name; its extension helps
    /// format detection.
    async fn transcode(
        &self,
        input: &[u8],
        file_name_hint: &str,
        params: &TranscodeParams,
    ) -> Result<TranscodeOutput, TranscoderError>;

    /// Release a temporary artifact returned by [`Transcoder::transcode`]
    async fn release(&self, artifact: &Path) -> Result<(), CleanupError> {
        let _ = artifact;
        Ok(())
    }
}

/// Build the engine selected in `settings`
pub fn engine_from_settings(settings: &Settings) -> TranscoderEngine {
    let transcoder: Box<dyn Transcoder> = match settings.engine {
        EngineKind::Symphonia => Box::new(SymphoniaTranscoder::new()),
        EngineKind::Ffmpeg => Box::new(FfmpegTranscoder::new(
            settings.ffmpeg_path.clone(),
            settings.work_dir.clone(),
        )),
    };
    TranscoderEngine::new(transcoder, settings.engine_load_timeout)
}

/// Extension of a file name hint, lowercased, without the dot
pub(crate) fn extension_hint(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
