//! Error types for qtwt-convert
//!
//! Four classes of failure:
//! - format errors, raised while decoding a WAV container
//! - contract errors, when the transcoder output violates its normalization
//! - external errors from the transcoder engine
//! - non-fatal cleanup errors, recorded and logged but never returned as failures

use std::time::Duration;
use thiserror::Error;

/// WAV container validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WavFormatError {
    #[error("Not a RIFF/WAVE file")]
    NotRiffWave,

    #[error("WAV missing fmt chunk")]
    MissingFormatChunk,

    #[error("WAV missing data chunk")]
    MissingDataChunk,

    #[error("WAV is not PCM (format tag {0})")]
    UnsupportedEncoding(u16),

    #[error("WAV is not mono ({0} channels)")]
    UnsupportedChannelLayout(u16),

    #[error("WAV is not 16-bit ({0} bits per sample)")]
    UnsupportedBitDepth(u16),
}

/// Transcoder engine failures
#[derive(Error, Debug)]
pub enum TranscoderError {
    /// Engine did not finish loading within the allowed time
    #[error("Transcoder engine load timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Engine failed to load
    #[error("Transcoder engine failed to load: {0}")]
    Load(String),

    /// Engine failed earlier in this process and is not retried
    #[error("Transcoder engine unavailable: {0}")]
    Unavailable(String),

    /// Engine ran but could not transcode the input
    #[error("Transcoding failed: {0}")]
    Failed(String),

    /// Working storage I/O error
    #[error("Transcoder I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure converting a single file
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Input bytes could not be read
    #[error("Failed to read input: {0}")]
    Input(#[source] std::io::Error),

    #[error(transparent)]
    Transcoder(#[from] TranscoderError),

    #[error(transparent)]
    Format(#[from] WavFormatError),

    /// Transcoder output was not at the normalized rate
    #[error("Unexpected sample rate after transcoding: {actual} Hz (expected {expected} Hz)")]
    UnexpectedSampleRate { expected: u32, actual: u32 },
}

/// Temporary artifact that could not be released (non-fatal)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to release temporary artifact {artifact}: {reason}")]
pub struct CleanupError {
    pub artifact: String,
    pub reason: String,
}

/// Archive bundling failures
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to bundle")]
    Empty,
}

/// Convenience Result type for single-file conversion
pub type Result<T> = std::result::Result<T, ConversionError>;
