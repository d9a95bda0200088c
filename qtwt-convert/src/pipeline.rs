//! Single-file conversion pipeline
//!
//! ```text
//! input bytes ─> Transcoder ─> WavDecoder ─> rate check ─> SampleFitter
//!             ─> FadeProcessor ─> WavEncoder ─> named ConversionResult
//! ```
//!
//! Temporary transcoder artifacts are released after every attempt, whether
//! or not the later stages succeeded. Release failures never fail the file.

use crate::audio::{FadeProcessor, SampleFitter, WavDecoder, WavEncoder};
use crate::error::{CleanupError, ConversionError, Result};
use crate::transcoder::{TranscodeOutput, TranscodeParams, TranscoderEngine};
use chrono::Utc;
use qtwt_common::events::{ConversionEvent, EventBus};
use qtwt_common::naming::{output_file_name, sanitize_base_name};
use qtwt_common::params::TARGET_SAMPLE_RATE;
use qtwt_common::ConversionRequest;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// One converted wavetable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// `<base>_qtpy_<waves>x256.wav`
    pub output_name: String,

    /// Complete WAV file
    pub audio: Vec<u8>,

    /// Samples decoded from the transcoder output
    pub input_sample_count: usize,

    /// Samples written (always `waves × 256`)
    pub output_sample_count: usize,

    /// Artifacts that could not be released
    pub cleanup_failures: Vec<CleanupError>,
}

/// Converts one input file into one wavetable
pub struct ConversionPipeline {
    engine: Arc<TranscoderEngine>,
    params: TranscodeParams,
    events: Option<EventBus>,
}

impl ConversionPipeline {
    pub fn new(engine: Arc<TranscoderEngine>) -> Self {
        Self {
            engine,
            params: TranscodeParams::qtpy(),
            events: None,
        }
    }

    /// Report cleanup failures on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Convert `bytes` (the contents of `file_name`) into a wavetable
    pub async fn convert(
        &self,
        bytes: &[u8],
        file_name: &str,
        request: &ConversionRequest,
    ) -> Result<ConversionResult> {
        let base = sanitize_base_name(file_name);

        let TranscodeOutput { wav, artifacts } =
            self.engine.transcode(bytes, file_name, &self.params).await?;

        let outcome = Self::render(&base, &wav, request);
        let cleanup_failures = self.release_artifacts(file_name, artifacts).await;

        let mut result = outcome?;
        result.cleanup_failures = cleanup_failures;
        Ok(result)
    }

    /// Turn normalized WAV bytes into a named wavetable
    ///
    /// Everything after the transcoder; no I/O.
    pub fn render(base: &str, wav: &[u8], request: &ConversionRequest) -> Result<ConversionResult> {
        let decoded = WavDecoder::decode(wav)?;
        if decoded.sample_rate != TARGET_SAMPLE_RATE {
            return Err(ConversionError::UnexpectedSampleRate {
                expected: TARGET_SAMPLE_RATE,
                actual: decoded.sample_rate,
            });
        }

        let target = request.target_sample_count();
        let fitted = SampleFitter::fit(&decoded.samples, target);
        let faded = FadeProcessor::fade(
            &fitted,
            request.fade_in,
            request.fade_out,
            request.fade_length_samples,
        );

        debug!(
            base,
            input_samples = decoded.len(),
            input_secs = decoded.duration_seconds(),
            output_samples = faded.len(),
            "Rendered wavetable"
        );

        Ok(ConversionResult {
            output_name: output_file_name(base, request.target_wave_count),
            audio: WavEncoder::encode(TARGET_SAMPLE_RATE, &faded),
            input_sample_count: decoded.len(),
            output_sample_count: faded.len(),
            cleanup_failures: Vec::new(),
        })
    }

    async fn release_artifacts(&self, file_name: &str, artifacts: Vec<PathBuf>) -> Vec<CleanupError> {
        let mut failures = Vec::new();

        for artifact in artifacts {
            if let Err(e) = self.engine.release(&artifact).await {
                warn!(file = %file_name, artifact = %e.artifact, "{}", e);
                if let Some(events) = &self.events {
                    events.emit_lossy(ConversionEvent::CleanupFailed {
                        file_name: file_name.to_string(),
                        artifact: e.artifact.clone(),
                        reason: e.reason.clone(),
                        timestamp: Utc::now(),
                    });
                }
                failures.push(e);
            }
        }

        failures
    }
}
