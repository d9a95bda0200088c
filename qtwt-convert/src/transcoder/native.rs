//! In-process transcoder built on symphonia + rubato
//!
//! Decodes any container/codec symphonia knows from memory, averages all
//! channels down to mono, resamples with a sinc resampler when the source rate
//! differs from the target, and quantizes to 16-bit. No metadata is carried
//! over because the output is written by [`WavEncoder`].

use super::{extension_hint, TranscodeOutput, TranscodeParams, Transcoder};
use crate::audio::WavEncoder;
use crate::error::TranscoderError;
use async_trait::async_trait;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded mono audio at the source rate
struct MonoPcm {
    sample_rate: u32,
    samples: Vec<f32>,
}

/// Pure-Rust transcoder, no external processes or scratch files
#[derive(Debug, Default)]
pub struct SymphoniaTranscoder;

impl SymphoniaTranscoder {
    pub fn new() -> Self {
        Self
    }

    fn run(input: &[u8], file_name_hint: &str, params: &TranscodeParams) -> Result<Vec<u8>, TranscoderError> {
        if params.channels != 1 || params.bits_per_sample != 16 {
            return Err(TranscoderError::Failed(format!(
                "unsupported output layout: {} channels, {} bits",
                params.channels, params.bits_per_sample
            )));
        }

        let mono = decode_to_mono(input, file_name_hint)?;
        let resampled = if mono.sample_rate == params.sample_rate {
            mono.samples
        } else {
            debug!(
                from = mono.sample_rate,
                to = params.sample_rate,
                frames = mono.samples.len(),
                "Resampling"
            );
            resample_mono(&mono.samples, mono.sample_rate, params.sample_rate)?
        };

        let pcm: Vec<i16> = resampled.iter().map(|&s| quantize(s)).collect();
        Ok(WavEncoder::encode(params.sample_rate, &pcm))
    }
}

#[async_trait]
impl Transcoder for SymphoniaTranscoder {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    async fn load(&self) -> Result<(), TranscoderError> {
        // First access builds the probe and codec registries
        tokio::task::spawn_blocking(|| {
            let _ = symphonia::default::get_probe();
            let _ = symphonia::default::get_codecs();
        })
        .await
        .map_err(|e| TranscoderError::Load(e.to_string()))
    }

    async fn transcode(
        &self,
        input: &[u8],
        file_name_hint: &str,
        params: &TranscodeParams,
    ) -> Result<TranscodeOutput, TranscoderError> {
        let input = input.to_vec();
        let hint = file_name_hint.to_string();
        let params = *params;

        let wav = tokio::task::spawn_blocking(move || Self::run(&input, &hint, &params))
            .await
            .map_err(|e| TranscoderError::Failed(format!("decode task failed: {}", e)))??;

        Ok(TranscodeOutput::in_memory(wav))
    }
}

fn decode_to_mono(input: &[u8], file_name_hint: &str) -> Result<MonoPcm, TranscoderError> {
    let source = Cursor::new(input.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_hint(file_name_hint) {
        hint.with_extension(&ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| TranscoderError::Failed(format!("unrecognized audio format: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TranscoderError::Failed("no audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut sample_rate = codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| TranscoderError::Failed(format!("unsupported codec: {}", e)))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(TranscoderError::Failed(format!("failed to read packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(file = %file_name_hint, "Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => return Err(TranscoderError::Failed(format!("decode failed: {}", e))),
        };

        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count().max(1);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        samples.extend(
            buffer
                .samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    let sample_rate = sample_rate
        .ok_or_else(|| TranscoderError::Failed("sample rate not specified".to_string()))?;

    debug!(
        file = %file_name_hint,
        sample_rate,
        frames = samples.len(),
        "Decoded to mono"
    );

    Ok(MonoPcm {
        sample_rate,
        samples,
    })
}

/// Frames fed to the resampler per call
const RESAMPLE_CHUNK: usize = 1024;

/// Sinc resample of a mono signal, keeping the full input duration
///
/// The output is exactly `ceil(len * target / source)` frames long. The
/// resampler's leading delay is dropped and its buffered tail is flushed.
fn resample_mono(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, TranscoderError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        1.0,
        params,
        RESAMPLE_CHUNK,
        1,
    )
    .map_err(|e| TranscoderError::Failed(format!("failed to create resampler: {}", e)))?;

    let expected = (samples.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

    let mut chunks = samples.chunks_exact(RESAMPLE_CHUNK);
    for chunk in &mut chunks {
        let frames = resampler
            .process(&[chunk], None)
            .map_err(|e| TranscoderError::Failed(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let frames = resampler
            .process_partial(Some(&[rest]), None)
            .map_err(|e| TranscoderError::Failed(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);
    }

    // Drain the tail still sitting in the sinc history
    while output.len() < delay + expected {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| TranscoderError::Failed(format!("resampling failed: {}", e)))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    let mut resampled: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();
    resampled.resize(expected, 0.0);
    Ok(resampled)
}

/// f32 in [-1, 1] to i16, clamping sinc overshoot
fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
