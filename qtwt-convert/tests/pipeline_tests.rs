//! Single-file pipeline tests
//!
//! The passthrough transcoder hands fixture WAVs straight to the decoder, so
//! these exercise decode → fit → fade → encode plus artifact handling. The
//! symphonia tests run the real in-process engine.

mod helpers;

use helpers::{constant_wav, passthrough_engine, ramp_wav, tone_wav, AudioConfig, PassthroughTranscoder};
use qtwt_common::{ConversionEvent, ConversionRequest, EventBus, WaveCount};
use qtwt_convert::audio::{WavDecoder, WavEncoder};
use qtwt_convert::error::{ConversionError, TranscoderError, WavFormatError};
use qtwt_convert::transcoder::{SymphoniaTranscoder, TranscoderEngine};
use qtwt_convert::ConversionPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn request(fade_in: bool, fade_out: bool, fade_len: usize) -> ConversionRequest {
    ConversionRequest::new(WaveCount::Auto, fade_in, fade_out, fade_len)
}

#[tokio::test]
async fn test_end_to_end_20000_samples_auto_waves() {
    let input = ramp_wav(&AudioConfig::default());
    let samples = WavDecoder::decode(&input).unwrap().samples;
    let pipeline = ConversionPipeline::new(passthrough_engine(PassthroughTranscoder::default()));

    let result = pipeline
        .convert(&input, "Pad Loop.wav", &request(true, false, 100))
        .await
        .unwrap();

    assert_eq!(result.output_name, "Pad_Loop_qtpy_64x256.wav");
    assert_eq!(result.input_sample_count, 20_000);
    assert_eq!(result.output_sample_count, 16_384);
    assert!(result.cleanup_failures.is_empty());

    let out = WavDecoder::decode(&result.audio).unwrap();
    assert_eq!(out.sample_rate, 44100);
    assert_eq!(out.len(), 16_384);
    // The first 16 384 input samples, faded in over 100
    assert_eq!(out.samples[0], 0);
    assert_eq!(out.samples[50], 25);
    assert_eq!(out.samples[100..], samples[100..16_384]);
}

#[tokio::test]
async fn test_output_bytes_are_canonical() {
    let input = tone_wav(&AudioConfig {
        frames: 300,
        ..AudioConfig::default()
    });
    let pipeline = ConversionPipeline::new(passthrough_engine(PassthroughTranscoder::default()));
    let req = ConversionRequest::with_wave_count(1, false, false, 0).unwrap();

    let result = pipeline.convert(&input, "tone.wav", &req).await.unwrap();
    let decoded = WavDecoder::decode(&input).unwrap();

    assert_eq!(result.audio, WavEncoder::encode(44100, &decoded.samples[..256]));
}

#[tokio::test]
async fn test_stereo_transcoder_output_rejected() {
    let input = tone_wav(&AudioConfig {
        channels: 2,
        ..AudioConfig::default()
    });
    let pipeline = ConversionPipeline::new(passthrough_engine(PassthroughTranscoder::default()));

    let err = pipeline
        .convert(&input, "stereo.wav", &request(false, false, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConversionError::Format(WavFormatError::UnsupportedChannelLayout(2))
    ));
}

#[tokio::test]
async fn test_24_bit_transcoder_output_rejected() {
    // Plain PCM header declaring 24 bits per sample
    let mut input = WavEncoder::encode(44100, &[0; 30]);
    input[34..36].copy_from_slice(&24u16.to_le_bytes());
    let pipeline = ConversionPipeline::new(passthrough_engine(PassthroughTranscoder::default()));

    let err = pipeline
        .convert(&input, "deep.wav", &request(false, false, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConversionError::Format(WavFormatError::UnsupportedBitDepth(24))
    ));
}

#[tokio::test]
async fn test_wrong_rate_from_transcoder_rejected() {
    let input = constant_wav(
        &AudioConfig {
            sample_rate: 22050,
            ..AudioConfig::default()
        },
        1,
    );
    let pipeline = ConversionPipeline::new(passthrough_engine(PassthroughTranscoder::default()));

    let err = pipeline
        .convert(&input, "low.wav", &request(false, false, 0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConversionError::UnexpectedSampleRate {
            expected: 44100,
            actual: 22050
        }
    ));
}

#[tokio::test]
async fn test_transcoder_failure_propagates() {
    let transcoder = PassthroughTranscoder {
        failing_inputs: vec!["broken.mp3".to_string()],
        ..Default::default()
    };
    let pipeline = ConversionPipeline::new(passthrough_engine(transcoder));

    let err = pipeline
        .convert(b"junk", "broken.mp3", &request(false, false, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::Transcoder(TranscoderError::Failed(_))));
}

#[tokio::test]
async fn test_artifacts_released_after_success() {
    let artifacts = vec![PathBuf::from("/scratch/a_in.mp3"), PathBuf::from("/scratch/a_mid.wav")];
    let transcoder = PassthroughTranscoder {
        artifacts: artifacts.clone(),
        ..Default::default()
    };
    let pipeline = ConversionPipeline::new(passthrough_engine(transcoder.clone()));

    let input = constant_wav(&AudioConfig::default(), 5);
    pipeline
        .convert(&input, "a.mp3", &request(false, false, 0))
        .await
        .unwrap();

    assert_eq!(transcoder.released(), artifacts);
}

#[tokio::test]
async fn test_artifacts_released_after_decode_failure() {
    let artifacts = vec![PathBuf::from("/scratch/b_mid.wav")];
    let transcoder = PassthroughTranscoder {
        artifacts: artifacts.clone(),
        ..Default::default()
    };
    let pipeline = ConversionPipeline::new(passthrough_engine(transcoder.clone()));

    let err = pipeline
        .convert(b"not a wav at all", "b.mp3", &request(false, false, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::Format(WavFormatError::NotRiffWave)));
    assert_eq!(transcoder.released(), artifacts);
}

#[tokio::test]
async fn test_cleanup_failure_is_not_fatal() {
    let stuck = PathBuf::from("/scratch/c_mid.wav");
    let transcoder = PassthroughTranscoder {
        artifacts: vec![PathBuf::from("/scratch/c_in.ogg"), stuck.clone()],
        stuck_artifacts: vec![stuck.clone()],
        ..Default::default()
    };
    let events = EventBus::new(16);
    let mut rx = events.subscribe();
    let pipeline =
        ConversionPipeline::new(passthrough_engine(transcoder.clone())).with_events(events);

    let input = constant_wav(&AudioConfig::default(), 5);
    let result = pipeline
        .convert(&input, "c.ogg", &request(false, false, 0))
        .await
        .unwrap();

    assert_eq!(result.cleanup_failures.len(), 1);
    assert_eq!(result.cleanup_failures[0].artifact, stuck.display().to_string());
    assert_eq!(transcoder.released().len(), 2);

    match rx.try_recv().unwrap() {
        ConversionEvent::CleanupFailed { file_name, reason, .. } => {
            assert_eq!(file_name, "c.ogg");
            assert_eq!(reason, "permission denied");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_symphonia_engine_normalizes_stereo_48k() {
    let input = tone_wav(&AudioConfig {
        frames: 48_000,
        sample_rate: 48_000,
        channels: 2,
        bits_per_sample: 16,
    });
    let engine = Arc::new(TranscoderEngine::new(
        Box::new(SymphoniaTranscoder::new()),
        Duration::from_secs(15),
    ));
    let pipeline = ConversionPipeline::new(engine);

    let result = pipeline
        .convert(&input, "tone48k.wav", &request(false, true, 64))
        .await
        .unwrap();

    // One second in, one second out
    assert!(
        (44_099..=44_101).contains(&result.input_sample_count),
        "unexpected resampled length {}",
        result.input_sample_count
    );
    assert_eq!(result.output_sample_count, 16_384);

    let out = WavDecoder::decode(&result.audio).unwrap();
    assert_eq!(out.sample_rate, 44100);
    assert_eq!(out.len(), 16_384);
    // Fade-out leaves 1/64 of the tone on the last sample
    assert!(out.samples.last().unwrap().unsigned_abs() < 200);
    assert!(out.samples.iter().any(|&s| s.unsigned_abs() > 5_000));
}

#[tokio::test]
async fn test_symphonia_engine_rejects_garbage() {
    let engine = Arc::new(TranscoderEngine::new(
        Box::new(SymphoniaTranscoder::new()),
        Duration::from_secs(15),
    ));
    let pipeline = ConversionPipeline::new(engine);

    let err = pipeline
        .convert(&[0u8; 512], "noise.mp3", &request(false, false, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::Transcoder(TranscoderError::Failed(_))));
}
