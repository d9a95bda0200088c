//! Audio Test Fixture Generator
//!
//! Builds WAV fixtures with hound, in memory or on disk

use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub frames: usize,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frames: 20_000,
            sample_rate: 44100,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

fn spec(config: &AudioConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: config.bits_per_sample,
        sample_format: hound::SampleFormat::Int,
    }
}

/// 440 Hz tone at 30% amplitude, same signal on every channel
pub fn tone_wav(config: &AudioConfig) -> Vec<u8> {
    write_wav(config, |i| {
        let t = i as f32 / config.sample_rate as f32;
        (0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * i16::MAX as f32) as i16
    })
}

/// Every sample set to `value`
pub fn constant_wav(config: &AudioConfig, value: i16) -> Vec<u8> {
    write_wav(config, |_| value)
}

/// Sample `i` holds `i` (wrapping), so any slice of the output can be located
pub fn ramp_wav(config: &AudioConfig) -> Vec<u8> {
    write_wav(config, |i| i as i16)
}

/// Write a tone fixture to `path`
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<PathBuf> {
    std::fs::write(path, tone_wav(config))?;
    Ok(path.to_path_buf())
}

fn write_wav(config: &AudioConfig, sample_at: impl Fn(usize) -> i16) -> Vec<u8> {
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec(config))
            .expect("Failed to create WAV writer");
        for i in 0..config.frames {
            let sample = sample_at(i);
            for _ in 0..config.channels {
                if config.bits_per_sample == 16 {
                    writer.write_sample(sample).expect("Failed to write sample");
                } else {
                    writer
                        .write_sample(sample as i32)
                        .expect("Failed to write sample");
                }
            }
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    bytes
}
