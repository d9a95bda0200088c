//! Wavetable layout helpers
//!
//! A wavetable is a run of 256-sample single-cycle waves. The synth picks
//! `waves[i]` by index, so a file whose length is not a multiple of 256 has a
//! partial last wave that will never be played correctly.

use crate::audio::types::AudioBuffer;
use qtwt_common::params::{SAMPLES_PER_WAVE, TARGET_SAMPLE_RATE};
use serde::Serialize;

/// Iterate over the complete waves of a sample sequence
pub fn waves(samples: &[i16]) -> std::slice::ChunksExact<'_, i16> {
    samples.chunks_exact(SAMPLES_PER_WAVE)
}

/// Shape of a decoded wavetable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WavetableSummary {
    pub sample_rate: u32,
    pub sample_count: usize,
    /// Number of complete 256-sample waves
    pub wave_count: usize,
    /// Samples left over after the last complete wave
    pub remainder: usize,
    /// Peak absolute amplitude of each complete wave
    pub wave_peaks: Vec<u16>,
}

impl WavetableSummary {
    pub fn from_buffer(buffer: &AudioBuffer) -> Self {
        let wave_peaks = waves(&buffer.samples)
            .map(|wave| wave.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0))
            .collect::<Vec<_>>();

        Self {
            sample_rate: buffer.sample_rate,
            sample_count: buffer.samples.len(),
            wave_count: wave_peaks.len(),
            remainder: buffer.samples.len() % SAMPLES_PER_WAVE,
            wave_peaks,
        }
    }

    /// Whole number of waves at the synth's sample rate
    pub fn is_well_formed(&self) -> bool {
        self.remainder == 0 && self.wave_count > 0 && self.sample_rate == TARGET_SAMPLE_RATE
    }

    /// Waves that are completely silent
    pub fn silent_waves(&self) -> usize {
        self.wave_peaks.iter().filter(|&&peak| peak == 0).count()
    }
}
