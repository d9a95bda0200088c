//! Conversion parameters shared by the converter and its front ends
//!
//! A wavetable file is `waves × 256` mono 16-bit samples at 44.1kHz. The wave
//! count comes from a fixed menu or the `auto` sentinel.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Samples in one wavetable cycle
pub const SAMPLES_PER_WAVE: usize = 256;

/// Sample rate of every wavetable file (Hz)
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Wave count used when the request says `auto`
pub const AUTO_WAVE_COUNT: NonZeroU32 = match NonZeroU32::new(64) {
    Some(n) => n,
    None => panic!("auto wave count must be non-zero"),
};

/// Wave counts offered to the user
pub const WAVE_COUNT_MENU: &[u32] = &[1, 2, 4, 8, 16, 32, 64, 128, 256];

/// Requested number of waves in the output wavetable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawWaveCount", into = "RawWaveCount")]
pub enum WaveCount {
    /// Let the converter pick (resolves to [`AUTO_WAVE_COUNT`])
    #[default]
    Auto,
    /// Explicit entry from [`WAVE_COUNT_MENU`]
    Fixed(NonZeroU32),
}

impl WaveCount {
    /// Build an explicit wave count, rejecting values outside the menu
    pub fn fixed(count: u32) -> Result<Self> {
        if !WAVE_COUNT_MENU.contains(&count) {
            return Err(Error::InvalidInput(format!(
                "wave count {} is not one of {:?}",
                count, WAVE_COUNT_MENU
            )));
        }
        NonZeroU32::new(count)
            .map(WaveCount::Fixed)
            .ok_or_else(|| Error::InvalidInput("wave count must be positive".to_string()))
    }

    /// Concrete number of waves
    pub fn resolve(&self) -> NonZeroU32 {
        match self {
            WaveCount::Auto => AUTO_WAVE_COUNT,
            WaveCount::Fixed(n) => *n,
        }
    }
}

impl FromStr for WaveCount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(WaveCount::Auto);
        }
        let count: u32 = s
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid wave count: {:?}", s)))?;
        WaveCount::fixed(count)
    }
}

impl fmt::Display for WaveCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaveCount::Auto => write!(f, "auto"),
            WaveCount::Fixed(n) => write!(f, "{}", n),
        }
    }
}

/// TOML accepts both `waves = "auto"` and `waves = 64`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawWaveCount {
    Number(u32),
    Text(String),
}

impl TryFrom<RawWaveCount> for WaveCount {
    type Error = Error;

    fn try_from(raw: RawWaveCount) -> Result<Self> {
        match raw {
            RawWaveCount::Number(n) => WaveCount::fixed(n),
            RawWaveCount::Text(s) => s.parse(),
        }
    }
}

impl From<WaveCount> for RawWaveCount {
    fn from(count: WaveCount) -> Self {
        match count {
            WaveCount::Auto => RawWaveCount::Text("auto".to_string()),
            WaveCount::Fixed(n) => RawWaveCount::Number(n.get()),
        }
    }
}

/// Clamp a user-supplied fade length to a usable sample count
///
/// Negative lengths mean "no fade".
pub fn sanitize_fade_length(value: i64) -> usize {
    usize::try_from(value.max(0)).unwrap_or(usize::MAX)
}

/// Parameters applied to every file of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Number of 256-sample waves in each output file
    pub target_wave_count: NonZeroU32,
    /// Apply a linear fade-in at the start of the wavetable
    pub fade_in: bool,
    /// Apply a linear fade-out at the end of the wavetable
    pub fade_out: bool,
    /// Fade ramp length in samples (clamped to half the output later)
    pub fade_length_samples: usize,
}

impl ConversionRequest {
    pub fn new(waves: WaveCount, fade_in: bool, fade_out: bool, fade_length_samples: usize) -> Self {
        Self {
            target_wave_count: waves.resolve(),
            fade_in,
            fade_out,
            fade_length_samples,
        }
    }

    /// Build a request from a raw wave count (any positive value, no menu check)
    pub fn with_wave_count(
        target_wave_count: u32,
        fade_in: bool,
        fade_out: bool,
        fade_length_samples: usize,
    ) -> Result<Self> {
        let target_wave_count = NonZeroU32::new(target_wave_count)
            .ok_or_else(|| Error::InvalidInput("target wave count must be positive".to_string()))?;
        Ok(Self {
            target_wave_count,
            fade_in,
            fade_out,
            fade_length_samples,
        })
    }

    /// Exact number of samples every output file will hold
    pub fn target_sample_count(&self) -> usize {
        self.target_wave_count.get() as usize * SAMPLES_PER_WAVE
    }
}

impl Default for ConversionRequest {
    fn default() -> Self {
        Self::new(WaveCount::Auto, false, false, 0)
    }
}
