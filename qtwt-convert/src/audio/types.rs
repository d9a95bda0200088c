//! Core audio data types
//!
//! Every stage of the conversion pipeline consumes an [`AudioBuffer`] and
//! produces a new one; nothing is mutated in place.

/// Mono 16-bit linear PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// PCM samples, one per frame (mono)
    pub samples: Vec<i16>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, samples: Vec<i16>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Number of samples (frames, since the buffer is mono)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Get duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Fields of a WAV `fmt ` chunk needed for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormatDescriptor {
    /// 1 = linear PCM
    pub audio_format_tag: u16,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavFormatDescriptor {
    /// Minimum `fmt ` body length holding every field read here
    pub const MIN_BODY_LEN: usize = 16;

    /// Parse from a `fmt ` chunk body
    ///
    /// Returns `None` when the body is too short to hold the fields.
    pub fn parse(body: &[u8]) -> Option<Self> {
        if body.len() < Self::MIN_BODY_LEN {
            return None;
        }
        Some(Self {
            audio_format_tag: u16::from_le_bytes([body[0], body[1]]),
            channel_count: u16::from_le_bytes([body[2], body[3]]),
            sample_rate: u32::from_le_bytes([body[4], body[5], body[6], body[7]]),
            bits_per_sample: u16::from_le_bytes([body[14], body[15]]),
        })
    }
}
