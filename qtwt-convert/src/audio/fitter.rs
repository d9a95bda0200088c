//! Exact-length fitting of a sample sequence
//!
//! Longer input is cut (the tail is discarded), shorter input is zero-padded at
//! the end. No resampling happens here; rate conversion is the transcoder's job.

/// Trims or zero-pads samples to an exact length
pub struct SampleFitter;

impl SampleFitter {
    /// Return a new sequence of exactly `target_len` samples
    pub fn fit(samples: &[i16], target_len: usize) -> Vec<i16> {
        let keep = samples.len().min(target_len);
        let mut out = Vec::with_capacity(target_len);
        out.extend_from_slice(&samples[..keep]);
        out.resize(target_len, 0);
        out
    }
}
