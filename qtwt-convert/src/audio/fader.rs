//! Linear fade-in / fade-out envelopes
//!
//! The fade length is clamped to half the buffer so the two ramps never
//! overlap. Gains are linear:
//! - fade-in: sample `i` of the first `n` is scaled by `i / n`
//! - fade-out: sample `len - n + i` is scaled by `1 - i / n`
//!
//! so the first sample of a fade-in is silenced and the last sample of a
//! fade-out keeps `1 / n` of its amplitude. Scaled values truncate toward zero.

/// Applies linear gain ramps to the ends of a sample sequence
pub struct FadeProcessor;

impl FadeProcessor {
    /// Return a faded copy of `samples`; the input is left untouched
    pub fn fade(samples: &[i16], fade_in: bool, fade_out: bool, fade_length: usize) -> Vec<i16> {
        let mut out = samples.to_vec();

        let n = Self::effective_length(samples.len(), fade_length);
        if n == 0 {
            return out;
        }

        if fade_in {
            for (i, sample) in out[..n].iter_mut().enumerate() {
                *sample = Self::scale(*sample, Self::fade_in_gain(i, n));
            }
        }

        if fade_out {
            let start = out.len() - n;
            for (i, sample) in out[start..].iter_mut().enumerate() {
                *sample = Self::scale(*sample, Self::fade_out_gain(i, n));
            }
        }

        out
    }

    /// Fade length actually applied to a buffer of `len` samples
    pub fn effective_length(len: usize, fade_length: usize) -> usize {
        fade_length.min(len / 2)
    }

    fn fade_in_gain(i: usize, n: usize) -> f64 {
        i as f64 / n as f64
    }

    fn fade_out_gain(i: usize, n: usize) -> f64 {
        1.0 - i as f64 / n as f64
    }

    /// Multiply and truncate toward zero (gain is within [0, 1])
    fn scale(sample: i16, gain: f64) -> i16 {
        (sample as f64 * gain) as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, value: i16) -> Vec<i16> {
        vec![value; len]
    }

    #[test]
    fn test_no_flags_is_identity() {
        let samples: Vec<i16> = (0..100).map(|i| (i * 300) as i16).collect();
        assert_eq!(FadeProcessor::fade(&samples, false, false, 40), samples);
    }

    #[test]
    fn test_zero_length_is_identity() {
        let samples = ramp(64, 1000);
        assert_eq!(FadeProcessor::fade(&samples, true, true, 0), samples);
    }

    #[test]
    fn test_fade_in_boundaries() {
        let samples = ramp(1000, 10_000);
        let faded = FadeProcessor::fade(&samples, true, false, 100);

        assert_eq!(faded[0], 0);
        assert_eq!(faded[50], 5_000);
        assert_eq!(faded[99], 9_900);
        assert_eq!(faded[100], 10_000);
        assert_eq!(&faded[100..], &samples[100..]);
    }

    #[test]
    fn test_fade_out_mirrors_fade_in() {
        let samples = ramp(1000, 10_000);
        let faded = FadeProcessor::fade(&samples, false, true, 100);

        assert_eq!(&faded[..900], &samples[..900]);
        assert_eq!(faded[900], 10_000);
        assert_eq!(faded[950], 5_000);
        assert_eq!(faded[999], 100);
    }

    #[test]
    fn test_fade_out_tail_when_fade_equals_half() {
        let samples = ramp(10, 8_000);
        let faded = FadeProcessor::fade(&samples, false, true, 5);
        // gains for the tail: 1, 0.8, 0.6, 0.4, 0.2 (1 - 4/5 is just under 0.2)
        assert_eq!(&faded[5..], &[8_000, 6_400, 4_800, 3_200, 1_599]);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let samples = vec![7i16, 7, 7, -7, -7, -7];
        let faded = FadeProcessor::fade(&samples, true, false, 3);
        // 7 * 1/3 = 2.33 -> 2, 7 * 2/3 = 4.67 -> 4
        assert_eq!(&faded[..3], &[0, 2, 4]);

        let faded = FadeProcessor::fade(&samples, false, true, 3);
        // -7 * 1 = -7, -7 * 2/3 = -4.67 -> -4, -7 * 1/3 = -2.33 -> -2
        assert_eq!(&faded[3..], &[-7, -4, -2]);
    }

    #[test]
    fn test_length_clamped_to_half() {
        let samples: Vec<i16> = (0..11).map(|i| 1000 + i as i16).collect();
        let clamped = FadeProcessor::fade(&samples, true, true, 1_000);
        let explicit = FadeProcessor::fade(&samples, true, true, 11 / 2);
        assert_eq!(clamped, explicit);
        assert_eq!(FadeProcessor::effective_length(11, 1_000), 5);
    }

    #[test]
    fn test_both_fades_do_not_overlap() {
        let samples = ramp(8, 4_000);
        let faded = FadeProcessor::fade(&samples, true, true, 4);
        assert_eq!(faded, vec![0, 1_000, 2_000, 3_000, 4_000, 3_000, 2_000, 1_000]);
    }

    #[test]
    fn test_single_sample_buffer_untouched() {
        assert_eq!(FadeProcessor::fade(&[123], true, true, 10), vec![123]);
        assert!(FadeProcessor::fade(&[], true, true, 10).is_empty());
    }

    #[test]
    fn test_input_not_modified() {
        let samples = ramp(20, 500);
        let _ = FadeProcessor::fade(&samples, true, true, 10);
        assert!(samples.iter().all(|&s| s == 500));
    }
}
