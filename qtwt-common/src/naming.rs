//! Output file naming
//!
//! Wavetable files are named `<base>_qtpy_<waves>x256.wav`, where `<base>` is the
//! input file name with its extension removed and every character outside
//! `[A-Za-z0-9_.-]` replaced by `_`.

use crate::params::SAMPLES_PER_WAVE;
use std::num::NonZeroU32;

/// Longest base name kept in output file names (characters)
pub const MAX_BASE_NAME_LEN: usize = 80;

/// Base name used when nothing usable is left of the input name
pub const FALLBACK_BASE_NAME: &str = "converted";

/// Strip the final `.ext` (one or more non-dot characters after the last dot)
fn strip_extension(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx + 1 < file_name.len() => &file_name[..idx],
        _ => file_name,
    }
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Derive a filesystem-safe base name from an input file name
pub fn sanitize_base_name(file_name: &str) -> String {
    let base: String = strip_extension(file_name)
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .take(MAX_BASE_NAME_LEN)
        .collect();

    if base.is_empty() {
        FALLBACK_BASE_NAME.to_string()
    } else {
        base
    }
}

/// Name of the wavetable produced for `base` with `waves` waves
pub fn output_file_name(base: &str, waves: NonZeroU32) -> String {
    format!("{}_qtpy_{}x{}.wav", base, waves, SAMPLES_PER_WAVE)
}
