//! Audio data types and the sample-level pipeline stages
//!
//! WAV decode and encode, exact-length fitting, fades, and wavetable layout.

pub mod fader;
pub mod fitter;
pub mod types;
pub mod wav_decoder;
pub mod wav_encoder;
pub mod wavetable;

pub use fader::FadeProcessor;
pub use fitter::SampleFitter;
pub use types::{AudioBuffer, WavFormatDescriptor};
pub use wav_decoder::WavDecoder;
pub use wav_encoder::WavEncoder;
pub use wavetable::WavetableSummary;
