//! # QT Py Wavetable Converter (qtwt-convert)
//!
//! Turns arbitrary audio files into fixed-size wavetable WAV files for the
//! QT Py synth: `waves × 256` mono 16-bit samples at 44.1 kHz.
//!
//! **Pipeline:** transcoder (symphonia or ffmpeg) → WAV decode → exact-length
//! fit → linear fades → WAV encode, driven sequentially over a batch of files.
//! Multi-file batches can be bundled into one zip archive.

pub mod audio;
pub mod batch;
pub mod bundle;
pub mod error;
pub mod pipeline;
pub mod transcoder;

pub use batch::{BatchController, BatchError, BatchFailure, BatchJob, InputFile};
pub use bundle::{ArchiveBundler, ZipBundler};
pub use error::{ConversionError, Result};
pub use pipeline::{ConversionPipeline, ConversionResult};
pub use transcoder::{Transcoder, TranscoderEngine};
