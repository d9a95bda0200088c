//! Test Helper Utilities
//!
//! Shared utilities for testing qtwt-convert

#![allow(dead_code)]

pub mod audio_generator;
pub mod mock_transcoder;

pub use audio_generator::{constant_wav, generate_test_wav, ramp_wav, tone_wav, AudioConfig};
pub use mock_transcoder::{passthrough_engine, PassthroughTranscoder};
