//! # QT Py Wavetable Common Library
//!
//! Shared code for the wavetable converter crates:
//! - Error type and result alias
//! - Configuration loading and priority resolution
//! - Conversion parameters (wave count menu, fade settings)
//! - Output file naming
//! - Progress events and the event bus

pub mod config;
pub mod error;
pub mod events;
pub mod naming;
pub mod params;

pub use error::{Error, Result};
pub use events::{ConversionEvent, EventBus};
pub use params::{ConversionRequest, WaveCount};
