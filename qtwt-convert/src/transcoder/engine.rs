//! Shared transcoder engine handle
//!
//! The engine is loaded lazily on first use, under a timeout, and the load is
//! attempted at most once. State machine:
//!
//! ```text
//! Uninitialized ──> Loading ──> Ready
//!                          └──> Failed (terminal, never retried)
//! ```
//!
//! A load whose caller went away before it finished leaves `Loading` behind;
//! the next call turns that into `Failed` instead of loading again.
//!
//! All transcodes go through a single gate, so at most one conversion is in
//! flight at a time.

use super::{TranscodeOutput, TranscodeParams, Transcoder};
use crate::error::{CleanupError, TranscoderError};
use chrono::Utc;
use qtwt_common::events::{ConversionEvent, EventBus};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info};

/// Engine lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Loading,
    Ready,
    /// Load failed or timed out; carries the reason
    Failed(String),
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "uninitialized"),
            EngineState::Loading => write!(f, "loading"),
            EngineState::Ready => write!(f, "ready"),
            EngineState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Singleton wrapper around a [`Transcoder`]
pub struct TranscoderEngine {
    transcoder: Box<dyn Transcoder>,
    state: Mutex<EngineState>,
    /// Held for the duration of a load or a transcode
    gate: tokio::sync::Mutex<()>,
    load_timeout: Duration,
    events: Option<EventBus>,
}

impl TranscoderEngine {
    pub fn new(transcoder: Box<dyn Transcoder>, load_timeout: Duration) -> Self {
        Self {
            transcoder,
            state: Mutex::new(EngineState::Uninitialized),
            gate: tokio::sync::Mutex::new(()),
            load_timeout,
            events: None,
        }
    }

    /// Report state changes on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &'static str {
        self.transcoder.name()
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }

    pub fn state(&self) -> EngineState {
        self.lock_state().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.lock_state() == EngineState::Ready
    }

    /// Load the engine if that has not been attempted yet
    ///
    /// Returns the original error on the attempt that failed and
    /// [`TranscoderError::Unavailable`] on every later call.
    pub async fn initialize(&self) -> Result<(), TranscoderError> {
        let _gate = self.gate.lock().await;
        self.ensure_loaded().await
    }

    /// Normalize one input, loading the engine first if needed
    pub async fn transcode(
        &self,
        input: &[u8],
        file_name_hint: &str,
        params: &TranscodeParams,
    ) -> Result<TranscodeOutput, TranscoderError> {
        let _gate = self.gate.lock().await;
        self.ensure_loaded().await?;

        debug!(
            engine = self.name(),
            file = %file_name_hint,
            input_bytes = input.len(),
            "Transcoding"
        );
        self.transcoder.transcode(input, file_name_hint, params).await
    }

    /// Release a temporary artifact left by a transcode
    pub async fn release(&self, artifact: &Path) -> Result<(), CleanupError> {
        self.transcoder.release(artifact).await
    }

    /// Caller must hold `gate`
    async fn ensure_loaded(&self) -> Result<(), TranscoderError> {
        match self.state() {
            EngineState::Ready => return Ok(()),
            EngineState::Failed(reason) => return Err(TranscoderError::Unavailable(reason)),
            EngineState::Loading => {
                let reason = "engine load was interrupted".to_string();
                error!(engine = self.name(), "{}", reason);
                self.set_state(EngineState::Failed(reason.clone()));
                return Err(TranscoderError::Unavailable(reason));
            }
            EngineState::Uninitialized => {}
        }

        self.set_state(EngineState::Loading);
        info!(
            engine = self.name(),
            timeout_secs = self.load_timeout.as_secs_f64(),
            "Loading transcoder engine"
        );

        let outcome = match tokio::time::timeout(self.load_timeout, self.transcoder.load()).await {
            Ok(result) => result,
            Err(_) => Err(TranscoderError::Timeout(self.load_timeout)),
        };

        match &outcome {
            Ok(()) => {
                info!(engine = self.name(), "Transcoder engine ready");
                self.set_state(EngineState::Ready);
            }
            Err(e) => {
                error!(engine = self.name(), error = %e, "Transcoder engine failed to load");
                self.set_state(EngineState::Failed(e.to_string()));
            }
        }

        outcome
    }

    fn set_state(&self, state: EngineState) {
        let label = state.to_string();
        *self.lock_state() = state;

        if let Some(events) = &self.events {
            events.emit_lossy(ConversionEvent::EngineStateChanged {
                engine: self.name().to_string(),
                state: label,
                timestamp: Utc::now(),
            });
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
