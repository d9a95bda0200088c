//! Progress events for the conversion workflow
//!
//! Events are broadcast on an [`EventBus`] so front ends can render progress
//! without the batch controller knowing who listens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Conversion workflow events
///
/// Positions (`position`) are 1-based, matching what is shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversionEvent {
    /// A batch run started
    BatchStarted {
        total_files: usize,
        target_wave_count: u32,
        target_sample_count: usize,
        fade_in: bool,
        fade_out: bool,
        fade_length_samples: usize,
        timestamp: DateTime<Utc>,
    },

    /// A file entered the pipeline
    FileStarted {
        position: usize,
        total_files: usize,
        file_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A file was converted successfully
    FileConverted {
        position: usize,
        total_files: usize,
        file_name: String,
        output_name: String,
        input_sample_count: usize,
        output_sample_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A file failed; the batch stops here
    FileFailed {
        position: usize,
        total_files: usize,
        file_name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A temporary transcoder artifact could not be released (non-fatal)
    CleanupFailed {
        file_name: String,
        artifact: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The transcoder engine changed state
    EngineStateChanged {
        engine: String,
        state: String,
        timestamp: DateTime<Utc>,
    },

    /// A batch run ended (successfully or at the first failure)
    BatchCompleted {
        converted: usize,
        total_files: usize,
        failed: bool,
        timestamp: DateTime<Utc>,
    },
}

impl ConversionEvent {
    /// Event type name (matches the serialized `type` tag)
    pub fn event_type(&self) -> &'static str {
        match self {
            ConversionEvent::BatchStarted { .. } => "BatchStarted",
            ConversionEvent::FileStarted { .. } => "FileStarted",
            ConversionEvent::FileConverted { .. } => "FileConverted",
            ConversionEvent::FileFailed { .. } => "FileFailed",
            ConversionEvent::CleanupFailed { .. } => "CleanupFailed",
            ConversionEvent::EngineStateChanged { .. } => "EngineStateChanged",
            ConversionEvent::BatchCompleted { .. } => "BatchCompleted",
        }
    }

    /// Serialize as a single JSON line
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Broadcast channel for [`ConversionEvent`]s
///
/// Cloning the bus shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ConversionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ConversionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ConversionEvent,
    ) -> Result<usize, broadcast::error::SendError<ConversionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ConversionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_started(position: usize) -> ConversionEvent {
        ConversionEvent::FileStarted {
            position,
            total_files: 3,
            file_name: format!("file{}.wav", position),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(file_started(1)).expect("emit should succeed");

        let received = rx.try_recv().expect("Should receive event");
        assert_eq!(received.event_type(), "FileStarted");
    }

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(10);
        assert!(bus.emit(file_started(1)).is_err());
        // lossy variant is fine with nobody listening
        bus.emit_lossy(file_started(2));
    }

    #[test]
    fn test_eventbus_emit_lossy_full_channel() {
        let bus = EventBus::new(2);
        let _rx = bus.subscribe();
        for i in 0..10 {
            bus.emit_lossy(file_started(i));
        }
        assert_eq!(bus.capacity(), 2);
    }

    #[test]
    fn test_clone_shares_channel() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let clone = bus.clone();
        clone.emit_lossy(file_started(2));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_json_tag_matches_event_type() {
        let event = ConversionEvent::BatchCompleted {
            converted: 2,
            total_files: 3,
            failed: true,
            timestamp: Utc::now(),
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"BatchCompleted\""));
        assert!(json.contains("\"failed\":true"));

        let parsed: ConversionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type(), event.event_type());
    }
}
