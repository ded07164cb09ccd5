//! Progress reporting
//!
//! Orchestrators emit an ordered stream of [`StatusEvent`]s through a
//! [`StatusSink`]. The channel is unbounded: emitting never waits on the
//! consumer, and a consumer that went away is ignored. Every event is mirrored
//! into `tracing` at the matching level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// One human-readable progress message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub level: StatusLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Receiving half of a status channel
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

/// Sending half of a status channel
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl StatusSink {
    /// Create a connected sink/receiver pair
    pub fn channel() -> (Self, StatusReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that only logs
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn info(&self, message: impl Into<String>) -> StatusEvent {
        self.emit(StatusLevel::Info, message)
    }

    pub fn warn(&self, message: impl Into<String>) -> StatusEvent {
        self.emit(StatusLevel::Warn, message)
    }

    pub fn error(&self, message: impl Into<String>) -> StatusEvent {
        self.emit(StatusLevel::Error, message)
    }

    /// Log and publish one event, returning it for the caller's own trace
    pub fn emit(&self, level: StatusLevel, message: impl Into<String>) -> StatusEvent {
        let event = StatusEvent {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        };

        match level {
            StatusLevel::Info => info!("{}", event.message),
            StatusLevel::Warn => warn!("{}", event.message),
            StatusLevel::Error => error!("{}", event.message),
        }

        if let Some(tx) = &self.tx {
            let _ = tx.send(event.clone());
        }
        event
    }
}

/// A sink that also keeps its own copy of everything it emitted.
///
/// Orchestrators use this to build the trace returned in their outcome.
#[derive(Debug)]
pub struct Recorder {
    sink: StatusSink,
    trace: Vec<StatusEvent>,
}

impl Recorder {
    pub fn new(sink: StatusSink) -> Self {
        Self {
            sink,
            trace: Vec::new(),
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let event = self.sink.info(message);
        self.trace.push(event);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let event = self.sink.warn(message);
        self.trace.push(event);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let event = self.sink.error(message);
        self.trace.push(event);
    }

    pub fn into_trace(self) -> Vec<StatusEvent> {
        self.trace
    }
}
