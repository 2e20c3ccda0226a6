//! Notification sinks
//!
//! Every update transition is pushed to a [`NotificationSink`] exactly once.
//! Delivery is best effort: the coordinator logs a failed delivery and moves
//! on, it never retries and never changes state because of it.

#[cfg(feature = "desktop")]
mod window;

#[cfg(test)]
mod tests;

#[cfg(feature = "desktop")]
pub use window::WindowSink;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::update::UpdateEvent;

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Notification channel closed")]
    Closed,

    #[error("Failed to deliver notification: {0}")]
    Delivery(String),
}

/// One-way push channel towards the UI
pub trait NotificationSink: Send + Sync {
    /// Deliver one event
    fn deliver(&self, event: &UpdateEvent) -> Result<(), SinkError>;
}

/// Sink backed by an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UpdateEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes it
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn deliver(&self, event: &UpdateEvent) -> Result<(), SinkError> {
        self.tx.send(event.clone()).map_err(|_| SinkError::Closed)
    }
}

/// Sink that forwards to several sinks.
///
/// All sinks are attempted; the first failure is reported.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    /// Add another sink
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutSink {
    fn deliver(&self, event: &UpdateEvent) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
