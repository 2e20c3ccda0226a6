//! Sink pushing update events to every open webview

use tauri::{AppHandle, Manager};

use super::{NotificationSink, SinkError};
use crate::update::{UpdateEvent, UPDATE_EVENT_CHANNEL};

/// Emits each event on the `auto-updater-message` channel of all windows
#[derive(Clone)]
pub struct WindowSink {
    app: AppHandle,
}

impl WindowSink {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl NotificationSink for WindowSink {
    fn deliver(&self, event: &UpdateEvent) -> Result<(), SinkError> {
        self.app
            .emit_all(UPDATE_EVENT_CHANNEL, event)
            .map_err(|e| SinkError::Delivery(e.to_string()))
    }
}
