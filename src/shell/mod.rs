//! Desktop windows
//!
//! The shell has two windows: `boot`, a local page shown while the startup
//! update check runs, and `main`, the remote web application, created hidden
//! and shown once the boot screen reveals it.

use tauri::{AppHandle, Manager, Window, WindowBuilder, WindowUrl};

use crate::boot::BootSurface;
use crate::update::{UpdateHandle, UPDATE_EVENT_CHANNEL};

/// Label of the remote application window
pub const MAIN_WINDOW: &str = "main";

/// Label of the boot screen window
pub const BOOT_WINDOW: &str = "boot";

/// Boot window event carrying the status line
pub const BOOT_STATUS_EVENT: &str = "boot-status";

/// Boot window event carrying the rendered status log
pub const BOOT_LOG_EVENT: &str = "boot-log";

/// Boot window event carrying the progress bar value, `null` to hide it
pub const BOOT_PROGRESS_EVENT: &str = "boot-progress";

/// Create the hidden main window pointing at `remote_origin`
pub fn create_main_window(app: &AppHandle, remote_origin: &str) -> anyhow::Result<Window> {
    let url: reqwest::Url = remote_origin.parse()?;
    let window = WindowBuilder::new(app, MAIN_WINDOW, WindowUrl::External(url))
        .title("Clovord")
        .inner_size(1280.0, 800.0)
        .min_inner_size(960.0, 600.0)
        .visible(false)
        .build()?;
    Ok(window)
}

/// Push the current `lastEvent` to a window that just finished loading
pub fn replay_last_event(window: Window) {
    let Some(updates) = window.try_state::<UpdateHandle>() else {
        return;
    };
    let updates = updates.inner().clone();

    tauri::async_runtime::spawn(async move {
        match updates.snapshot().await {
            Ok(state) => {
                if let Err(e) = window.emit(UPDATE_EVENT_CHANNEL, &state.last_event) {
                    tracing::debug!(window = window.label(), "Failed to replay update state: {}", e);
                }
            }
            Err(e) => tracing::debug!("Update state unavailable for replay: {}", e),
        }
    });
}

/// [`BootSurface`] rendering into the boot window
pub struct WindowSurface {
    app: AppHandle,
}

impl WindowSurface {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn emit_boot<P: serde::Serialize + Clone>(&self, event: &str, payload: P) {
        let Some(window) = self.app.get_window(BOOT_WINDOW) else {
            return;
        };
        if let Err(e) = window.emit(event, payload) {
            tracing::debug!("Failed to update boot window ({}): {}", event, e);
        }
    }
}

impl BootSurface for WindowSurface {
    fn set_status(&self, text: &str) {
        self.emit_boot(BOOT_STATUS_EVENT, text.to_string());
    }

    fn set_log(&self, text: &str) {
        self.emit_boot(BOOT_LOG_EVENT, text.to_string());
    }

    fn show_progress(&self, percent: u8) {
        self.emit_boot(BOOT_PROGRESS_EVENT, Some(percent));
    }

    fn clear_progress(&self) {
        self.emit_boot(BOOT_PROGRESS_EVENT, None::<u8>);
    }

    fn reveal(&self) {
        match self.app.get_window(MAIN_WINDOW) {
            Some(main) => {
                if let Err(e) = main.show().and_then(|_| main.set_focus()) {
                    tracing::warn!("Failed to show the main window: {}", e);
                }
            }
            None => tracing::warn!("Main window missing at reveal"),
        }

        if let Some(boot) = self.app.get_window(BOOT_WINDOW) {
            if let Err(e) = boot.close() {
                tracing::debug!("Failed to close the boot window: {}", e);
            }
        }
        tracing::info!("Boot screen dismissed");
    }
}
