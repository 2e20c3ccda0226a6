//! Update lifecycle state
//!
//! [`UpdateStateStore`] holds the single canonical [`UpdateState`] record and
//! the transition function that mutates it. It performs no I/O, so every
//! transition can be exercised directly in tests.

use serde::{Deserialize, Serialize};

use super::event::{UpdateEvent, UpdateEventKind, UpdateMetadata, UpdatePayload};

/// The process-wide update record, as handed to late subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateState {
    /// Most recent transition
    pub last_event: UpdateEvent,
    /// True while a check is outstanding
    pub check_requested: bool,
    /// Set once an update is known to be available
    pub available: Option<UpdateMetadata>,
    /// True once the download completed
    pub ready_to_install: bool,
    pub download_in_progress: bool,
    /// Download percentage (0-100)
    pub download_percent: f64,
}

impl UpdateState {
    /// Initial record: `disabled` in development builds, `idle` otherwise
    pub fn initial(dev_mode: bool) -> Self {
        Self {
            last_event: if dev_mode {
                UpdateEvent::disabled()
            } else {
                UpdateEvent::idle()
            },
            check_requested: false,
            available: None,
            ready_to_install: false,
            download_in_progress: false,
            download_percent: 0.0,
        }
    }

    /// Whether a check or a download is currently running
    pub fn is_in_flight(&self) -> bool {
        self.check_requested || self.download_in_progress
    }
}

/// Lifecycle phase derived from the update record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdatePhase {
    Disabled,
    Idle,
    Checking,
    Available,
    Downloading,
    ReadyToInstall,
    Installing,
    Error,
}

impl UpdatePhase {
    /// Check if the phase has an operation running at the backend
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UpdatePhase::Checking | UpdatePhase::Downloading)
    }
}

/// Owner of the update record and its transition rules
#[derive(Debug, Clone)]
pub struct UpdateStateStore {
    state: UpdateState,
    disabled: bool,
}

impl UpdateStateStore {
    /// Create the store for a development (`disabled`) or packaged build
    pub fn new(dev_mode: bool) -> Self {
        Self {
            state: UpdateState::initial(dev_mode),
            disabled: dev_mode,
        }
    }

    /// Current record
    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    /// Owned copy of the current record
    pub fn snapshot(&self) -> UpdateState {
        self.state.clone()
    }

    /// Whether updates are disabled for this process
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Apply a lifecycle event and return it unchanged.
    ///
    /// `downloadPercent` never decreases inside one download attempt and
    /// stays within 0..=100; only `available`, `not-available` and
    /// `downloaded` move it otherwise.
    pub fn apply(&mut self, kind: UpdateEventKind, payload: Option<UpdatePayload>) -> UpdateEvent {
        let state = &mut self.state;
        match kind {
            UpdateEventKind::Checking => {
                state.check_requested = true;
            }
            UpdateEventKind::Available => {
                state.check_requested = false;
                state.available = Some(
                    payload
                        .as_ref()
                        .and_then(UpdatePayload::as_metadata)
                        .cloned()
                        .unwrap_or_default(),
                );
                state.ready_to_install = false;
                state.download_in_progress = false;
                state.download_percent = 0.0;
            }
            UpdateEventKind::NotAvailable => {
                state.check_requested = false;
                state.available = None;
                state.ready_to_install = false;
                state.download_in_progress = false;
                state.download_percent = 0.0;
            }
            UpdateEventKind::Progress => {
                state.download_in_progress = true;
                if let Some(percent) = payload.as_ref().and_then(UpdatePayload::percent) {
                    state.download_percent = percent.clamp(0.0, 100.0).max(state.download_percent);
                }
            }
            UpdateEventKind::Downloaded => {
                state.check_requested = false;
                state.ready_to_install = true;
                state.download_in_progress = false;
                state.download_percent = 100.0;
            }
            UpdateEventKind::Installing => {
                state.ready_to_install = false;
                state.download_in_progress = false;
                state.available = None;
            }
            UpdateEventKind::Error => {
                state.check_requested = false;
                state.download_in_progress = false;
            }
            UpdateEventKind::Disabled | UpdateEventKind::Idle | UpdateEventKind::Warning => {}
        }

        let event = UpdateEvent::new(kind, payload);
        state.last_event = event.clone();
        event
    }

    /// Record that a check was issued to the backend
    pub fn mark_check_requested(&mut self) {
        self.state.check_requested = true;
    }

    /// Clear the outstanding check after the backend call failed
    pub fn abort_check(&mut self) {
        self.state.check_requested = false;
    }

    /// Clear the running download after the backend call failed
    pub fn abort_download(&mut self) {
        self.state.download_in_progress = false;
    }

    /// Derive the lifecycle phase from the record
    pub fn phase(&self) -> UpdatePhase {
        let state = &self.state;
        if self.disabled || state.last_event.kind == UpdateEventKind::Disabled {
            return UpdatePhase::Disabled;
        }
        if state.last_event.kind == UpdateEventKind::Installing {
            return UpdatePhase::Installing;
        }
        if state.download_in_progress {
            UpdatePhase::Downloading
        } else if state.check_requested {
            UpdatePhase::Checking
        } else if state.ready_to_install {
            UpdatePhase::ReadyToInstall
        } else if state.last_event.kind == UpdateEventKind::Error {
            UpdatePhase::Error
        } else if state.available.is_some() {
            UpdatePhase::Available
        } else {
            UpdatePhase::Idle
        }
    }
}
