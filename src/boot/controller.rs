//! Boot screen state machine
//!
//! [`BootController`] is pure: it turns update events and command results
//! into [`BootAction`]s and never touches a window or a timer itself.

use std::time::Duration;

use crate::update::{CommandResult, ReasonCode, UpdateEvent, UpdateEventKind, UpdatePayload, UpdateState};

/// Reveal delay after `disabled`
pub const REVEAL_DISABLED: Duration = Duration::from_millis(400);
/// Reveal delay after `idle`
pub const REVEAL_IDLE: Duration = Duration::from_millis(600);
/// Reveal delay after `not-available`
pub const REVEAL_UP_TO_DATE: Duration = Duration::from_millis(800);
/// Reveal delay after an error or a refused request
pub const REVEAL_AFTER_ERROR: Duration = Duration::from_millis(1500);
/// Reveal delay after a failed install request
pub const REVEAL_AFTER_INSTALL_FAILURE: Duration = Duration::from_millis(2000);

/// Minimum percentage step between two progress log lines
const PROGRESS_LOG_STEP: i64 = 5;

/// Something the boot screen should do
#[derive(Debug, Clone, PartialEq)]
pub enum BootAction {
    /// Replace the headline status text
    Status(String),
    /// Append a line to the status log
    Log(String),
    /// Show the progress bar at the given percentage
    Progress(u8),
    /// Hide and reset the progress bar
    ClearProgress,
    /// Reveal the application after the delay, replacing any pending reveal
    Reveal(Duration),
    /// Ask the coordinator to download the available update
    StartDownload,
    /// Ask the coordinator to install the downloaded update
    StartInstall,
    /// Ask the coordinator for an update check
    TriggerCheck,
}

/// What the boot screen believes about the update
#[derive(Debug, Clone, Default)]
struct UpdateView {
    available: bool,
    ready: bool,
    downloading: bool,
    percent: f64,
    download_requested: bool,
    install_requested: bool,
}

/// Boot screen logic
#[derive(Debug, Default)]
pub struct BootController {
    view: UpdateView,
    last_logged_progress: Option<i64>,
    download_in_flight: bool,
    install_in_flight: bool,
}

impl BootController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an automatic download request is outstanding
    pub fn download_in_flight(&self) -> bool {
        self.download_in_flight
    }

    /// Whether an install request is outstanding
    pub fn install_in_flight(&self) -> bool {
        self.install_in_flight
    }

    /// React to a pushed update event
    pub fn on_event(&mut self, event: &UpdateEvent) -> Vec<BootAction> {
        let mut actions = Vec::new();

        match event.kind {
            UpdateEventKind::Disabled => {
                self.reset_view();
                actions.push(BootAction::ClearProgress);
                actions.push(BootAction::Status(
                    "Auto-updater disabled (development build).".to_string(),
                ));
                actions.push(BootAction::Log(
                    "Auto-updater disabled (development build).".to_string(),
                ));
                actions.push(BootAction::Reveal(REVEAL_DISABLED));
            }
            UpdateEventKind::Idle => {
                self.reset_view();
                actions.push(BootAction::ClearProgress);
                actions.push(BootAction::Status("Updater ready.".to_string()));
                actions.push(BootAction::Log("Auto-updater ready.".to_string()));
                actions.push(BootAction::Reveal(REVEAL_IDLE));
            }
            UpdateEventKind::Checking => {
                actions.push(BootAction::Status("Checking for updates…".to_string()));
                actions.push(BootAction::Log("Checking for updates...".to_string()));
            }
            UpdateEventKind::Available => {
                self.view = UpdateView {
                    available: true,
                    ..UpdateView::default()
                };
                self.last_logged_progress = None;
                actions.push(BootAction::ClearProgress);
                actions.push(BootAction::Status(
                    "Update available. Starting download…".to_string(),
                ));
                actions.push(BootAction::Log(
                    "Update available. Starting automatic download.".to_string(),
                ));
                self.start_download(&mut actions);
            }
            UpdateEventKind::Progress => {
                self.view.available = true;
                self.view.downloading = true;
                match event.payload.as_ref().and_then(UpdatePayload::percent) {
                    Some(percent) => {
                        self.view.percent = percent;
                        actions.push(BootAction::Progress(round_percent(percent)));
                        let rounded = percent.floor() as i64;
                        let due = self
                            .last_logged_progress
                            .map_or(true, |last| rounded - last >= PROGRESS_LOG_STEP);
                        if due {
                            actions.push(BootAction::Log(format!("Download progress: {}%", rounded)));
                            self.last_logged_progress = Some(rounded);
                        }
                    }
                    None => {
                        actions.push(BootAction::Log("Download progress event received.".to_string()));
                    }
                }
                actions.push(BootAction::Status("Downloading update…".to_string()));
            }
            UpdateEventKind::Warning => {
                let message = match &event.payload {
                    Some(UpdatePayload::Notice(notice)) => notice.message.clone(),
                    Some(UpdatePayload::Message(text)) => Some(text.clone()),
                    _ => None,
                };
                actions.push(BootAction::Log(match message {
                    Some(message) => format!("Updater warning: {}", message),
                    None => "Updater warning received.".to_string(),
                }));
            }
            UpdateEventKind::Downloaded => {
                self.view.available = true;
                self.view.ready = true;
                self.view.downloading = false;
                self.view.percent = 100.0;
                self.view.download_requested = true;
                self.last_logged_progress = None;
                actions.push(BootAction::Progress(100));
                actions.push(BootAction::Status("Update ready. Restarting…".to_string()));
                actions.push(BootAction::Log("Update downloaded. Preparing restart.".to_string()));
                self.start_install(&mut actions);
            }
            UpdateEventKind::Installing => {
                self.view.available = false;
                self.view.ready = false;
                self.view.downloading = false;
                self.view.percent = 0.0;
                actions.push(BootAction::Status("Installing update…".to_string()));
                actions.push(BootAction::Log("Installing update...".to_string()));
            }
            UpdateEventKind::NotAvailable => {
                self.reset_view();
                self.last_logged_progress = None;
                actions.push(BootAction::ClearProgress);
                actions.push(BootAction::Status(
                    "Everything is up to date. Starting Clovord…".to_string(),
                ));
                actions.push(BootAction::Log("No updates available. Launching app.".to_string()));
                actions.push(BootAction::Reveal(REVEAL_UP_TO_DATE));
            }
            UpdateEventKind::Error => {
                self.view.downloading = false;
                if !self.view.ready {
                    self.view.percent = 0.0;
                    actions.push(BootAction::ClearProgress);
                }
                self.view.download_requested = false;
                let detail = event
                    .payload
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown".to_string());
                actions.push(BootAction::Status(
                    "Update error. Starting the app anyway…".to_string(),
                ));
                actions.push(BootAction::Log(format!("Update error: {}", detail)));
                actions.push(BootAction::Reveal(REVEAL_AFTER_ERROR));
            }
        }

        actions
    }

    /// Resume from the coordinator's record, for a boot screen attaching
    /// after startup
    pub fn bootstrap(&mut self, state: &UpdateState) -> Vec<BootAction> {
        let mut actions = Vec::new();

        self.view.available = state.available.is_some();
        self.view.ready = state.ready_to_install;
        self.view.downloading = state.download_in_progress;
        self.view.percent = state.download_percent;

        if self.view.downloading {
            actions.push(BootAction::Progress(round_percent(self.view.percent)));
            self.last_logged_progress = Some(self.view.percent.floor() as i64);
        }

        actions.extend(self.on_event(&state.last_event));

        let can_check = !state.check_requested
            && !self.view.downloading
            && !self.view.ready
            && !self.view.available;
        let settled = matches!(
            state.last_event.kind,
            UpdateEventKind::Idle
                | UpdateEventKind::Error
                | UpdateEventKind::Warning
                | UpdateEventKind::NotAvailable
        );
        if can_check && settled {
            actions.push(BootAction::TriggerCheck);
        }

        actions
    }

    /// The coordinator could not be reached at startup
    pub fn bootstrap_failed(&mut self, error: &str) -> Vec<BootAction> {
        vec![
            BootAction::Log(format!("Failed to initialize updater: {}", error)),
            BootAction::Status("Updater could not be started. Starting the app…".to_string()),
            BootAction::Reveal(REVEAL_AFTER_ERROR),
        ]
    }

    /// Outcome of a [`BootAction::StartDownload`] request
    pub fn on_download_result(&mut self, result: Result<CommandResult, String>) -> Vec<BootAction> {
        self.download_in_flight = false;

        match result {
            Ok(response) if response.success => Vec::new(),
            Ok(response) => {
                if response.reason() == Some(ReasonCode::DownloadInProgress) {
                    return vec![BootAction::Log("Update download already in progress.".to_string())];
                }
                self.view.download_requested = false;
                vec![
                    BootAction::Log(describe(&response, "Unable to start download")),
                    BootAction::Status(
                        "Update download could not be started. Starting anyway…".to_string(),
                    ),
                    BootAction::Reveal(REVEAL_AFTER_ERROR),
                ]
            }
            Err(error) => {
                self.view.download_requested = false;
                vec![
                    BootAction::Log(format!("Unable to start update download: {}", error)),
                    BootAction::Status("Update download failed. Starting anyway…".to_string()),
                    BootAction::Reveal(REVEAL_AFTER_ERROR),
                ]
            }
        }
    }

    /// Outcome of a [`BootAction::StartInstall`] request
    pub fn on_install_result(&mut self, result: Result<CommandResult, String>) -> Vec<BootAction> {
        self.install_in_flight = false;

        match result {
            Ok(response) if response.success || response.error.is_none() => Vec::new(),
            Ok(response) => vec![
                BootAction::Log(describe(&response, "Unable to start installation")),
                BootAction::Status("Update ready, but the automatic restart failed.".to_string()),
                BootAction::Reveal(REVEAL_AFTER_INSTALL_FAILURE),
            ],
            Err(error) => vec![
                BootAction::Log(format!("Install request failed: {}", error)),
                BootAction::Status(
                    "The update could not be installed. Please restart manually.".to_string(),
                ),
                BootAction::Reveal(REVEAL_AFTER_INSTALL_FAILURE),
            ],
        }
    }

    /// Outcome of a [`BootAction::TriggerCheck`] request
    pub fn on_check_result(&mut self, result: Result<CommandResult, String>) -> Vec<BootAction> {
        match result {
            Ok(response) if response.success => {
                vec![BootAction::Log("Update check triggered.".to_string())]
            }
            Ok(response) if response.error.is_some() => vec![
                BootAction::Log(describe(&response, "Unable to start update check")),
                BootAction::Reveal(REVEAL_AFTER_ERROR),
            ],
            Ok(_) => Vec::new(),
            Err(error) => vec![
                BootAction::Log(format!("Failed to initialize updater: {}", error)),
                BootAction::Status("Updater could not be started. Starting the app…".to_string()),
                BootAction::Reveal(REVEAL_AFTER_ERROR),
            ],
        }
    }

    fn start_download(&mut self, actions: &mut Vec<BootAction>) {
        if self.download_in_flight || self.view.downloading || self.view.ready {
            return;
        }
        self.download_in_flight = true;
        self.view.download_requested = true;
        actions.push(BootAction::Log("Starting automatic update download...".to_string()));
        actions.push(BootAction::StartDownload);
    }

    fn start_install(&mut self, actions: &mut Vec<BootAction>) {
        if self.install_in_flight || self.view.install_requested || !self.view.ready {
            return;
        }
        self.install_in_flight = true;
        self.view.install_requested = true;
        actions.push(BootAction::Log(
            "Requesting application restart to install update...".to_string(),
        ));
        actions.push(BootAction::StartInstall);
    }

    fn reset_view(&mut self) {
        self.view = UpdateView::default();
    }
}

fn round_percent(percent: f64) -> u8 {
    percent.round().clamp(0.0, 100.0) as u8
}

/// Log line for a failed command: the reason code's description, or the
/// raw error behind `fallback`
fn describe(response: &CommandResult, fallback: &str) -> String {
    match (response.reason(), response.error.as_deref()) {
        (Some(reason), _) => reason.describe().to_string(),
        (None, Some(error)) => format!("{}: {}", fallback, error),
        (None, None) => "Unknown update error.".to_string(),
    }
}
