//! Update errors, admission refusals and command results

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for update delivery operations
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to check for updates: {0}")]
    CheckFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("No update has been discovered yet")]
    NoUpdateDiscovered,

    #[error("No downloaded update to install")]
    NoPendingUpdate,

    #[error("Failed to launch installer: {0}")]
    InstallFailed(String),

    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid version format: {0}")]
    InvalidVersion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Update coordinator is not running")]
    CoordinatorStopped,
}

/// Result type for update operations
pub type Result<T> = std::result::Result<T, UpdateError>;

/// Why the coordinator refused a request.
///
/// Refusals are policy decisions, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    DisabledInDev,
    AlreadyChecking,
    DownloadInProgress,
    ReadyToInstall,
    UpdateAvailable,
    NoUpdateAvailable,
    NotReady,
}

impl ReasonCode {
    /// Wire name, as sent to the renderer
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::DisabledInDev => "DISABLED_IN_DEV",
            ReasonCode::AlreadyChecking => "ALREADY_CHECKING",
            ReasonCode::DownloadInProgress => "DOWNLOAD_IN_PROGRESS",
            ReasonCode::ReadyToInstall => "READY_TO_INSTALL",
            ReasonCode::UpdateAvailable => "UPDATE_AVAILABLE",
            ReasonCode::NoUpdateAvailable => "NO_UPDATE_AVAILABLE",
            ReasonCode::NotReady => "NOT_READY",
        }
    }

    /// Parse a wire name back into a reason code
    pub fn from_wire(code: &str) -> Option<Self> {
        match code {
            "DISABLED_IN_DEV" => Some(ReasonCode::DisabledInDev),
            "ALREADY_CHECKING" => Some(ReasonCode::AlreadyChecking),
            "DOWNLOAD_IN_PROGRESS" => Some(ReasonCode::DownloadInProgress),
            "READY_TO_INSTALL" => Some(ReasonCode::ReadyToInstall),
            "UPDATE_AVAILABLE" => Some(ReasonCode::UpdateAvailable),
            "NO_UPDATE_AVAILABLE" => Some(ReasonCode::NoUpdateAvailable),
            "NOT_READY" => Some(ReasonCode::NotReady),
            _ => None,
        }
    }

    /// Human readable explanation for the status log
    pub fn describe(&self) -> &'static str {
        match self {
            ReasonCode::DisabledInDev => "Auto-updater disabled (development build).",
            ReasonCode::AlreadyChecking => "An update check is already running.",
            ReasonCode::DownloadInProgress => "The update download is already running.",
            ReasonCode::ReadyToInstall => "The update is already downloaded.",
            ReasonCode::UpdateAvailable => "An update is already available.",
            ReasonCode::NoUpdateAvailable => "No update available.",
            ReasonCode::NotReady => "No update is ready to install.",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a check request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
}

impl CheckOutcome {
    pub fn started() -> Self {
        Self {
            started: true,
            reason: None,
        }
    }

    pub fn refused(reason: ReasonCode) -> Self {
        Self {
            started: false,
            reason: Some(reason),
        }
    }
}

impl From<CheckOutcome> for CommandResult {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome.reason {
            Some(reason) if !outcome.started => CommandResult::refused(reason),
            _ => CommandResult::ok(),
        }
    }
}

/// Result record returned by every update command.
///
/// `error` carries either a [`ReasonCode`] wire name or the description of a
/// backend failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn refused(reason: ReasonCode) -> Self {
        Self {
            success: false,
            error: Some(reason.as_str().to_string()),
        }
    }

    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(description.into()),
        }
    }

    /// The refusal reason, when the error is a known reason code
    pub fn reason(&self) -> Option<ReasonCode> {
        self.error.as_deref().and_then(ReasonCode::from_wire)
    }
}
