//! Update lifecycle events
//!
//! Every transition of the update lifecycle is described by an
//! [`UpdateEvent`]: a `{ type, payload }` record pushed to the UI on the
//! `auto-updater-message` channel. Events are immutable; each new event fully
//! replaces the previous "last known event".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel name used when pushing update events to the renderer
pub const UPDATE_EVENT_CHANNEL: &str = "auto-updater-message";

/// The ten lifecycle transition signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateEventKind {
    /// Updates are disabled (development build)
    Disabled,
    /// Updater is ready, nothing in flight
    Idle,
    /// A check against the release feed is running
    Checking,
    /// A newer release was found
    Available,
    /// The running version is current
    NotAvailable,
    /// Download progress
    Progress,
    /// The update package is downloaded and verified
    Downloaded,
    /// The installer is being launched
    Installing,
    /// Something failed; the state is retryable
    Error,
    /// Non-fatal condition worth surfacing (e.g. missing credentials)
    Warning,
}

impl UpdateEventKind {
    /// Wire name of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateEventKind::Disabled => "disabled",
            UpdateEventKind::Idle => "idle",
            UpdateEventKind::Checking => "checking",
            UpdateEventKind::Available => "available",
            UpdateEventKind::NotAvailable => "not-available",
            UpdateEventKind::Progress => "progress",
            UpdateEventKind::Downloaded => "downloaded",
            UpdateEventKind::Installing => "installing",
            UpdateEventKind::Error => "error",
            UpdateEventKind::Warning => "warning",
        }
    }
}

impl std::fmt::Display for UpdateEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file belonging to a release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFile {
    /// Download URL of the package
    pub url: String,
    /// Size of the package in bytes
    #[serde(default)]
    pub size: u64,
    /// Hex encoded SHA-256 of the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Target platform (`windows`, `macos`, `linux`); `None` matches any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

/// Information about a release, as published by the update feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateMetadata {
    /// Release version (`2.0.1`, `v2.0.1`)
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,
    pub files: Vec<UpdateFile>,
}

impl UpdateMetadata {
    /// Metadata carrying only a version string
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }
}

/// Download progress, shaped like the renderer expects it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    /// Percentage (0-100)
    pub percent: f64,
    /// Current download speed in bytes/second
    #[serde(default)]
    pub bytes_per_second: u64,
    /// Bytes downloaded so far
    #[serde(default)]
    pub transferred: u64,
    /// Total bytes to download
    #[serde(default)]
    pub total: u64,
}

impl DownloadProgress {
    /// Progress carrying only a percentage
    pub fn at(percent: f64) -> Self {
        Self {
            percent,
            bytes_per_second: 0,
            transferred: 0,
            total: 0,
        }
    }
}

/// A machine readable reason plus a human readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Notice {
    pub fn new(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: Some(message.into()),
        }
    }

    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            message: None,
        }
    }
}

/// Type-dependent event payload.
///
/// Untagged on the wire; variant order matters for deserialization because
/// [`UpdateMetadata`] accepts any object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdatePayload {
    Progress(DownloadProgress),
    Notice(Notice),
    Metadata(UpdateMetadata),
    Message(String),
}

impl UpdatePayload {
    /// Release metadata, if this payload carries any
    pub fn as_metadata(&self) -> Option<&UpdateMetadata> {
        match self {
            UpdatePayload::Metadata(meta) => Some(meta),
            _ => None,
        }
    }

    /// Reported percentage, if this payload is a finite progress value
    pub fn percent(&self) -> Option<f64> {
        match self {
            UpdatePayload::Progress(progress) if progress.percent.is_finite() => {
                Some(progress.percent)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for UpdatePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdatePayload::Progress(p) => write!(f, "{:.0}%", p.percent),
            UpdatePayload::Notice(n) => match &n.message {
                Some(message) => write!(f, "{} ({})", message, n.reason),
                None => f.write_str(&n.reason),
            },
            UpdatePayload::Metadata(m) => write!(f, "version {}", m.version),
            UpdatePayload::Message(text) => f.write_str(text),
        }
    }
}

impl From<UpdateMetadata> for UpdatePayload {
    fn from(meta: UpdateMetadata) -> Self {
        UpdatePayload::Metadata(meta)
    }
}

impl From<DownloadProgress> for UpdatePayload {
    fn from(progress: DownloadProgress) -> Self {
        UpdatePayload::Progress(progress)
    }
}

impl From<Notice> for UpdatePayload {
    fn from(notice: Notice) -> Self {
        UpdatePayload::Notice(notice)
    }
}

impl From<String> for UpdatePayload {
    fn from(text: String) -> Self {
        UpdatePayload::Message(text)
    }
}

/// A single lifecycle transition as seen by the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(rename = "type")]
    pub kind: UpdateEventKind,
    pub payload: Option<UpdatePayload>,
}

impl UpdateEvent {
    pub fn new(kind: UpdateEventKind, payload: Option<UpdatePayload>) -> Self {
        Self { kind, payload }
    }

    /// Initial event of a development build
    pub fn disabled() -> Self {
        Self::new(
            UpdateEventKind::Disabled,
            Some(Notice::reason("development").into()),
        )
    }

    /// Initial event of a packaged build
    pub fn idle() -> Self {
        Self::new(UpdateEventKind::Idle, None)
    }
}
