//! Update delivery backend abstraction
//!
//! The coordinator never talks to a release server directly. It drives an
//! [`UpdateBackend`] and listens to the six lifecycle events the backend
//! reports through the channel handed to it at construction time.

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::mpsc;

use super::error::UpdateError;
use super::event::{DownloadProgress, UpdateEventKind, UpdateMetadata, UpdatePayload};

/// Lifecycle callbacks of an update delivery service
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    CheckingForUpdate,
    UpdateAvailable(UpdateMetadata),
    UpdateNotAvailable(Option<UpdateMetadata>),
    Error(String),
    DownloadProgress(DownloadProgress),
    UpdateDownloaded(UpdateMetadata),
}

impl BackendEvent {
    /// Map the callback onto the lifecycle event fed into the state store
    pub fn into_transition(self) -> (UpdateEventKind, Option<UpdatePayload>) {
        match self {
            BackendEvent::CheckingForUpdate => (UpdateEventKind::Checking, None),
            BackendEvent::UpdateAvailable(meta) => (UpdateEventKind::Available, Some(meta.into())),
            BackendEvent::UpdateNotAvailable(meta) => {
                (UpdateEventKind::NotAvailable, meta.map(UpdatePayload::from))
            }
            BackendEvent::Error(message) => (UpdateEventKind::Error, Some(message.into())),
            BackendEvent::DownloadProgress(progress) => {
                (UpdateEventKind::Progress, Some(progress.into()))
            }
            BackendEvent::UpdateDownloaded(meta) => (UpdateEventKind::Downloaded, Some(meta.into())),
        }
    }
}

/// Receiving half of the backend event channel, drained by the coordinator
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Sending half of the backend event channel, owned by the backend
#[derive(Debug, Clone)]
pub struct BackendEvents {
    tx: mpsc::UnboundedSender<BackendEvent>,
}

impl BackendEvents {
    /// Report a lifecycle event. Events emitted after the coordinator has
    /// stopped are dropped.
    pub fn emit(&self, event: BackendEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Update coordinator gone, dropping backend event");
        }
    }
}

/// Create the backend event channel
pub fn backend_channel() -> (BackendEvents, BackendEventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (BackendEvents { tx }, rx)
}

/// Settings applied to the backend at startup
#[derive(Debug, Clone, Default)]
pub struct BackendOptions {
    /// Credential for private release feeds
    pub credentials: Option<SecretString>,
    /// Download as soon as an update is found
    pub auto_download: bool,
    /// Install a downloaded update when the app quits
    pub auto_install_on_app_quit: bool,
}

/// An update delivery service
#[async_trait]
pub trait UpdateBackend: Send + Sync + 'static {
    /// Apply startup settings
    fn configure(&self, options: BackendOptions);

    /// Query the release feed. Results arrive as lifecycle events.
    async fn check_for_updates(&self) -> Result<(), UpdateError>;

    /// Download the update found by the last check
    async fn download_update(&self) -> Result<(), UpdateError>;

    /// Quit the application and run the installer. Returning at all means
    /// the process is still alive.
    fn quit_and_install(&self) -> Result<(), UpdateError>;
}
