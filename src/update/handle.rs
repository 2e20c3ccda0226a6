//! Handle for talking to a running [`UpdateCoordinator`](super::UpdateCoordinator)
//!
//! All requests are posted onto the coordinator's queue and answered over a
//! oneshot channel, so the coordinator stays the only mutator of the update
//! record.

use tokio::sync::{mpsc, oneshot};

use super::error::{CheckOutcome, CommandResult, Result, UpdateError};
use super::state::UpdateState;

/// Messages drained by the coordinator loop
pub(crate) enum Message {
    Check {
        force: bool,
        reply: oneshot::Sender<CheckOutcome>,
    },
    Download {
        reply: oneshot::Sender<CommandResult>,
    },
    Install {
        reply: oneshot::Sender<CommandResult>,
    },
    Snapshot {
        reply: oneshot::Sender<UpdateState>,
    },
    /// The spawned backend check failed
    CheckFailed(String),
    /// The spawned backend download finished
    DownloadFinished {
        outcome: std::result::Result<(), String>,
        reply: oneshot::Sender<CommandResult>,
    },
    /// The install grace period elapsed
    InstallStalled,
    Shutdown,
}

/// Cloneable handle to the update coordinator, shared with the command
/// surface and the boot driver
#[derive(Clone)]
pub struct UpdateHandle {
    mailbox: mpsc::UnboundedSender<Message>,
}

impl UpdateHandle {
    pub(crate) fn new(mailbox: mpsc::UnboundedSender<Message>) -> Self {
        Self { mailbox }
    }

    /// Request an update check
    pub async fn check(&self, force: bool) -> Result<CheckOutcome> {
        self.request(|reply| Message::Check { force, reply }).await
    }

    /// Request the download of the available update. Resolves once the
    /// backend download finished or was refused.
    pub async fn download(&self) -> Result<CommandResult> {
        self.request(|reply| Message::Download { reply }).await
    }

    /// Request installation of the downloaded update
    pub async fn install(&self) -> Result<CommandResult> {
        self.request(|reply| Message::Install { reply }).await
    }

    /// Current update record, for subscribers attaching late
    pub async fn snapshot(&self) -> Result<UpdateState> {
        self.request(|reply| Message::Snapshot { reply }).await
    }

    /// Stop the coordinator loop
    pub fn shutdown(&self) {
        let _ = self.mailbox.send(Message::Shutdown);
    }

    /// Whether the coordinator loop is still accepting requests
    pub fn is_running(&self) -> bool {
        !self.mailbox.is_closed()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Message) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(build(reply))
            .map_err(|_| UpdateError::CoordinatorStopped)?;
        response.await.map_err(|_| UpdateError::CoordinatorStopped)
    }
}
