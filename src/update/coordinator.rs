//! Update coordinator
//!
//! Drives an [`UpdateBackend`] through the update lifecycle:
//! - admission control for check/download/install requests
//! - relay of backend lifecycle events into the state store
//! - forwarding of every transition to the notification sink
//! - recurring forced checks and the startup sequence
//!
//! The coordinator runs as a single task ([`UpdateCoordinator::run`]). UI
//! commands, backend events, completions of spawned backend operations and
//! timer ticks all arrive on that task, so the update record has exactly one
//! mutator and needs no locking.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use super::backend::{BackendEvent, BackendEventReceiver, BackendOptions, UpdateBackend};
use super::error::{CheckOutcome, CommandResult, ReasonCode};
use super::event::{DownloadProgress, Notice, UpdateEvent, UpdateEventKind, UpdatePayload};
use super::handle::{Message, UpdateHandle};
use super::state::{UpdatePhase, UpdateState, UpdateStateStore};
use crate::core::error::ErrorRecovery;
use crate::notify::NotificationSink;

/// Interval between recurring forced checks
pub const UPDATE_CHECK_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// How long the process may survive a successful quit-and-install call
pub const INSTALL_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Coordinator settings
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Development build: every request is refused with `DISABLED_IN_DEV`
    pub dev_mode: bool,
    /// Interval between recurring forced checks
    pub check_interval: Duration,
    /// Grace period before a non-terminating install is reported
    pub install_timeout: Option<Duration>,
    /// Credential handed to the backend at startup
    pub credentials: Option<SecretString>,
    /// Log sink delivery failures
    pub diagnostics: bool,
}

impl CoordinatorConfig {
    pub fn new(dev_mode: bool) -> Self {
        Self {
            dev_mode,
            check_interval: UPDATE_CHECK_INTERVAL,
            install_timeout: Some(INSTALL_GRACE_PERIOD),
            credentials: None,
            diagnostics: dev_mode,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<SecretString>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_install_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.install_timeout = timeout;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new(cfg!(debug_assertions))
    }
}

/// Owner of the update record and the only caller of the backend
pub struct UpdateCoordinator<B: UpdateBackend> {
    store: UpdateStateStore,
    backend: Arc<B>,
    sink: Arc<dyn NotificationSink>,
    config: CoordinatorConfig,
    mailbox: mpsc::UnboundedSender<Message>,
    inbox: Option<mpsc::UnboundedReceiver<Message>>,
}

impl<B: UpdateBackend> UpdateCoordinator<B> {
    /// Create a coordinator in its initial phase (Disabled or Idle)
    pub fn new(backend: Arc<B>, sink: Arc<dyn NotificationSink>, config: CoordinatorConfig) -> Self {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        Self {
            store: UpdateStateStore::new(config.dev_mode),
            backend,
            sink,
            config,
            mailbox,
            inbox: Some(inbox),
        }
    }

    /// Handle for the command surface
    pub fn handle(&self) -> UpdateHandle {
        UpdateHandle::new(self.mailbox.clone())
    }

    /// Current update record
    pub fn state(&self) -> &UpdateState {
        self.store.state()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> UpdatePhase {
        self.store.phase()
    }

    /// Startup sequence: configure the backend, then force an initial check
    pub fn start(&mut self) {
        if self.config.credentials.is_none() {
            self.emit(
                UpdateEventKind::Warning,
                Some(
                    Notice::new(
                        "NO_TOKEN",
                        "Update feed credential missing; private release feeds are unreachable",
                    )
                    .into(),
                ),
            );
        }

        self.backend.configure(BackendOptions {
            credentials: self.config.credentials.clone(),
            auto_download: false,
            auto_install_on_app_quit: false,
        });

        let outcome = self.request_check(true);
        tracing::info!(
            started = outcome.started,
            reason = ?outcome.reason,
            "Initial update check"
        );
    }

    /// Admission control for update checks.
    ///
    /// In-flight operations block even a forced check; `force` only
    /// overrides an already resolved update (available or downloaded).
    pub fn request_check(&mut self, force: bool) -> CheckOutcome {
        let state = self.store.state();
        let refusal = if self.store.is_disabled() {
            Some(ReasonCode::DisabledInDev)
        } else if state.check_requested {
            Some(ReasonCode::AlreadyChecking)
        } else if state.download_in_progress {
            Some(ReasonCode::DownloadInProgress)
        } else if state.ready_to_install && !force {
            Some(ReasonCode::ReadyToInstall)
        } else if state.available.is_some() && !force {
            Some(ReasonCode::UpdateAvailable)
        } else {
            None
        };

        if let Some(reason) = refusal {
            tracing::debug!(%reason, force, "Update check refused");
            return CheckOutcome::refused(reason);
        }

        self.store.mark_check_requested();

        let backend = Arc::clone(&self.backend);
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.check_for_updates().await {
                tracing::debug!(
                    retryable = e.is_retryable(),
                    retry_delay_ms = ?e.retry_delay_ms(),
                    "Backend update check failed"
                );
                let _ = mailbox.send(Message::CheckFailed(e.to_string()));
            }
        });

        CheckOutcome::started()
    }

    /// Admission control for downloads.
    ///
    /// On admission a synthetic `progress` event at the current percentage
    /// is emitted so the UI reacts before the backend reports anything.
    pub fn begin_download(&mut self) -> Result<(), ReasonCode> {
        let state = self.store.state();
        if self.store.is_disabled() {
            return Err(ReasonCode::DisabledInDev);
        }
        if state.available.is_none() {
            return Err(ReasonCode::NoUpdateAvailable);
        }
        if state.download_in_progress {
            return Err(ReasonCode::DownloadInProgress);
        }
        if state.ready_to_install {
            return Err(ReasonCode::ReadyToInstall);
        }

        let percent = state.download_percent;
        self.emit(
            UpdateEventKind::Progress,
            Some(DownloadProgress::at(percent).into()),
        );
        Ok(())
    }

    /// Settle a backend download started by [`begin_download`](Self::begin_download)
    pub fn finish_download(&mut self, outcome: Result<(), String>) -> CommandResult {
        match outcome {
            Ok(()) => CommandResult::ok(),
            Err(description) => {
                tracing::warn!("Update download failed: {}", description);
                self.store.abort_download();
                self.emit(UpdateEventKind::Error, Some(description.clone().into()));
                CommandResult::failed(description)
            }
        }
    }

    /// Emit `installing` and hand over to the backend installer
    pub fn request_install(&mut self) -> CommandResult {
        if self.store.is_disabled() {
            return CommandResult::refused(ReasonCode::DisabledInDev);
        }
        if !self.store.state().ready_to_install {
            return CommandResult::refused(ReasonCode::NotReady);
        }

        self.emit(UpdateEventKind::Installing, None);
        tracing::info!("Quitting to install update");

        match self.backend.quit_and_install() {
            Ok(()) => {
                if let Some(timeout) = self.config.install_timeout {
                    let mailbox = self.mailbox.clone();
                    tokio::spawn(async move {
                        time::sleep(timeout).await;
                        let _ = mailbox.send(Message::InstallStalled);
                    });
                }
                CommandResult::ok()
            }
            Err(e) => {
                let description = e.to_string();
                tracing::error!("Failed to install update: {}", description);
                self.emit(UpdateEventKind::Error, Some(description.clone().into()));
                CommandResult::failed(description)
            }
        }
    }

    /// Feed a backend lifecycle callback into the store and the sink
    pub fn relay(&mut self, event: BackendEvent) -> UpdateEvent {
        let (kind, payload) = event.into_transition();
        self.emit(kind, payload)
    }

    /// Recurring timer callback. Returns `false` once the timer must stop.
    pub fn on_recurring_tick(&mut self) -> bool {
        let outcome = self.request_check(true);
        if outcome.reason == Some(ReasonCode::DisabledInDev) {
            tracing::info!("Updates disabled, cancelling recurring update checks");
            return false;
        }
        tracing::debug!(started = outcome.started, reason = ?outcome.reason, "Recurring update check");
        true
    }

    /// Run the coordinator until shut down.
    ///
    /// Performs the startup sequence, then drains requests, backend events
    /// and timer ticks on this task.
    pub async fn run(mut self, mut events: BackendEventReceiver) {
        let Some(mut inbox) = self.inbox.take() else {
            tracing::warn!("Update coordinator already ran");
            return;
        };

        self.start();

        let period = self.config.check_interval;
        let mut recurring = time::interval_at(Instant::now() + period, period);
        recurring.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut recurring = Some(recurring);

        loop {
            tokio::select! {
                message = inbox.recv() => match message {
                    Some(Message::Shutdown) | None => break,
                    Some(message) => {
                        self.relay_pending(&mut events);
                        self.handle_message(message);
                    }
                },
                Some(event) = events.recv() => {
                    self.relay(event);
                }
                _ = next_tick(&mut recurring) => {
                    if !self.on_recurring_tick() {
                        recurring = None;
                    }
                }
            }
        }

        tracing::info!("Update coordinator stopped");
    }

    /// Relay backend events queued ahead of a mailbox message.
    ///
    /// A backend call emits its lifecycle events before its completion is
    /// posted; they must reach the store first or a late `checking` or
    /// `progress` re-arms the flags the failure cleared.
    fn relay_pending(&mut self, events: &mut BackendEventReceiver) {
        while let Ok(event) = events.try_recv() {
            self.relay(event);
        }
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Check { force, reply } => {
                let _ = reply.send(self.request_check(force));
            }
            Message::Download { reply } => match self.begin_download() {
                Ok(()) => self.spawn_download(reply),
                Err(reason) => {
                    let _ = reply.send(CommandResult::refused(reason));
                }
            },
            Message::Install { reply } => {
                let _ = reply.send(self.request_install());
            }
            Message::Snapshot { reply } => {
                let _ = reply.send(self.store.snapshot());
            }
            Message::CheckFailed(description) => {
                tracing::warn!("Update check failed: {}", description);
                self.store.abort_check();
                self.emit(UpdateEventKind::Error, Some(description.into()));
            }
            Message::DownloadFinished { outcome, reply } => {
                let _ = reply.send(self.finish_download(outcome));
            }
            Message::InstallStalled => {
                if self.store.phase() == UpdatePhase::Installing {
                    tracing::error!("Installer did not terminate the application");
                    self.emit(
                        UpdateEventKind::Error,
                        Some(UpdatePayload::Message(
                            "The installer did not terminate the application".to_string(),
                        )),
                    );
                }
            }
            Message::Shutdown => {}
        }
    }

    fn spawn_download(&self, reply: oneshot::Sender<CommandResult>) {
        let backend = Arc::clone(&self.backend);
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let outcome = backend.download_update().await.map_err(|e| {
                tracing::debug!(
                    retryable = e.is_retryable(),
                    action = ?e.recovery_action(),
                    "Backend update download failed"
                );
                e.to_string()
            });
            let _ = mailbox.send(Message::DownloadFinished { outcome, reply });
        });
    }

    fn emit(&mut self, kind: UpdateEventKind, payload: Option<UpdatePayload>) -> UpdateEvent {
        let event = self.store.apply(kind, payload);
        tracing::debug!(event = %event.kind, "Update transition");
        if let Err(e) = self.sink.deliver(&event) {
            if self.config.diagnostics {
                tracing::warn!(event = %event.kind, "Failed to forward updater status: {}", e);
            }
        }
        event
    }
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
