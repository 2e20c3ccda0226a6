//! Boot screen driver
//!
//! Runs a [`BootController`] against a [`BootSurface`]: drains pushed update
//! events, issues the requested update commands, keeps the status log and
//! owns the single reveal timer.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use super::controller::{BootAction, BootController};
use crate::update::{CommandResult, UpdateError, UpdateEvent, UpdateHandle, UpdateState};

/// Number of lines kept in the status log
pub const STATUS_LOG_CAPACITY: usize = 120;

/// Where the boot screen is rendered
pub trait BootSurface: Send + Sync + 'static {
    fn set_status(&self, text: &str);

    /// Replace the status log with `text` (newline separated)
    fn set_log(&self, text: &str);

    fn show_progress(&self, percent: u8);

    fn clear_progress(&self);

    /// Hide the boot screen and show the application. Called at most once.
    fn reveal(&self);
}

/// Update commands the boot screen issues
#[async_trait]
pub trait UpdateControl: Clone + Send + Sync + 'static {
    async fn current_state(&self) -> Result<UpdateState, UpdateError>;
    async fn request_check(&self) -> Result<CommandResult, UpdateError>;
    async fn request_download(&self) -> Result<CommandResult, UpdateError>;
    async fn request_install(&self) -> Result<CommandResult, UpdateError>;
}

#[async_trait]
impl UpdateControl for UpdateHandle {
    async fn current_state(&self) -> Result<UpdateState, UpdateError> {
        self.snapshot().await
    }

    async fn request_check(&self) -> Result<CommandResult, UpdateError> {
        self.check(false).await.map(CommandResult::from)
    }

    async fn request_download(&self) -> Result<CommandResult, UpdateError> {
        self.download().await
    }

    async fn request_install(&self) -> Result<CommandResult, UpdateError> {
        self.install().await
    }
}

/// Timestamped, bounded status log
#[derive(Debug, Clone)]
pub struct StatusLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl StatusLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message prefixed with the local time, dropping the oldest
    /// line when full
    pub fn push(&mut self, message: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines
            .push_back(format!("{} {}", Local::now().format("%H:%M:%S"), message));
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }
}

impl Default for StatusLog {
    fn default() -> Self {
        Self::new(STATUS_LOG_CAPACITY)
    }
}

enum Completion {
    Check(Result<CommandResult, String>),
    Download(Result<CommandResult, String>),
    Install(Result<CommandResult, String>),
}

/// Drives the boot screen until the update event stream ends
pub struct BootDriver<S: BootSurface, U: UpdateControl> {
    controller: BootController,
    surface: Arc<S>,
    updates: U,
    log: StatusLog,
    reveal_at: Option<Instant>,
    revealed: bool,
    completions: mpsc::UnboundedSender<Completion>,
    completed: Option<mpsc::UnboundedReceiver<Completion>>,
}

impl<S: BootSurface, U: UpdateControl> BootDriver<S, U> {
    pub fn new(surface: Arc<S>, updates: U) -> Self {
        let (completions, completed) = mpsc::unbounded_channel();
        Self {
            controller: BootController::new(),
            surface,
            updates,
            log: StatusLog::default(),
            reveal_at: None,
            revealed: false,
            completions,
            completed: Some(completed),
        }
    }

    /// Bootstrap from the coordinator's record, then follow `events`.
    ///
    /// When the event stream closes the application is revealed at once.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<UpdateEvent>) {
        let Some(mut completed) = self.completed.take() else {
            return;
        };

        let actions = match self.updates.current_state().await {
            Ok(state) => self.controller.bootstrap(&state),
            Err(e) => {
                tracing::warn!("Boot screen could not read update state: {}", e);
                self.controller.bootstrap_failed(&e.to_string())
            }
        };
        self.execute(actions);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        let actions = self.controller.on_event(&event);
                        self.execute(actions);
                    }
                    None => break,
                },
                Some(completion) = completed.recv() => {
                    let actions = match completion {
                        Completion::Check(result) => self.controller.on_check_result(result),
                        Completion::Download(result) => self.controller.on_download_result(result),
                        Completion::Install(result) => self.controller.on_install_result(result),
                    };
                    self.execute(actions);
                }
                _ = reveal_deadline(self.reveal_at) => {
                    self.reveal_now();
                }
            }
        }

        tracing::debug!("Update event stream closed, leaving boot screen");
        self.reveal_now();
    }

    fn execute(&mut self, actions: Vec<BootAction>) {
        for action in actions {
            match action {
                BootAction::Status(text) => self.surface.set_status(&text),
                BootAction::Log(message) => {
                    tracing::debug!(target: "boot", "{}", message);
                    self.log.push(&message);
                    self.surface.set_log(&self.log.render());
                }
                BootAction::Progress(percent) => self.surface.show_progress(percent),
                BootAction::ClearProgress => self.surface.clear_progress(),
                BootAction::Reveal(delay) => {
                    if !self.revealed {
                        self.reveal_at = Some(Instant::now() + delay);
                    }
                }
                BootAction::StartDownload => {
                    let updates = self.updates.clone();
                    self.spawn_request(async move {
                        Completion::Download(updates.request_download().await.map_err(|e| e.to_string()))
                    });
                }
                BootAction::StartInstall => {
                    let updates = self.updates.clone();
                    self.spawn_request(async move {
                        Completion::Install(updates.request_install().await.map_err(|e| e.to_string()))
                    });
                }
                BootAction::TriggerCheck => {
                    let updates = self.updates.clone();
                    self.spawn_request(async move {
                        Completion::Check(updates.request_check().await.map_err(|e| e.to_string()))
                    });
                }
            }
        }
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: std::future::Future<Output = Completion> + Send + 'static,
    {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let _ = completions.send(request.await);
        });
    }

    fn reveal_now(&mut self) {
        self.reveal_at = None;
        if self.revealed {
            return;
        }
        self.revealed = true;
        tracing::info!("Revealing application window");
        self.surface.reveal();
    }
}

async fn reveal_deadline(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
