//! Tests for the boot screen
//!
//! Controller tests are pure; driver tests run on tokio's paused clock.

use super::*;
use crate::update::{
    CommandResult, DownloadProgress, Notice, ReasonCode, UpdateError, UpdateEvent,
    UpdateEventKind, UpdateMetadata, UpdatePayload, UpdateState,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn event(kind: UpdateEventKind) -> UpdateEvent {
    UpdateEvent::new(kind, None)
}

fn progress(percent: f64) -> UpdateEvent {
    UpdateEvent::new(
        UpdateEventKind::Progress,
        Some(DownloadProgress::at(percent).into()),
    )
}

fn reveals(actions: &[BootAction]) -> Vec<Duration> {
    actions
        .iter()
        .filter_map(|a| match a {
            BootAction::Reveal(delay) => Some(*delay),
            _ => None,
        })
        .collect()
}

fn logs(actions: &[BootAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            BootAction::Log(line) => Some(line.clone()),
            _ => None,
        })
        .collect()
}

fn count(actions: &[BootAction], wanted: &BootAction) -> usize {
    actions.iter().filter(|a| *a == wanted).count()
}

fn state_with(last_event: UpdateEvent) -> UpdateState {
    UpdateState {
        last_event,
        ..UpdateState::initial(false)
    }
}

// ============================================================================
// Controller
// ============================================================================

#[test]
fn test_reveal_delays_per_event() {
    let cases = [
        (UpdateEventKind::Disabled, REVEAL_DISABLED),
        (UpdateEventKind::Idle, REVEAL_IDLE),
        (UpdateEventKind::NotAvailable, REVEAL_UP_TO_DATE),
        (UpdateEventKind::Error, REVEAL_AFTER_ERROR),
    ];
    for (kind, delay) in cases {
        let mut controller = BootController::new();
        let actions = controller.on_event(&event(kind));
        assert_eq!(reveals(&actions), vec![delay], "reveal delay for {}", kind);
    }

    assert_eq!(REVEAL_DISABLED, Duration::from_millis(400));
    assert_eq!(REVEAL_IDLE, Duration::from_millis(600));
    assert_eq!(REVEAL_UP_TO_DATE, Duration::from_millis(800));
    assert_eq!(REVEAL_AFTER_ERROR, Duration::from_millis(1500));
    assert_eq!(REVEAL_AFTER_INSTALL_FAILURE, Duration::from_millis(2000));
}

#[test]
fn test_in_flight_events_do_not_reveal() {
    let mut controller = BootController::new();
    for kind in [
        UpdateEventKind::Checking,
        UpdateEventKind::Installing,
        UpdateEventKind::Warning,
    ] {
        assert!(reveals(&controller.on_event(&event(kind))).is_empty());
    }
    assert!(reveals(&controller.on_event(&progress(10.0))).is_empty());
}

#[test]
fn test_available_starts_download_once() {
    let mut controller = BootController::new();
    let available = UpdateEvent::new(
        UpdateEventKind::Available,
        Some(UpdateMetadata::with_version("2.0.0").into()),
    );

    let actions = controller.on_event(&available);
    assert_eq!(count(&actions, &BootAction::StartDownload), 1);
    assert!(actions.contains(&BootAction::ClearProgress));
    assert!(controller.download_in_flight());

    let actions = controller.on_event(&available);
    assert_eq!(count(&actions, &BootAction::StartDownload), 0);
}

#[test]
fn test_progress_logged_every_five_points() {
    let mut controller = BootController::new();
    let mut logged = Vec::new();
    for percent in [0.0, 2.0, 5.0, 7.9, 10.4, 14.0, 15.2] {
        logged.extend(logs(&controller.on_event(&progress(percent))));
    }
    assert_eq!(
        logged,
        vec![
            "Download progress: 0%".to_string(),
            "Download progress: 5%".to_string(),
            "Download progress: 10%".to_string(),
            "Download progress: 15%".to_string(),
        ]
    );
}

#[test]
fn test_progress_bar_is_rounded() {
    let mut controller = BootController::new();
    let actions = controller.on_event(&progress(41.6));
    assert!(actions.contains(&BootAction::Progress(42)));
    assert!(actions.contains(&BootAction::Status("Downloading update…".to_string())));
}

#[test]
fn test_progress_without_percentage() {
    let mut controller = BootController::new();
    let actions = controller.on_event(&event(UpdateEventKind::Progress));
    assert_eq!(logs(&actions), vec!["Download progress event received.".to_string()]);
    assert!(!actions.iter().any(|a| matches!(a, BootAction::Progress(_))));
}

#[test]
fn test_downloaded_starts_install_once() {
    let mut controller = BootController::new();
    let downloaded = event(UpdateEventKind::Downloaded);

    let actions = controller.on_event(&downloaded);
    assert!(actions.contains(&BootAction::Progress(100)));
    assert_eq!(count(&actions, &BootAction::StartInstall), 1);
    assert!(controller.install_in_flight());

    controller.on_install_result(Ok(CommandResult::ok()));
    let actions = controller.on_event(&downloaded);
    assert_eq!(count(&actions, &BootAction::StartInstall), 0);
}

#[test]
fn test_error_keeps_progress_when_ready() {
    let mut controller = BootController::new();
    controller.on_event(&event(UpdateEventKind::Downloaded));
    let actions = controller.on_event(&UpdateEvent::new(
        UpdateEventKind::Error,
        Some(UpdatePayload::Message("disk full".to_string())),
    ));
    assert!(!actions.contains(&BootAction::ClearProgress));
    assert_eq!(logs(&actions), vec!["Update error: disk full".to_string()]);

    let mut controller = BootController::new();
    let actions = controller.on_event(&event(UpdateEventKind::Error));
    assert!(actions.contains(&BootAction::ClearProgress));
    assert_eq!(logs(&actions), vec!["Update error: unknown".to_string()]);
}

#[test]
fn test_warning_message_is_logged() {
    let mut controller = BootController::new();
    let actions = controller.on_event(&UpdateEvent::new(
        UpdateEventKind::Warning,
        Some(Notice::new("NO_TOKEN", "credential missing").into()),
    ));
    assert_eq!(logs(&actions), vec!["Updater warning: credential missing".to_string()]);

    let actions = controller.on_event(&event(UpdateEventKind::Warning));
    assert_eq!(logs(&actions), vec!["Updater warning received.".to_string()]);
}

#[test]
fn test_download_results() {
    let mut controller = BootController::new();

    assert!(controller.on_download_result(Ok(CommandResult::ok())).is_empty());

    let actions =
        controller.on_download_result(Ok(CommandResult::refused(ReasonCode::DownloadInProgress)));
    assert_eq!(logs(&actions), vec!["Update download already in progress.".to_string()]);
    assert!(reveals(&actions).is_empty());

    let actions =
        controller.on_download_result(Ok(CommandResult::refused(ReasonCode::NoUpdateAvailable)));
    assert_eq!(logs(&actions), vec![ReasonCode::NoUpdateAvailable.describe().to_string()]);
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_ERROR]);

    let actions = controller.on_download_result(Ok(CommandResult::failed("Download failed: 404")));
    assert_eq!(
        logs(&actions),
        vec!["Unable to start download: Download failed: 404".to_string()]
    );
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_ERROR]);

    let actions = controller.on_download_result(Err("coordinator gone".to_string()));
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_ERROR]);
    assert!(!controller.download_in_flight());
}

#[test]
fn test_install_results() {
    let mut controller = BootController::new();

    assert!(controller.on_install_result(Ok(CommandResult::ok())).is_empty());

    let actions = controller.on_install_result(Ok(CommandResult::refused(ReasonCode::NotReady)));
    assert_eq!(logs(&actions), vec!["No update is ready to install.".to_string()]);
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_INSTALL_FAILURE]);

    let actions = controller.on_install_result(Err("coordinator gone".to_string()));
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_INSTALL_FAILURE]);
    assert!(!controller.install_in_flight());
}

#[test]
fn test_check_results() {
    let mut controller = BootController::new();

    let actions = controller.on_check_result(Ok(CommandResult::ok()));
    assert_eq!(logs(&actions), vec!["Update check triggered.".to_string()]);
    assert!(reveals(&actions).is_empty());

    let actions = controller.on_check_result(Ok(CommandResult::refused(ReasonCode::AlreadyChecking)));
    assert_eq!(logs(&actions), vec!["An update check is already running.".to_string()]);
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_ERROR]);
}

#[test]
fn test_bootstrap_triggers_check_when_settled() {
    for kind in [
        UpdateEventKind::Idle,
        UpdateEventKind::Error,
        UpdateEventKind::Warning,
        UpdateEventKind::NotAvailable,
    ] {
        let mut controller = BootController::new();
        let actions = controller.bootstrap(&state_with(event(kind)));
        assert_eq!(
            actions.last(),
            Some(&BootAction::TriggerCheck),
            "bootstrap after {}",
            kind
        );
    }
}

#[test]
fn test_bootstrap_without_check() {
    let mut controller = BootController::new();
    let state = UpdateState {
        check_requested: true,
        ..state_with(event(UpdateEventKind::Warning))
    };
    assert!(!controller.bootstrap(&state).contains(&BootAction::TriggerCheck));

    let mut controller = BootController::new();
    let actions = controller.bootstrap(&UpdateState::initial(true));
    assert!(!actions.contains(&BootAction::TriggerCheck));
    assert_eq!(reveals(&actions), vec![REVEAL_DISABLED]);

    let mut controller = BootController::new();
    let state = UpdateState {
        available: Some(UpdateMetadata::with_version("2.0.0")),
        ..state_with(event(UpdateEventKind::Error))
    };
    assert!(!controller.bootstrap(&state).contains(&BootAction::TriggerCheck));
}

#[test]
fn test_bootstrap_resumes_download() {
    let mut controller = BootController::new();
    let state = UpdateState {
        download_in_progress: true,
        download_percent: 42.0,
        available: Some(UpdateMetadata::with_version("2.0.0")),
        ..state_with(progress(42.0))
    };

    let actions = controller.bootstrap(&state);
    assert_eq!(actions.first(), Some(&BootAction::Progress(42)));
    assert!(logs(&actions).is_empty());
    assert!(!actions.contains(&BootAction::TriggerCheck));
    assert!(!actions.contains(&BootAction::StartDownload));
}

#[test]
fn test_bootstrap_failure_reveals() {
    let mut controller = BootController::new();
    let actions = controller.bootstrap_failed("Update coordinator is not running");
    assert_eq!(reveals(&actions), vec![REVEAL_AFTER_ERROR]);
}

// ============================================================================
// Status log
// ============================================================================

#[test]
fn test_status_log_is_bounded() {
    let mut log = StatusLog::default();
    for i in 0..130 {
        log.push(&format!("line {}", i));
    }

    assert_eq!(log.len(), STATUS_LOG_CAPACITY);
    assert!(log.lines().next().unwrap().ends_with(" line 10"));
    assert!(log.lines().last().unwrap().ends_with(" line 129"));
    assert_eq!(log.render().lines().count(), STATUS_LOG_CAPACITY);
}

#[test]
fn test_status_log_lines_are_timestamped() {
    let mut log = StatusLog::new(4);
    assert!(log.is_empty());
    log.push("hello");
    let line = log.lines().next().unwrap();
    let (time, message) = line.split_once(' ').unwrap();
    assert_eq!(message, "hello");
    assert!(chrono::NaiveTime::parse_from_str(time, "%H:%M:%S").is_ok());
}

// ============================================================================
// Driver
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum SurfaceCall {
    Status(String),
    Log(String),
    Progress(u8),
    ClearProgress,
    Reveal,
}

#[derive(Default)]
struct RecordingSurface {
    calls: Mutex<Vec<SurfaceCall>>,
}

impl RecordingSurface {
    fn reveal_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == SurfaceCall::Reveal)
            .count()
    }

    fn last_log(&self) -> Option<String> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            SurfaceCall::Log(text) => Some(text.clone()),
            _ => None,
        })
    }
}

impl BootSurface for RecordingSurface {
    fn set_status(&self, text: &str) {
        self.calls.lock().push(SurfaceCall::Status(text.to_string()));
    }

    fn set_log(&self, text: &str) {
        self.calls.lock().push(SurfaceCall::Log(text.to_string()));
    }

    fn show_progress(&self, percent: u8) {
        self.calls.lock().push(SurfaceCall::Progress(percent));
    }

    fn clear_progress(&self) {
        self.calls.lock().push(SurfaceCall::ClearProgress);
    }

    fn reveal(&self) {
        self.calls.lock().push(SurfaceCall::Reveal);
    }
}

struct FakeInner {
    state: Option<UpdateState>,
    check: CommandResult,
    download: CommandResult,
    install: CommandResult,
    checks: AtomicUsize,
    downloads: AtomicUsize,
    installs: AtomicUsize,
}

#[derive(Clone)]
struct FakeUpdates {
    inner: Arc<FakeInner>,
}

impl FakeUpdates {
    fn new(state: Option<UpdateState>) -> Self {
        Self::scripted(state, CommandResult::ok())
    }

    fn scripted(state: Option<UpdateState>, download: CommandResult) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                state,
                check: CommandResult::ok(),
                download,
                install: CommandResult::ok(),
                checks: AtomicUsize::new(0),
                downloads: AtomicUsize::new(0),
                installs: AtomicUsize::new(0),
            }),
        }
    }
}

#[async_trait]
impl UpdateControl for FakeUpdates {
    async fn current_state(&self) -> Result<UpdateState, UpdateError> {
        self.inner.state.clone().ok_or(UpdateError::CoordinatorStopped)
    }

    async fn request_check(&self) -> Result<CommandResult, UpdateError> {
        self.inner.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.check.clone())
    }

    async fn request_download(&self) -> Result<CommandResult, UpdateError> {
        self.inner.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.download.clone())
    }

    async fn request_install(&self) -> Result<CommandResult, UpdateError> {
        self.inner.installs.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.install.clone())
    }
}

fn checking_state() -> UpdateState {
    UpdateState {
        check_requested: true,
        ..state_with(event(UpdateEventKind::Checking))
    }
}

fn spawn_driver(
    updates: FakeUpdates,
) -> (
    Arc<RecordingSurface>,
    mpsc::UnboundedSender<UpdateEvent>,
    tokio::task::JoinHandle<()>,
) {
    let surface = Arc::new(RecordingSurface::default());
    let (tx, rx) = mpsc::unbounded_channel();
    let driver = BootDriver::new(Arc::clone(&surface), updates);
    let task = tokio::spawn(driver.run(rx));
    (surface, tx, task)
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

async fn advance(ms: u64) {
    tokio::time::advance(Duration::from_millis(ms)).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_driver_reveals_after_up_to_date() {
    let (surface, tx, _task) = spawn_driver(FakeUpdates::new(Some(checking_state())));
    settle().await;

    tx.send(event(UpdateEventKind::NotAvailable)).unwrap();
    settle().await;

    advance(799).await;
    assert_eq!(surface.reveal_count(), 0);
    advance(1).await;
    assert_eq!(surface.reveal_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_reschedules_reveal() {
    let (surface, tx, _task) = spawn_driver(FakeUpdates::new(Some(checking_state())));
    settle().await;

    tx.send(event(UpdateEventKind::Error)).unwrap();
    settle().await;
    advance(1000).await;

    tx.send(event(UpdateEventKind::Idle)).unwrap();
    settle().await;

    advance(599).await;
    assert_eq!(surface.reveal_count(), 0);
    advance(1).await;
    assert_eq!(surface.reveal_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_reveals_only_once() {
    let (surface, tx, _task) = spawn_driver(FakeUpdates::new(Some(checking_state())));
    settle().await;

    tx.send(event(UpdateEventKind::NotAvailable)).unwrap();
    settle().await;
    advance(800).await;

    tx.send(event(UpdateEventKind::Error)).unwrap();
    settle().await;
    advance(5000).await;

    assert_eq!(surface.reveal_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_bootstrap_triggers_check() {
    let updates = FakeUpdates::new(Some(UpdateState::initial(false)));
    let (surface, _tx, _task) = spawn_driver(updates.clone());
    settle().await;

    assert_eq!(updates.inner.checks.load(Ordering::SeqCst), 1);
    assert!(surface.last_log().unwrap().ends_with("Update check triggered."));
}

#[tokio::test(start_paused = true)]
async fn test_driver_refused_download_reveals() {
    let updates = FakeUpdates::scripted(
        Some(checking_state()),
        CommandResult::refused(ReasonCode::NoUpdateAvailable),
    );
    let (surface, tx, _task) = spawn_driver(updates.clone());
    settle().await;

    tx.send(UpdateEvent::new(
        UpdateEventKind::Available,
        Some(UpdateMetadata::with_version("2.0.0").into()),
    ))
    .unwrap();
    settle().await;
    assert_eq!(updates.inner.downloads.load(Ordering::SeqCst), 1);

    advance(1499).await;
    assert_eq!(surface.reveal_count(), 0);
    advance(1).await;
    assert_eq!(surface.reveal_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_driver_downloaded_requests_install() {
    let updates = FakeUpdates::new(Some(checking_state()));
    let (surface, tx, _task) = spawn_driver(updates.clone());
    settle().await;

    tx.send(progress(55.0)).unwrap();
    tx.send(event(UpdateEventKind::Downloaded)).unwrap();
    settle().await;

    assert_eq!(updates.inner.installs.load(Ordering::SeqCst), 1);
    let calls = surface.calls.lock().clone();
    assert!(calls.contains(&SurfaceCall::Progress(55)));
    assert!(calls.contains(&SurfaceCall::Progress(100)));
    assert!(calls.contains(&SurfaceCall::Status("Update ready. Restarting…".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_driver_reveals_when_stream_closes() {
    let (surface, tx, task) = spawn_driver(FakeUpdates::new(Some(checking_state())));
    settle().await;

    drop(tx);
    task.await.unwrap();
    assert_eq!(surface.reveal_count(), 1);
    assert!(!surface.calls.lock().contains(&SurfaceCall::ClearProgress));
}

#[tokio::test(start_paused = true)]
async fn test_driver_unreachable_coordinator() {
    let (surface, _tx, _task) = spawn_driver(FakeUpdates::new(None));
    settle().await;

    assert!(surface
        .last_log()
        .unwrap()
        .contains("Failed to initialize updater"));
    advance(1500).await;
    assert_eq!(surface.reveal_count(), 1);
}
