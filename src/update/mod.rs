//! Update module for the Clovord desktop shell
//!
//! This module provides the auto-update lifecycle:
//! - Lifecycle events and the canonical update record
//! - Admission control over check/download/install requests
//! - Relay of backend lifecycle callbacks to the UI
//! - A release feed backend with resumable, verified downloads

pub mod backend;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod feed;
pub mod handle;
pub mod state;


pub use backend::{
    backend_channel, BackendEvent, BackendEventReceiver, BackendEvents, BackendOptions,
    UpdateBackend,
};
pub use coordinator::{
    CoordinatorConfig, UpdateCoordinator, INSTALL_GRACE_PERIOD, UPDATE_CHECK_INTERVAL,
};
pub use error::{CheckOutcome, CommandResult, ReasonCode, Result, UpdateError};
pub use event::{
    DownloadProgress, Notice, UpdateEvent, UpdateEventKind, UpdateFile, UpdateMetadata,
    UpdatePayload, UPDATE_EVENT_CHANNEL,
};
pub use feed::{ExitHook, FeedBackend, FeedConfig};
pub use handle::UpdateHandle;
pub use state::{UpdatePhase, UpdateState, UpdateStateStore};
