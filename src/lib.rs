//! Clovord desktop shell
//!
//! Wraps the Clovord web application in a desktop window and manages its
//! auto-update lifecycle:
//! - Update coordination with admission control and a single update record
//! - A release feed backend with resumable, verified downloads
//! - Notification sinks pushing every transition to the UI
//! - A boot screen that follows the startup update check
//! - Layered configuration and structured logging

pub mod boot;
pub mod core;
pub mod logging;
pub mod notify;
pub mod update;

#[cfg(feature = "desktop")]
pub mod commands;
#[cfg(feature = "desktop")]
pub mod shell;

// Re-export commonly used items
pub use core::config::ShellConfig;
pub use core::error::{Result, ShellError};
pub use notify::{ChannelSink, FanoutSink, NotificationSink};
pub use update::{
    CommandResult, CoordinatorConfig, FeedBackend, ReasonCode, UpdateCoordinator, UpdateEvent,
    UpdateHandle, UpdateState,
};
