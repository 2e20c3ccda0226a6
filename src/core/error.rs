//! Error types for the Clovord desktop shell
//!
//! Module errors roll up into [`ShellError`]; recovery hints are exposed
//! through [`ErrorRecovery`].

use thiserror::Error;

use crate::logging::LoggingError;
use crate::notify::SinkError;
use crate::update::UpdateError;

/// Result type alias for shell operations
pub type Result<T> = std::result::Result<T, ShellError>;

/// Main error type for the shell
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Update error: {0}")]
    Update(#[from] UpdateError),

    #[error("Notification error: {0}")]
    Notify(#[from] SinkError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Trait for error recovery strategies
pub trait ErrorRecovery {
    /// Check if the error is retryable
    fn is_retryable(&self) -> bool;

    /// Get suggested retry delay in milliseconds
    fn retry_delay_ms(&self) -> Option<u64>;

    /// Get recovery action suggestion
    fn recovery_action(&self) -> RecoveryAction;
}

/// Recovery action suggestions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Retry the operation
    Retry,
    /// Continue without the failed operation
    Skip,
    /// Notify user and wait for input
    NotifyUser,
    /// Abort the operation
    Abort,
}

impl ErrorRecovery for UpdateError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpdateError::Network(_)
                | UpdateError::Io(_)
                | UpdateError::CheckFailed(_)
                | UpdateError::DownloadFailed(_)
                | UpdateError::ChecksumMismatch { .. }
                | UpdateError::RateLimited { .. }
        )
    }

    /// Suggested retry delay in milliseconds.
    ///
    /// `RateLimited` carries the server's `Retry-After` value.
    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            UpdateError::RateLimited { retry_after_secs } => Some(retry_after_secs * 1000),
            UpdateError::Network(_) => Some(5000),
            UpdateError::CheckFailed(_) | UpdateError::DownloadFailed(_) => Some(2000),
            UpdateError::Io(_) | UpdateError::ChecksumMismatch { .. } => Some(1000),
            _ => None,
        }
    }

    fn recovery_action(&self) -> RecoveryAction {
        match self {
            UpdateError::NoUpdateDiscovered | UpdateError::NoPendingUpdate => RecoveryAction::Skip,
            UpdateError::InstallFailed(_) => RecoveryAction::NotifyUser,
            UpdateError::InvalidVersion(_) | UpdateError::Serialization(_) => RecoveryAction::Skip,
            UpdateError::CoordinatorStopped => RecoveryAction::Abort,
            _ => RecoveryAction::Retry,
        }
    }
}

impl ErrorRecovery for ShellError {
    fn is_retryable(&self) -> bool {
        match self {
            ShellError::Update(e) => e.is_retryable(),
            ShellError::Io(_) => true,
            _ => false,
        }
    }

    fn retry_delay_ms(&self) -> Option<u64> {
        match self {
            ShellError::Update(e) => e.retry_delay_ms(),
            ShellError::Io(_) => Some(1000),
            _ => None,
        }
    }

    fn recovery_action(&self) -> RecoveryAction {
        match self {
            ShellError::Update(e) => e.recovery_action(),
            ShellError::Notify(_) | ShellError::Logging(_) => RecoveryAction::Skip,
            ShellError::Config(_) | ShellError::InvalidConfig { .. } => RecoveryAction::NotifyUser,
            ShellError::Io(_) => RecoveryAction::Retry,
            ShellError::Internal(_) => RecoveryAction::Abort,
        }
    }
}

/// Tauri commands report errors as strings
impl From<ShellError> for String {
    fn from(err: ShellError) -> Self {
        err.to_string()
    }
}
