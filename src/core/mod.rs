//! Clovord Core Module
//!
//! This module contains the shell-wide pieces:
//! - Configuration loading and validation
//! - Error types and recovery hints

pub mod config;
pub mod error;


// Re-export commonly used items
pub use config::{credentials_from, update_credentials, ShellConfig};
pub use error::{ErrorRecovery, RecoveryAction, Result, ShellError};
