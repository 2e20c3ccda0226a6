//! Tauri IPC commands for the Clovord desktop shell
//!
//! Commands are organized by functionality:
//! - Update commands (updates_check, updates_download, updates_install,
//!   updates_get_last_event)
//! - App commands (app_get_version)

pub mod updates;

pub use updates::*;
