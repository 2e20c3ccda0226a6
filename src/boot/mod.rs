//! Boot screen
//!
//! Shown while the startup update check runs. The boot screen follows the
//! update lifecycle, starts the download and install automatically, and
//! reveals the application once there is nothing left to wait for.

pub mod controller;
pub mod driver;

#[cfg(test)]
mod tests;

pub use controller::{
    BootAction, BootController, REVEAL_AFTER_ERROR, REVEAL_AFTER_INSTALL_FAILURE,
    REVEAL_DISABLED, REVEAL_IDLE, REVEAL_UP_TO_DATE,
};
pub use driver::{BootDriver, BootSurface, StatusLog, UpdateControl, STATUS_LOG_CAPACITY};
