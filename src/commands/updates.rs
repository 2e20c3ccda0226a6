//! Update commands
//!
//! Thin wrappers over the [`UpdateHandle`] held in Tauri managed state. Each
//! update command answers with a `{success, error?}` record; refusals are not
//! errors. `Err` is only returned when the coordinator is gone.

use tauri::{AppHandle, State};

use crate::update::{CommandResult, UpdateHandle, UpdateState};

/// Ask for an update check
#[tauri::command]
pub async fn updates_check(updates: State<'_, UpdateHandle>) -> Result<CommandResult, String> {
    let outcome = updates.check(false).await.map_err(|e| e.to_string())?;
    Ok(outcome.into())
}

/// Download the available update
#[tauri::command]
pub async fn updates_download(updates: State<'_, UpdateHandle>) -> Result<CommandResult, String> {
    updates.download().await.map_err(|e| e.to_string())
}

/// Quit and install the downloaded update
#[tauri::command]
pub async fn updates_install(updates: State<'_, UpdateHandle>) -> Result<CommandResult, String> {
    updates.install().await.map_err(|e| e.to_string())
}

/// Current update record, for a UI attaching after transitions happened
#[tauri::command]
pub async fn updates_get_last_event(
    updates: State<'_, UpdateHandle>,
) -> Result<UpdateState, String> {
    updates.snapshot().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub fn app_get_version(app: AppHandle) -> String {
    app.package_info().version.to_string()
}
