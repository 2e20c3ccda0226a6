//! Clovord desktop shell
//!
//! Main entry point for the Tauri application.

#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tauri::{Manager, RunEvent};

use clovord_desktop::boot::BootDriver;
use clovord_desktop::commands::{
    app_get_version, updates_check, updates_download, updates_get_last_event, updates_install,
};
use clovord_desktop::core::{update_credentials, ShellConfig};
use clovord_desktop::logging::{init_fallback_logging, LoggingConfig, LoggingSystem};
use clovord_desktop::notify::{ChannelSink, FanoutSink, NotificationSink, WindowSink};
use clovord_desktop::shell::{create_main_window, replay_last_event, WindowSurface};
use clovord_desktop::update::{backend_channel, FeedBackend, UpdateCoordinator, UpdateHandle};

fn main() -> anyhow::Result<()> {
    let dev_mode = cfg!(debug_assertions);

    let logging_config = if dev_mode {
        LoggingConfig::development()
    } else {
        LoggingConfig::production()
    };

    // Dropped right before the process ends so buffered file output is flushed
    let logging_system = match LoggingSystem::init(logging_config) {
        Ok(system) => Some(system),
        Err(e) => {
            eprintln!("Failed to initialize logging system: {}. Using basic logging.", e);
            init_fallback_logging();
            None
        }
    };
    let logging = Arc::new(Mutex::new(logging_system));
    let exit_logging = Arc::clone(&logging);

    let config = ShellConfig::load().context("Failed to load shell settings")?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        dev_mode,
        remote_origin = %config.remote_origin,
        "Starting Clovord desktop"
    );

    let app = tauri::Builder::default()
        .setup(move |app| {
            let handle = app.handle();
            create_main_window(&handle, &config.remote_origin)?;

            let (events, event_receiver) = backend_channel();
            let exit_handle = handle.clone();
            let backend = FeedBackend::new(config.feed_config(), events)?.with_exit_hook(move || {
                drop(exit_logging.lock().take());
                exit_handle.exit(0);
            });

            let (boot_sink, boot_events) = ChannelSink::new();
            let sink: Arc<dyn NotificationSink> = Arc::new(
                FanoutSink::default()
                    .with(Arc::new(WindowSink::new(handle.clone())))
                    .with(Arc::new(boot_sink)),
            );

            let coordinator = UpdateCoordinator::new(
                Arc::new(backend),
                sink,
                config.coordinator_config(dev_mode, update_credentials()),
            );
            let updates = coordinator.handle();
            app.manage(updates.clone());

            tauri::async_runtime::spawn(coordinator.run(event_receiver));

            let driver = BootDriver::new(Arc::new(WindowSurface::new(handle)), updates);
            tauri::async_runtime::spawn(driver.run(boot_events));

            Ok(())
        })
        .on_page_load(|window, _payload| replay_last_event(window))
        .invoke_handler(tauri::generate_handler![
            updates_check,
            updates_download,
            updates_install,
            updates_get_last_event,
            app_get_version,
        ])
        .build(tauri::generate_context!())
        .context("Failed to build the Tauri application")?;

    app.run(move |app_handle, event| {
        if let RunEvent::Exit = event {
            if let Some(updates) = app_handle.try_state::<UpdateHandle>() {
                updates.shutdown();
            }
            tracing::info!("Clovord desktop exiting");
            drop(logging.lock().take());
        }
    });

    Ok(())
}
