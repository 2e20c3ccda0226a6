//! Logging System for the Clovord desktop shell
//!
//! Provides structured logging with:
//! - Configurable verbosity, globally and per module
//! - Console and/or non-blocking rolling file output
//! - Text or JSON formatting

mod config;

#[cfg(test)]
mod tests;

pub use config::{
    default_log_directory, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    LOG_FILE_NAME,
};

use std::path::PathBuf;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Logging system errors
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    InitializationError(String),

    #[error("Failed to create log directory: {0}")]
    DirectoryCreationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for logging operations
pub type LoggingResult<T> = Result<T, LoggingError>;

/// Installed logging system. Keep it alive for the lifetime of the process
/// so buffered file output is flushed on drop.
pub struct LoggingSystem {
    config: LoggingConfig,
    _guards: Vec<WorkerGuard>,
}

impl LoggingSystem {
    /// Initialize the logging system with the given configuration
    pub fn init(config: LoggingConfig) -> LoggingResult<Self> {
        // Ensure log directory exists
        if let Some(ref log_dir) = config.log_directory {
            std::fs::create_dir_all(log_dir).map_err(|e| {
                LoggingError::DirectoryCreationError(format!(
                    "Failed to create log directory {:?}: {}",
                    log_dir, e
                ))
            })?;
        }

        let mut guards = Vec::new();
        let env_filter = Self::build_env_filter(&config);
        let registry = tracing_subscriber::registry();

        match config.output {
            LogOutput::Console => {
                let fmt_layer = Self::create_console_layer(&config);
                registry
                    .with(env_filter)
                    .with(fmt_layer)
                    .try_init()
                    .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
            }
            LogOutput::File => {
                let (file_layer, guard) = Self::create_file_layer(&config)?;
                guards.push(guard);
                registry
                    .with(env_filter)
                    .with(file_layer)
                    .try_init()
                    .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
            }
            LogOutput::Both => {
                let console_layer = Self::create_console_layer(&config);
                let (file_layer, guard) = Self::create_file_layer(&config)?;
                guards.push(guard);
                registry
                    .with(env_filter)
                    .with(console_layer)
                    .with(file_layer)
                    .try_init()
                    .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
            }
        }

        Ok(Self {
            config,
            _guards: guards,
        })
    }

    /// Build environment filter from configuration.
    ///
    /// `RUST_LOG` directives, when set, are applied on top.
    fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
        let mut filter = EnvFilter::new(config.level.as_str());

        for (module, level) in &config.module_levels {
            if let Ok(directive) = format!("{}={}", module, level).parse() {
                filter = filter.add_directive(directive);
            }
        }

        if let Ok(overrides) = std::env::var(EnvFilter::DEFAULT_ENV) {
            for directive in overrides.split(',').filter(|d| !d.trim().is_empty()) {
                if let Ok(directive) = directive.trim().parse() {
                    filter = filter.add_directive(directive);
                }
            }
        }

        filter
    }

    /// Create console logging layer
    fn create_console_layer<S>(config: &LoggingConfig) -> impl Layer<S>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let layer = fmt::layer()
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_id)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info);

        if config.format == LogFormat::Json {
            layer.json().boxed()
        } else {
            layer.boxed()
        }
    }

    /// Create file logging layer with rotation
    fn create_file_layer<S>(config: &LoggingConfig) -> LoggingResult<(impl Layer<S>, WorkerGuard)>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        let log_dir = config
            .log_directory
            .clone()
            .unwrap_or_else(default_log_directory);

        let mut builder = RollingFileAppender::builder()
            .rotation(config.rotation.to_appender_rotation())
            .filename_prefix(LOG_FILE_NAME);
        if let Some(max_files) = config.max_files {
            builder = builder.max_log_files(max_files);
        }
        let file_appender = builder
            .build(&log_dir)
            .map_err(|e| LoggingError::InitializationError(e.to_string()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_target(config.include_target)
            .with_thread_ids(config.include_thread_id)
            .with_file(config.include_file_info)
            .with_line_number(config.include_file_info)
            .with_ansi(false); // No ANSI colors in file output

        if config.format == LogFormat::Json {
            Ok((layer.json().boxed(), guard))
        } else {
            Ok((layer.boxed(), guard))
        }
    }

    /// Get current log directory
    pub fn log_directory(&self) -> Option<&PathBuf> {
        self.config.log_directory.as_ref()
    }

    /// Get current log level
    pub fn log_level(&self) -> LogLevel {
        self.config.level
    }
}

/// Install a plain console subscriber; used when [`LoggingSystem::init`] fails
pub fn init_fallback_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .try_init();
}
