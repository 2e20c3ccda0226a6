//! Tests for the logging system

use super::*;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_log_level_display() {
    assert_eq!(LogLevel::Trace.to_string(), "trace");
    assert_eq!(LogLevel::Debug.to_string(), "debug");
    assert_eq!(LogLevel::Info.to_string(), "info");
    assert_eq!(LogLevel::Warn.as_str(), "warn");
    assert_eq!(LogLevel::Error.as_str(), "error");
}

#[test]
fn test_log_level_to_tracing() {
    assert_eq!(LogLevel::Debug.to_tracing_level(), tracing::Level::DEBUG);
    assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
}

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.format, LogFormat::Text);
    assert_eq!(config.output, LogOutput::Both);
    assert!(config.log_directory.is_some());
    assert_eq!(config.rotation, LogRotation::Daily);
    assert_eq!(config.max_files, Some(7));
}

#[test]
fn test_logging_config_builder() {
    let config = LoggingConfig::new()
        .with_level(LogLevel::Debug)
        .with_format(LogFormat::Json)
        .with_output(LogOutput::Console)
        .with_module_level("clovord_desktop::update", LogLevel::Trace)
        .with_thread_id(true)
        .with_rotation(LogRotation::Hourly, Some(3));

    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.output, LogOutput::Console);
    assert_eq!(
        config.module_levels.get("clovord_desktop::update"),
        Some(&LogLevel::Trace)
    );
    assert!(config.include_thread_id);
    assert_eq!(config.rotation, LogRotation::Hourly);
    assert_eq!(config.max_files, Some(3));
}

#[test]
fn test_development_config() {
    let config = LoggingConfig::development();
    assert_eq!(config.level, LogLevel::Debug);
    assert_eq!(config.output, LogOutput::Console);
    assert!(config.log_directory.is_none());
    assert!(config.include_file_info);
}

#[test]
fn test_production_config() {
    let config = LoggingConfig::production();
    assert_eq!(config.level, LogLevel::Info);
    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.output, LogOutput::Both);
    assert_eq!(config.module_levels.get("reqwest"), Some(&LogLevel::Warn));
    assert_eq!(config.max_files, Some(14));
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: LoggingConfig = serde_json::from_str(
        r#"{"level":"warn","format":"json","output":"file","log_directory":null}"#,
    )
    .unwrap();
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.output, LogOutput::File);
    assert!(config.include_target);
    assert_eq!(config.rotation, LogRotation::Daily);
    assert!(config.max_files.is_none());
}

#[test]
fn test_rotation_mapping() {
    use tracing_appender::rolling::Rotation;
    assert_eq!(LogRotation::Daily.to_appender_rotation(), Rotation::DAILY);
    assert_eq!(LogRotation::Hourly.to_appender_rotation(), Rotation::HOURLY);
    assert_eq!(LogRotation::Never.to_appender_rotation(), Rotation::NEVER);
}

#[test]
fn test_env_filter_includes_module_levels() {
    let config = LoggingConfig::new()
        .with_level(LogLevel::Info)
        .with_module_level("hyper", LogLevel::Warn);
    let filter = LoggingSystem::build_env_filter(&config).to_string();
    assert!(filter.contains("info"));
    assert!(filter.contains("hyper=warn"));
}

#[test]
fn test_default_log_directory_is_app_scoped() {
    let dir = default_log_directory();
    assert!(dir.ends_with("logs"));
}

#[test]
fn test_file_layer_writes_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = LoggingConfig::new()
        .with_output(LogOutput::File)
        .with_log_directory(temp_dir.path().to_path_buf())
        .with_rotation(LogRotation::Never, None);

    let (layer, guard) =
        LoggingSystem::create_file_layer::<tracing_subscriber::Registry>(&config).unwrap();
    let subscriber = tracing_subscriber::registry().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("update check scheduled");
    });
    drop(guard);

    let contents = std::fs::read_to_string(temp_dir.path().join(LOG_FILE_NAME)).unwrap();
    assert!(contents.contains("update check scheduled"));
}
