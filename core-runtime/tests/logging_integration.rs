//! Integration tests for logging system

use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};

#[test]
fn test_logging_configuration_roundtrips_through_core_config() {
    let logging = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug)
        .with_spans(true);

    let config = CoreConfig::builder()
        .logging(logging.clone())
        .build()
        .unwrap();

    assert_eq!(config.logging, logging);
}

#[test]
fn test_format_selection() {
    // Debug builds should default to Pretty
    #[cfg(debug_assertions)]
    assert_eq!(LogFormat::default(), LogFormat::Pretty);

    // Release builds should default to JSON
    #[cfg(not(debug_assertions))]
    assert_eq!(LogFormat::default(), LogFormat::Json);
}

#[test]
fn test_second_initialization_fails() {
    // Only one global subscriber can exist per process; this is the only test
    // in this binary that installs one.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn);

    init_logging(config.clone()).expect("first initialization succeeds");
    tracing::warn!(target: "core_library", "logging initialized");

    assert!(init_logging(config).is_err());
}
