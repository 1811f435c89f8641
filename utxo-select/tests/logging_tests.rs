use serde_json::json;
use std::sync::Once;
use utxo_select::logging::{self, LogConfig, LogContext, LogLevel};

// Ensure logging is only initialized once across all tests
static INIT: Once = Once::new();

fn setup_logging() {
    INIT.call_once(|| {
        let config = LogConfig {
            level: LogLevel::Error,
            log_file: None,
            include_timestamps: false,
            include_source_location: false,
            json_format: true,
        };
        let _ = logging::init(&config);
    });
}

#[test]
fn test_logging_initialization_is_idempotent() {
    setup_logging();

    assert!(logging::init(&LogConfig::default()).is_ok());
    assert!(utxo_select::init().is_ok());

    logging::set_log_level(LogLevel::Debug);
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    logging::set_log_level(LogLevel::Error);
    assert_eq!(log::max_level(), log::LevelFilter::Error);
}

#[test]
fn test_log_event_accepts_every_context() {
    setup_logging();
    for context in [
        LogContext::Selection,
        LogContext::Settlement,
        LogContext::Normalization,
        LogContext::Config,
    ] {
        logging::log_event(LogLevel::Info, context, "event", Some(json!({ "fee": "479" })));
        logging::log_event(LogLevel::Trace, context, "event", None);
    }
}

#[test]
fn test_default_config() {
    let config = LogConfig::default();
    assert_eq!(config.level, LogLevel::Info);
    assert!(config.log_file.is_none());
    assert!(config.include_timestamps);
    assert!(!config.include_source_location);
    assert!(!config.json_format);
}

#[test]
fn test_config_serde() {
    let config = LogConfig {
        level: LogLevel::Warn,
        log_file: Some("/tmp/utxo-select.log".to_string()),
        include_timestamps: false,
        include_source_location: true,
        json_format: true,
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: LogConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_destinations_are_shortened() {
    assert_eq!(logging::sanitize_for_logging("bc1qchangeaddress"), "bc1q...ress");
    assert_eq!(logging::sanitize_for_logging("short"), "*****");
}
