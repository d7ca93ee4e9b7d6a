//! Unit tests for configuration module

use genai_gateway::config::Settings;
use std::io::Write;

#[test]
fn test_default_settings() {
    let settings = Settings::default();

    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.server.port, 8080);
    assert!(settings.rate_limit.enabled);
    assert_eq!(settings.rate_limit.requests_per_window, 60);
    assert_eq!(settings.rate_limit.window_secs, 60);
    assert_eq!(settings.rate_limit.cleanup_interval_secs, 300);
    assert_eq!(settings.provider.default_model, "gpt-3.5-turbo");
    assert_eq!(settings.image.max_file_size, 10 * 1024 * 1024);
}

#[test]
fn test_settings_validation_valid() {
    assert!(Settings::default().validate().is_ok());
}

#[test]
fn test_settings_validation_invalid_port() {
    let mut settings = Settings::default();
    settings.server.port = 0;

    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_validation_zero_limit() {
    let mut settings = Settings::default();
    settings.rate_limit.requests_per_window = 0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.rate_limit.window_secs = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn test_settings_validation_empty_base_url() {
    let mut settings = Settings::default();
    settings.provider.base_url = "  ".to_string();

    assert!(settings.validate().is_err());
}

#[test]
fn test_load_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        r#"
server:
  port: 9191
rate_limit:
  requests_per_window: 5
  window_secs: 10
provider:
  base_url: "http://localhost:4010/v1"
  api_key: "test-key"
  default_model: "gpt-4o-mini"
logging:
  format: "pretty"
"#
    )
    .unwrap();

    let settings = Settings::load_from_path(file.path()).unwrap();

    assert_eq!(settings.server.port, 9191);
    assert_eq!(settings.server.host, "0.0.0.0");
    assert_eq!(settings.rate_limit.requests_per_window, 5);
    assert_eq!(settings.rate_limit.window_secs, 10);
    assert_eq!(settings.provider.base_url, "http://localhost:4010/v1");
    assert_eq!(settings.provider.resolve_api_key().as_deref(), Some("test-key"));
    assert_eq!(settings.provider.default_model, "gpt-4o-mini");
    assert_eq!(settings.provider.vision_model, "gpt-4o");
    assert_eq!(settings.logging.format, "pretty");
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load_from_path(dir.path().join("absent.yaml")).unwrap();

    assert_eq!(settings.rate_limit.requests_per_window, 60);
    assert_eq!(settings.provider.timeout_ms, 60000);
}

#[test]
fn test_load_rejects_invalid_values() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(file, "rate_limit:\n  requests_per_window: 0").unwrap();

    assert!(Settings::load_from_path(file.path()).is_err());
}
