use refactor_relay::config::Config;
use std::time::Duration;

#[test]
fn toml_overrides_and_defaults() {
    let config = Config::from_toml_str(
        r#"
backend_port = 8001
domain = "satellite"
compliance_targets = ["ecss", "do178c"]
interactive_timeout_ms = 15000
"#,
    )
    .unwrap();

    assert_eq!(config.backend_host, "127.0.0.1");
    assert_eq!(config.backend_port, 8001);
    assert_eq!(config.fallback_port(), 8000);
    assert_eq!(config.domain, "satellite");
    assert_eq!(config.compliance_targets, vec!["ecss", "do178c"]);
    assert_eq!(config.event_timeout(), Duration::from_millis(3000));
    assert_eq!(config.interactive_timeout(), Some(Duration::from_secs(15)));
    assert_eq!(config.otel_endpoint, None);
}

#[test]
fn empty_toml_is_all_defaults() {
    assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
}

#[test]
fn malformed_toml_is_a_config_error() {
    let err = Config::from_toml_str("backend_port = \"eight\"").unwrap_err();
    assert!(err.to_string().contains("bad config"));
}

#[test]
fn load_reports_missing_file() {
    let err = Config::load(std::path::Path::new("/nonexistent/relay.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/relay.toml"));
}

// Environment handling lives in one test so parallel tests never see each
// other's variables.
#[test]
fn config_from_env() {
    unsafe {
        std::env::set_var("RELAY_BACKEND_HOST", "10.0.0.5");
        std::env::set_var("RELAY_BACKEND_PORT", "9100");
        std::env::set_var("RELAY_DOMAIN", "hpc");
        std::env::set_var("RELAY_COMPLIANCE_TARGETS", "misra, iso26262");
        std::env::set_var("RELAY_EVENT_TIMEOUT_MS", "750");
        std::env::remove_var("RELAY_INTERACTIVE_TIMEOUT_MS");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.backend_host, "10.0.0.5");
    assert_eq!(config.backend_port, 9100);
    assert_eq!(config.fallback_port(), 8000);
    assert_eq!(config.domain, "hpc");
    assert_eq!(config.compliance_targets, vec!["misra", "iso26262"]);
    assert_eq!(config.event_timeout(), Duration::from_millis(750));
    assert_eq!(config.interactive_timeout(), None);

    unsafe {
        std::env::set_var("RELAY_BACKEND_PORT", "not-a-port");
    }
    assert!(Config::from_env().is_err());

    // Clean up
    unsafe {
        std::env::remove_var("RELAY_BACKEND_HOST");
        std::env::remove_var("RELAY_BACKEND_PORT");
        std::env::remove_var("RELAY_DOMAIN");
        std::env::remove_var("RELAY_COMPLIANCE_TARGETS");
        std::env::remove_var("RELAY_EVENT_TIMEOUT_MS");
    }
}
