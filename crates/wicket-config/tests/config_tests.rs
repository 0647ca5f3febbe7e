// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Wicket configuration system.

use wicket_config::diagnostic::{suggest_key, ConfigError};
use wicket_config::model::WicketConfig;
use wicket_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_wicket_config() {
    let toml = r#"
[client]
log_level = "debug"
user_id = 7
display_name = "Ada"

[broker]
url = "wss://support.example.com/ws"
reconnect_delay_secs = 3
connect_timeout_secs = 5
subscription_buffer = 32

[api]
base_url = "https://support.example.com"
timeout_secs = 15

[auth]
token = "jwt-abc"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.client.log_level, "debug");
    assert_eq!(config.client.user_id, Some(7));
    assert_eq!(config.client.display_name, "Ada");
    assert_eq!(config.broker.url, "wss://support.example.com/ws");
    assert_eq!(config.broker.reconnect_delay_secs, 3);
    assert_eq!(config.broker.connect_timeout_secs, 5);
    assert_eq!(config.broker.subscription_buffer, 32);
    assert_eq!(config.api.base_url, "https://support.example.com");
    assert_eq!(config.api.timeout_secs, 15);
    assert_eq!(config.auth.token.as_deref(), Some("jwt-abc"));
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.client.log_level, "info");
    assert!(config.client.user_id.is_none());
    assert_eq!(config.client.display_name, "me");
    assert_eq!(config.broker.url, "ws://localhost:8080/ws");
    assert_eq!(config.broker.reconnect_delay_secs, 5);
    assert_eq!(config.broker.subscription_buffer, 64);
    assert_eq!(config.api.base_url, "http://localhost:8080");
    assert_eq!(config.api.timeout_secs, 30);
    assert!(config.auth.token.is_none());
}

/// Unknown field in [broker] section is rejected.
#[test]
fn unknown_field_in_broker_produces_error() {
    let toml = r#"
[broker]
ulr = "ws://x"
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("ulr"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected by deny_unknown_fields.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telemetry]
enabled = true
"#;

    let err =
        load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("telemetry"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Dotted overrides merge over TOML the way WICKET_* env vars do.
#[test]
fn dotted_override_beats_toml() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let toml_content = r#"
[broker]
url = "ws://from-toml/ws"
"#;

    let config: WicketConfig = Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::string(toml_content))
        .merge(("broker.url", "wss://from-env/ws"))
        .extract()
        .expect("should merge override");

    assert_eq!(config.broker.url, "wss://from-env/ws");
}

/// Underscore-containing keys map as one key, not nested sections.
#[test]
fn underscore_keys_stay_flat() {
    use figment::{providers::Serialized, Figment};

    let config: WicketConfig = Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(("broker.reconnect_delay_secs", 9u64))
        .extract()
        .expect("should set reconnect_delay_secs via dot notation");

    assert_eq!(config.broker.reconnect_delay_secs, 9);
}

/// Missing config files are silently skipped (Figment's Toml::file behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        providers::{Format, Serialized, Toml},
        Figment,
    };

    let config: WicketConfig = Figment::new()
        .merge(Serialized::defaults(WicketConfig::default()))
        .merge(Toml::file("/nonexistent/path/wicket.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.broker.reconnect_delay_secs, 5);
}

/// Unknown key "ulr" in [broker] produces a suggestion and valid key list.
#[test]
fn diagnostic_error_includes_unknown_key() {
    let toml = r#"
[broker]
ulr = "ws://x"
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(!errors.is_empty(), "should have at least one error");

    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "ulr"
                && suggestion.as_deref() == Some("url")
                && valid_keys.contains("reconnect_delay_secs")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'ulr' with suggestion 'url', got: {errors:?}"
    );
}

/// suggest_key finds close matches and rejects distant ones.
#[test]
fn diagnostic_suggestions() {
    let valid_keys = &["base_url", "timeout_secs"];
    assert_eq!(
        suggest_key("base_ulr", valid_keys),
        Some("base_url".to_string())
    );
    assert!(suggest_key("qqqqq", valid_keys).is_none());
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[broker]
reconnect_delay_secs = "soon"
"#;

    let err = load_config_from_str(toml).expect_err("should reject invalid type");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("invalid type") || err_str.contains("reconnect_delay_secs"),
        "error should mention type mismatch, got: {err_str}"
    );
}

/// ConfigError renders through miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "ulr".to_string(),
        suggestion: Some("url".to_string()),
        valid_keys: "url, reconnect_delay_secs, connect_timeout_secs, subscription_buffer"
            .to_string(),
        span: None,
        src: None,
    };

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("ulr"), "rendered report should mention the key");
    assert!(
        buf.contains("did you mean `url`"),
        "rendered report should carry the suggestion, got: {buf}"
    );
}

/// Validation failures surface through load_and_validate_str.
#[test]
fn validation_catches_bad_broker_scheme() {
    let toml = r#"
[broker]
url = "http://not-a-ws-endpoint"
"#;

    let errors = load_and_validate_str(toml).expect_err("bad scheme should fail");
    let has_validation_error = errors.iter().any(
        |e| matches!(e, ConfigError::Validation { message } if message.contains("broker.url")),
    );
    assert!(
        has_validation_error,
        "should have validation error for broker.url, got: {errors:?}"
    );
}

/// load_and_validate_str with valid TOML returns Ok config.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[broker]
url = "wss://support.example.com/ws"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.broker.url, "wss://support.example.com/ws");
}
