// SPDX-FileCopyrightText: 2026 Wicket Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as URL schemes and positive delay values.

use crate::diagnostic::ConfigError;
use crate::model::WicketConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &WicketConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let broker_url = config.broker.url.trim();
    if broker_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "broker.url must not be empty".to_string(),
        });
    } else if !broker_url.starts_with("ws://") && !broker_url.starts_with("wss://") {
        errors.push(ConfigError::Validation {
            message: format!("broker.url `{broker_url}` must use the ws:// or wss:// scheme"),
        });
    }

    if config.broker.reconnect_delay_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "broker.reconnect_delay_secs must be at least 1".to_string(),
        });
    }

    if config.broker.connect_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "broker.connect_timeout_secs must be at least 1".to_string(),
        });
    }

    if config.broker.subscription_buffer == 0 {
        errors.push(ConfigError::Validation {
            message: "broker.subscription_buffer must be at least 1".to_string(),
        });
    }

    let api_url = config.api.base_url.trim();
    if api_url.is_empty() {
        errors.push(ConfigError::Validation {
            message: "api.base_url must not be empty".to_string(),
        });
    } else if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
        errors.push(ConfigError::Validation {
            message: format!("api.base_url `{api_url}` must use the http:// or https:// scheme"),
        });
    }

    if config.api.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "api.timeout_secs must be at least 1".to_string(),
        });
    }

    if let Some(ref token) = config.auth.token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "auth.token must not be empty when set (omit it instead)".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = WicketConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn bad_broker_scheme_fails_validation() {
        let mut config = WicketConfig::default();
        config.broker.url = "http://localhost:8080/ws".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("ws://"))));
    }

    #[test]
    fn zero_reconnect_delay_fails_validation() {
        let mut config = WicketConfig::default();
        config.broker.reconnect_delay_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("reconnect_delay_secs"))
        ));
    }

    #[test]
    fn bad_api_scheme_fails_validation() {
        let mut config = WicketConfig::default();
        config.api.base_url = "ftp://backend".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("base_url"))));
    }

    #[test]
    fn empty_token_fails_validation() {
        let mut config = WicketConfig::default();
        config.auth.token = Some("   ".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("auth.token"))));
    }

    #[test]
    fn valid_custom_config_passes() {
        let mut config = WicketConfig::default();
        config.broker.url = "wss://support.example.com/ws".to_string();
        config.api.base_url = "https://support.example.com".to_string();
        config.auth.token = Some("jwt-token".to_string());
        config.client.user_id = Some(7);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = WicketConfig::default();
        config.broker.url = String::new();
        config.api.base_url = String::new();
        config.broker.subscription_buffer = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3, "expected all errors collected, got {errors:?}");
    }
}
