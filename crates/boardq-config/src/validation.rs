// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{BoardqConfig, StorageBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of failing fast.
pub fn validate_config(config: &BoardqConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        invalid("storage.database_path must not be empty for the sqlite backend".to_string());
    }

    if config.storage.change_poll_ms == 0 {
        invalid("storage.change_poll_ms must be at least 1".to_string());
    }

    if config.queue.history_limit == 0 {
        invalid("queue.history_limit must be at least 1".to_string());
    }

    if config.processor.claim_retry_ms == 0 {
        invalid("processor.claim_retry_ms must be at least 1".to_string());
    }

    if config.processor.interpreter_timeout_secs == Some(0) {
        invalid("processor.interpreter_timeout_secs must be positive when set".to_string());
    }

    if config.executor.step_timeout_secs == Some(0) {
        invalid("executor.step_timeout_secs must be positive when set".to_string());
    }

    if config.interpreter.request_timeout_secs == 0 {
        invalid("interpreter.request_timeout_secs must be at least 1".to_string());
    }

    if let Some(endpoint) = &config.interpreter.endpoint {
        let endpoint = endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            invalid(format!(
                "interpreter.endpoint `{endpoint}` must be an http:// or https:// URL"
            ));
        }
    }

    let level = config.log.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        invalid(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
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

    fn messages(config: &BoardqConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&BoardqConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_only_matters_for_sqlite() {
        let mut config = BoardqConfig::default();
        config.storage.database_path = "  ".to_string();
        assert!(messages(&config)[0].contains("database_path"));

        config.storage.backend = StorageBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut config = BoardqConfig::default();
        config.processor.interpreter_timeout_secs = Some(0);
        config.executor.step_timeout_secs = Some(0);
        let errors = messages(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|m| m.contains("interpreter_timeout_secs")));
        assert!(errors.iter().any(|m| m.contains("step_timeout_secs")));
    }

    #[test]
    fn zero_claim_retry_is_rejected() {
        let mut config = BoardqConfig::default();
        config.processor.claim_retry_ms = 0;
        let errors = messages(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("processor.claim_retry_ms must be at least 1"));
    }

    #[test]
    fn endpoint_must_be_http() {
        let mut config = BoardqConfig::default();
        config.interpreter.endpoint = Some("ftp://example.com".to_string());
        assert!(messages(&config)[0].contains("interpreter.endpoint"));

        config.interpreter.endpoint = Some("https://ai.example.com/command".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut config = BoardqConfig::default();
        config.log.level = "verbose".to_string();
        assert!(messages(&config)[0].contains("log.level"));
        config.log.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());
    }
}
