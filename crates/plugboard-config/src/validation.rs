// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{PlugboardConfig, StorageBackend};

/// Upper bound on `registry.conflict_retries`.
pub const MAX_CONFLICT_RETRIES: u32 = 16;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration, collecting every error.
pub fn validate_config(config: &PlugboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.log.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of: {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.registry.conflict_retries > MAX_CONFLICT_RETRIES {
        errors.push(ConfigError::Validation {
            message: format!(
                "registry.conflict_retries must be at most {MAX_CONFLICT_RETRIES}, got {}",
                config.registry.conflict_retries
            ),
        });
    }

    if config.storage.backend == StorageBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty for the sqlite backend".to_string(),
        });
    }

    if config.scanner.manifest_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "scanner.manifest_dir must not be empty".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&PlugboardConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = PlugboardConfig::default();
        config.log.level = "loud".to_string();
        config.registry.conflict_retries = 100;
        config.storage.database_path = " ".to_string();
        config.scanner.manifest_dir = String::new();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn memory_backend_does_not_need_a_database_path() {
        let mut config = PlugboardConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.storage.database_path = String::new();
        assert!(validate_config(&config).is_ok());
    }
}
