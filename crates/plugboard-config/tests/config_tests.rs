// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Plugboard configuration system.

use plugboard_config::diagnostic::ConfigError;
use plugboard_config::model::StorageBackend;
use plugboard_config::{load_and_validate_str, load_config, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[log]
level = "debug"

[registry]
conflict_retries = 5
disable_when_broken = false
include_test_plugins = true
reload_on_admin_view = true

[storage]
backend = "memory"
database_path = "/tmp/plugboard-test.db"
wal_mode = false

[scanner]
manifest_dir = "/srv/plugins"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.registry.conflict_retries, 5);
    assert!(!config.registry.disable_when_broken);
    assert!(config.registry.include_test_plugins);
    assert!(config.registry.reload_on_admin_view);
    assert_eq!(config.storage.backend, StorageBackend::Memory);
    assert_eq!(config.storage.database_path, "/tmp/plugboard-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.scanner.manifest_dir, "/srv/plugins");
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.log.level, "info");
    assert_eq!(config.registry.conflict_retries, 3);
    assert!(config.registry.disable_when_broken);
    assert!(!config.registry.include_test_plugins);
    assert!(!config.registry.reload_on_admin_view);
    assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    assert_eq!(config.storage.database_path, "plugboard.db");
    assert!(config.storage.wal_mode);
    assert_eq!(config.scanner.manifest_dir, "plugins");
}

#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[registry]
conflict_retry = 2
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key must be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "conflict_retry" && s == "conflict_retries"
        )
    });
    assert!(found, "expected an UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[registry]
conflict_retries = "many"
"#;

    let errors = load_and_validate_str(toml).expect_err("wrong type must be rejected");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "expected InvalidType, got: {errors:?}"
    );
}

#[test]
fn validation_runs_after_deserialization() {
    let toml = r#"
[log]
level = "chatty"
"#;

    let errors = load_and_validate_str(toml).expect_err("invalid level must be rejected");
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

#[test]
fn env_var_overrides_local_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "plugboard.toml",
            r#"
[registry]
conflict_retries = 2
include_test_plugins = true
"#,
        )?;
        jail.set_env("PLUGBOARD_REGISTRY_CONFLICT_RETRIES", "7");
        jail.set_env("PLUGBOARD_STORAGE_DATABASE_PATH", "/var/lib/plugboard.db");

        let config = load_config().expect("layered config should load");
        assert_eq!(config.registry.conflict_retries, 7);
        assert!(config.registry.include_test_plugins);
        assert_eq!(config.storage.database_path, "/var/lib/plugboard.db");
        Ok(())
    });
}
