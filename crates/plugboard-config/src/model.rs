// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of being silently ignored.

use serde::{Deserialize, Serialize};

/// Top-level Plugboard configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlugboardConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Reconciliation and dispatch settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Persisted store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Code scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Reconciliation and registry behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// How many times a conflicting commit is retried from a fresh read.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,

    /// Force plugins with unavailable dependencies to inactive.
    #[serde(default = "default_true")]
    pub disable_when_broken: bool,

    /// Show plugins flagged as test plugins in listings.
    #[serde(default)]
    pub include_test_plugins: bool,

    /// Reconcile against the code surface before every admin listing.
    #[serde(default)]
    pub reload_on_admin_view: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            conflict_retries: default_conflict_retries(),
            disable_when_broken: true,
            include_test_plugins: false,
            reload_on_admin_view: false,
        }
    }
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

/// Persisted store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Which store backend to open.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    "plugboard.db".to_string()
}

/// Code scanner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Directory holding `<group>/group.toml` and `<group>/<plugin>/plugin.toml` manifests.
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: String,

    /// External dependency names the deployment provides (e.g. `openssl`).
    #[serde(default)]
    pub provided: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            manifest_dir: default_manifest_dir(),
            provided: Vec::new(),
        }
    }
}

fn default_manifest_dir() -> String {
    "plugins".to_string()
}

/// Persisted store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database at `storage.database_path`.
    #[default]
    Sqlite,
    /// Process-local store, discarded on exit.
    Memory,
}
