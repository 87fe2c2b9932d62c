// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Plugboard plugin registry.

use thiserror::Error;

/// Boxed error produced by component subscribers and action handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across the registry, its stores and the CLI.
#[derive(Debug, Error)]
pub enum PlugboardError {
    /// A module declared malformed metadata (e.g. an action bound to an
    /// option that does not exist). Fatal to that module's reconciliation only.
    #[error("discovery error in module `{module}`: {message}")]
    Discovery { module: String, message: String },

    /// A value does not fit the declared type of an option. The previous
    /// value is retained.
    #[error("type mismatch for option `{option}`: {value} is not a valid {expected}")]
    TypeMismatch {
        option: String,
        value: String,
        expected: String,
    },

    /// A plugin cannot be used because some declared dependencies are missing.
    #[error("plugin `{plugin}` is not usable, missing dependencies: {}", missing.join(", "))]
    DependencyUnavailable { plugin: String, missing: Vec<String> },

    /// A subscriber failed during dispatch. No later subscriber was invoked.
    #[error("subscriber `{component}` of plugin `{plugin}` failed in `{method}`: {source}")]
    Dispatch {
        method: String,
        component: String,
        plugin: String,
        source: crate::BoxError,
    },

    /// The persisted store changed underneath a pending commit.
    #[error("store conflict: expected generation {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    /// Every retry of a conflicting commit failed.
    #[error("reload aborted after {attempts} conflicting attempts")]
    ConflictRetriesExhausted { attempts: u32 },

    /// A plugin, option or action does not exist.
    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    /// An action handler failed or is not registered.
    #[error("action `{action}` of plugin `{plugin}` failed: {source}")]
    Action {
        plugin: String,
        action: String,
        source: crate::BoxError,
    },

    /// Configuration errors (invalid settings, unusable paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage { source: crate::BoxError },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlugboardError {
    /// Returns true for the optimistic-concurrency conflict that callers retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PlugboardError::Conflict { .. })
    }

    /// Shorthand for a `NotFound` error.
    pub fn not_found(kind: &str, name: impl Into<String>) -> Self {
        PlugboardError::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    /// Shorthand for a `Discovery` error.
    pub fn discovery(module: impl Into<String>, message: impl Into<String>) -> Self {
        PlugboardError::Discovery {
            module: module.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for PlugboardError {
    fn from(err: serde_json::Error) -> Self {
        PlugboardError::Storage {
            source: Box::new(err),
        }
    }
}
