// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted stores for the Plugboard plugin registry.
//!
//! Two [`PluginStore`] backends are provided: [`SqliteStore`], a WAL-mode
//! SQLite database with embedded migrations whose writes are serialized
//! through `tokio-rusqlite`'s single background thread, and [`MemoryStore`]
//! for tests and throwaway runs. Both implement the same generation check.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;

use std::sync::Arc;

use plugboard_config::model::{StorageBackend, StorageConfig};
use plugboard_core::{PlugboardError, PluginStore};
use tracing::debug;

pub use adapter::SqliteStore;
pub use database::Database;
pub use memory::MemoryStore;

/// Open the store selected by `config.backend`.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn PluginStore>, PlugboardError> {
    let store: Arc<dyn PluginStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(config).await?),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    debug!(backend = store.name(), "plugin store opened");
    Ok(store)
}
