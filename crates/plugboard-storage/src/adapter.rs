// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`PluginStore`] trait.

use async_trait::async_trait;
use plugboard_config::model::StorageConfig;
use plugboard_core::{PlugboardError, PluginStore, StoreSnapshot, StoreWrite};
use tracing::{debug, warn};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed plugin store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database configured in `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, PlugboardError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self { db })
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    /// Checkpoint the WAL so the database file is self-contained.
    pub async fn close(&self) -> Result<(), PlugboardError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("plugin store WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self) -> Result<StoreSnapshot, PlugboardError> {
        queries::state::load_snapshot(&self.db).await
    }

    async fn commit(
        &self,
        expected_generation: u64,
        writes: Vec<StoreWrite>,
    ) -> Result<u64, PlugboardError> {
        let result = queries::state::commit(&self.db, expected_generation, writes).await;
        if let Err(PlugboardError::Conflict { expected, found }) = &result {
            warn!(expected, found, "plugin store commit rejected: generation moved");
        }
        result
    }
}
