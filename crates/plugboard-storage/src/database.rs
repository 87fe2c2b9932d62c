// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup and migrations.
//!
//! All access goes through one `tokio_rusqlite::Connection`, whose
//! background thread serializes every closure passed to `call()`.

use plugboard_core::PlugboardError;
use tracing::debug;

use crate::migrations;

/// Handle to the plugin state database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, PlugboardError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| PlugboardError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), PlugboardError> {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;"
            ))
            .map_err(|e| PlugboardError::Storage {
                source: Box::new(e),
            })?;
            migrations::run_migrations(conn)
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => PlugboardError::Storage {
                source: other.to_string().into(),
            },
        })?;

        debug!(path, wal_mode, "plugin state database ready");
        Ok(Self { conn })
    }

    /// The underlying connection. Query modules call through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

/// Map a `tokio_rusqlite` error into the storage variant.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> PlugboardError {
    PlugboardError::Storage {
        source: Box::new(e),
    }
}
