// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot reads and generation-checked commits of plugin state rows.

use std::collections::BTreeMap;
use std::str::FromStr;

use plugboard_core::{EntryKind, PlugboardError, StoreKey, StoreSnapshot, StoreWrite};
use rusqlite::types::Type;
use rusqlite::{TransactionBehavior, params};

use crate::database::{Database, map_tr_err};

/// Outcome of a commit attempt inside the write transaction.
enum CommitOutcome {
    Committed(u64),
    Conflict { found: u64 },
}

fn read_generation(conn: &rusqlite::Connection) -> Result<u64, rusqlite::Error> {
    let value: i64 = conn.query_row(
        "SELECT value FROM store_meta WHERE key = 'generation'",
        [],
        |row| row.get(0),
    )?;
    Ok(value as u64)
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

/// Read every row plus the current generation in one transaction.
pub async fn load_snapshot(db: &Database) -> Result<StoreSnapshot, PlugboardError> {
    db.connection()
        .call(|conn| -> Result<StoreSnapshot, rusqlite::Error> {
            let tx = conn.transaction()?;
            let generation = read_generation(&tx)?;
            let mut entries = BTreeMap::new();
            {
                let mut stmt = tx.prepare(
                    "SELECT group_name, plugin_name, kind, name, value
                     FROM plugin_state
                     ORDER BY group_name, plugin_name, kind, name",
                )?;
                let rows = stmt.query_map([], |row| {
                    let plugin: String = row.get(1)?;
                    let kind: String = row.get(2)?;
                    let value: String = row.get(4)?;
                    let key = StoreKey {
                        group: row.get(0)?,
                        plugin: (!plugin.is_empty()).then_some(plugin),
                        kind: EntryKind::from_str(&kind).map_err(|e| conversion_error(2, e))?,
                        name: row.get(3)?,
                    };
                    let value: serde_json::Value =
                        serde_json::from_str(&value).map_err(|e| conversion_error(4, e))?;
                    Ok((key, value))
                })?;
                for row in rows {
                    let (key, value) = row?;
                    entries.insert(key, value);
                }
            }
            tx.commit()?;
            Ok(StoreSnapshot {
                generation,
                entries,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Apply `writes` if the stored generation still equals `expected`.
///
/// Uses an IMMEDIATE transaction so the generation check and the writes
/// happen under the same write lock.
pub async fn commit(
    db: &Database,
    expected: u64,
    writes: Vec<StoreWrite>,
) -> Result<u64, PlugboardError> {
    let outcome = db
        .connection()
        .call(move |conn| -> Result<CommitOutcome, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let found = read_generation(&tx)?;
            if found != expected {
                return Ok(CommitOutcome::Conflict { found });
            }
            if writes.is_empty() {
                return Ok(CommitOutcome::Committed(found));
            }

            for write in writes {
                match write {
                    StoreWrite::ReplaceGroup { group, entries } => {
                        tx.execute(
                            "DELETE FROM plugin_state WHERE group_name = ?1",
                            params![group],
                        )?;
                        for (key, value) in entries {
                            tx.execute(
                                "INSERT INTO plugin_state (group_name, plugin_name, kind, name, value)
                                 VALUES (?1, ?2, ?3, ?4, ?5)",
                                params![
                                    key.group,
                                    key.plugin.unwrap_or_default(),
                                    key.kind.to_string(),
                                    key.name,
                                    value.to_string(),
                                ],
                            )?;
                        }
                    }
                    StoreWrite::Clear => {
                        tx.execute("DELETE FROM plugin_state", [])?;
                    }
                }
            }

            let next = found + 1;
            tx.execute(
                "UPDATE store_meta SET value = ?1 WHERE key = 'generation'",
                params![next as i64],
            )?;
            tx.commit()?;
            Ok(CommitOutcome::Committed(next))
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        CommitOutcome::Committed(generation) => Ok(generation),
        CommitOutcome::Conflict { found } => Err(PlugboardError::Conflict { expected, found }),
    }
}
