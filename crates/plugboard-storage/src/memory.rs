// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process [`PluginStore`] used by tests and the `memory` backend.

use std::sync::Mutex;

use async_trait::async_trait;
use plugboard_core::{PlugboardError, PluginStore, StoreSnapshot, StoreWrite};

/// Process-local store with the same generation semantics as SQLite.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    /// Create an empty store at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreSnapshot>, PlugboardError> {
        self.state
            .lock()
            .map_err(|_| PlugboardError::Internal("memory store lock poisoned".to_string()))
    }

    /// Bump the generation without writing, simulating a concurrent writer.
    pub fn touch(&self) -> Result<u64, PlugboardError> {
        let mut state = self.lock()?;
        state.generation += 1;
        Ok(state.generation)
    }
}

#[async_trait]
impl PluginStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> Result<StoreSnapshot, PlugboardError> {
        Ok(self.lock()?.clone())
    }

    async fn commit(
        &self,
        expected_generation: u64,
        writes: Vec<StoreWrite>,
    ) -> Result<u64, PlugboardError> {
        let mut state = self.lock()?;
        if state.generation != expected_generation {
            return Err(PlugboardError::Conflict {
                expected: expected_generation,
                found: state.generation,
            });
        }
        if writes.is_empty() {
            return Ok(state.generation);
        }

        // Writes land on a copy that replaces the state in one step.
        let mut entries = state.entries.clone();
        for write in writes {
            match write {
                StoreWrite::ReplaceGroup {
                    group,
                    entries: rows,
                } => {
                    entries.retain(|key, _| key.group != group);
                    entries.extend(rows);
                }
                StoreWrite::Clear => entries.clear(),
            }
        }
        state.entries = entries;
        state.generation += 1;
        Ok(state.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugboard_core::{EntryKind, PluginPath, StoreKey};

    fn row(group: &str, name: &str) -> (StoreKey, serde_json::Value) {
        (
            StoreKey::entry(&PluginPath::group(group), EntryKind::Option, name),
            serde_json::Value::Bool(true),
        )
    }

    #[tokio::test]
    async fn replace_group_leaves_other_groups_alone() {
        let store = MemoryStore::new();
        store
            .commit(
                0,
                vec![
                    StoreWrite::ReplaceGroup {
                        group: "a".into(),
                        entries: vec![row("a", "x"), row("a", "y")],
                    },
                    StoreWrite::ReplaceGroup {
                        group: "b".into(),
                        entries: vec![row("b", "z")],
                    },
                ],
            )
            .await
            .unwrap();
        store
            .commit(
                1,
                vec![StoreWrite::ReplaceGroup {
                    group: "a".into(),
                    entries: vec![row("a", "x")],
                }],
            )
            .await
            .unwrap();

        let snapshot = store.load().await.unwrap();
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.group_entries("b").count(), 1);
    }

    #[tokio::test]
    async fn empty_commit_keeps_generation() {
        let store = MemoryStore::new();
        assert_eq!(store.commit(0, Vec::new()).await.unwrap(), 0);
        assert_eq!(store.load().await.unwrap().generation, 0);
    }

    #[tokio::test]
    async fn touch_makes_pending_commit_conflict() {
        let store = MemoryStore::new();
        let snapshot = store.load().await.unwrap();
        store.touch().unwrap();

        let err = store
            .commit(snapshot.generation, vec![StoreWrite::Clear])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }
}
