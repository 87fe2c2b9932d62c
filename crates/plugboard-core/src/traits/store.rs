// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted configuration boundary.
//!
//! The registry treats the store as an opaque, transactional key/value
//! container. Every commit names the generation it was computed from; a
//! store whose generation moved on rejects the commit with
//! [`PlugboardError::Conflict`] and the caller restarts from a fresh read.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::PlugboardError;
use crate::types::StoreKey;

/// A consistent read of every persisted entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
    /// Generation the snapshot was read at. Starts at 0 for an empty store.
    pub generation: u64,
    /// Every entry, ordered by key.
    pub entries: BTreeMap<StoreKey, serde_json::Value>,
}

impl StoreSnapshot {
    /// Names of all groups with at least one persisted entry.
    pub fn groups(&self) -> BTreeSet<String> {
        self.entries.keys().map(|k| k.group.clone()).collect()
    }

    /// Entries belonging to `group` (group-level and plugin-level).
    pub fn group_entries<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = (&'a StoreKey, &'a serde_json::Value)> + 'a {
        self.entries.iter().filter(move |(k, _)| k.group == group)
    }
}

/// A write applied as part of one commit.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    /// Replace every entry of a group with the given entries.
    ReplaceGroup {
        group: String,
        entries: Vec<(StoreKey, serde_json::Value)>,
    },
    /// Remove every entry.
    Clear,
}

/// Transactional key/value store holding persisted plugin state.
#[async_trait]
pub trait PluginStore: Send + Sync {
    /// Human-readable backend name used in logs.
    fn name(&self) -> &str;

    /// Read a consistent snapshot of all entries.
    async fn load(&self) -> Result<StoreSnapshot, PlugboardError>;

    /// Apply `writes` atomically if the store is still at `expected_generation`.
    ///
    /// Returns the new generation. An empty write list only validates the
    /// generation and leaves it unchanged.
    async fn commit(
        &self,
        expected_generation: u64,
        writes: Vec<StoreWrite>,
    ) -> Result<u64, PlugboardError>;
}
