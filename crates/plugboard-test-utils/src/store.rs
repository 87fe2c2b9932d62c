// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wrapper that injects commit conflicts.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use plugboard_core::{PlugboardError, PluginStore, StoreSnapshot, StoreWrite};
use plugboard_storage::MemoryStore;
use tracing::debug;

/// Memory store where the next `n` commits lose to a simulated concurrent
/// writer, as set by [`inject_conflicts`](Self::inject_conflicts).
#[derive(Debug, Default)]
pub struct ContendedStore {
    inner: MemoryStore,
    pending: AtomicU32,
    commits: AtomicU32,
}

impl ContendedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` commits conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.pending.store(n, Ordering::SeqCst);
    }

    /// Commit attempts seen so far, conflicting ones included.
    pub fn commit_attempts(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginStore for ContendedStore {
    fn name(&self) -> &str {
        "contended-memory"
    }

    async fn load(&self) -> Result<StoreSnapshot, PlugboardError> {
        self.inner.load().await
    }

    async fn commit(
        &self,
        expected_generation: u64,
        writes: Vec<StoreWrite>,
    ) -> Result<u64, PlugboardError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            let generation = self.inner.touch()?;
            debug!(generation, "injected concurrent write");
        }
        self.inner.commit(expected_generation, writes).await
    }
}
