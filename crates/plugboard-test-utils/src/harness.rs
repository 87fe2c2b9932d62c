// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end plugin directory tests.
//!
//! `TestHarness` wires a [`PluginDirectory`] to a [`StaticScanner`], a fresh
//! [`ComponentRegistry`] and either a [`ContendedStore`] or a SQLite store in
//! a temp directory.

use std::sync::Arc;

use plugboard_config::model::StorageConfig;
use plugboard_core::{PlugboardError, PluginPath, PluginStore};
use plugboard_plugin::{
    ActionHandlers, CodeScanner, ComponentRegistry, DirectorySettings, Module, PluginDescriptor,
    PluginDirectory, StaticScanner,
};
use plugboard_storage::SqliteStore;
use tempfile::TempDir;

use crate::store::ContendedStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    modules: Vec<Box<dyn FnOnce(&StaticScanner) + Send>>,
    provided: Vec<String>,
    settings: DirectorySettings,
    sqlite: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            modules: Vec::new(),
            provided: Vec::new(),
            settings: DirectorySettings::default(),
            sqlite: false,
        }
    }

    /// Adds a module to the scanner.
    pub fn with_module(mut self, module: impl Module + 'static) -> Self {
        self.modules
            .push(Box::new(move |scanner: &StaticScanner| scanner.add_module(module)));
        self
    }

    /// Marks an external dependency as available.
    pub fn with_provided(mut self, dependency: impl Into<String>) -> Self {
        self.provided.push(dependency.into());
        self
    }

    pub fn with_settings(mut self, settings: DirectorySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Persists to a SQLite database in a temp directory instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Build the harness: register every module, open the directory.
    /// Does not reconcile.
    pub async fn build(self) -> Result<TestHarness, PlugboardError> {
        let temp_dir = TempDir::new().map_err(|e| PlugboardError::Storage { source: e.into() })?;

        let scanner = Arc::new(StaticScanner::new());
        for add in self.modules {
            add(&scanner);
        }
        for dependency in self.provided {
            scanner.provide(dependency);
        }

        let registry = Arc::new(ComponentRegistry::new());
        let mut handlers = ActionHandlers::new();
        scanner.install(&registry, &mut handlers)?;

        let contended = Arc::new(ContendedStore::new());
        let store: Arc<dyn PluginStore> = if self.sqlite {
            let config = StorageConfig {
                database_path: temp_dir.path().join("plugins.db").display().to_string(),
                ..Default::default()
            };
            Arc::new(SqliteStore::open(&config).await?)
        } else {
            Arc::clone(&contended) as Arc<dyn PluginStore>
        };

        let directory = PluginDirectory::open(
            self.settings,
            Arc::clone(&store),
            Arc::clone(&scanner) as Arc<dyn CodeScanner>,
            Arc::clone(&registry),
            handlers,
        )
        .await?;

        Ok(TestHarness {
            directory,
            registry,
            scanner,
            store,
            contended,
            temp_dir,
        })
    }
}

/// A wired-up plugin directory for tests.
pub struct TestHarness {
    pub directory: PluginDirectory,
    pub registry: Arc<ComponentRegistry>,
    pub scanner: Arc<StaticScanner>,
    pub store: Arc<dyn PluginStore>,
    contended: Arc<ContendedStore>,
    temp_dir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Makes the next `n` commits conflict. Only affects the memory store.
    pub fn inject_conflicts(&self, n: u32) {
        self.contended.inject_conflicts(n);
    }

    /// Commit attempts on the memory store.
    pub fn commit_attempts(&self) -> u32 {
        self.contended.commit_attempts()
    }

    /// Temp directory owned by the harness.
    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// Descriptor at `path` ("group" or "group/plugin").
    pub fn descriptor(&self, path: &str) -> Option<PluginDescriptor> {
        path.parse::<PluginPath>()
            .ok()
            .and_then(|p| self.directory.descriptor(&p))
    }

    /// Activates each path in order.
    pub async fn activate(&self, paths: &[&str]) -> Result<(), PlugboardError> {
        for path in paths {
            self.directory.activate(&path.parse()?).await?;
        }
        Ok(())
    }
}
