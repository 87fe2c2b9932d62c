// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The plugin directory: persisted descriptors, reconciliation and the
//! administrative operations on top of them.
//!
//! Every write follows the same cycle: load a store snapshot, apply the
//! change to a copy of the descriptors, commit the diff guarded by the
//! snapshot generation, publish the new state, rebuild the dispatch table.
//! A conflicting commit restarts the cycle from a fresh read.

use std::sync::Arc;

use arc_swap::ArcSwap;
use plugboard_config::model::RegistryConfig;
use plugboard_core::{PlugboardError, PluginPath, PluginStore};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::action::{ActionFilter, ActionHandlers};
use crate::descriptor::{ListFilter, PluginDescriptor};
use crate::option::ExtendedTypes;
use crate::persist::{self, Groups};
use crate::reconcile::{Declaration, ReconcileContext, ReconcileWarning, reconcile_group};
use crate::registry::{ActivationView, ComponentRegistry};
use crate::scanner::{CodeScanner, ScanOutcome};

/// Behaviour switches of a [`PluginDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySettings {
    /// Retries after a conflicting commit before giving up.
    pub conflict_retries: u32,
    /// Deactivate plugins whose dependencies are missing.
    pub disable_when_broken: bool,
    /// Show test plugins in the admin listing.
    pub include_test_plugins: bool,
    /// Reconcile before serving the admin listing.
    pub reload_on_admin_view: bool,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for DirectorySettings {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            conflict_retries: config.conflict_retries,
            disable_when_broken: config.disable_when_broken,
            include_test_plugins: config.include_test_plugins,
            reload_on_admin_view: config.reload_on_admin_view,
        }
    }
}

/// Published descriptor state, as of one store generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryState {
    pub generation: u64,
    pub groups: Groups,
}

impl DirectoryState {
    pub fn descriptor(&self, path: &PluginPath) -> Option<&PluginDescriptor> {
        let group = self.groups.get(&path.group)?;
        match &path.plugin {
            None => Some(group),
            Some(name) => group.plugin(name),
        }
    }
}

impl ActivationView for DirectoryState {
    /// A plugin is dispatchable when it and its group are present, active
    /// and usable.
    fn is_dispatchable(&self, path: &PluginPath) -> bool {
        let Some(group) = self.groups.get(&path.group) else {
            return false;
        };
        if !group.is_dispatchable() {
            return false;
        }
        match &path.plugin {
            None => true,
            Some(name) => group.plugin(name).is_some_and(PluginDescriptor::is_dispatchable),
        }
    }
}

/// Outcome of a reconciliation.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Store generation after the commit.
    pub generation: u64,
    /// Groups merged successfully.
    pub reconciled: Vec<String>,
    /// Groups whose declaration was rejected; their persisted state is unchanged.
    pub failed: Vec<(String, PlugboardError)>,
    pub warnings: Vec<ReconcileWarning>,
}

impl ReloadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.warnings.is_empty()
    }
}

/// How the dispatch table follows a published state.
enum Refresh<'a> {
    Rebuild,
    Remove(&'a PluginPath),
}

/// Persisted plugin descriptors plus the operations that change them.
pub struct PluginDirectory {
    settings: DirectorySettings,
    store: Arc<dyn PluginStore>,
    scanner: Arc<dyn CodeScanner>,
    registry: Arc<ComponentRegistry>,
    handlers: ActionHandlers,
    types: ExtendedTypes,
    state: ArcSwap<DirectoryState>,
}

impl std::fmt::Debug for PluginDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("PluginDirectory")
            .field("store", &self.store.name())
            .field("generation", &state.generation)
            .field("groups", &state.groups.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl PluginDirectory {
    /// Loads the persisted descriptors and builds the dispatch table from
    /// them. Does not scan; call [`reconcile_all`](Self::reconcile_all) for that.
    pub async fn open(
        settings: DirectorySettings,
        store: Arc<dyn PluginStore>,
        scanner: Arc<dyn CodeScanner>,
        registry: Arc<ComponentRegistry>,
        handlers: ActionHandlers,
    ) -> Result<Self, PlugboardError> {
        let snapshot = store.load().await?;
        let state = DirectoryState {
            generation: snapshot.generation,
            groups: persist::decode(&snapshot)?,
        };
        registry.activate_all(&state)?;
        info!(
            store = store.name(),
            generation = state.generation,
            groups = state.groups.len(),
            "plugin directory opened"
        );
        Ok(Self {
            settings,
            store,
            scanner,
            registry,
            handlers,
            types: ExtendedTypes::new(),
            state: ArcSwap::from_pointee(state),
        })
    }

    /// Replaces the extended option types used for coercion.
    pub fn with_types(mut self, types: ExtendedTypes) -> Self {
        self.types = types;
        self
    }

    /// Drops the dispatch table and every registered component.
    pub fn close(&self) {
        self.registry.close();
        info!(store = self.store.name(), "plugin directory closed");
    }

    pub fn settings(&self) -> &DirectorySettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn types(&self) -> &ExtendedTypes {
        &self.types
    }

    /// The currently published state.
    pub fn state(&self) -> Arc<DirectoryState> {
        self.state.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.state.load().generation
    }

    /// Merges every scanned group with its persisted state and commits the
    /// result. Groups with malformed declarations keep their persisted
    /// state and are listed in [`ReloadReport::failed`].
    pub async fn reconcile_all(&self) -> Result<ReloadReport, PlugboardError> {
        let (mut report, generation) = self
            .transact("reconcile", Refresh::Rebuild, |groups| {
                let scan = self.scanner.scan()?;
                Ok(self.reconcile_scanned(groups, scan, None))
            })
            .await?;
        report.generation = generation;
        self.log_report(&report);
        Ok(report)
    }

    /// Reconciles a single group. Fails with `NotFound` if the scanner does
    /// not report it.
    pub async fn reconcile_group(&self, name: &str) -> Result<ReloadReport, PlugboardError> {
        let (mut report, generation) = self
            .transact("reconcile_group", Refresh::Rebuild, |groups| {
                let scan = self.scanner.scan()?;
                if scan.is_absent(name) {
                    return Err(PlugboardError::not_found("group", name));
                }
                Ok(self.reconcile_scanned(groups, scan, Some(name)))
            })
            .await?;
        report.generation = generation;
        self.log_report(&report);
        Ok(report)
    }

    fn reconcile_scanned(&self, groups: &mut Groups, scan: ScanOutcome, only: Option<&str>) -> ReloadReport {
        let ctx = ReconcileContext {
            types: &self.types,
            handlers: &self.handlers,
            provided: &scan.provided,
            disable_when_broken: self.settings.disable_when_broken,
        };
        let wanted = |name: &str| only.is_none_or(|o| o == name);
        let mut report = ReloadReport::default();

        for declared in scan.groups.iter().filter(|g| wanted(&g.name)) {
            match self.merge_group(groups.get(&declared.name), declared, &ctx) {
                Ok((descriptor, warnings)) => {
                    groups.insert(declared.name.clone(), descriptor);
                    report.reconciled.push(declared.name.clone());
                    report.warnings.extend(warnings);
                }
                Err(err) => report.failed.push((declared.name.clone(), err)),
            }
        }

        if only.is_none() {
            for (name, group) in groups.iter_mut() {
                if scan.is_absent(name) {
                    report.warnings.extend(
                        group
                            .mark_absent()
                            .into_iter()
                            .map(|plugin| ReconcileWarning::PluginMissing { plugin }),
                    );
                }
            }
        }

        report.failed.extend(
            scan.failures
                .into_iter()
                .filter(|(name, _)| wanted(name)),
        );
        report
    }

    /// Merges one group and runs its execute-on-load actions on the result.
    fn merge_group(
        &self,
        persisted: Option<&PluginDescriptor>,
        declared: &Declaration,
        ctx: &ReconcileContext<'_>,
    ) -> Result<(PluginDescriptor, Vec<ReconcileWarning>), PlugboardError> {
        let mut merged = reconcile_group(persisted, declared, ctx)?;
        for (path, action) in &merged.on_load {
            let target = match &path.plugin {
                None => &mut merged.descriptor,
                Some(name) => merged
                    .descriptor
                    .plugin_mut(name)
                    .ok_or_else(|| PlugboardError::not_found("plugin", path.to_string()))?,
            };
            debug!(plugin = %path, action = %action, "running execute-on-load action");
            self.handlers.run(path, action, target)?;
        }
        Ok((merged.descriptor, merged.warnings))
    }

    fn log_report(&self, report: &ReloadReport) {
        for warning in &report.warnings {
            warn!(%warning, "reconciliation warning");
        }
        for (group, err) in &report.failed {
            error!(group = %group, error = %err, "group not reconciled");
        }
        info!(
            generation = report.generation,
            reconciled = report.reconciled.len(),
            failed = report.failed.len(),
            warnings = report.warnings.len(),
            "plugins reconciled"
        );
    }

    /// Marks a group or plugin active.
    pub async fn activate(&self, path: &PluginPath) -> Result<(), PlugboardError> {
        let ((), generation) = self
            .transact("activate", Refresh::Rebuild, |groups| {
                let descriptor = descriptor_mut(groups, path)?;
                if !descriptor.present {
                    return Err(PlugboardError::not_found("present plugin", path.to_string()));
                }
                if !descriptor.usable {
                    return Err(PlugboardError::DependencyUnavailable {
                        plugin: path.to_string(),
                        missing: descriptor.missing_dependencies.clone(),
                    });
                }
                descriptor.active = true;
                Ok(())
            })
            .await?;
        info!(plugin = %path, generation, "plugin activated");
        Ok(())
    }

    /// Marks a group or plugin inactive and removes its subscribers.
    pub async fn deactivate(&self, path: &PluginPath) -> Result<(), PlugboardError> {
        let ((), generation) = self
            .transact("deactivate", Refresh::Remove(path), |groups| {
                descriptor_mut(groups, path)?.active = false;
                Ok(())
            })
            .await?;
        info!(plugin = %path, generation, "plugin deactivated");
        Ok(())
    }

    /// Stores a new option value, then runs the actions triggered by it.
    ///
    /// A type mismatch or a failing triggered action aborts the operation
    /// and leaves the stored value unchanged.
    pub async fn set_option_value(
        &self,
        path: &PluginPath,
        option: &str,
        value: Value,
    ) -> Result<(), PlugboardError> {
        let (triggered, generation) = self
            .transact("set_option_value", Refresh::Rebuild, |groups| {
                let descriptor = descriptor_mut(groups, path)?;
                let current = descriptor
                    .option(option)
                    .filter(|o| o.present)
                    .ok_or_else(|| PlugboardError::not_found("option", format!("{path}:{option}")))?;
                if !current.editable {
                    return Err(PlugboardError::Config(format!(
                        "option `{option}` of `{path}` is not editable"
                    )));
                }
                descriptor.set_option_value(option, value.clone(), &self.types)?;

                let triggered: Vec<String> = descriptor
                    .actions(&ActionFilter {
                        include_hidden: true,
                        ..Default::default()
                    })
                    .into_iter()
                    .filter(|a| a.is_triggered_by(option))
                    .map(|a| a.name.clone())
                    .collect();
                for action in &triggered {
                    self.handlers.run(path, action, descriptor)?;
                }
                Ok(triggered)
            })
            .await?;
        info!(
            plugin = %path,
            option,
            generation,
            triggered = triggered.len(),
            "option value saved"
        );
        Ok(())
    }

    /// Runs an action and commits whatever it changed.
    pub async fn run_action(&self, path: &PluginPath, action: &str) -> Result<(), PlugboardError> {
        let ((), generation) = self
            .transact("run_action", Refresh::Rebuild, |groups| {
                let descriptor = descriptor_mut(groups, path)?;
                if descriptor.action(action).is_none() {
                    return Err(PlugboardError::not_found("action", format!("{path}:{action}")));
                }
                self.handlers.run(path, action, descriptor)
            })
            .await?;
        info!(plugin = %path, action, generation, "action executed");
        Ok(())
    }

    /// Deletes every persisted descriptor. Returns how many groups were removed.
    pub async fn purge(&self) -> Result<usize, PlugboardError> {
        let (removed, generation) = self
            .transact("purge", Refresh::Rebuild, |groups| {
                let removed = groups.len();
                groups.clear();
                Ok(removed)
            })
            .await?;
        warn!(removed, generation, "all plugin descriptors purged");
        Ok(removed)
    }

    /// Re-reads the store and republishes it without reconciling.
    pub async fn refresh(&self) -> Result<u64, PlugboardError> {
        let snapshot = self.store.load().await?;
        let groups = persist::decode(&snapshot)?;
        self.publish(snapshot.generation, groups, Refresh::Rebuild)?;
        Ok(snapshot.generation)
    }

    /// Copy of the descriptor at `path` from the published state.
    pub fn descriptor(&self, path: &PluginPath) -> Option<PluginDescriptor> {
        self.state.load().descriptor(path).cloned()
    }

    /// Groups matching `filter`, sorted by name.
    pub fn groups(&self, filter: &ListFilter) -> Vec<PluginDescriptor> {
        self.state
            .load()
            .groups
            .values()
            .filter(|g| filter.matches(g))
            .cloned()
            .collect()
    }

    /// Plugins of `group` matching `filter`, sorted by name.
    pub fn plugins(&self, group: &str, filter: &ListFilter) -> Result<Vec<PluginDescriptor>, PlugboardError> {
        let state = self.state.load();
        let group = state
            .groups
            .get(group)
            .ok_or_else(|| PlugboardError::not_found("group", group))?;
        Ok(group.plugins(filter).into_iter().cloned().collect())
    }

    /// Groups as an administrator sees them: present and visible, with
    /// test plugins only when configured. Reconciles first when
    /// `reload_on_admin_view` is set.
    pub async fn admin_listing(&self) -> Result<Vec<PluginDescriptor>, PlugboardError> {
        if self.settings.reload_on_admin_view {
            self.reconcile_all().await?;
        }
        let filter = ListFilter {
            include_test_plugins: self.settings.include_test_plugins,
            ..Default::default()
        };
        let mut groups = self.groups(&filter);
        for group in &mut groups {
            group.plugins.retain(|_, plugin| filter.matches(plugin));
        }
        Ok(groups)
    }

    /// Runs one read-modify-commit cycle, retrying on store conflicts.
    async fn transact<T>(
        &self,
        operation: &'static str,
        refresh: Refresh<'_>,
        mut apply: impl FnMut(&mut Groups) -> Result<T, PlugboardError>,
    ) -> Result<(T, u64), PlugboardError> {
        let attempts = self.settings.conflict_retries.saturating_add(1);
        for attempt in 1..=attempts {
            let snapshot = self.store.load().await?;
            let before = persist::decode(&snapshot)?;
            let mut after = before.clone();
            let outcome = apply(&mut after)?;
            let writes = persist::diff(&before, &after)?;
            let written = writes.len();

            match self.store.commit(snapshot.generation, writes).await {
                Ok(generation) => {
                    debug!(operation, generation, groups_written = written, "changes committed");
                    self.publish(generation, after, refresh)?;
                    return Ok((outcome, generation));
                }
                Err(err) if err.is_conflict() => {
                    warn!(
                        operation,
                        attempt,
                        attempts,
                        error = %err,
                        "store changed underneath, retrying from a fresh read"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        error!(operation, attempts, "giving up after repeated store conflicts");
        Err(PlugboardError::ConflictRetriesExhausted { attempts })
    }

    /// Publishes `groups` unless a newer generation is already published,
    /// then brings the dispatch table in line.
    fn publish(&self, generation: u64, groups: Groups, refresh: Refresh<'_>) -> Result<(), PlugboardError> {
        let next = Arc::new(DirectoryState { generation, groups });
        let previous = self.state.rcu(|current| {
            if current.generation > generation {
                Arc::clone(current)
            } else {
                Arc::clone(&next)
            }
        });
        let published = previous.generation <= generation;

        match refresh {
            Refresh::Remove(path) if published => {
                self.registry.deactivate_plugin(path);
            }
            _ => {
                self.registry.mark_stale();
                let state = self.state.load_full();
                self.registry.activate_all(&*state)?;
            }
        }
        Ok(())
    }
}

fn descriptor_mut<'a>(groups: &'a mut Groups, path: &PluginPath) -> Result<&'a mut PluginDescriptor, PlugboardError> {
    let group = groups
        .get_mut(&path.group)
        .ok_or_else(|| PlugboardError::not_found("group", path.group.clone()))?;
    match &path.plugin {
        None => Ok(group),
        Some(name) => group
            .plugin_mut(name)
            .ok_or_else(|| PlugboardError::not_found("plugin", path.to_string())),
    }
}
