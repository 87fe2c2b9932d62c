// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of what the deployed code declares.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use plugboard_core::PlugboardError;
use tracing::warn;

use crate::action::ActionHandlers;
use crate::reconcile::Declaration;
use crate::registry::ComponentRegistry;

/// Result of one scan of the code.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Group declarations that parsed, `ignore`d ones excluded.
    pub groups: Vec<Declaration>,
    /// Groups whose metadata could not be read.
    pub failures: Vec<(String, PlugboardError)>,
    /// Names dependencies may refer to: every declared group (`g`), plugin
    /// (`g/p`), and anything else the deployment provides.
    pub provided: BTreeSet<String>,
}

impl ScanOutcome {
    /// Builds an outcome, deriving `provided` from the declarations plus `extra`.
    pub fn new(
        groups: Vec<Declaration>,
        failures: Vec<(String, PlugboardError)>,
        extra: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut provided: BTreeSet<String> = extra.into_iter().collect();
        let groups: Vec<Declaration> = groups.into_iter().filter(|g| !g.ignore).collect();
        for group in &groups {
            provided.insert(group.name.clone());
            for plugin in group.plugins.iter().filter(|p| !p.ignore) {
                provided.insert(format!("{}/{}", group.name, plugin.name));
            }
        }
        Self {
            groups,
            failures,
            provided,
        }
    }

    pub fn group(&self, name: &str) -> Option<&Declaration> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// True if the scan produced no result, good or bad, for `name`.
    pub fn is_absent(&self, name: &str) -> bool {
        self.group(name).is_none() && !self.failures.iter().any(|(g, _)| g == name)
    }
}

/// Source of group declarations.
pub trait CodeScanner: Send + Sync {
    /// Lists every group the code declares. Per-group failures go in
    /// [`ScanOutcome::failures`]; an `Err` means nothing could be scanned.
    fn scan(&self) -> Result<ScanOutcome, PlugboardError>;
}

/// A group of plugins linked into the binary.
pub trait Module: Send + Sync {
    fn declaration(&self) -> Declaration;

    /// Registers the components of the group and its plugins.
    fn register_components(&self, _registry: &ComponentRegistry) -> Result<(), PlugboardError> {
        Ok(())
    }

    /// Registers handlers for the group's and plugins' actions.
    fn register_actions(&self, _handlers: &mut ActionHandlers) {}
}

impl Module for Declaration {
    fn declaration(&self) -> Declaration {
        self.clone()
    }
}

/// Scanner over modules registered explicitly at startup.
#[derive(Default)]
pub struct StaticScanner {
    modules: RwLock<Vec<Arc<dyn Module>>>,
    provided: RwLock<BTreeSet<String>>,
}

impl std::fmt::Debug for StaticScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticScanner")
            .field("modules", &self.len())
            .finish()
    }
}

impl StaticScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(self, module: impl Module + 'static) -> Self {
        self.add_module(module);
        self
    }

    /// Adds a module, replacing one that declares the same group.
    pub fn add_module(&self, module: impl Module + 'static) {
        let name = module.declaration().name;
        if let Ok(mut modules) = self.modules.write() {
            modules.retain(|m| m.declaration().name != name);
            modules.push(Arc::new(module));
        }
    }

    /// Removes the module declaring `group`. Returns false if none did.
    pub fn remove_module(&self, group: &str) -> bool {
        match self.modules.write() {
            Ok(mut modules) => {
                let before = modules.len();
                modules.retain(|m| m.declaration().name != group);
                modules.len() != before
            }
            Err(_) => false,
        }
    }

    /// Marks an external dependency as available.
    pub fn provide(&self, dependency: impl Into<String>) {
        if let Ok(mut provided) = self.provided.write() {
            provided.insert(dependency.into());
        }
    }

    pub fn withdraw(&self, dependency: &str) {
        if let Ok(mut provided) = self.provided.write() {
            provided.remove(dependency);
        }
    }

    /// Registers every module's components and action handlers.
    pub fn install(
        &self,
        registry: &ComponentRegistry,
        handlers: &mut ActionHandlers,
    ) -> Result<(), PlugboardError> {
        for module in self.modules()? {
            module.register_components(registry)?;
            module.register_actions(handlers);
        }
        Ok(())
    }

    fn modules(&self) -> Result<Vec<Arc<dyn Module>>, PlugboardError> {
        self.modules
            .read()
            .map(|m| m.clone())
            .map_err(|_| PlugboardError::Internal("scanner lock poisoned".into()))
    }

    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CodeScanner for StaticScanner {
    fn scan(&self) -> Result<ScanOutcome, PlugboardError> {
        let groups = self.modules()?.iter().map(|m| m.declaration()).collect();
        let extra = self
            .provided
            .read()
            .map(|p| p.iter().cloned().collect::<Vec<_>>())
            .map_err(|_| PlugboardError::Internal("scanner lock poisoned".into()))?;
        Ok(ScanOutcome::new(groups, Vec::new(), extra))
    }
}

/// Scans several sources in turn. The first scanner that declares a group
/// owns it; later declarations of the same group are dropped.
#[derive(Default)]
pub struct CombinedScanner {
    scanners: Vec<Arc<dyn CodeScanner>>,
}

impl CombinedScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, scanner: Arc<dyn CodeScanner>) -> Self {
        self.scanners.push(scanner);
        self
    }
}

impl std::fmt::Debug for CombinedScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinedScanner")
            .field("scanners", &self.scanners.len())
            .finish()
    }
}

impl CodeScanner for CombinedScanner {
    fn scan(&self) -> Result<ScanOutcome, PlugboardError> {
        let mut combined = ScanOutcome::default();
        for scanner in &self.scanners {
            let outcome = scanner.scan()?;
            for group in outcome.groups {
                if combined.group(&group.name).is_some() {
                    warn!(group = %group.name, "group declared twice, keeping the first declaration");
                    continue;
                }
                combined.groups.push(group);
            }
            combined.failures.extend(outcome.failures);
            combined.provided.extend(outcome.provided);
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provided_names_cover_groups_plugins_and_extras() {
        let scanner = StaticScanner::new()
            .with_module(Declaration::new("search").plugin(Declaration::new("solr")))
            .with_module(Declaration::new("hidden").ignore(true));
        scanner.provide("java");

        let outcome = scanner.scan().unwrap();
        assert_eq!(outcome.groups.len(), 1);
        let provided: Vec<&str> = outcome.provided.iter().map(String::as_str).collect();
        assert_eq!(provided, vec!["java", "search", "search/solr"]);
        assert!(outcome.is_absent("hidden"));
    }

    #[test]
    fn modules_can_be_replaced_and_removed() {
        let scanner = StaticScanner::new().with_module(Declaration::new("search"));
        scanner.add_module(Declaration::new("search").description("v2"));
        assert_eq!(scanner.len(), 1);
        let outcome = scanner.scan().unwrap();
        assert_eq!(outcome.groups[0].description.as_deref(), Some("v2"));

        assert!(scanner.remove_module("search"));
        assert!(!scanner.remove_module("search"));
        assert!(scanner.scan().unwrap().groups.is_empty());
    }

    #[test]
    fn withdrawn_dependency_is_no_longer_provided() {
        let scanner = StaticScanner::new();
        scanner.provide("java");
        scanner.withdraw("java");
        assert!(scanner.scan().unwrap().provided.is_empty());
    }

    #[test]
    fn combined_scanner_merges_and_keeps_first_declaration() {
        let builtin = StaticScanner::new()
            .with_module(Declaration::new("catalog").description("built in"));
        let extra = StaticScanner::new()
            .with_module(Declaration::new("catalog").description("shadowed"))
            .with_module(Declaration::new("search").plugin(Declaration::new("solr")));
        extra.provide("java");

        let outcome = CombinedScanner::new()
            .with(Arc::new(builtin))
            .with(Arc::new(extra))
            .scan()
            .unwrap();

        let names: Vec<&str> = outcome.groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["catalog", "search"]);
        assert_eq!(
            outcome.group("catalog").unwrap().description.as_deref(),
            Some("built in")
        );
        assert!(outcome.provided.contains("java"));
        assert!(outcome.provided.contains("search/solr"));
        assert!(outcome.provided.contains("catalog"));
    }
}
