// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent descriptors of plugin groups and plugins.

use std::collections::BTreeMap;

use plugboard_core::{PlugboardError, PluginPath};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{ActionFilter, ConfigAction};
use crate::option::{ConfigOption, ExtendedTypes, OptionFilter};

/// A plugin group or a plugin inside a group.
///
/// Groups carry their plugins as children; plugins never have children.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDescriptor {
    pub path: PluginPath,
    pub description: Option<String>,
    /// Code location the declaration came from.
    pub module: Option<String>,
    /// False when the code no longer declares this entry.
    pub present: bool,
    pub active: bool,
    /// False when a declared dependency is unavailable.
    pub usable: bool,
    pub visible: bool,
    pub test_plugin: bool,
    pub missing_dependencies: Vec<String>,
    pub(crate) options: BTreeMap<String, ConfigOption>,
    pub(crate) actions: BTreeMap<String, ConfigAction>,
    pub(crate) plugins: BTreeMap<String, PluginDescriptor>,
}

impl PluginDescriptor {
    fn new(path: PluginPath) -> Self {
        Self {
            path,
            description: None,
            module: None,
            present: false,
            active: false,
            usable: true,
            visible: true,
            test_plugin: false,
            missing_dependencies: Vec::new(),
            options: BTreeMap::new(),
            actions: BTreeMap::new(),
            plugins: BTreeMap::new(),
        }
    }

    /// A fresh, inactive group.
    pub fn new_group(name: impl Into<String>) -> Self {
        Self::new(PluginPath::group(name))
    }

    /// A fresh, inactive plugin of `group`.
    pub fn new_plugin(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(PluginPath::plugin(group, name))
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn is_group(&self) -> bool {
        self.path.is_group()
    }

    pub fn option(&self, name: &str) -> Option<&ConfigOption> {
        self.options.get(name)
    }

    /// Options matching `filter`, in declaration order.
    pub fn options(&self, filter: &OptionFilter) -> Vec<&ConfigOption> {
        let mut options: Vec<&ConfigOption> =
            self.options.values().filter(|o| filter.matches(o)).collect();
        options.sort_by_key(|o| (!o.present, o.order));
        options
    }

    /// Current value of option `name`.
    pub fn option_value(&self, name: &str) -> Result<&Value, PlugboardError> {
        self.options
            .get(name)
            .map(ConfigOption::value)
            .ok_or_else(|| PlugboardError::not_found("option", format!("{}:{name}", self.path)))
    }

    /// Coerces and stores a new value for option `name`. On a type mismatch
    /// the old value stays.
    pub fn set_option_value(
        &mut self,
        name: &str,
        value: Value,
        types: &ExtendedTypes,
    ) -> Result<(), PlugboardError> {
        let path = &self.path;
        self.options
            .get_mut(name)
            .ok_or_else(|| PlugboardError::not_found("option", format!("{path}:{name}")))?
            .set_value(value, types)
    }

    pub fn action(&self, name: &str) -> Option<&ConfigAction> {
        self.actions.get(name)
    }

    /// Actions matching `filter`, in declaration order.
    pub fn actions(&self, filter: &ActionFilter) -> Vec<&ConfigAction> {
        let mut actions: Vec<&ConfigAction> =
            self.actions.values().filter(|a| filter.matches(a)).collect();
        actions.sort_by_key(|a| a.order);
        actions
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }

    pub fn plugin_mut(&mut self, name: &str) -> Option<&mut PluginDescriptor> {
        self.plugins.get_mut(name)
    }

    /// Child plugins matching `filter`, sorted by name.
    pub fn plugins(&self, filter: &ListFilter) -> Vec<&PluginDescriptor> {
        self.plugins.values().filter(|p| filter.matches(p)).collect()
    }

    /// True if components of this descriptor may take part in dispatch on
    /// their own account. The owning group is checked separately.
    pub fn is_dispatchable(&self) -> bool {
        self.present && self.active && self.usable
    }

    /// Marks this descriptor and, for a group, every child as no longer
    /// present. Returns the paths that changed.
    pub(crate) fn mark_absent(&mut self) -> Vec<PluginPath> {
        let mut changed = Vec::new();
        if self.present {
            self.present = false;
            changed.push(self.path.clone());
        }
        for plugin in self.plugins.values_mut() {
            changed.extend(plugin.mark_absent());
        }
        changed
    }

    /// Flags shared by group and plugin rows, without the nested collections.
    pub(crate) fn record(&self) -> DescriptorRecord {
        DescriptorRecord {
            description: self.description.clone(),
            module: self.module.clone(),
            present: self.present,
            active: self.active,
            usable: self.usable,
            visible: self.visible,
            test_plugin: self.test_plugin,
            missing_dependencies: self.missing_dependencies.clone(),
        }
    }

    pub(crate) fn apply_record(&mut self, record: DescriptorRecord) {
        self.description = record.description;
        self.module = record.module;
        self.present = record.present;
        self.active = record.active;
        self.usable = record.usable;
        self.visible = record.visible;
        self.test_plugin = record.test_plugin;
        self.missing_dependencies = record.missing_dependencies;
    }
}

/// Persisted form of a descriptor's own flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DescriptorRecord {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    pub present: bool,
    pub active: bool,
    pub usable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub test_plugin: bool,
    #[serde(default)]
    pub missing_dependencies: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Selects groups or plugins in listings. The default lists present,
/// visible, non-test entries whether active or not.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub include_non_present: bool,
    pub only_active: bool,
    pub include_hidden: bool,
    pub include_test_plugins: bool,
}

impl ListFilter {
    pub fn matches(&self, descriptor: &PluginDescriptor) -> bool {
        (self.include_non_present || descriptor.present)
            && (!self.only_active || descriptor.active)
            && (self.include_hidden || descriptor.visible)
            && (self.include_test_plugins || !descriptor.test_plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionDeclaration;
    use serde_json::json;

    fn group_with_plugins() -> PluginDescriptor {
        let mut group = PluginDescriptor::new_group("search");
        group.present = true;
        for name in ["solr", "elastic", "mock"] {
            let mut plugin = PluginDescriptor::new_plugin("search", name);
            plugin.present = true;
            plugin.test_plugin = name == "mock";
            group.plugins.insert(name.into(), plugin);
        }
        group
    }

    #[test]
    fn new_descriptors_start_inactive() {
        let group = PluginDescriptor::new_group("search");
        assert!(group.is_group());
        assert!(!group.active);
        assert!(!group.present);
        assert!(group.usable);

        let plugin = PluginDescriptor::new_plugin("search", "solr");
        assert!(!plugin.is_group());
        assert_eq!(plugin.name(), "solr");
    }

    #[test]
    fn listing_hides_test_plugins_by_default() {
        let group = group_with_plugins();
        let names: Vec<&str> = group
            .plugins(&ListFilter::default())
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["elastic", "solr"]);

        let all = ListFilter {
            include_test_plugins: true,
            ..Default::default()
        };
        assert_eq!(group.plugins(&all).len(), 3);
    }

    #[test]
    fn mark_absent_covers_children() {
        let mut group = group_with_plugins();
        let changed = group.mark_absent();
        assert_eq!(changed.len(), 4);
        assert!(group.plugins.values().all(|p| !p.present));
        assert!(group.mark_absent().is_empty());
    }

    #[test]
    fn set_option_value_reports_unknown_option() {
        let mut plugin = PluginDescriptor::new_plugin("search", "solr");
        let decl = OptionDeclaration::new("url", "string");
        plugin
            .options
            .insert("url".into(), ConfigOption::declared(&decl, Value::Null, 0));

        let types = ExtendedTypes::new();
        plugin.set_option_value("url", json!("http://solr"), &types).unwrap();
        assert_eq!(plugin.option_value("url").unwrap(), &json!("http://solr"));

        let err = plugin.set_option_value("port", json!(1), &types).unwrap_err();
        assert!(matches!(err, PlugboardError::NotFound { .. }));
    }

    #[test]
    fn options_list_present_first_in_declaration_order() {
        let mut plugin = PluginDescriptor::new_plugin("search", "solr");
        for (order, name) in ["b", "a", "c"].into_iter().enumerate() {
            let decl = OptionDeclaration::new(name, "string");
            plugin
                .options
                .insert(name.into(), ConfigOption::declared(&decl, Value::Null, order));
        }
        plugin.options.get_mut("b").unwrap().present = false;

        let filter = OptionFilter {
            include_non_present: true,
            ..Default::default()
        };
        let names: Vec<&str> = plugin.options(&filter).iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b"]);
    }
}
