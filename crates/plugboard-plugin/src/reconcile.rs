// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merging persisted descriptors with what the code declares.
//!
//! [`reconcile_group`] is pure: it takes the persisted state of one group and
//! its current declaration, and returns the merged descriptor plus the
//! warnings and execute-on-load actions the merge produced. Nothing is
//! written until the caller commits the result.
//!
//! Merge rules:
//! - options keep their value across code changes, unless the option is
//!   `must_reload` or the declared type no longer accepts the value
//! - options the code stops declaring stay persisted, marked not present
//! - actions are rebuilt from the declaration every time
//! - plugins and groups the code stops declaring stay persisted, marked not present
//! - a group with unavailable dependencies leaves all its plugins not present

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use plugboard_core::{PlugboardError, PluginPath};
use serde::Deserialize;

use crate::action::{ActionDeclaration, ActionHandlers, ConfigAction};
use crate::descriptor::PluginDescriptor;
use crate::option::{ConfigOption, ExtendedTypes, OptionDeclaration};

/// What the code declares for one group or plugin.
///
/// Groups list their plugins in `plugins`; a plugin's own `plugins` must be empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub test_plugin: bool,
    /// Skipped entirely during reconciliation.
    #[serde(default)]
    pub ignore: bool,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub options: Vec<OptionDeclaration>,
    #[serde(default)]
    pub actions: Vec<ActionDeclaration>,
    #[serde(default)]
    pub plugins: Vec<Declaration>,
}

fn default_true() -> bool {
    true
}

impl Declaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn requires(mut self, dependency: impl Into<String>) -> Self {
        self.requires.push(dependency.into());
        self
    }

    pub fn option(mut self, option: OptionDeclaration) -> Self {
        self.options.push(option);
        self
    }

    pub fn action(mut self, action: ActionDeclaration) -> Self {
        self.actions.push(action);
        self
    }

    pub fn plugin(mut self, plugin: Declaration) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn test_plugin(mut self, test_plugin: bool) -> Self {
        self.test_plugin = test_plugin;
        self
    }

    pub fn ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Something a merge changed that an administrator may want to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWarning {
    /// The code no longer declares this option; its value is kept.
    OptionRetired { plugin: PluginPath, option: String },
    /// The code no longer declares this plugin or group.
    PluginMissing { plugin: PluginPath },
    /// The option's declared type changed and the old value no longer fits.
    ValueReset { plugin: PluginPath, option: String },
    /// Declared dependencies are not available.
    DependencyUnavailable { plugin: PluginPath, missing: Vec<String> },
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileWarning::OptionRetired { plugin, option } => {
                write!(f, "option `{option}` of `{plugin}` is no longer declared")
            }
            ReconcileWarning::PluginMissing { plugin } => {
                write!(f, "`{plugin}` is no longer present in the code")
            }
            ReconcileWarning::ValueReset { plugin, option } => {
                write!(f, "option `{option}` of `{plugin}` was reset to its default")
            }
            ReconcileWarning::DependencyUnavailable { plugin, missing } => {
                write!(f, "`{plugin}` is missing dependencies: {}", missing.join(", "))
            }
        }
    }
}

/// Inputs of a merge besides the descriptor and declaration.
pub struct ReconcileContext<'a> {
    pub types: &'a ExtendedTypes,
    pub handlers: &'a ActionHandlers,
    /// Names the deployment provides, for dependency checks.
    pub provided: &'a BTreeSet<String>,
    /// Deactivate plugins whose dependencies are missing.
    pub disable_when_broken: bool,
}

/// Result of merging one group.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub descriptor: PluginDescriptor,
    pub warnings: Vec<ReconcileWarning>,
    /// Execute-on-load actions to run, children before their group.
    pub on_load: Vec<(PluginPath, String)>,
}

/// Merges `persisted` (if any) with `declared` into a new group descriptor.
///
/// A discovery error means the declaration is malformed; the caller should
/// keep the persisted state for this group.
pub fn reconcile_group(
    persisted: Option<&PluginDescriptor>,
    declared: &Declaration,
    ctx: &ReconcileContext<'_>,
) -> Result<Reconciled, PlugboardError> {
    check_name(&declared.name, &declared.name)?;
    let mut descriptor = persisted
        .cloned()
        .unwrap_or_else(|| PluginDescriptor::new_group(declared.name.clone()));
    let mut warnings = Vec::new();
    let mut on_load = Vec::new();

    let missing = missing_dependencies(declared, ctx.provided);
    let usable = missing.is_empty();

    let mut seen = HashSet::new();
    let previously_present: Vec<String> = descriptor
        .plugins
        .values()
        .filter(|p| p.present)
        .map(|p| p.name().to_string())
        .collect();
    for plugin in descriptor.plugins.values_mut() {
        plugin.present = false;
    }

    if usable {
        for child in declared.plugins.iter().filter(|p| !p.ignore) {
            check_name(&declared.name, &child.name)?;
            if !seen.insert(child.name.as_str()) {
                return Err(PlugboardError::discovery(
                    declared.name.clone(),
                    format!("plugin `{}` is declared twice", child.name),
                ));
            }
            if !child.plugins.is_empty() {
                return Err(PlugboardError::discovery(
                    format!("{}/{}", declared.name, child.name),
                    "plugins cannot contain other plugins",
                ));
            }
            let mut plugin = descriptor
                .plugins
                .remove(&child.name)
                .unwrap_or_else(|| PluginDescriptor::new_plugin(declared.name.clone(), child.name.clone()));
            merge_entry(&mut plugin, child, ctx, &mut warnings, &mut on_load)?;
            descriptor.plugins.insert(child.name.clone(), plugin);
        }
    }

    for name in previously_present {
        if !seen.contains(name.as_str()) {
            warnings.push(ReconcileWarning::PluginMissing {
                plugin: PluginPath::plugin(declared.name.clone(), name),
            });
        }
    }

    merge_entry(&mut descriptor, declared, ctx, &mut warnings, &mut on_load)?;

    Ok(Reconciled {
        descriptor,
        warnings,
        on_load,
    })
}

/// Group and plugin names become store keys and path segments.
fn check_name(module: &str, name: &str) -> Result<(), PlugboardError> {
    if name.trim().is_empty() || name.contains('/') {
        return Err(PlugboardError::discovery(
            module,
            format!("invalid plugin name `{name}`: must be non-empty and contain no `/`"),
        ));
    }
    Ok(())
}

fn missing_dependencies(declared: &Declaration, provided: &BTreeSet<String>) -> Vec<String> {
    declared
        .requires
        .iter()
        .filter(|dep| !provided.contains(dep.as_str()))
        .cloned()
        .collect()
}

/// Merges the flags, options and actions of one descriptor.
fn merge_entry(
    descriptor: &mut PluginDescriptor,
    declared: &Declaration,
    ctx: &ReconcileContext<'_>,
    warnings: &mut Vec<ReconcileWarning>,
    on_load: &mut Vec<(PluginPath, String)>,
) -> Result<(), PlugboardError> {
    let missing = missing_dependencies(declared, ctx.provided);

    descriptor.present = true;
    descriptor.description = declared.description.clone();
    descriptor.module = declared.module.clone();
    descriptor.visible = declared.visible;
    descriptor.test_plugin = declared.test_plugin;
    descriptor.usable = missing.is_empty();
    if !missing.is_empty() {
        if ctx.disable_when_broken {
            descriptor.active = false;
        }
        warnings.push(ReconcileWarning::DependencyUnavailable {
            plugin: descriptor.path.clone(),
            missing: missing.clone(),
        });
    }
    descriptor.missing_dependencies = missing;

    merge_options(descriptor, &declared.options, ctx.types, warnings)?;
    rebuild_actions(descriptor, &declared.actions, ctx.handlers, on_load)
}

fn merge_options(
    descriptor: &mut PluginDescriptor,
    declared: &[OptionDeclaration],
    types: &ExtendedTypes,
    warnings: &mut Vec<ReconcileWarning>,
) -> Result<(), PlugboardError> {
    let module = descriptor.path.to_string();
    let mut seen = HashSet::new();
    let previously_present: Vec<String> = descriptor
        .options
        .values()
        .filter(|o| o.present)
        .map(|o| o.name.clone())
        .collect();
    for option in descriptor.options.values_mut() {
        option.present = false;
    }

    for (order, decl) in declared.iter().enumerate() {
        if !seen.insert(decl.name.as_str()) {
            return Err(PlugboardError::discovery(
                module,
                format!("option `{}` is declared twice", decl.name),
            ));
        }
        let default = types
            .coerce(&decl.name, &decl.option_type, decl.default.clone())
            .map_err(|err| {
                PlugboardError::discovery(
                    module.clone(),
                    format!("default of option `{}` is invalid: {err}", decl.name),
                )
            })?;

        match descriptor.options.get_mut(&decl.name) {
            Some(option) => {
                let retained = option.value().clone();
                option.description = decl.description.clone();
                option.sub_type = decl.sub_type.clone();
                option.editable = decl.editable;
                option.visible = decl.visible;
                option.must_reload = decl.must_reload;
                option.present = true;
                option.order = order;

                if option.option_type != decl.option_type {
                    option.option_type = decl.option_type.clone();
                    match types.coerce(&decl.name, &decl.option_type, retained) {
                        Ok(value) => option.replace_value(value),
                        Err(_) => {
                            option.replace_value(default.clone());
                            warnings.push(ReconcileWarning::ValueReset {
                                plugin: descriptor.path.clone(),
                                option: decl.name.clone(),
                            });
                        }
                    }
                }
                if decl.must_reload {
                    option.replace_value(default);
                }
            }
            None => {
                descriptor
                    .options
                    .insert(decl.name.clone(), ConfigOption::declared(decl, default, order));
            }
        }
    }

    for name in previously_present {
        if !seen.contains(name.as_str()) {
            warnings.push(ReconcileWarning::OptionRetired {
                plugin: descriptor.path.clone(),
                option: name,
            });
        }
    }
    Ok(())
}

fn rebuild_actions(
    descriptor: &mut PluginDescriptor,
    declared: &[ActionDeclaration],
    handlers: &ActionHandlers,
    on_load: &mut Vec<(PluginPath, String)>,
) -> Result<(), PlugboardError> {
    let module = descriptor.path.to_string();
    descriptor.actions.clear();
    for option in descriptor.options.values_mut() {
        option.associated_actions.clear();
    }

    for (order, decl) in declared.iter().enumerate() {
        if descriptor.actions.contains_key(&decl.name) {
            return Err(PlugboardError::discovery(
                module,
                format!("action `{}` is declared twice", decl.name),
            ));
        }
        if decl.visible && decl.button_text.is_none() {
            return Err(PlugboardError::discovery(
                module,
                format!("visible action `{}` has no button text", decl.name),
            ));
        }
        if let Some(option) = &decl.associated_option {
            match descriptor.options.get_mut(option) {
                Some(option) => option.associated_actions.push(decl.name.clone()),
                None => {
                    return Err(PlugboardError::discovery(
                        module,
                        format!(
                            "action `{}` is associated with option `{option}`, which does not exist",
                            decl.name
                        ),
                    ));
                }
            }
        }
        if let Some(unknown) = decl
            .triggered_by
            .iter()
            .find(|o| !descriptor.options.contains_key(o.as_str()))
        {
            return Err(PlugboardError::discovery(
                module,
                format!(
                    "action `{}` is triggered by option `{unknown}`, which does not exist",
                    decl.name
                ),
            ));
        }
        if decl.execute_on_load {
            if !handlers.contains(&descriptor.path, &decl.name) {
                return Err(PlugboardError::discovery(
                    module,
                    format!("action `{}` runs on load but has no handler", decl.name),
                ));
            }
            on_load.push((descriptor.path.clone(), decl.name.clone()));
        }
        descriptor
            .actions
            .insert(decl.name.clone(), ConfigAction::declared(decl, order));
    }
    Ok(())
}
