// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration actions and their handlers.

use std::collections::HashMap;
use std::sync::Arc;

use plugboard_core::{BoxError, PlugboardError, PluginPath};
use serde::{Deserialize, Serialize};

use crate::descriptor::PluginDescriptor;

/// An action as declared by plugin code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDeclaration {
    pub name: String,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub associated_option: Option<String>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub execute_on_load: bool,
    #[serde(default)]
    pub triggered_by: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl ActionDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            button_text: None,
            associated_option: None,
            visible: true,
            execute_on_load: false,
            triggered_by: Vec::new(),
        }
    }

    pub fn button_text(mut self, text: impl Into<String>) -> Self {
        self.button_text = Some(text.into());
        self
    }

    pub fn associated_option(mut self, option: impl Into<String>) -> Self {
        self.associated_option = Some(option.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn execute_on_load(mut self, execute_on_load: bool) -> Self {
        self.execute_on_load = execute_on_load;
        self
    }

    pub fn triggered_by(mut self, option: impl Into<String>) -> Self {
        self.triggered_by.push(option.into());
        self
    }
}

/// A configuration action of a group or plugin. Rebuilt on every reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigAction {
    pub name: String,
    #[serde(default)]
    pub button_text: Option<String>,
    #[serde(default)]
    pub associated_option: Option<String>,
    pub visible: bool,
    pub execute_on_load: bool,
    #[serde(default)]
    pub triggered_by: Vec<String>,
    pub order: usize,
}

impl ConfigAction {
    pub(crate) fn declared(decl: &ActionDeclaration, order: usize) -> Self {
        Self {
            name: decl.name.clone(),
            button_text: decl.button_text.clone(),
            associated_option: decl.associated_option.clone(),
            visible: decl.visible,
            execute_on_load: decl.execute_on_load,
            triggered_by: decl.triggered_by.clone(),
            order,
        }
    }

    /// True if changing `option` should run this action.
    pub fn is_triggered_by(&self, option: &str) -> bool {
        self.triggered_by.iter().any(|o| o == option)
    }
}

/// Selects actions in listings. The default lists visible actions.
#[derive(Debug, Clone, Default)]
pub struct ActionFilter {
    pub include_hidden: bool,
    pub only_non_associated: bool,
    pub only_triggered: bool,
}

impl ActionFilter {
    pub fn matches(&self, action: &ConfigAction) -> bool {
        (self.include_hidden || action.visible)
            && (!self.only_non_associated || action.associated_option.is_none())
            && (!self.only_triggered || !action.triggered_by.is_empty())
    }
}

/// Code that runs when an action is executed. It may change the descriptor
/// that owns the action; changes are committed with the surrounding operation.
pub trait ActionHandler: Send + Sync {
    fn run(&self, descriptor: &mut PluginDescriptor) -> Result<(), BoxError>;
}

impl<F> ActionHandler for F
where
    F: Fn(&mut PluginDescriptor) -> Result<(), BoxError> + Send + Sync,
{
    fn run(&self, descriptor: &mut PluginDescriptor) -> Result<(), BoxError> {
        self(descriptor)
    }
}

/// Action handlers keyed by owning plugin and action name.
#[derive(Default, Clone)]
pub struct ActionHandlers {
    handlers: HashMap<(PluginPath, String), Arc<dyn ActionHandler>>,
}

impl std::fmt::Debug for ActionHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .handlers
            .keys()
            .map(|(path, name)| format!("{path}:{name}"))
            .collect();
        keys.sort();
        f.debug_struct("ActionHandlers").field("handlers", &keys).finish()
    }
}

impl ActionHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for action `name` of `path`, replacing any previous one.
    pub fn register(
        &mut self,
        path: PluginPath,
        name: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) {
        self.handlers.insert((path, name.into()), Arc::new(handler));
    }

    pub fn get(&self, path: &PluginPath, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&(path.clone(), name.to_string())).cloned()
    }

    pub fn contains(&self, path: &PluginPath, name: &str) -> bool {
        self.handlers.contains_key(&(path.clone(), name.to_string()))
    }

    /// Runs action `name` of the descriptor at `path`.
    pub fn run(
        &self,
        path: &PluginPath,
        name: &str,
        descriptor: &mut PluginDescriptor,
    ) -> Result<(), PlugboardError> {
        let handler = self.get(path, name).ok_or_else(|| PlugboardError::Action {
            plugin: path.to_string(),
            action: name.to_string(),
            source: "no handler registered".into(),
        })?;
        handler
            .run(descriptor)
            .map_err(|source| PlugboardError::Action {
                plugin: path.to_string(),
                action: name.to_string(),
                source,
            })
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
