// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity types shared across the registry and its persisted store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PlugboardError;

/// Identifies a plugin group (`"payment"`) or a leaf plugin inside a group
/// (`"payment/paypal"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginPath {
    pub group: String,
    pub plugin: Option<String>,
}

impl PluginPath {
    /// Path of a plugin group.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            group: name.into(),
            plugin: None,
        }
    }

    /// Path of a leaf plugin inside `group`.
    pub fn plugin(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            plugin: Some(name.into()),
        }
    }

    /// Returns true when this path names a group rather than a leaf plugin.
    pub fn is_group(&self) -> bool {
        self.plugin.is_none()
    }

    /// Path of the group this path belongs to (itself for a group).
    pub fn group_path(&self) -> PluginPath {
        PluginPath::group(self.group.clone())
    }

    /// Last path segment: the plugin name, or the group name for a group.
    pub fn name(&self) -> &str {
        self.plugin.as_deref().unwrap_or(&self.group)
    }

    /// Returns true if `other` is this path or, for a group, one of its plugins.
    pub fn covers(&self, other: &PluginPath) -> bool {
        match &self.plugin {
            Some(_) => self == other,
            None => self.group == other.group,
        }
    }
}

impl fmt::Display for PluginPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.plugin {
            Some(plugin) => write!(f, "{}/{}", self.group, plugin),
            None => write!(f, "{}", self.group),
        }
    }
}

impl FromStr for PluginPath {
    type Err = PlugboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlugboardError::Config(format!("invalid plugin path `{s}`"));
        match s.split_once('/') {
            None if !s.is_empty() => Ok(PluginPath::group(s)),
            Some((group, plugin))
                if !group.is_empty() && !plugin.is_empty() && !plugin.contains('/') =>
            {
                Ok(PluginPath::plugin(group, plugin))
            }
            _ => Err(invalid()),
        }
    }
}

/// Kind of a persisted entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Flags and metadata of a group or plugin.
    Descriptor,
    /// A persisted configuration option.
    Option,
    /// A persisted configuration action.
    Action,
}

/// Key of an entry in the persisted store: (group, plugin, kind, name).
///
/// Group-level entries have `plugin == None`. Descriptor rows use an empty name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey {
    pub group: String,
    pub plugin: Option<String>,
    pub kind: EntryKind,
    pub name: String,
}

impl StoreKey {
    /// Key of the descriptor row for `path`.
    pub fn descriptor(path: &PluginPath) -> Self {
        Self {
            group: path.group.clone(),
            plugin: path.plugin.clone(),
            kind: EntryKind::Descriptor,
            name: String::new(),
        }
    }

    /// Key of an option or action row owned by `path`.
    pub fn entry(path: &PluginPath, kind: EntryKind, name: impl Into<String>) -> Self {
        Self {
            group: path.group.clone(),
            plugin: path.plugin.clone(),
            kind,
            name: name.into(),
        }
    }

    /// Path of the descriptor owning this entry.
    pub fn owner(&self) -> PluginPath {
        PluginPath {
            group: self.group.clone(),
            plugin: self.plugin.clone(),
        }
    }
}
