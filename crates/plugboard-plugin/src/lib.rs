// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extension-point registry and plugin directory.
//!
//! Capabilities are typed sets of methods. Components subscribe to methods
//! and belong to a plugin; the [`ComponentRegistry`] dispatches calls to the
//! components of active plugins in priority order. The [`PluginDirectory`]
//! keeps the persisted descriptors of plugin groups and plugins in line
//! with what the deployed code declares.

pub mod action;
pub mod capability;
pub mod catalog;
pub mod component;
pub mod descriptor;
pub mod directory;
pub mod manifest;
pub mod option;
pub mod persist;
pub mod reconcile;
pub mod registry;
pub mod scanner;

pub use action::{ActionDeclaration, ActionFilter, ActionHandler, ActionHandlers, ConfigAction};
pub use capability::{Capability, CapabilityDescriptor, Method, MethodKey};
pub use catalog::{IndexProvider, NamedIndex, ProvideIndexes, collect_indexes};
pub use component::{Component, ComponentInfo, DEFAULT_PRIORITY, Handles, Subscriptions};
pub use descriptor::{ListFilter, PluginDescriptor};
pub use directory::{DirectorySettings, DirectoryState, PluginDirectory, ReloadReport};
pub use manifest::{ManifestScanner, parse_group_manifest, parse_plugin_manifest};
pub use option::{ConfigOption, ExtendedTypes, OptionDeclaration, OptionFilter, OptionType};
pub use reconcile::{Declaration, ReconcileContext, ReconcileWarning, Reconciled, reconcile_group};
pub use registry::{ActivationView, ComponentRegistry, EntryState};
pub use scanner::{CodeScanner, CombinedScanner, Module, ScanOutcome, StaticScanner};
