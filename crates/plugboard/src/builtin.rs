// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modules compiled into the binary.
//!
//! Manifests declare metadata only, so their actions have no handler here.
//! The `catalog` group ships with the binary and is always scanned ahead of
//! the manifest directory.

use std::sync::{Arc, Weak};

use plugboard_core::{BoxError, PlugboardError, PluginPath};
use plugboard_plugin::{
    ActionDeclaration, ActionHandlers, Component, ComponentRegistry, Declaration, ExtendedTypes,
    Handles, Module, NamedIndex, OptionDeclaration, PluginDescriptor, ProvideIndexes,
    StaticScanner, Subscriptions, collect_indexes,
};
use serde_json::json;

pub const CATALOG: &str = "catalog";

/// Built-in modules, wired to `registry`.
pub fn builtin_scanner(registry: &Arc<ComponentRegistry>) -> StaticScanner {
    StaticScanner::new().with_module(CatalogModule {
        registry: Arc::downgrade(registry),
    })
}

fn upgrade(registry: &Weak<ComponentRegistry>) -> Result<Arc<ComponentRegistry>, BoxError> {
    registry.upgrade().ok_or_else(|| "component registry is closed".into())
}

/// Publishes the methods that currently have subscribers as the `methods` index.
struct MethodIndex {
    registry: Weak<ComponentRegistry>,
}

impl Component for MethodIndex {
    fn plugin(&self) -> PluginPath {
        PluginPath::plugin(CATALOG, "methods")
    }

    fn subscribe(subscriptions: &mut Subscriptions<Self>) {
        subscriptions.on::<ProvideIndexes>();
    }
}

impl Handles<ProvideIndexes> for MethodIndex {
    fn handle(&self, _: &()) -> Result<Vec<NamedIndex>, BoxError> {
        let methods: Vec<String> = upgrade(&self.registry)?
            .methods()
            .iter()
            .map(ToString::to_string)
            .collect();
        Ok(vec![NamedIndex::new("methods", methods)])
    }
}

struct CatalogModule {
    registry: Weak<ComponentRegistry>,
}

impl Module for CatalogModule {
    fn declaration(&self) -> Declaration {
        Declaration::new(CATALOG)
            .description("Secondary indexes contributed by active plugins")
            .module(module_path!())
            .option(
                OptionDeclaration::new("indexes", "list")
                    .description("Indexes found by the last refresh")
                    .default_value(json!([]))
                    .editable(false),
            )
            .action(
                ActionDeclaration::new("refresh")
                    .button_text("Refresh index list")
                    .associated_option("indexes")
                    .execute_on_load(true),
            )
            .plugin(
                Declaration::new("methods")
                    .description("Index of the methods that have active subscribers"),
            )
    }

    fn register_components(&self, registry: &ComponentRegistry) -> Result<(), PlugboardError> {
        registry
            .register(MethodIndex {
                registry: self.registry.clone(),
            })
            .map(drop)
    }

    fn register_actions(&self, handlers: &mut ActionHandlers) {
        let registry = self.registry.clone();
        handlers.register(
            PluginPath::group(CATALOG),
            "refresh",
            move |descriptor: &mut PluginDescriptor| -> Result<(), BoxError> {
                let names: Vec<String> = collect_indexes(&*upgrade(&registry)?)?
                    .into_iter()
                    .map(|index| index.name)
                    .collect();
                descriptor.set_option_value("indexes", json!(names), &ExtendedTypes::new())?;
                Ok(())
            },
        );
    }
}
