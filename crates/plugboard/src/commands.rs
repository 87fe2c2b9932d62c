// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations on top of the plugin directory.

use std::sync::Arc;

use plugboard_config::model::PlugboardConfig;
use plugboard_core::PlugboardError;
use plugboard_plugin::{
    ActionHandlers, CombinedScanner, ComponentRegistry, DirectorySettings, ListFilter,
    ManifestScanner, PluginDirectory,
};
use serde_json::Value;
use tracing::debug;

use crate::Commands;
use crate::builtin::builtin_scanner;
use crate::render::Output;

/// Opens the configured store over the built-in modules and the manifest
/// directory.
pub async fn open_directory(config: &PlugboardConfig) -> Result<PluginDirectory, PlugboardError> {
    let store = plugboard_storage::open_store(&config.storage).await?;

    let registry = Arc::new(ComponentRegistry::new());
    let builtins = builtin_scanner(&registry);
    let mut handlers = ActionHandlers::new();
    builtins.install(&registry, &mut handlers)?;

    let manifests = ManifestScanner::new(&config.scanner.manifest_dir)
        .with_provided(config.scanner.provided.iter().cloned());
    let scanner = CombinedScanner::new()
        .with(Arc::new(builtins))
        .with(Arc::new(manifests));

    debug!(
        manifest_dir = %config.scanner.manifest_dir,
        backend = ?config.storage.backend,
        handlers = handlers.len(),
        "opening plugin directory"
    );
    PluginDirectory::open(
        DirectorySettings::from(&config.registry),
        store,
        Arc::new(scanner),
        registry,
        handlers,
    )
    .await
}

pub async fn run(
    command: Commands,
    config: &PlugboardConfig,
    output: &Output,
) -> Result<(), PlugboardError> {
    let directory = open_directory(config).await?;
    let result = execute(command, &directory, output).await;
    directory.close();
    result
}

async fn execute(
    command: Commands,
    directory: &PluginDirectory,
    output: &Output,
) -> Result<(), PlugboardError> {
    match command {
        Commands::Reconcile { group } => {
            let report = match group {
                Some(name) => directory.reconcile_group(&name).await?,
                None => directory.reconcile_all().await?,
            };
            output.report(&report);
        }
        Commands::List { all } => {
            if all {
                let filter = ListFilter {
                    include_non_present: true,
                    include_hidden: true,
                    include_test_plugins: true,
                    ..Default::default()
                };
                output.listing(&directory.groups(&filter), &filter);
            } else {
                let filter = ListFilter {
                    include_test_plugins: directory.settings().include_test_plugins,
                    ..Default::default()
                };
                output.listing(&directory.admin_listing().await?, &filter);
            }
        }
        Commands::Show { path } => {
            let descriptor = directory
                .descriptor(&path)
                .ok_or_else(|| PlugboardError::not_found("plugin", path.to_string()))?;
            output.descriptor(&descriptor);
        }
        Commands::Activate { path } => {
            directory.activate(&path).await?;
            output.done(&format!("{path} activated"));
        }
        Commands::Deactivate { path } => {
            directory.deactivate(&path).await?;
            output.done(&format!("{path} deactivated"));
        }
        Commands::SetOption {
            path,
            option,
            value,
        } => {
            directory
                .set_option_value(&path, &option, parse_value(&value))
                .await?;
            output.done(&format!("{path}: {option} updated"));
        }
        Commands::RunAction { path, action } => {
            directory.run_action(&path, &action).await?;
            output.done(&format!("{path}: {action} executed"));
        }
        Commands::Purge { yes } => {
            if !yes {
                return Err(PlugboardError::Config(
                    "purge deletes every stored descriptor; pass --yes to confirm".to_string(),
                ));
            }
            let removed = directory.purge().await?;
            output.done(&format!("{removed} group(s) purged"));
        }
    }
    Ok(())
}

/// Parses a command-line option value as JSON, falling back to a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
