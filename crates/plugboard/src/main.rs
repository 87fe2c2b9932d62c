// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugboard - administer plugin groups, plugins and their options.
//!
//! This is the binary entry point. Every command opens the configured
//! store, scans the built-in modules and the manifest directory, and acts
//! on the plugin directory.

mod builtin;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use plugboard_core::PluginPath;

/// Plugboard - administer plugin groups, plugins and their options.
#[derive(Parser, Debug)]
#[command(name = "plugboard", version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Disable colors.
    #[arg(long, global = true)]
    plain: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Merge the manifests with the persisted descriptors.
    Reconcile {
        /// Reconcile only this group.
        #[arg(long)]
        group: Option<String>,
    },
    /// List groups and their plugins.
    List {
        /// Include absent, hidden and test entries.
        #[arg(long)]
        all: bool,
    },
    /// Show the options and actions of a group or plugin.
    Show { path: PluginPath },
    /// Activate a group (`group`) or plugin (`group/plugin`).
    Activate { path: PluginPath },
    /// Deactivate a group or plugin.
    Deactivate { path: PluginPath },
    /// Set an option value. The value is parsed as JSON, or taken as a string.
    SetOption {
        path: PluginPath,
        option: String,
        value: String,
    },
    /// Run a configuration action. Only actions of built-in groups have
    /// handlers; manifest-declared actions fail with "no handler registered".
    RunAction { path: PluginPath, action: String },
    /// Delete every persisted descriptor.
    Purge {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => plugboard_config::load_and_validate_path(path),
        None => plugboard_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            plugboard_config::render_errors(&errors);
            std::process::exit(2);
        }
    };

    init_tracing(&config.log.level);

    let output = render::Output::new(cli.json, cli.plain);
    if let Err(e) = commands::run(cli.command, &config, &output).await {
        output.error(&e);
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "plugboard={log_level},plugboard_plugin={log_level},plugboard_storage={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
