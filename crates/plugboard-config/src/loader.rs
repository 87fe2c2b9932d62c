// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./plugboard.toml` > `~/.config/plugboard/plugboard.toml` >
//! `/etc/plugboard/plugboard.toml`, with `PLUGBOARD_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::PlugboardConfig;

/// Sections whose keys may be set from `PLUGBOARD_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &["log", "registry", "storage", "scanner"];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/plugboard/plugboard.toml";
pub(crate) const LOCAL_CONFIG: &str = "plugboard.toml";

/// Path of the per-user configuration file, if a config dir exists.
pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("plugboard/plugboard.toml"))
}

/// Build the full layered Figment.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/plugboard/plugboard.toml`
/// 3. `~/.config/plugboard/plugboard.toml`
/// 4. `./plugboard.toml`
/// 5. `PLUGBOARD_*` environment variables
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(PlugboardConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<PlugboardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string over compiled defaults.
pub fn load_config_from_str(toml_content: &str) -> Result<PlugboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PlugboardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PlugboardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PlugboardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Environment provider mapping `PLUGBOARD_REGISTRY_CONFLICT_RETRIES` to
/// `registry.conflict_retries`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores survive intact.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("PLUGBOARD_").map(|key| {
        let raw = key.as_str();
        for section in ENV_SECTIONS {
            if let Some(rest) = raw.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
                return format!("{section}.{rest}").into();
            }
        }
        raw.to_string().into()
    })
}
