// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group and plugin declarations read from TOML manifests.
//!
//! Layout under the manifest directory:
//!
//! ```text
//! <dir>/<group>/group.toml
//! <dir>/<group>/<plugin>/plugin.toml
//! ```
//!
//! The directory names are the group and plugin names.

use std::fs;
use std::path::{Path, PathBuf};

use plugboard_core::PlugboardError;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::action::ActionDeclaration;
use crate::option::OptionDeclaration;
use crate::reconcile::Declaration;
use crate::scanner::{CodeScanner, ScanOutcome};

pub const GROUP_MANIFEST: &str = "group.toml";
pub const PLUGIN_MANIFEST: &str = "plugin.toml";

/// Intermediate TOML deserialization struct for `group.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GroupManifestFile {
    #[serde(default)]
    group: EntrySection,
    #[serde(default)]
    options: Vec<OptionDeclaration>,
    #[serde(default)]
    actions: Vec<ActionDeclaration>,
}

/// Intermediate TOML deserialization struct for `plugin.toml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginManifestFile {
    #[serde(default)]
    plugin: EntrySection,
    #[serde(default)]
    options: Vec<OptionDeclaration>,
    #[serde(default)]
    actions: Vec<ActionDeclaration>,
}

/// The `[group]` or `[plugin]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntrySection {
    name: Option<String>,
    description: Option<String>,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    test_plugin: bool,
    #[serde(default)]
    ignore: bool,
    #[serde(default)]
    requires: Vec<String>,
}

impl Default for EntrySection {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            visible: true,
            test_plugin: false,
            ignore: false,
            requires: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl EntrySection {
    fn into_declaration(
        self,
        expected: &str,
        module: String,
        options: Vec<OptionDeclaration>,
        actions: Vec<ActionDeclaration>,
    ) -> Result<Declaration, PlugboardError> {
        if let Some(name) = &self.name
            && name != expected
        {
            return Err(PlugboardError::discovery(
                module,
                format!("manifest names `{name}` but lives in directory `{expected}`"),
            ));
        }
        Ok(Declaration {
            name: expected.to_string(),
            description: self.description,
            module: Some(module),
            visible: self.visible,
            test_plugin: self.test_plugin,
            ignore: self.ignore,
            requires: self.requires,
            options,
            actions,
            plugins: Vec::new(),
        })
    }
}

/// Parse a `group.toml` for group `name`. Plugins are not included.
pub fn parse_group_manifest(name: &str, toml_content: &str) -> Result<Declaration, PlugboardError> {
    let file: GroupManifestFile = toml::from_str(toml_content)
        .map_err(|e| PlugboardError::discovery(name, format!("invalid group manifest: {e}")))?;
    file.group
        .into_declaration(name, name.to_string(), file.options, file.actions)
}

/// Parse a `plugin.toml` for plugin `name` of `group`.
pub fn parse_plugin_manifest(
    group: &str,
    name: &str,
    toml_content: &str,
) -> Result<Declaration, PlugboardError> {
    let module = format!("{group}/{name}");
    let file: PluginManifestFile = toml::from_str(toml_content).map_err(|e| {
        PlugboardError::discovery(module.clone(), format!("invalid plugin manifest: {e}"))
    })?;
    file.plugin
        .into_declaration(name, module, file.options, file.actions)
}

/// Scanner over a directory of manifests.
#[derive(Debug, Clone)]
pub struct ManifestScanner {
    root: PathBuf,
    provided: Vec<String>,
}

impl ManifestScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            provided: Vec::new(),
        }
    }

    /// Adds external dependency names the deployment provides.
    pub fn with_provided(mut self, provided: impl IntoIterator<Item = String>) -> Self {
        self.provided.extend(provided);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_group(&self, dir: &Path, name: &str) -> Result<Declaration, PlugboardError> {
        let manifest = dir.join(GROUP_MANIFEST);
        let content = read(&manifest, name)?;
        let mut group = parse_group_manifest(name, &content)?;
        group.module = Some(manifest.display().to_string());

        for (plugin_dir, plugin_name) in subdirectories(dir, name)? {
            let manifest = plugin_dir.join(PLUGIN_MANIFEST);
            if !manifest.is_file() {
                continue;
            }
            let content = read(&manifest, name)?;
            let mut plugin = parse_plugin_manifest(name, &plugin_name, &content)?;
            plugin.module = Some(manifest.display().to_string());
            group.plugins.push(plugin);
        }
        Ok(group)
    }
}

fn read(path: &Path, module: &str) -> Result<String, PlugboardError> {
    fs::read_to_string(path).map_err(|e| {
        PlugboardError::discovery(module, format!("cannot read {}: {e}", path.display()))
    })
}

/// Subdirectories of `dir` with UTF-8 names, sorted by name.
fn subdirectories(dir: &Path, module: &str) -> Result<Vec<(PathBuf, String)>, PlugboardError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        PlugboardError::discovery(module, format!("cannot list {}: {e}", dir.display()))
    })?;
    let mut dirs: Vec<(PathBuf, String)> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            Some((path, name))
        })
        .collect();
    dirs.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(dirs)
}

impl CodeScanner for ManifestScanner {
    fn scan(&self) -> Result<ScanOutcome, PlugboardError> {
        if !self.root.is_dir() {
            warn!(dir = %self.root.display(), "manifest directory does not exist, nothing to scan");
            return Ok(ScanOutcome::new(Vec::new(), Vec::new(), self.provided.clone()));
        }

        let dirs = subdirectories(&self.root, "manifests").map_err(|e| {
            PlugboardError::Config(format!("cannot scan {}: {e}", self.root.display()))
        })?;

        let mut groups = Vec::new();
        let mut failures = Vec::new();
        for (dir, name) in dirs {
            if !dir.join(GROUP_MANIFEST).is_file() {
                debug!(dir = %dir.display(), "no group manifest, skipping");
                continue;
            }
            match self.load_group(&dir, &name) {
                Ok(group) => groups.push(group),
                Err(e) => {
                    warn!(group = %name, error = %e, "group manifest rejected");
                    failures.push((name, e));
                }
            }
        }
        debug!(groups = groups.len(), failures = failures.len(), "manifests scanned");
        Ok(ScanOutcome::new(groups, failures, self.provided.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionType;
    use serde_json::json;

    #[test]
    fn parse_full_group_manifest() {
        let toml = r#"
[group]
description = "Payment gateways"
requires = ["openssl"]

[[options]]
name = "currency"
description = "Default currency"
type = "string"
default = "EUR"

[[options]]
name = "limits"
type = "mapping"
default = { daily = 100, monthly = 1000 }
must_reload = true

[[actions]]
name = "check"
button_text = "Check connectivity"
associated_option = "currency"
triggered_by = ["currency"]
"#;
        let group = parse_group_manifest("payment", toml).unwrap();
        assert_eq!(group.name, "payment");
        assert_eq!(group.description.as_deref(), Some("Payment gateways"));
        assert_eq!(group.requires, vec!["openssl"]);
        assert_eq!(group.options.len(), 2);
        assert_eq!(group.options[0].default, json!("EUR"));
        assert_eq!(group.options[1].option_type, OptionType::Mapping);
        assert_eq!(group.options[1].default, json!({"daily": 100, "monthly": 1000}));
        assert!(group.options[1].must_reload);
        assert!(group.options[0].editable);
        assert_eq!(group.actions[0].triggered_by, vec!["currency"]);
        assert!(group.actions[0].visible);
    }

    #[test]
    fn parse_minimal_plugin_manifest() {
        let plugin = parse_plugin_manifest("payment", "paypal", "[plugin]\n").unwrap();
        assert_eq!(plugin.name, "paypal");
        assert!(plugin.visible);
        assert!(!plugin.test_plugin);
        assert!(plugin.options.is_empty());
    }

    #[test]
    fn mismatched_name_is_rejected() {
        let err = parse_plugin_manifest("payment", "paypal", "[plugin]\nname = \"stripe\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("lives in directory"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_group_manifest("payment", "[group]\ncolour = \"red\"\n").unwrap_err();
        assert!(matches!(err, PlugboardError::Discovery { .. }));
    }

    #[test]
    fn unknown_keys_in_options_and_actions_are_rejected() {
        let misspelled_default = r#"
[[options]]
name = "currency"
type = "string"
defualt = "EUR"
"#;
        let err = parse_group_manifest("payment", misspelled_default).unwrap_err();
        assert!(matches!(err, PlugboardError::Discovery { .. }));
        assert!(err.to_string().contains("defualt"));

        let misspelled_label = r#"
[[actions]]
name = "check"
button_txt = "Check"
"#;
        let err = parse_plugin_manifest("payment", "paypal", misspelled_label).unwrap_err();
        assert!(matches!(err, PlugboardError::Discovery { .. }));
        assert!(err.to_string().contains("button_txt"));
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn scan_reads_groups_and_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("payment/group.toml"), "[group]\ndescription = \"Payments\"\n");
        write(&root.join("payment/paypal/plugin.toml"), "[plugin]\nrequires = [\"payment\"]\n");
        write(&root.join("payment/stripe/plugin.toml"), "[plugin]\ntest_plugin = true\n");
        write(&root.join("payment/assets/logo.txt"), "not a plugin");
        write(&root.join("search/group.toml"), "[group]\nignore = true\n");
        write(&root.join("broken/group.toml"), "[group\n");
        write(&root.join("notes/readme.txt"), "no manifest here");

        let outcome = ManifestScanner::new(root)
            .with_provided(vec!["openssl".to_string()])
            .scan()
            .unwrap();

        assert_eq!(outcome.groups.len(), 1);
        let payment = &outcome.groups[0];
        let plugins: Vec<&str> = payment.plugins.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(plugins, vec!["paypal", "stripe"]);
        assert!(payment.plugins[1].test_plugin);
        assert!(payment.module.as_deref().unwrap().ends_with("group.toml"));

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "broken");
        assert!(outcome.provided.contains("openssl"));
        assert!(outcome.provided.contains("payment/paypal"));
        assert!(outcome.is_absent("search"));
        assert!(!outcome.is_absent("broken"));
    }

    #[test]
    fn missing_directory_scans_empty() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = ManifestScanner::new(dir.path().join("nope")).scan().unwrap();
        assert!(outcome.groups.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
