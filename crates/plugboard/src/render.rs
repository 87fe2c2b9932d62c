// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal and JSON output of command results.

use std::io::IsTerminal;

use colored::Colorize;
use plugboard_core::PlugboardError;
use plugboard_plugin::{ActionFilter, ListFilter, OptionFilter, PluginDescriptor, ReloadReport};
use serde_json::{Value, json};

/// Output settings shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
    color: bool,
}

impl Output {
    pub fn new(json: bool, plain: bool) -> Self {
        Self {
            json,
            color: !plain && std::io::stdout().is_terminal(),
        }
    }

    fn print_json(&self, value: &Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn ok(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    fn bad(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    pub fn report(&self, report: &ReloadReport) {
        if self.json {
            self.print_json(&report_json(report));
            return;
        }
        println!();
        println!("  plugboard reconcile (generation {})", report.generation);
        println!("  {}", "-".repeat(35));
        for group in &report.reconciled {
            println!("    {} {group}", self.ok("[OK]"));
        }
        for (group, err) in &report.failed {
            println!("    {} {group}: {err}", self.bad("[FAIL]"));
        }
        for warning in &report.warnings {
            println!("    {} {warning}", self.dim("[WARN]"));
        }
        println!();
    }

    pub fn listing(&self, groups: &[PluginDescriptor], filter: &ListFilter) {
        if self.json {
            let groups: Vec<Value> = groups
                .iter()
                .map(|g| {
                    let mut value = flags_json(g);
                    value["plugins"] = g.plugins(filter).into_iter().map(flags_json).collect();
                    value
                })
                .collect();
            self.print_json(&Value::Array(groups));
            return;
        }
        if groups.is_empty() {
            println!("no plugin groups recorded; run `plugboard reconcile`");
            return;
        }
        for group in groups {
            println!("{} {}", group.name(), self.state(group));
            for plugin in group.plugins(filter) {
                println!("  {}/{} {}", group.name(), plugin.name(), self.state(plugin));
            }
        }
    }

    fn state(&self, descriptor: &PluginDescriptor) -> String {
        let mut parts = vec![if descriptor.active {
            self.ok("active")
        } else {
            self.dim("inactive")
        }];
        if !descriptor.present {
            parts.push(self.bad("absent"));
        }
        if !descriptor.usable {
            parts.push(self.bad(&format!(
                "missing: {}",
                descriptor.missing_dependencies.join(", ")
            )));
        }
        if descriptor.test_plugin {
            parts.push(self.dim("test"));
        }
        format!("[{}]", parts.join(", "))
    }

    pub fn descriptor(&self, descriptor: &PluginDescriptor) {
        let options = OptionFilter {
            include_non_present: true,
            ..Default::default()
        };
        let actions = ActionFilter {
            include_hidden: true,
            ..Default::default()
        };
        if self.json {
            let mut value = flags_json(descriptor);
            value["options"] = descriptor
                .options(&options)
                .into_iter()
                .map(|o| {
                    json!({
                        "name": o.name,
                        "type": o.option_type.to_string(),
                        "value": o.value(),
                        "present": o.present,
                        "editable": o.editable,
                        "description": o.description,
                        "actions": o.associated_actions,
                    })
                })
                .collect();
            value["actions"] = descriptor
                .actions(&actions)
                .into_iter()
                .map(|a| {
                    json!({
                        "name": a.name,
                        "button_text": a.button_text,
                        "associated_option": a.associated_option,
                        "execute_on_load": a.execute_on_load,
                        "triggered_by": a.triggered_by,
                    })
                })
                .collect();
            self.print_json(&value);
            return;
        }

        println!("{} {}", descriptor.path, self.state(descriptor));
        if let Some(description) = &descriptor.description {
            println!("  {description}");
        }
        println!("  options:");
        for option in descriptor.options(&options) {
            let mut line = format!("    {} ({}) = {}", option.name, option.option_type, option.value());
            if !option.present {
                line = self.dim(&format!("{line} [absent]"));
            } else if !option.editable {
                line.push_str(" [read-only]");
            }
            println!("{line}");
        }
        println!("  actions:");
        for action in descriptor.actions(&actions) {
            let label = action.button_text.as_deref().unwrap_or("-");
            println!("    {} \"{label}\"", action.name);
        }
    }

    pub fn done(&self, message: &str) {
        if self.json {
            self.print_json(&json!({ "ok": true, "message": message }));
        } else {
            println!("{} {message}", self.ok("[OK]"));
        }
    }

    pub fn error(&self, err: &PlugboardError) {
        if self.json {
            self.print_json(&json!({ "ok": false, "error": err.to_string() }));
        } else {
            eprintln!("{} {err}", self.bad("error:"));
        }
    }
}

fn flags_json(descriptor: &PluginDescriptor) -> Value {
    json!({
        "path": descriptor.path.to_string(),
        "description": descriptor.description,
        "present": descriptor.present,
        "active": descriptor.active,
        "usable": descriptor.usable,
        "missing_dependencies": descriptor.missing_dependencies,
        "test_plugin": descriptor.test_plugin,
    })
}

pub(crate) fn report_json(report: &ReloadReport) -> Value {
    json!({
        "generation": report.generation,
        "reconciled": report.reconciled,
        "failed": report
            .failed
            .iter()
            .map(|(group, err)| json!({ "group": group, "error": err.to_string() }))
            .collect::<Vec<_>>(),
        "warnings": report.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugboard_plugin::ReconcileWarning;
    use plugboard_core::PluginPath;

    #[test]
    fn report_json_lists_failures_and_warnings() {
        let report = ReloadReport {
            generation: 4,
            reconciled: vec!["shop".into()],
            failed: vec![(
                "broken".into(),
                PlugboardError::discovery("broken", "bad manifest"),
            )],
            warnings: vec![ReconcileWarning::PluginMissing {
                plugin: PluginPath::plugin("shop", "old"),
            }],
        };
        let value = report_json(&report);
        assert_eq!(value["generation"], 4);
        assert_eq!(value["reconciled"][0], "shop");
        assert_eq!(value["failed"][0]["group"], "broken");
        assert!(
            value["warnings"][0]
                .as_str()
                .unwrap()
                .contains("shop/old")
        );
    }

    #[test]
    fn plain_output_has_no_escape_codes() {
        let output = Output::new(false, true);
        assert_eq!(output.ok("fine"), "fine");
        assert_eq!(output.bad("nope"), "nope");
    }
}
