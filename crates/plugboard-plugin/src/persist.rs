// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping between descriptors and store rows.

use std::collections::BTreeMap;

use plugboard_core::{EntryKind, PlugboardError, PluginPath, StoreKey, StoreSnapshot, StoreWrite};
use serde_json::Value;

use crate::action::ConfigAction;
use crate::descriptor::{DescriptorRecord, PluginDescriptor};
use crate::option::ConfigOption;

/// Groups by name.
pub type Groups = BTreeMap<String, PluginDescriptor>;

/// Rows of one group, its plugins included, in key order.
pub fn encode_group(group: &PluginDescriptor) -> Result<Vec<(StoreKey, Value)>, PlugboardError> {
    let mut rows = Vec::new();
    encode_into(group, &mut rows)?;
    for plugin in group.plugins.values() {
        encode_into(plugin, &mut rows)?;
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(rows)
}

fn encode_into(
    descriptor: &PluginDescriptor,
    rows: &mut Vec<(StoreKey, Value)>,
) -> Result<(), PlugboardError> {
    let path = &descriptor.path;
    rows.push((
        StoreKey::descriptor(path),
        serde_json::to_value(descriptor.record())?,
    ));
    for option in descriptor.options.values() {
        rows.push((
            StoreKey::entry(path, EntryKind::Option, option.name.clone()),
            serde_json::to_value(option)?,
        ));
    }
    for action in descriptor.actions.values() {
        rows.push((
            StoreKey::entry(path, EntryKind::Action, action.name.clone()),
            serde_json::to_value(action)?,
        ));
    }
    Ok(())
}

/// Rebuilds every group from a store snapshot.
///
/// Rows whose owner has no descriptor row still produce a descriptor, so a
/// partially written group is readable.
pub fn decode(snapshot: &StoreSnapshot) -> Result<Groups, PlugboardError> {
    let mut groups = Groups::new();
    for (key, value) in &snapshot.entries {
        let owner = key.owner();
        let descriptor = slot(&mut groups, &owner);
        match key.kind {
            EntryKind::Descriptor => {
                let record: DescriptorRecord = serde_json::from_value(value.clone())?;
                descriptor.apply_record(record);
            }
            EntryKind::Option => {
                let option: ConfigOption = serde_json::from_value(value.clone())?;
                descriptor.options.insert(key.name.clone(), option);
            }
            EntryKind::Action => {
                let action: ConfigAction = serde_json::from_value(value.clone())?;
                descriptor.actions.insert(key.name.clone(), action);
            }
        }
    }
    Ok(groups)
}

fn slot<'a>(groups: &'a mut Groups, path: &PluginPath) -> &'a mut PluginDescriptor {
    let group = groups
        .entry(path.group.clone())
        .or_insert_with(|| PluginDescriptor::new_group(path.group.clone()));
    match &path.plugin {
        None => group,
        Some(name) => group
            .plugins
            .entry(name.clone())
            .or_insert_with(|| PluginDescriptor::new_plugin(path.group.clone(), name.clone())),
    }
}

/// Store writes that turn `before` into `after`. Unchanged groups produce
/// no write; removing every group is a single clear.
pub fn diff(before: &Groups, after: &Groups) -> Result<Vec<StoreWrite>, PlugboardError> {
    if after.is_empty() && !before.is_empty() {
        return Ok(vec![StoreWrite::Clear]);
    }
    let mut writes = Vec::new();
    for (name, group) in after {
        let entries = encode_group(group)?;
        let unchanged = match before.get(name) {
            Some(previous) => encode_group(previous)? == entries,
            None => false,
        };
        if !unchanged {
            writes.push(StoreWrite::ReplaceGroup {
                group: name.clone(),
                entries,
            });
        }
    }
    for name in before.keys().filter(|name| !after.contains_key(*name)) {
        writes.push(StoreWrite::ReplaceGroup {
            group: name.clone(),
            entries: Vec::new(),
        });
    }
    Ok(writes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionDeclaration;
    use crate::option::{ExtendedTypes, OptionDeclaration};
    use serde_json::json;

    fn sample() -> PluginDescriptor {
        let types = ExtendedTypes::new();
        let mut group = PluginDescriptor::new_group("search");
        group.present = true;
        group.active = true;
        let decl = OptionDeclaration::new("timeout", "integer");
        group
            .options
            .insert("timeout".into(), ConfigOption::declared(&decl, json!(30), 0));
        group
            .set_option_value("timeout", json!(45), &types)
            .unwrap();

        let mut solr = PluginDescriptor::new_plugin("search", "solr");
        solr.present = true;
        solr.missing_dependencies = vec!["java".into()];
        solr.usable = false;
        solr.actions.insert(
            "ping".into(),
            ConfigAction::declared(&ActionDeclaration::new("ping").button_text("Ping"), 0),
        );
        group.plugins.insert("solr".into(), solr);
        group
    }

    fn snapshot_of(group: &PluginDescriptor) -> StoreSnapshot {
        StoreSnapshot {
            generation: 1,
            entries: encode_group(group).unwrap().into_iter().collect(),
        }
    }

    #[test]
    fn encoded_group_decodes_to_itself() {
        let group = sample();
        let decoded = decode(&snapshot_of(&group)).unwrap();
        assert_eq!(decoded.get("search"), Some(&group));
    }

    #[test]
    fn rows_are_keyed_by_owner_and_kind() {
        let rows = encode_group(&sample()).unwrap();
        let keys: Vec<String> = rows
            .iter()
            .map(|(k, _)| format!("{}:{}:{}", k.owner(), k.kind, k.name))
            .collect();
        assert_eq!(
            keys,
            vec![
                "search:descriptor:",
                "search:option:timeout",
                "search/solr:descriptor:",
                "search/solr:action:ping",
            ]
        );
    }

    #[test]
    fn diff_skips_unchanged_groups() {
        let mut before = Groups::new();
        before.insert("search".into(), sample());
        let after = before.clone();
        assert!(diff(&before, &after).unwrap().is_empty());
    }

    #[test]
    fn diff_replaces_changed_and_removed_groups() {
        let mut before = Groups::new();
        before.insert("search".into(), sample());
        before.insert("old".into(), PluginDescriptor::new_group("old"));

        let mut after = Groups::new();
        let mut changed = sample();
        changed.active = false;
        after.insert("search".into(), changed);

        let writes = diff(&before, &after).unwrap();
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().any(|w| matches!(
            w,
            StoreWrite::ReplaceGroup { group, entries } if group == "old" && entries.is_empty()
        )));
        assert!(writes.iter().any(|w| matches!(
            w,
            StoreWrite::ReplaceGroup { group, entries } if group == "search" && entries.len() == 4
        )));
    }

    #[test]
    fn removing_every_group_clears_the_store() {
        let mut before = Groups::new();
        before.insert("search".into(), sample());
        before.insert("old".into(), PluginDescriptor::new_group("old"));

        assert_eq!(diff(&before, &Groups::new()).unwrap(), vec![StoreWrite::Clear]);
        assert!(diff(&Groups::new(), &Groups::new()).unwrap().is_empty());
    }
}
