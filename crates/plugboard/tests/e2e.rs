// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: scanner, directory, store and dispatch wired together.

use plugboard_core::{PlugboardError, PluginPath};
use plugboard_plugin::{
    ComponentRegistry, Declaration, DirectorySettings, EntryState, Method, Module, OptionDeclaration,
};
use plugboard_test_utils::{Recorder, TestHarness, Touch, failing_probe, probe_component};
use serde_json::json;

probe_component!(Foo, "demo/a", 10);
probe_component!(Bar, "demo/b", 5);
probe_component!(Early, "chain/x", 1);
failing_probe!(Broken, "chain/y", 2);
probe_component!(Late, "chain/z", 3);

struct Demo;

impl Module for Demo {
    fn declaration(&self) -> Declaration {
        Declaration::new("demo")
            .option(OptionDeclaration::new("greeting", "string").default_value("hello"))
            .plugin(Declaration::new("a"))
            .plugin(Declaration::new("b"))
    }

    fn register_components(&self, registry: &ComponentRegistry) -> Result<(), PlugboardError> {
        registry.register(Foo)?;
        registry.register(Bar)?;
        Ok(())
    }
}

struct Chain;

impl Module for Chain {
    fn declaration(&self) -> Declaration {
        Declaration::new("chain")
            .plugin(Declaration::new("x"))
            .plugin(Declaration::new("y"))
            .plugin(Declaration::new("z"))
    }

    fn register_components(&self, registry: &ComponentRegistry) -> Result<(), PlugboardError> {
        registry.register(Early)?;
        registry.register(Broken)?;
        registry.register(Late)?;
        Ok(())
    }
}

fn touch(harness: &TestHarness) -> (Result<Vec<String>, PlugboardError>, Recorder) {
    let recorder = Recorder::new();
    let result = harness.registry.dispatch::<Touch>(&recorder);
    (result, recorder)
}

#[tokio::test]
async fn dispatch_follows_activation() {
    let harness = TestHarness::builder().with_module(Demo).build().await.unwrap();
    harness.directory.reconcile_all().await.unwrap();

    let (result, _) = touch(&harness);
    assert!(result.unwrap().is_empty());

    harness.activate(&["demo", "demo/a", "demo/b"]).await.unwrap();
    let (result, recorder) = touch(&harness);
    assert_eq!(result.unwrap(), vec!["Bar", "Foo"]);
    assert_eq!(recorder.calls(), vec!["Bar", "Foo"]);

    harness
        .directory
        .deactivate(&PluginPath::plugin("demo", "a"))
        .await
        .unwrap();
    let (result, _) = touch(&harness);
    assert_eq!(result.unwrap(), vec!["Bar"]);
    assert_eq!(harness.registry.entry_state(Touch::key()), EntryState::Populated);
}

#[tokio::test]
async fn failing_subscriber_stops_dispatch() {
    let harness = TestHarness::builder().with_module(Chain).build().await.unwrap();
    harness.directory.reconcile_all().await.unwrap();
    harness
        .activate(&["chain", "chain/x", "chain/y", "chain/z"])
        .await
        .unwrap();

    let (result, recorder) = touch(&harness);
    let err = result.unwrap_err();
    match err {
        PlugboardError::Dispatch {
            method, plugin, ..
        } => {
            assert_eq!(method, "probe.touch");
            assert_eq!(plugin, "chain/y");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(recorder.count("Early"), 1);
    assert_eq!(recorder.count("Broken"), 1);
    assert_eq!(recorder.count("Late"), 0);
}

#[tokio::test]
async fn conflicting_commits_are_retried() {
    let harness = TestHarness::builder().with_module(Demo).build().await.unwrap();
    harness.directory.reconcile_all().await.unwrap();
    let before = harness.commit_attempts();

    harness.inject_conflicts(2);
    harness
        .directory
        .set_option_value(&PluginPath::group("demo"), "greeting", json!("hi"))
        .await
        .unwrap();

    assert_eq!(harness.commit_attempts() - before, 3);
    let demo = harness.descriptor("demo").unwrap();
    assert_eq!(demo.option_value("greeting").unwrap(), &json!("hi"));
}

#[tokio::test]
async fn persistent_conflicts_exhaust_retries() {
    let settings = DirectorySettings {
        conflict_retries: 2,
        ..Default::default()
    };
    let harness = TestHarness::builder()
        .with_module(Demo)
        .with_settings(settings)
        .build()
        .await
        .unwrap();
    harness.directory.reconcile_all().await.unwrap();
    let generation = harness.directory.generation();

    harness.inject_conflicts(10);
    let err = harness
        .directory
        .activate(&PluginPath::group("demo"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PlugboardError::ConflictRetriesExhausted { attempts: 3 }
    ));
    assert!(!harness.descriptor("demo").unwrap().active);
    assert_eq!(harness.directory.generation(), generation);
}

#[tokio::test]
async fn sqlite_state_survives_reopen() {
    let harness = TestHarness::builder()
        .with_module(Demo)
        .with_sqlite()
        .build()
        .await
        .unwrap();
    harness.directory.reconcile_all().await.unwrap();
    harness.activate(&["demo", "demo/b"]).await.unwrap();

    let generation = harness.directory.refresh().await.unwrap();
    assert_eq!(generation, harness.directory.generation());
    let b = harness.descriptor("demo/b").unwrap();
    assert!(b.active && b.present && b.usable);

    let (result, _) = touch(&harness);
    assert_eq!(result.unwrap(), vec!["Bar"]);
}

#[tokio::test]
async fn missing_dependency_is_resolved_by_provided() {
    let module = Declaration::new("reports").plugin(Declaration::new("pdf").requires("ghostscript"));

    let without = TestHarness::builder()
        .with_module(module.clone())
        .build()
        .await
        .unwrap();
    without.directory.reconcile_all().await.unwrap();
    let pdf = without.descriptor("reports/pdf").unwrap();
    assert!(!pdf.usable);
    assert_eq!(pdf.missing_dependencies, vec!["ghostscript".to_string()]);

    let with = TestHarness::builder()
        .with_module(module)
        .with_provided("ghostscript")
        .build()
        .await
        .unwrap();
    with.directory.reconcile_all().await.unwrap();
    assert!(with.descriptor("reports/pdf").unwrap().usable);
}
