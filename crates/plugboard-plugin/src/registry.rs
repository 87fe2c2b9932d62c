// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component registry and dispatch table.
//!
//! Components are registered explicitly at startup. [`ComponentRegistry::activate_all`]
//! builds a fresh dispatch table from every known component whose plugin is
//! dispatchable and publishes it with a single atomic swap, so readers always
//! see either the old table or the new one.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use plugboard_core::{PlugboardError, PluginPath};
use tracing::{debug, error, info};

use crate::capability::{Method, MethodKey};
use crate::component::{Component, ComponentInfo, Handler, Subscription, Subscriptions};

/// Decides which plugins contribute subscribers during a rebuild.
pub trait ActivationView {
    /// True if components owned by `path` may be dispatched to.
    fn is_dispatchable(&self, path: &PluginPath) -> bool;
}

impl<F> ActivationView for F
where
    F: Fn(&PluginPath) -> bool,
{
    fn is_dispatchable(&self, path: &PluginPath) -> bool {
        self(path)
    }
}

/// State of one dispatch-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// No subscribers.
    Empty,
    /// Current subscribers in priority order.
    Populated,
    /// Subscribers present but the table awaits a rebuild.
    Stale,
}

struct KnownComponent {
    info: Arc<ComponentInfo>,
    subscriptions: Vec<Subscription>,
}

#[derive(Clone)]
struct Subscriber {
    info: Arc<ComponentInfo>,
    handler: Arc<dyn Any + Send + Sync>,
}

#[derive(Clone, Default)]
struct DispatchTable {
    entries: HashMap<MethodKey, Vec<Subscriber>>,
}

impl DispatchTable {
    fn subscription_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// Registry of known components and the live dispatch table.
pub struct ComponentRegistry {
    known: Mutex<Vec<Arc<KnownComponent>>>,
    table: ArcSwap<DispatchTable>,
    stale: AtomicBool,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.load();
        f.debug_struct("ComponentRegistry")
            .field("known", &self.len())
            .field("methods", &table.entries.len())
            .field("subscriptions", &table.subscription_count())
            .field("stale", &self.stale.load(Ordering::Acquire))
            .finish()
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Creates an empty registry with an empty dispatch table.
    pub fn new() -> Self {
        Self {
            known: Mutex::new(Vec::new()),
            table: ArcSwap::from_pointee(DispatchTable::default()),
            stale: AtomicBool::new(false),
        }
    }

    /// Forgets every component and empties the dispatch table.
    pub fn close(&self) {
        if let Ok(mut known) = self.known.lock() {
            known.clear();
        }
        self.table.store(Arc::new(DispatchTable::default()));
        self.stale.store(false, Ordering::Release);
        debug!("component registry closed");
    }

    /// Registers a component. Returns `Ok(false)` if a component of the same
    /// type is already known.
    ///
    /// Fails with a discovery error if the component subscribes to a method
    /// its capability does not declare.
    pub fn register<C: Component>(&self, component: C) -> Result<bool, PlugboardError> {
        let mut known = self
            .known
            .lock()
            .map_err(|_| PlugboardError::Internal("component registry lock poisoned".into()))?;

        if known.iter().any(|k| k.info.type_id == TypeId::of::<C>()) {
            debug!(
                component = std::any::type_name::<C>(),
                "component already registered, skipping"
            );
            return Ok(false);
        }

        let info = ComponentInfo::of(&component, known.len() as u64);
        let mut subscriptions = Subscriptions::new(Arc::new(component));
        C::subscribe(&mut subscriptions);
        let subscriptions = subscriptions.into_entries();

        if let Some(undeclared) = subscriptions.iter().find(|s| !s.declared) {
            return Err(PlugboardError::discovery(
                info.plugin.to_string(),
                format!(
                    "component {} subscribes to `{}`, which its capability does not declare",
                    info.short_name(),
                    undeclared.key
                ),
            ));
        }

        debug!(
            component = info.short_name(),
            plugin = %info.plugin,
            priority = info.priority,
            methods = subscriptions.len(),
            "component registered"
        );
        known.push(Arc::new(KnownComponent {
            info: Arc::new(info),
            subscriptions,
        }));
        Ok(true)
    }

    /// Rebuilds the dispatch table from scratch and swaps it in.
    ///
    /// Components whose plugin is not dispatchable according to `view` are
    /// left out. Returns the number of subscriptions in the new table.
    pub fn activate_all(&self, view: &dyn ActivationView) -> Result<usize, PlugboardError> {
        let known: Vec<Arc<KnownComponent>> = self
            .known
            .lock()
            .map_err(|_| PlugboardError::Internal("component registry lock poisoned".into()))?
            .clone();

        let mut scratch = DispatchTable::default();
        for component in &known {
            if !view.is_dispatchable(&component.info.plugin) {
                debug!(
                    component = component.info.short_name(),
                    plugin = %component.info.plugin,
                    "plugin not dispatchable, component left out"
                );
                continue;
            }
            for subscription in &component.subscriptions {
                scratch
                    .entries
                    .entry(subscription.key)
                    .or_default()
                    .push(Subscriber {
                        info: Arc::clone(&component.info),
                        handler: Arc::clone(&subscription.handler),
                    });
            }
        }
        for subscribers in scratch.entries.values_mut() {
            subscribers.sort_by_key(|s| (s.info.priority, s.info.seq));
        }

        let count = scratch.subscription_count();
        self.table.store(Arc::new(scratch));
        self.stale.store(false, Ordering::Release);
        info!(subscriptions = count, "dispatch table rebuilt");
        Ok(count)
    }

    /// Removes every subscription owned by `path` from the live table.
    /// A group path also removes its plugins' subscriptions.
    pub fn deactivate_plugin(&self, path: &PluginPath) -> usize {
        let mut removed = 0;
        self.table.rcu(|current| {
            let mut next = DispatchTable::clone(current);
            removed = 0;
            for subscribers in next.entries.values_mut() {
                let before = subscribers.len();
                subscribers.retain(|s| !path.covers(&s.info.plugin));
                removed += before - subscribers.len();
            }
            next.entries.retain(|_, subscribers| !subscribers.is_empty());
            next
        });
        debug!(plugin = %path, removed, "plugin subscriptions removed");
        removed
    }

    /// Calls every subscriber of `M` in priority order and collects results.
    ///
    /// The first failing subscriber aborts the call: later subscribers are
    /// not invoked and no partial results are returned.
    pub fn dispatch<M: Method>(&self, input: &M::Input) -> Result<Vec<M::Output>, PlugboardError> {
        let key = M::key();
        let table = self.table.load_full();
        let Some(subscribers) = table.entries.get(&key) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::with_capacity(subscribers.len());
        for subscriber in subscribers {
            let handler = subscriber
                .handler
                .downcast_ref::<Handler<M>>()
                .ok_or_else(|| {
                    PlugboardError::Internal(format!(
                        "subscriber {} of `{key}` has a different signature",
                        subscriber.info.short_name()
                    ))
                })?;
            match handler(input) {
                Ok(output) => results.push(output),
                Err(source) => {
                    error!(
                        method = %key,
                        component = subscriber.info.short_name(),
                        plugin = %subscriber.info.plugin,
                        error = %source,
                        "subscriber failed, dispatch aborted"
                    );
                    return Err(PlugboardError::Dispatch {
                        method: key.to_string(),
                        component: subscriber.info.short_name().to_string(),
                        plugin: subscriber.info.plugin.to_string(),
                        source,
                    });
                }
            }
        }
        Ok(results)
    }

    /// Current subscribers of `key`, in call order.
    pub fn subscribers(&self, key: MethodKey) -> Vec<ComponentInfo> {
        self.table
            .load()
            .entries
            .get(&key)
            .map(|subs| subs.iter().map(|s| ComponentInfo::clone(&s.info)).collect())
            .unwrap_or_default()
    }

    /// Every method key that currently has subscribers, sorted.
    pub fn methods(&self) -> Vec<MethodKey> {
        let mut keys: Vec<MethodKey> = self.table.load().entries.keys().copied().collect();
        keys.sort();
        keys
    }

    /// State of the entry for `key`.
    pub fn entry_state(&self, key: MethodKey) -> EntryState {
        if !self.table.load().entries.contains_key(&key) {
            EntryState::Empty
        } else if self.stale.load(Ordering::Acquire) {
            EntryState::Stale
        } else {
            EntryState::Populated
        }
    }

    /// Flags the table as out of date until the next [`activate_all`](Self::activate_all).
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Registration facts of every known component, in registration order.
    pub fn components(&self) -> Vec<ComponentInfo> {
        self.known
            .lock()
            .map(|known| known.iter().map(|k| ComponentInfo::clone(&k.info)).collect())
            .unwrap_or_default()
    }

    /// Number of known components.
    pub fn len(&self) -> usize {
        self.known.lock().map(|k| k.len()).unwrap_or(0)
    }

    /// Returns true if no component is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, CapabilityDescriptor};
    use plugboard_core::BoxError;
    use std::sync::atomic::AtomicUsize;

    struct Greeter;
    impl Capability for Greeter {
        const DESCRIPTOR: CapabilityDescriptor =
            CapabilityDescriptor::new("greeter", &["greet", "wave"]);
    }

    struct Greet;
    impl Method for Greet {
        type Capability = Greeter;
        const NAME: &'static str = "greet";
        type Input = str;
        type Output = String;
    }

    struct Shout;
    impl Method for Shout {
        type Capability = Greeter;
        const NAME: &'static str = "shout";
        type Input = str;
        type Output = String;
    }

    fn path(s: &str) -> PluginPath {
        s.parse().unwrap()
    }

    macro_rules! greeter {
        ($name:ident, $plugin:expr, $priority:expr) => {
            struct $name;
            impl Component for $name {
                fn plugin(&self) -> PluginPath {
                    path($plugin)
                }
                fn priority(&self) -> i32 {
                    $priority
                }
                fn subscribe(s: &mut Subscriptions<Self>) {
                    s.on::<Greet>();
                }
            }
            impl Handles<Greet> for $name {
                fn handle(&self, who: &str) -> Result<String, BoxError> {
                    Ok(format!("{}:{}", stringify!($name), who))
                }
            }
        };
    }

    use crate::component::Handles;

    greeter!(Early, "social/hello", 10);
    greeter!(Late, "social/hello", 200);
    greeter!(Middle, "social/wave", 100);
    greeter!(Other, "other", 100);

    fn all(_: &PluginPath) -> bool {
        true
    }

    #[test]
    fn empty_registry_dispatches_nothing() {
        let registry = ComponentRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.dispatch::<Greet>("x").unwrap().is_empty());
        assert_eq!(registry.entry_state(Greet::key()), EntryState::Empty);
    }

    #[test]
    fn dispatch_follows_priority() {
        let registry = ComponentRegistry::new();
        registry.register(Late).unwrap();
        registry.register(Middle).unwrap();
        registry.register(Early).unwrap();
        registry.activate_all(&all).unwrap();

        let out = registry.dispatch::<Greet>("bob").unwrap();
        assert_eq!(out, vec!["Early:bob", "Middle:bob", "Late:bob"]);
    }

    #[test]
    fn equal_priority_keeps_registration_order() {
        let registry = ComponentRegistry::new();
        registry.register(Other).unwrap();
        registry.register(Middle).unwrap();
        registry.activate_all(&all).unwrap();
        let out = registry.dispatch::<Greet>("a").unwrap();
        assert_eq!(out, vec!["Other:a", "Middle:a"]);
    }

    #[test]
    fn registering_same_type_twice_is_noop() {
        let registry = ComponentRegistry::new();
        assert!(registry.register(Early).unwrap());
        assert!(!registry.register(Early).unwrap());
        assert_eq!(registry.len(), 1);
        registry.activate_all(&all).unwrap();
        assert_eq!(registry.dispatch::<Greet>("a").unwrap().len(), 1);
    }

    #[test]
    fn activate_all_twice_yields_same_table() {
        let registry = ComponentRegistry::new();
        registry.register(Early).unwrap();
        registry.register(Late).unwrap();
        let first = registry.activate_all(&all).unwrap();
        let before = registry.subscribers(Greet::key());
        let second = registry.activate_all(&all).unwrap();
        assert_eq!(first, second);
        assert_eq!(before, registry.subscribers(Greet::key()));
    }

    #[test]
    fn activation_view_filters_plugins() {
        let registry = ComponentRegistry::new();
        registry.register(Early).unwrap();
        registry.register(Middle).unwrap();
        registry.register(Other).unwrap();
        registry
            .activate_all(&|p: &PluginPath| p.group != "social")
            .unwrap();
        assert_eq!(registry.dispatch::<Greet>("a").unwrap(), vec!["Other:a"]);
    }

    #[test]
    fn deactivate_removes_only_that_plugin() {
        let registry = ComponentRegistry::new();
        registry.register(Early).unwrap();
        registry.register(Late).unwrap();
        registry.register(Middle).unwrap();
        registry.register(Other).unwrap();
        registry.activate_all(&all).unwrap();

        let removed = registry.deactivate_plugin(&path("social/hello"));
        assert_eq!(removed, 2);
        assert_eq!(
            registry.dispatch::<Greet>("a").unwrap(),
            vec!["Middle:a", "Other:a"]
        );
    }

    #[test]
    fn deactivating_group_removes_its_plugins() {
        let registry = ComponentRegistry::new();
        registry.register(Early).unwrap();
        registry.register(Middle).unwrap();
        registry.register(Other).unwrap();
        registry.activate_all(&all).unwrap();

        assert_eq!(registry.deactivate_plugin(&path("social")), 2);
        assert_eq!(registry.dispatch::<Greet>("a").unwrap(), vec!["Other:a"]);
    }

    #[test]
    fn deactivating_last_subscriber_empties_entry() {
        let registry = ComponentRegistry::new();
        registry.register(Other).unwrap();
        registry.activate_all(&all).unwrap();
        registry.deactivate_plugin(&path("other"));
        assert_eq!(registry.entry_state(Greet::key()), EntryState::Empty);
        assert!(registry.methods().is_empty());
    }

    #[test]
    fn stale_until_rebuilt() {
        let registry = ComponentRegistry::new();
        registry.register(Other).unwrap();
        registry.activate_all(&all).unwrap();
        assert_eq!(registry.entry_state(Greet::key()), EntryState::Populated);
        registry.mark_stale();
        assert_eq!(registry.entry_state(Greet::key()), EntryState::Stale);
        registry.activate_all(&all).unwrap();
        assert_eq!(registry.entry_state(Greet::key()), EntryState::Populated);
    }

    struct Loud;
    impl Component for Loud {
        fn plugin(&self) -> PluginPath {
            path("social/loud")
        }
        fn subscribe(s: &mut Subscriptions<Self>) {
            s.on::<Shout>();
        }
    }
    impl Handles<Shout> for Loud {
        fn handle(&self, who: &str) -> Result<String, BoxError> {
            Ok(who.to_uppercase())
        }
    }

    #[test]
    fn undeclared_method_is_rejected() {
        let registry = ComponentRegistry::new();
        let err = registry.register(Loud).unwrap_err();
        assert!(matches!(err, PlugboardError::Discovery { .. }));
        assert!(err.to_string().contains("greeter.shout"));
        assert!(registry.is_empty());
    }

    static SECOND_CALLS: AtomicUsize = AtomicUsize::new(0);

    struct Failing;
    impl Component for Failing {
        fn plugin(&self) -> PluginPath {
            path("broken/x")
        }
        fn priority(&self) -> i32 {
            1
        }
        fn subscribe(s: &mut Subscriptions<Self>) {
            s.on::<Greet>();
        }
    }
    impl Handles<Greet> for Failing {
        fn handle(&self, _: &str) -> Result<String, BoxError> {
            Err("boom".into())
        }
    }

    struct Counting;
    impl Component for Counting {
        fn plugin(&self) -> PluginPath {
            path("broken/y")
        }
        fn priority(&self) -> i32 {
            2
        }
        fn subscribe(s: &mut Subscriptions<Self>) {
            s.on::<Greet>();
        }
    }
    impl Handles<Greet> for Counting {
        fn handle(&self, _: &str) -> Result<String, BoxError> {
            SECOND_CALLS.fetch_add(1, Ordering::SeqCst);
            Ok("y".into())
        }
    }

    #[tracing_test::traced_test]
    #[test]
    fn failing_subscriber_aborts_dispatch() {
        let registry = ComponentRegistry::new();
        registry.register(Counting).unwrap();
        registry.register(Failing).unwrap();
        registry.activate_all(&all).unwrap();

        let err = registry.dispatch::<Greet>("a").unwrap_err();
        match err {
            PlugboardError::Dispatch {
                component, plugin, ..
            } => {
                assert_eq!(component, "Failing");
                assert_eq!(plugin, "broken/x");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(SECOND_CALLS.load(Ordering::SeqCst), 0);
        assert!(logs_contain("subscriber failed, dispatch aborted"));
    }

    #[test]
    fn close_forgets_everything() {
        let registry = ComponentRegistry::new();
        registry.register(Other).unwrap();
        registry.activate_all(&all).unwrap();
        registry.close();
        assert!(registry.is_empty());
        assert!(registry.dispatch::<Greet>("a").unwrap().is_empty());
    }

    mod ordering {
        use super::*;
        use proptest::prelude::*;

        greeter!(P0, "g/a", 30);
        greeter!(P1, "g/b", 10);
        greeter!(P2, "g/c", 20);
        greeter!(P3, "g/d", 10);

        fn register_nth(registry: &ComponentRegistry, n: usize) {
            match n {
                0 => registry.register(P0).map(drop),
                1 => registry.register(P1).map(drop),
                2 => registry.register(P2).map(drop),
                _ => registry.register(P3).map(drop),
            }
            .unwrap();
        }

        proptest! {
            #[test]
            fn priorities_never_decrease(order in Just(vec![0usize, 1, 2, 3]).prop_shuffle()) {
                let registry = ComponentRegistry::new();
                for n in &order {
                    register_nth(&registry, *n);
                }
                registry.activate_all(&all).unwrap();

                let subs = registry.subscribers(Greet::key());
                prop_assert_eq!(subs.len(), 4);
                for pair in subs.windows(2) {
                    prop_assert!(pair[0].priority <= pair[1].priority);
                    if pair[0].priority == pair[1].priority {
                        prop_assert!(pair[0].seq < pair[1].seq);
                    }
                }
            }
        }
    }
}
