// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in `index_provider` capability.
//!
//! Plugins contribute named indexes (search catalogs, lookup tables) without
//! the registry knowing what they contain. Consumers downcast the index to
//! the type they expect.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use plugboard_core::PlugboardError;

use crate::capability::{Capability, CapabilityDescriptor, Method};
use crate::registry::ComponentRegistry;

/// Capability of components that expose indexes.
pub struct IndexProvider;

impl Capability for IndexProvider {
    const DESCRIPTOR: CapabilityDescriptor =
        CapabilityDescriptor::new("index_provider", &["provide_indexes"]);
}

/// Asks every provider for its indexes.
pub struct ProvideIndexes;

impl Method for ProvideIndexes {
    type Capability = IndexProvider;
    const NAME: &'static str = "provide_indexes";
    type Input = ();
    type Output = Vec<NamedIndex>;
}

/// An opaque index under a name.
#[derive(Clone)]
pub struct NamedIndex {
    pub name: String,
    pub index: Arc<dyn Any + Send + Sync>,
}

impl NamedIndex {
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>, index: T) -> Self {
        Self {
            name: name.into(),
            index: Arc::new(index),
        }
    }

    /// The index as `T`, if that is what it holds.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.index.downcast_ref::<T>()
    }
}

impl fmt::Debug for NamedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedIndex").field("name", &self.name).finish()
    }
}

/// Every index contributed by active providers, in dispatch order.
pub fn collect_indexes(registry: &ComponentRegistry) -> Result<Vec<NamedIndex>, PlugboardError> {
    Ok(registry
        .dispatch::<ProvideIndexes>(&())?
        .into_iter()
        .flatten()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Handles, Subscriptions};
    use plugboard_core::{BoxError, PluginPath};

    struct Rooms;
    impl Component for Rooms {
        fn plugin(&self) -> PluginPath {
            PluginPath::plugin("booking", "rooms")
        }
        fn priority(&self) -> i32 {
            50
        }
        fn subscribe(s: &mut Subscriptions<Self>) {
            s.on::<ProvideIndexes>();
        }
    }
    impl Handles<ProvideIndexes> for Rooms {
        fn handle(&self, _: &()) -> Result<Vec<NamedIndex>, BoxError> {
            Ok(vec![
                NamedIndex::new("rooms", vec!["A101", "B202"]),
                NamedIndex::new("floors", 3u32),
            ])
        }
    }

    struct Users;
    impl Component for Users {
        fn plugin(&self) -> PluginPath {
            PluginPath::group("directory")
        }
        fn subscribe(s: &mut Subscriptions<Self>) {
            s.on::<ProvideIndexes>();
        }
    }
    impl Handles<ProvideIndexes> for Users {
        fn handle(&self, _: &()) -> Result<Vec<NamedIndex>, BoxError> {
            Ok(vec![NamedIndex::new("users", vec!["ana".to_string()])])
        }
    }

    #[test]
    fn indexes_are_flattened_in_dispatch_order() {
        let registry = ComponentRegistry::new();
        registry.register(Users).unwrap();
        registry.register(Rooms).unwrap();
        registry.activate_all(&|_: &PluginPath| true).unwrap();

        let indexes = collect_indexes(&registry).unwrap();
        let names: Vec<&str> = indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["rooms", "floors", "users"]);
        assert_eq!(indexes[1].downcast::<u32>(), Some(&3));
        assert!(indexes[0].downcast::<u32>().is_none());
    }

    #[test]
    fn no_providers_yields_no_indexes() {
        let registry = ComponentRegistry::new();
        assert!(collect_indexes(&registry).unwrap().is_empty());
    }
}
