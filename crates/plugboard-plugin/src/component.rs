// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Components and their method subscriptions.

use std::any::{Any, TypeId};
use std::sync::Arc;

use plugboard_core::{BoxError, PluginPath};

use crate::capability::{Method, MethodKey};

/// Priority used when a component does not override [`Component::priority`].
pub const DEFAULT_PRIORITY: i32 = 100;

/// A unit of plugin code that subscribes to capability methods.
///
/// Identity is the implementing type: registering a second value of the
/// same type is a no-op.
pub trait Component: Send + Sync + 'static {
    /// The plugin (or group) this component's code belongs to.
    fn plugin(&self) -> PluginPath;

    /// Lower runs first; ties fall back to registration order.
    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Lists the methods this component handles.
    fn subscribe(subscriptions: &mut Subscriptions<Self>)
    where
        Self: Sized;
}

/// Implemented once per method a component handles.
pub trait Handles<M: Method>: Component {
    fn handle(&self, input: &M::Input) -> Result<M::Output, BoxError>;
}

/// Type-erased callable stored per subscription; downcast back at dispatch.
pub(crate) type Handler<M> = Arc<
    dyn Fn(&<M as Method>::Input) -> Result<<M as Method>::Output, BoxError> + Send + Sync,
>;

pub(crate) struct Subscription {
    pub(crate) key: MethodKey,
    pub(crate) declared: bool,
    pub(crate) handler: Arc<dyn Any + Send + Sync>,
}

/// Collects the subscriptions of one component during registration.
pub struct Subscriptions<C> {
    component: Arc<C>,
    entries: Vec<Subscription>,
}

impl<C: Component> Subscriptions<C> {
    pub(crate) fn new(component: Arc<C>) -> Self {
        Self {
            component,
            entries: Vec::new(),
        }
    }

    /// Subscribes the component to method `M`. Repeated calls for the same
    /// method keep the first subscription.
    pub fn on<M>(&mut self) -> &mut Self
    where
        M: Method,
        C: Handles<M>,
    {
        let key = M::key();
        if self.entries.iter().any(|s| s.key == key) {
            return self;
        }
        let component = Arc::clone(&self.component);
        let handler: Handler<M> =
            Arc::new(move |input: &M::Input| <C as Handles<M>>::handle(&component, input));
        self.entries.push(Subscription {
            key,
            declared: M::is_declared(),
            handler: Arc::new(handler),
        });
        self
    }

    pub(crate) fn into_entries(self) -> Vec<Subscription> {
        self.entries
    }
}

/// Registration-time facts about a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub plugin: PluginPath,
    pub priority: i32,
    /// Registration sequence number, the priority tie-breaker.
    pub seq: u64,
}

impl ComponentInfo {
    pub(crate) fn of<C: Component>(component: &C, seq: u64) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
            plugin: component.plugin(),
            priority: component.priority(),
            seq,
        }
    }

    /// Type name without the module path, for logs and listings.
    pub fn short_name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }
}
