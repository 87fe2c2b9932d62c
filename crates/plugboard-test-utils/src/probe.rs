// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Probe capability and recording components.

use std::sync::{Arc, Mutex};

use plugboard_plugin::{Capability, CapabilityDescriptor, Method};

/// Capability every probe component subscribes to.
pub struct Probe;

impl Capability for Probe {
    const DESCRIPTOR: CapabilityDescriptor = CapabilityDescriptor::new("probe", &["touch"]);
}

/// Each subscriber records its name in the recorder and returns it.
pub struct Touch;

impl Method for Touch {
    type Capability = Probe;
    const NAME: &'static str = "touch";
    type Input = Recorder;
    type Output = String;
}

/// Shared log of subscriber invocations, in call order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, label: impl Into<String>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(label.into());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of recorded calls made by `label`.
    pub fn count(&self, label: &str) -> usize {
        self.calls().iter().filter(|c| *c == label).count()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }
}

/// Defines a component of `$plugin` that records its type name on [`Touch`].
///
/// ```ignore
/// probe_component!(Foo, "shop/a", 10);
/// ```
#[macro_export]
macro_rules! probe_component {
    ($name:ident, $plugin:expr, $priority:expr) => {
        struct $name;

        impl $crate::__plugin::Component for $name {
            fn plugin(&self) -> $crate::__core::PluginPath {
                $plugin.parse().expect("probe plugin path")
            }

            fn priority(&self) -> i32 {
                $priority
            }

            fn subscribe(subscriptions: &mut $crate::__plugin::Subscriptions<Self>) {
                subscriptions.on::<$crate::Touch>();
            }
        }

        impl $crate::__plugin::Handles<$crate::Touch> for $name {
            fn handle(
                &self,
                recorder: &$crate::Recorder,
            ) -> Result<String, $crate::__core::BoxError> {
                recorder.record(stringify!($name));
                Ok(stringify!($name).to_string())
            }
        }
    };
}

/// Like [`probe_component!`], but the handler records and then fails.
#[macro_export]
macro_rules! failing_probe {
    ($name:ident, $plugin:expr, $priority:expr) => {
        struct $name;

        impl $crate::__plugin::Component for $name {
            fn plugin(&self) -> $crate::__core::PluginPath {
                $plugin.parse().expect("probe plugin path")
            }

            fn priority(&self) -> i32 {
                $priority
            }

            fn subscribe(subscriptions: &mut $crate::__plugin::Subscriptions<Self>) {
                subscriptions.on::<$crate::Touch>();
            }
        }

        impl $crate::__plugin::Handles<$crate::Touch> for $name {
            fn handle(
                &self,
                recorder: &$crate::Recorder,
            ) -> Result<String, $crate::__core::BoxError> {
                recorder.record(stringify!($name));
                Err(concat!(stringify!($name), " failed on purpose").into())
            }
        }
    };
}
