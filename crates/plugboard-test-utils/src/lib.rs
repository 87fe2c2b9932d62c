// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Plugboard integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - directory, registry and scanner wired to a temp store
//! - [`ContendedStore`] - memory store that fails commits on demand
//! - [`Recorder`] and the [`probe_component!`] / [`failing_probe!`] macros -
//!   components that log the order in which they are dispatched

pub mod harness;
pub mod probe;
pub mod store;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use probe::{Probe, Recorder, Touch};
pub use store::ContendedStore;

#[doc(hidden)]
pub use plugboard_core as __core;
#[doc(hidden)]
pub use plugboard_plugin as __plugin;
