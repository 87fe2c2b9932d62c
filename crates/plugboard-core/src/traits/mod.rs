// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the boundaries of the registry.

pub mod store;

pub use store::{PluginStore, StoreSnapshot, StoreWrite};
