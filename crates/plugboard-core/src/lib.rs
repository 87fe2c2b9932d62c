// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Plugboard plugin registry.
//!
//! This crate provides the error type, identity types, and the persisted
//! store trait shared by the registry, the storage backends and the CLI.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{BoxError, PlugboardError};
pub use traits::{PluginStore, StoreSnapshot, StoreWrite};
pub use types::{EntryKind, PluginPath, StoreKey};
