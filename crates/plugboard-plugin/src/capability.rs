// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability declarations.
//!
//! A capability is a named set of methods. Each method is a type
//! implementing [`Method`], which fixes the input a subscriber receives and
//! the output it returns, so dispatch never goes through string lookup.
//!
//! ```
//! use plugboard_plugin::{Capability, CapabilityDescriptor, Method};
//!
//! struct MenuBuilder;
//! impl Capability for MenuBuilder {
//!     const DESCRIPTOR: CapabilityDescriptor =
//!         CapabilityDescriptor::new("menu_builder", &["side_menu_items"]);
//! }
//!
//! struct SideMenuItems;
//! impl Method for SideMenuItems {
//!     type Capability = MenuBuilder;
//!     const NAME: &'static str = "side_menu_items";
//!     type Input = str;
//!     type Output = Vec<String>;
//! }
//!
//! assert_eq!(SideMenuItems::key().to_string(), "menu_builder.side_menu_items");
//! ```

use std::fmt;

/// Name and ordered method list of a capability. Defined in code, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub methods: &'static [&'static str],
}

impl CapabilityDescriptor {
    pub const fn new(name: &'static str, methods: &'static [&'static str]) -> Self {
        Self { name, methods }
    }

    /// Returns true if `method` is one of this capability's methods.
    pub fn declares(&self, method: &str) -> bool {
        self.methods.contains(&method)
    }

    /// Dispatch keys of every declared method, in declaration order.
    pub fn method_keys(&self) -> impl Iterator<Item = MethodKey> + '_ {
        self.methods.iter().map(|method| MethodKey {
            capability: self.name,
            method,
        })
    }
}

/// A statically declared capability.
pub trait Capability: 'static {
    const DESCRIPTOR: CapabilityDescriptor;
}

/// Key of one dispatch-table entry: a method of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodKey {
    pub capability: &'static str,
    pub method: &'static str,
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.capability, self.method)
    }
}

/// One method of a capability with its typed call signature.
pub trait Method: 'static {
    /// The capability this method belongs to.
    type Capability: Capability;

    /// Method name; must appear in the capability's descriptor.
    const NAME: &'static str;

    /// What every subscriber receives (the calling object and arguments).
    type Input: ?Sized + 'static;

    /// What every subscriber returns.
    type Output: 'static;

    /// Dispatch key of this method.
    fn key() -> MethodKey {
        MethodKey {
            capability: <Self::Capability as Capability>::DESCRIPTOR.name,
            method: Self::NAME,
        }
    }

    /// Whether the capability descriptor actually lists this method.
    fn is_declared() -> bool {
        <Self::Capability as Capability>::DESCRIPTOR.declares(Self::NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Payment;
    impl Capability for Payment {
        const DESCRIPTOR: CapabilityDescriptor =
            CapabilityDescriptor::new("payment", &["checkout", "refund"]);
    }

    struct Checkout;
    impl Method for Checkout {
        type Capability = Payment;
        const NAME: &'static str = "checkout";
        type Input = u64;
        type Output = bool;
    }

    struct Chargeback;
    impl Method for Chargeback {
        type Capability = Payment;
        const NAME: &'static str = "chargeback";
        type Input = u64;
        type Output = bool;
    }

    #[test]
    fn method_key_uses_capability_name() {
        let key = Checkout::key();
        assert_eq!(key.capability, "payment");
        assert_eq!(key.method, "checkout");
        assert_eq!(key.to_string(), "payment.checkout");
    }

    #[test]
    fn undeclared_method_is_detected() {
        assert!(Checkout::is_declared());
        assert!(!Chargeback::is_declared());
    }

    #[test]
    fn method_keys_follow_declaration_order() {
        let keys: Vec<String> = Payment::DESCRIPTOR
            .method_keys()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(keys, vec!["payment.checkout", "payment.refund"]);
    }
}
