// SPDX-FileCopyrightText: 2026 Plugboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration options and value coercion.

use std::collections::HashMap;
use std::fmt;

use plugboard_core::PlugboardError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of an option value.
///
/// Serialized as its lowercase name. Any name that is not a base type is an
/// extended type, resolved through [`ExtendedTypes`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OptionType {
    String,
    Integer,
    Boolean,
    List,
    Mapping,
    Set,
    Extended(String),
}

impl From<String> for OptionType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "string" | "str" => OptionType::String,
            "integer" | "int" => OptionType::Integer,
            "boolean" | "bool" => OptionType::Boolean,
            "list" => OptionType::List,
            "mapping" | "dict" => OptionType::Mapping,
            "set" => OptionType::Set,
            _ => OptionType::Extended(name),
        }
    }
}

impl From<&str> for OptionType {
    fn from(name: &str) -> Self {
        OptionType::from(name.to_string())
    }
}

impl From<OptionType> for String {
    fn from(ty: OptionType) -> Self {
        ty.to_string()
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::String => write!(f, "string"),
            OptionType::Integer => write!(f, "integer"),
            OptionType::Boolean => write!(f, "boolean"),
            OptionType::List => write!(f, "list"),
            OptionType::Mapping => write!(f, "mapping"),
            OptionType::Set => write!(f, "set"),
            OptionType::Extended(name) => write!(f, "{name}"),
        }
    }
}

/// Mapping from extended type names to the base type that stores them.
#[derive(Debug, Clone)]
pub struct ExtendedTypes {
    bases: HashMap<String, OptionType>,
}

impl Default for ExtendedTypes {
    fn default() -> Self {
        let mut types = Self {
            bases: HashMap::new(),
        };
        types.bases.insert("users".into(), OptionType::List);
        types.bases.insert("rooms".into(), OptionType::List);
        types
    }
}

impl ExtendedTypes {
    /// The built-in extended types (`users` and `rooms`, both stored as lists).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an extended type. Extended types cannot nest.
    pub fn register(&mut self, name: impl Into<String>, base: OptionType) -> Result<(), PlugboardError> {
        let name = name.into();
        if let OptionType::Extended(inner) = &base {
            return Err(PlugboardError::Config(format!(
                "extended type `{name}` must map to a base type, not `{inner}`"
            )));
        }
        self.bases.insert(name, base);
        Ok(())
    }

    /// Base type backing `ty`, or `None` for an unknown extended type.
    pub fn resolve(&self, ty: &OptionType) -> Option<OptionType> {
        match ty {
            OptionType::Extended(name) => self.bases.get(name).cloned(),
            base => Some(base.clone()),
        }
    }

    /// Coerces `value` into the storage shape of `ty`.
    ///
    /// `null` fits every type. Fails with `TypeMismatch` when the value
    /// cannot be represented.
    pub fn coerce(&self, option: &str, ty: &OptionType, value: Value) -> Result<Value, PlugboardError> {
        if value.is_null() {
            return Ok(value);
        }
        let mismatch = |value: &Value| PlugboardError::TypeMismatch {
            option: option.to_string(),
            value: value.to_string(),
            expected: ty.to_string(),
        };
        let Some(base) = self.resolve(ty) else {
            return Err(mismatch(&value));
        };

        match base {
            OptionType::String => match value {
                Value::String(_) => Ok(value),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                Value::Bool(b) => Ok(Value::String(b.to_string())),
                other => Err(mismatch(&other)),
            },
            OptionType::Integer => match &value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
                Value::Number(n) => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(mismatch(&value)),
                },
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| mismatch(&value)),
                Value::Bool(b) => Ok(Value::from(i64::from(*b))),
                _ => Err(mismatch(&value)),
            },
            OptionType::Boolean => match &value {
                Value::Bool(_) => Ok(value),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(Value::Bool(false)),
                    Some(1) => Ok(Value::Bool(true)),
                    _ => Err(mismatch(&value)),
                },
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                    "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                    _ => Err(mismatch(&value)),
                },
                _ => Err(mismatch(&value)),
            },
            OptionType::List => match value {
                Value::Array(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            OptionType::Set => match value {
                Value::Array(items) => {
                    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                    for item in items {
                        if !unique.contains(&item) {
                            unique.push(item);
                        }
                    }
                    Ok(Value::Array(unique))
                }
                other => Err(mismatch(&other)),
            },
            OptionType::Mapping => match value {
                Value::Object(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            OptionType::Extended(_) => Err(mismatch(&value)),
        }
    }
}

/// An option as declared by plugin code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(default)]
    pub default: Value,
    #[serde(default = "default_true")]
    pub editable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub must_reload: bool,
}

fn default_true() -> bool {
    true
}

impl OptionDeclaration {
    pub fn new(name: impl Into<String>, option_type: impl Into<OptionType>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            option_type: option_type.into(),
            sub_type: None,
            default: Value::Null,
            editable: true,
            visible: true,
            must_reload: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    pub fn sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn must_reload(mut self, must_reload: bool) -> Self {
        self.must_reload = must_reload;
        self
    }
}

/// A persisted configuration option of a group or plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOption {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default)]
    pub sub_type: Option<String>,
    value: Value,
    pub editable: bool,
    pub visible: bool,
    pub must_reload: bool,
    /// False once the option disappears from the code; the value is kept.
    pub present: bool,
    /// Position in the declaration list.
    pub order: usize,
    #[serde(default)]
    pub associated_actions: Vec<String>,
}

impl ConfigOption {
    /// New option from a declaration and its already-coerced default.
    pub(crate) fn declared(decl: &OptionDeclaration, default: Value, order: usize) -> Self {
        Self {
            name: decl.name.clone(),
            description: decl.description.clone(),
            option_type: decl.option_type.clone(),
            sub_type: decl.sub_type.clone(),
            value: default,
            editable: decl.editable,
            visible: decl.visible,
            must_reload: decl.must_reload,
            present: true,
            order,
            associated_actions: Vec::new(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replaces the value after coercing it to the option's type. On a
    /// mismatch the current value stays.
    pub fn set_value(&mut self, value: Value, types: &ExtendedTypes) -> Result<(), PlugboardError> {
        self.value = types.coerce(&self.name, &self.option_type, value)?;
        Ok(())
    }

    pub(crate) fn replace_value(&mut self, value: Value) {
        self.value = value;
    }

    pub fn has_actions(&self) -> bool {
        !self.associated_actions.is_empty()
    }
}

/// Selects options in listings. The default lists every present option.
#[derive(Debug, Clone, Default)]
pub struct OptionFilter {
    pub include_non_present: bool,
    pub only_editable: bool,
    pub only_non_editable: bool,
    pub only_visible: bool,
    pub of_type: Option<OptionType>,
}

impl OptionFilter {
    pub fn matches(&self, option: &ConfigOption) -> bool {
        (self.include_non_present || option.present)
            && (!self.only_editable || option.editable)
            && (!self.only_non_editable || !option.editable)
            && (!self.only_visible || option.visible)
            && self
                .of_type
                .as_ref()
                .is_none_or(|ty| *ty == option.option_type)
    }
}
