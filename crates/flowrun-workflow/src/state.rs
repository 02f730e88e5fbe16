//! State management for flow execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::StateError;
use crate::types::StateType;

/// Canonical string form of a state value: missing and `null` become the
/// empty string, objects and arrays are JSON-encoded, everything else uses
/// its plain string rendering (no JSON quoting for strings).
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Defines a typed slot in the state container.
///
/// Slots provide type information and casting for state values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSlot {
    pub name: String,
    #[serde(rename = "type", default)]
    pub slot_type: StateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StateSlot {
    pub fn new(name: impl Into<String>, slot_type: StateType) -> Self {
        Self {
            name: name.into(),
            slot_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Coerce a value to the slot's type. `null` always stays `null`.
    pub fn cast(&self, value: Value) -> Result<Value, StateError> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match self.slot_type {
            StateType::Any => Ok(value),
            StateType::Text => Ok(match value {
                Value::String(s) => Value::String(s),
                other => Value::String(value_to_string(&other)),
            }),
            StateType::Number => self.cast_number(value),
            StateType::Boolean => Ok(match value {
                Value::String(s) => Value::Bool(matches!(
                    s.to_lowercase().as_str(),
                    "true" | "1" | "yes"
                )),
                other => Value::Bool(is_truthy(&other)),
            }),
            StateType::Object | StateType::Array => match value {
                Value::String(s) => {
                    serde_json::from_str(&s).map_err(|e| StateError::InvalidJson {
                        slot: self.name.clone(),
                        message: e.to_string(),
                    })
                }
                other => Ok(other),
            },
        }
    }

    // Strings parse as integer first, float as the fallback; every other
    // accepted input coerces to float.
    fn cast_number(&self, value: Value) -> Result<Value, StateError> {
        match value {
            Value::String(s) => {
                if let Ok(i) = s.trim().parse::<i64>() {
                    return Ok(Value::from(i));
                }
                let f = s
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| StateError::InvalidNumber(s.clone()))?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or(StateError::InvalidNumber(s))
            }
            Value::Number(n) => {
                let f = n
                    .as_f64()
                    .ok_or_else(|| StateError::InvalidNumber(n.to_string()))?;
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| StateError::InvalidNumber(n.to_string()))
            }
            Value::Bool(b) => Ok(Value::from(if b { 1.0 } else { 0.0 })),
            other => Err(StateError::InvalidNumber(value_to_string(&other))),
        }
    }
}

/// Runtime state container with typed slots.
///
/// State flows through execution as a key-value store with optional type
/// definitions for validation and casting. Cloning is the shallow-copy
/// operation: both maps are copied, detached from the original.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateContainer {
    #[serde(default)]
    pub slots: HashMap<String, StateSlot>,
    #[serde(default)]
    pub values: HashMap<String, Value>,
}

impl StateContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a typed slot; later writes to `name` coerce through it.
    pub fn define(&mut self, name: impl Into<String>, slot_type: StateType) {
        let name = name.into();
        self.slots
            .insert(name.clone(), StateSlot::new(name, slot_type));
    }

    /// Set a value, casting to the slot type if one is defined.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), StateError> {
        let name = name.into();
        let mut value = value.into();
        if let Some(slot) = self.slots.get(&name) {
            value = slot.cast(value)?;
        }
        self.values.insert(name, value);
        Ok(())
    }

    /// Get a value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Get a nested value using dot notation.
    ///
    /// Supports simple keys (`user`), nested objects (`user.profile.email`)
    /// and array indices (`items.0.name`). Missing keys, out-of-range or
    /// non-numeric indices, and `null` values anywhere on the path yield
    /// `None`.
    pub fn get_nested(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;
        if current.is_null() {
            return None;
        }

        for part in parts {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
            if current.is_null() {
                return None;
            }
        }
        Some(current)
    }

    /// Get a value as a string (JSON-encodes objects/arrays, `""` if missing).
    pub fn get_as_string(&self, name: &str) -> String {
        self.values.get(name).map(value_to_string).unwrap_or_default()
    }
}
