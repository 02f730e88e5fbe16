//! Late-bound configuration values.

use serde::{Deserialize, Serialize};

/// A configuration field that holds either a literal value or a `{{path}}`
/// template, resolved against live state immediately before the step runs.
///
/// Deserialization is untagged: a JSON value of the target type becomes
/// [`Interpolated::Value`], a string becomes whichever variant fits. For
/// string-typed fields every string parses as `Value`, so resolution also
/// scans literal strings for `{{` (see `flowrun-core`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Interpolated<T> {
    Value(T),
    Template(String),
}

impl<T> Interpolated<T> {
    /// Wrap a raw template string, e.g. `"{{user.name}}"`.
    pub fn template(template: impl Into<String>) -> Self {
        Interpolated::Template(template.into())
    }

    /// The literal value, if this field is not an unresolved template.
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Interpolated::Value(v) => Some(v),
            Interpolated::Template(_) => None,
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Interpolated::Template(_))
    }
}

impl<T: Default> Default for Interpolated<T> {
    fn default() -> Self {
        Interpolated::Value(T::default())
    }
}

impl From<&str> for Interpolated<String> {
    fn from(s: &str) -> Self {
        Interpolated::Value(s.to_string())
    }
}

impl From<String> for Interpolated<String> {
    fn from(s: String) -> Self {
        Interpolated::Value(s)
    }
}

impl From<f64> for Interpolated<f64> {
    fn from(v: f64) -> Self {
        Interpolated::Value(v)
    }
}

impl From<i64> for Interpolated<i64> {
    fn from(v: i64) -> Self {
        Interpolated::Value(v)
    }
}
