//! Output declarations for steps.

use serde::{Deserialize, Serialize};

use crate::types::StateType;

/// Declares a state key that a step produces.
///
/// Declared outputs drive validation and let downstream steps discover the
/// `{{refs}}` available to them; the runner never enforces them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Output {
    pub key: String,
    #[serde(rename = "type", default)]
    pub output_type: StateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Output {
    pub fn new(key: impl Into<String>, output_type: StateType) -> Self {
        Self {
            key: key.into(),
            output_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
