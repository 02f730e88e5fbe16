//! Edge model for connecting steps in a flow.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::step::DEFAULT_PORT;

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

/// Connects two steps via their ports.
///
/// An edge routes execution from a source step's output port to a target
/// step's input port. Edges are not deduplicated; parallel edges are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: Uuid,
    pub source_step_id: Uuid,
    #[serde(default = "default_port")]
    pub source_port: String,
    pub target_step_id: Uuid,
    #[serde(default = "default_port")]
    pub target_port: String,
}

impl Edge {
    /// A new edge connecting the default ports.
    pub fn new(source_step_id: Uuid, target_step_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_step_id,
            source_port: default_port(),
            target_step_id,
            target_port: default_port(),
        }
    }

    pub fn with_source_port(mut self, port: impl Into<String>) -> Self {
        self.source_port = port.into();
        self
    }

    pub fn with_target_port(mut self, port: impl Into<String>) -> Self {
        self.target_port = port.into();
        self
    }
}
