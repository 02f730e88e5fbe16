//! Error types for the flow model.

use thiserror::Error;
use uuid::Uuid;

/// Errors from constructing or mutating flows.
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    #[error("Step not found: {0}")]
    StepNotFound(Uuid),

    #[error("Port '{port}' not found on step {step_id}. Available ports: {available:?}")]
    PortNotFound {
        step_id: Uuid,
        port: String,
        available: Vec<String>,
    },
}

/// Errors from coercing values through typed state slots.
#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("Cannot cast '{0}' to a number")]
    InvalidNumber(String),

    #[error("Invalid JSON for slot '{slot}': {message}")]
    InvalidJson { slot: String, message: String },
}
