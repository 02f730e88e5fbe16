//! Error types for the execution engine.

use flowrun_workflow::{FlowError, StateError, StepType};
use thiserror::Error;

/// Errors from resolving `{{path}}` references in step configuration.
#[derive(Error, Debug, Clone)]
pub enum InterpolationError {
    #[error("cannot parse '{0}' as an integer")]
    InvalidInt(String),

    #[error("cannot parse '{0}' as a number")]
    InvalidFloat(String),

    #[error("invalid JSON '{value}': {message}")]
    InvalidJson { value: String, message: String },
}

/// Errors that can occur during flow execution.
///
/// Handler errors escaping a step body are converted by the runner into
/// ERROR results with code `EXECUTION_ERROR`; they never abort the run.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("config resolution failed: {0}")]
    Interpolation(#[from] InterpolationError),

    #[error("unexpected config for {step_type} step")]
    ConfigMismatch { step_type: StepType },
}
