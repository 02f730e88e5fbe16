//! Step model and run results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::config::StepConfig;
use crate::output::Output;
use crate::types::{JoinMode, StateType, StepRunStatus, StepType};

/// Default output port carried by most step kinds.
pub const DEFAULT_PORT: &str = "default";
/// Error port fired by steps that route failures explicitly.
pub const ERROR_PORT: &str = "error";
/// Success port of the request step.
pub const SUCCESS_PORT: &str = "success";
/// Catch-all port of the switch step.
pub const ELSE_PORT: &str = "else";

/// A node in a flow.
///
/// Steps are pure data; execution behavior lives in the engine's step
/// handlers, dispatched on the step type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: Uuid,
    /// Display name, not required to be unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub join_mode: JoinMode,
    #[serde(flatten)]
    pub config: StepConfig,
}

impl Step {
    pub fn new(config: StepConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            join_mode: JoinMode::default(),
            config,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_join_mode(mut self, join_mode: JoinMode) -> Self {
        self.join_mode = join_mode;
        self
    }

    pub fn step_type(&self) -> StepType {
        self.config.step_type()
    }

    /// Whether this step is a flow entry point.
    pub fn is_trigger(&self) -> bool {
        self.step_type().is_trigger()
    }

    /// Output ports, recomputed from the current config so that switch case
    /// edits take effect wherever the live port list is consulted.
    pub fn ports(&self) -> Vec<String> {
        match &self.config {
            StepConfig::Conditional(_) => vec!["true".to_string(), "false".to_string()],
            StepConfig::Request(_) => vec![SUCCESS_PORT.to_string(), ERROR_PORT.to_string()],
            StepConfig::Switch(config) => config
                .cases
                .iter()
                .map(|case| case.name.clone())
                .chain([ELSE_PORT.to_string()])
                .collect(),
            _ => vec![DEFAULT_PORT.to_string()],
        }
    }

    /// State keys this step declares it produces. Used by validation only;
    /// never enforced against actual writes.
    pub fn outputs(&self) -> Vec<Output> {
        match self.step_type() {
            StepType::TriggerWebhook => vec![
                Output::new("body", StateType::Any).with_description("Request body"),
                Output::new("headers", StateType::Object).with_description("Request headers"),
                Output::new("method", StateType::Text).with_description("HTTP method"),
                Output::new("query", StateType::Object).with_description("Query parameters"),
            ],
            StepType::TriggerSchedule => vec![
                Output::new("scheduled_time", StateType::Text)
                    .with_description("Scheduled execution time (ISO)"),
                Output::new("actual_time", StateType::Text)
                    .with_description("Actual execution time (ISO)"),
            ],
            StepType::TriggerEvent => vec![
                Output::new("event_name", StateType::Text).with_description("Name of the event"),
                Output::new("event_data", StateType::Any).with_description("Event payload data"),
                Output::new("event_timestamp", StateType::Text)
                    .with_description("Event timestamp (ISO)"),
            ],
            StepType::Delay => vec![
                Output::new("delayed_seconds", StateType::Number)
                    .with_description("Actual delay duration"),
            ],
            StepType::Request => vec![
                Output::new("response", StateType::Any).with_description("Response body"),
                Output::new("status_code", StateType::Number).with_description("HTTP status code"),
                Output::new("response_headers", StateType::Object)
                    .with_description("Response headers"),
            ],
            StepType::Reply => vec![
                Output::new("reply", StateType::Text).with_description("Generated reply"),
            ],
            StepType::ConversationStart => vec![
                Output::new("conversation_id", StateType::Text)
                    .with_description("Conversation identifier"),
            ],
            StepType::UserMessage => vec![
                Output::new("user_message", StateType::Text)
                    .with_description("User's message text"),
                Output::new("user_id", StateType::Text).with_description("User identifier"),
            ],
            // set_state writes a user-defined key; the validator reads it
            // from config instead of a declaration here.
            _ => Vec::new(),
        }
    }
}

/// Error information from a failed step execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl StepError {
    /// Config resolution threw before the step was launched.
    pub const CONFIG_RESOLUTION_ERROR: &'static str = "CONFIG_RESOLUTION_ERROR";
    /// The step body failed or panicked.
    pub const EXECUTION_ERROR: &'static str = "EXECUTION_ERROR";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const REQUEST_ERROR: &'static str = "REQUEST_ERROR";
    pub const INVALID_URL: &'static str = "INVALID_URL";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_details(mut self, details: HashMap<String, Value>) -> Self {
        self.details = Some(details);
        self
    }
}

/// Result of a step execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepRunResult {
    pub step_id: Uuid,
    pub status: StepRunStatus,
    /// Ports to propagate along; must be a subset of the step's live ports.
    pub fired_ports: Vec<String>,
    /// Fire-and-forget: the runner skips routing from this result.
    #[serde(default)]
    pub continue_without_waiting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_data: Option<HashMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

impl StepRunResult {
    /// A successful result firing the default port.
    pub fn success(step_id: Uuid) -> Self {
        Self {
            step_id,
            status: StepRunStatus::Success,
            fired_ports: vec![DEFAULT_PORT.to_string()],
            continue_without_waiting: false,
            output_data: None,
            error: None,
        }
    }

    /// A failed result firing the default port; use
    /// [`StepRunResult::with_fired_ports`] to route along `error` instead.
    pub fn failure(step_id: Uuid, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            step_id,
            status: StepRunStatus::Error,
            fired_ports: vec![DEFAULT_PORT.to_string()],
            continue_without_waiting: false,
            output_data: None,
            error: Some(StepError::new(message).with_code(code)),
        }
    }

    pub fn with_fired_ports(mut self, fired_ports: Vec<String>) -> Self {
        self.fired_ports = fired_ports;
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: Value) -> Self {
        self.output_data
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_continue_without_waiting(mut self) -> Self {
        self.continue_without_waiting = true;
        self
    }

    pub fn with_error_details(mut self, details: HashMap<String, Value>) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = Some(details);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepRunStatus::Success
    }
}
