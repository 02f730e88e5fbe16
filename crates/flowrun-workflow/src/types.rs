//! Core enums shared across the flow model.

use serde::{Deserialize, Serialize};

/// Type classification for state values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StateType {
    #[default]
    Any,
    Text,
    Number,
    Boolean,
    Object,
    Array,
}

impl StateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateType::Any => "any",
            StateType::Text => "text",
            StateType::Number => "number",
            StateType::Boolean => "boolean",
            StateType::Object => "object",
            StateType::Array => "array",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "any" => Some(StateType::Any),
            "text" => Some(StateType::Text),
            "number" => Some(StateType::Number),
            "boolean" => Some(StateType::Boolean),
            "object" => Some(StateType::Object),
            "array" => Some(StateType::Array),
            _ => None,
        }
    }
}

/// How a step with multiple incoming edges decides when to launch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Each arrival triggers the step independently (default).
    #[default]
    NoWait,
    /// Wait for every incoming source; launch only if all succeeded.
    AllSuccess,
    /// Wait for every incoming source regardless of status.
    AllDone,
    /// Launch as soon as any source delivers a successful result.
    FirstSuccess,
}

impl JoinMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinMode::NoWait => "no_wait",
            JoinMode::AllSuccess => "all_success",
            JoinMode::AllDone => "all_done",
            JoinMode::FirstSuccess => "first_success",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "no_wait" => Some(JoinMode::NoWait),
            "all_success" => Some(JoinMode::AllSuccess),
            "all_done" => Some(JoinMode::AllDone),
            "first_success" => Some(JoinMode::FirstSuccess),
            _ => None,
        }
    }
}

/// Classification of step types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    // Triggers (entry points)
    TriggerWebhook,
    TriggerSchedule,
    TriggerEvent,

    // Execution steps
    Request,
    SetState,
    Conditional,
    Transform,
    SubFlow,
    Delay,
    Switch,

    // Conversation steps
    ConversationStart,
    UserMessage,
    Reply,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::TriggerWebhook => "trigger_webhook",
            StepType::TriggerSchedule => "trigger_schedule",
            StepType::TriggerEvent => "trigger_event",
            StepType::Request => "request",
            StepType::SetState => "set_state",
            StepType::Conditional => "conditional",
            StepType::Transform => "transform",
            StepType::SubFlow => "sub_flow",
            StepType::Delay => "delay",
            StepType::Switch => "switch",
            StepType::ConversationStart => "conversation_start",
            StepType::UserMessage => "user_message",
            StepType::Reply => "reply",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trigger_webhook" => Some(StepType::TriggerWebhook),
            "trigger_schedule" => Some(StepType::TriggerSchedule),
            "trigger_event" => Some(StepType::TriggerEvent),
            "request" => Some(StepType::Request),
            "set_state" => Some(StepType::SetState),
            "conditional" => Some(StepType::Conditional),
            "transform" => Some(StepType::Transform),
            "sub_flow" => Some(StepType::SubFlow),
            "delay" => Some(StepType::Delay),
            "switch" => Some(StepType::Switch),
            "conversation_start" => Some(StepType::ConversationStart),
            "user_message" => Some(StepType::UserMessage),
            "reply" => Some(StepType::Reply),
            _ => None,
        }
    }

    /// Whether steps of this type are flow entry points.
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            StepType::TriggerWebhook
                | StepType::TriggerSchedule
                | StepType::TriggerEvent
                | StepType::ConversationStart
        )
    }
}

impl std::fmt::Display for StepType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result status of a single step execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepRunStatus {
    #[default]
    Success,
    Error,
}

impl StepRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepRunStatus::Success => "success",
            StepRunStatus::Error => "error",
        }
    }
}

/// Final status of a flow run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
