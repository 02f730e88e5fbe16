//! Step configuration models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::interpolated::Interpolated;
use crate::types::StepType;

/// HTTP methods accepted by the webhook trigger and the request step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request body is sent for this method.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

/// Comparison operators for the conditional step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalOperator {
    #[default]
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
}

/// Configuration for the webhook trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookTriggerConfig {
    /// HTTP method to accept.
    #[serde(default = "default_webhook_method")]
    pub method: HttpMethod,
    /// Webhook endpoint path, e.g. `/webhook/my-flow`.
    pub path: String,
}

fn default_webhook_method() -> HttpMethod {
    HttpMethod::Post
}

/// Configuration for the schedule trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleTriggerConfig {
    /// Cron expression for scheduling.
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Configuration for the event trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventTriggerConfig {
    /// Name of the event to listen for, e.g. `user.created`.
    pub event_name: String,
}

/// Configuration for the delay step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelayConfig {
    /// Seconds to pause, 0 to 300.
    #[serde(default = "default_delay_seconds")]
    pub seconds: Interpolated<f64>,
}

fn default_delay_seconds() -> Interpolated<f64> {
    Interpolated::Value(1.0)
}

/// Configuration for the HTTP request step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestConfig {
    /// Request URL.
    pub url: Interpolated<String>,
    #[serde(default = "default_request_method")]
    pub method: HttpMethod,
    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, Interpolated<String>>,
    /// Request body, sent for POST/PUT/PATCH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Interpolated<String>>,
    /// Request timeout in seconds, 1 to 300.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_request_method() -> HttpMethod {
    HttpMethod::Get
}

fn default_request_timeout() -> u64 {
    30
}

/// Configuration for the set-state step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetStateConfig {
    /// State key to write.
    pub key: String,
    /// Value to store (supports `{{state}}` references).
    pub value: Interpolated<String>,
}

/// Configuration for the conditional step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionalConfig {
    /// Left side of the comparison.
    pub left: Interpolated<String>,
    #[serde(default)]
    pub operator: ConditionalOperator,
    /// Right side of the comparison.
    pub right: Interpolated<String>,
}

/// A single case in a switch step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchCase {
    /// Port name for this case.
    pub name: String,
    /// Value to match against.
    pub value: Interpolated<String>,
}

/// Configuration for the switch step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchConfig {
    /// Value to switch on.
    pub value: Interpolated<String>,
    #[serde(default)]
    pub cases: Vec<SwitchCase>,
}

/// Configuration for the reply step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ReplyConfig {
    /// Reply template (supports `{{state}}` references).
    #[serde(default)]
    pub template: Interpolated<String>,
}

/// Typed configuration for each step kind.
///
/// The variant determines the step type; `transform` and `sub_flow` exist as
/// [`StepType`] tokens only and have no configuration here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepConfig {
    TriggerWebhook(WebhookTriggerConfig),
    TriggerSchedule(ScheduleTriggerConfig),
    TriggerEvent(EventTriggerConfig),
    Delay(DelayConfig),
    Request(RequestConfig),
    SetState(SetStateConfig),
    Conditional(ConditionalConfig),
    Switch(SwitchConfig),
    Reply(ReplyConfig),
    ConversationStart,
    UserMessage,
}

impl StepConfig {
    /// The step type this configuration belongs to.
    pub fn step_type(&self) -> StepType {
        match self {
            StepConfig::TriggerWebhook(_) => StepType::TriggerWebhook,
            StepConfig::TriggerSchedule(_) => StepType::TriggerSchedule,
            StepConfig::TriggerEvent(_) => StepType::TriggerEvent,
            StepConfig::Delay(_) => StepType::Delay,
            StepConfig::Request(_) => StepType::Request,
            StepConfig::SetState(_) => StepType::SetState,
            StepConfig::Conditional(_) => StepType::Conditional,
            StepConfig::Switch(_) => StepType::Switch,
            StepConfig::Reply(_) => StepType::Reply,
            StepConfig::ConversationStart => StepType::ConversationStart,
            StepConfig::UserMessage => StepType::UserMessage,
        }
    }
}
