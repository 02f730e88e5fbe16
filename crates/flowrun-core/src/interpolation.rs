//! Reference resolution for step configuration.
//!
//! Configs may carry `{{path.to.value}}` references in fields declared as
//! [`Interpolated`]. [`resolve_config`] substitutes them against live state
//! and coerces each field to its declared type, producing a config of the
//! same shape with every field in literal form. [`extract_refs`] performs
//! the same walk but collects the references instead, for validation.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

use flowrun_workflow::{
    state::value_to_string, ConditionalConfig, DelayConfig, Interpolated, ReplyConfig,
    RequestConfig, SetStateConfig, StateContainer, StepConfig, SwitchCase, SwitchConfig,
};

use crate::error::InterpolationError;

static REF_PATTERN: OnceLock<Regex> = OnceLock::new();

// Matches {{path.to.value}}; the path is trimmed before lookup.
fn ref_pattern() -> &'static Regex {
    REF_PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([^}]+)\}\}").expect("reference pattern is valid")
    })
}

/// Replace `{{path}}` references in `template` with values from `state`.
///
/// Missing references and `null` values substitute as the empty string;
/// objects and arrays are JSON-encoded; everything else uses its plain
/// string form. One pass only: substituted text is not re-scanned, and there
/// is no escape for `{{`.
pub fn resolve_template(template: &str, state: &StateContainer) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    ref_pattern()
        .replace_all(template, |caps: &Captures| {
            let path = caps[1].trim();
            state
                .get_nested(path)
                .map(value_to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

/// A scalar type a resolved template can coerce to.
///
/// `from_resolved` receives the fully substituted string; the empty string
/// maps to each type's zero value. `resolve_literal` handles values that
/// deserialized as literals — for strings these may still carry references,
/// because untagged deserialization cannot tell a template apart.
pub trait InterpolationTarget: Sized + Clone {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError>;

    fn resolve_literal(value: &Self, _state: &StateContainer) -> Result<Self, InterpolationError> {
        Ok(value.clone())
    }
}

impl InterpolationTarget for String {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError> {
        Ok(raw.to_string())
    }

    fn resolve_literal(value: &Self, state: &StateContainer) -> Result<Self, InterpolationError> {
        if value.contains("{{") {
            Ok(resolve_template(value, state))
        } else {
            Ok(value.clone())
        }
    }
}

impl InterpolationTarget for i64 {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError> {
        if raw.is_empty() {
            return Ok(0);
        }
        raw.trim()
            .parse()
            .map_err(|_| InterpolationError::InvalidInt(raw.to_string()))
    }
}

impl InterpolationTarget for f64 {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError> {
        if raw.is_empty() {
            return Ok(0.0);
        }
        raw.trim()
            .parse()
            .map_err(|_| InterpolationError::InvalidFloat(raw.to_string()))
    }
}

impl InterpolationTarget for bool {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError> {
        Ok(matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes"))
    }
}

impl InterpolationTarget for serde_json::Map<String, Value> {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError> {
        if raw.is_empty() {
            return Ok(serde_json::Map::new());
        }
        serde_json::from_str(raw).map_err(|e| InterpolationError::InvalidJson {
            value: raw.to_string(),
            message: e.to_string(),
        })
    }
}

impl InterpolationTarget for Vec<Value> {
    fn from_resolved(raw: &str) -> Result<Self, InterpolationError> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(raw).map_err(|e| InterpolationError::InvalidJson {
            value: raw.to_string(),
            message: e.to_string(),
        })
    }
}

/// Resolve a single interpolatable field to its target type.
pub fn resolve_value<T: InterpolationTarget>(
    field: &Interpolated<T>,
    state: &StateContainer,
) -> Result<T, InterpolationError> {
    match field {
        Interpolated::Value(v) => T::resolve_literal(v, state),
        Interpolated::Template(raw) => {
            let resolved = if raw.contains("{{") {
                resolve_template(raw, state)
            } else {
                raw.clone()
            };
            T::from_resolved(&resolved)
        }
    }
}

fn resolved<T: InterpolationTarget>(
    field: &Interpolated<T>,
    state: &StateContainer,
) -> Result<Interpolated<T>, InterpolationError> {
    Ok(Interpolated::Value(resolve_value(field, state)?))
}

/// Produce a copy of `config` with every interpolatable field resolved
/// against `state` and coerced to its declared type.
///
/// The step's handler receives the resolved config; no interpolation happens
/// during step execution.
pub fn resolve_config(
    config: &StepConfig,
    state: &StateContainer,
) -> Result<StepConfig, InterpolationError> {
    let result = match config {
        // Trigger configs carry no interpolatable fields.
        StepConfig::TriggerWebhook(_)
        | StepConfig::TriggerSchedule(_)
        | StepConfig::TriggerEvent(_)
        | StepConfig::ConversationStart
        | StepConfig::UserMessage => config.clone(),

        StepConfig::Delay(c) => StepConfig::Delay(DelayConfig {
            seconds: resolved(&c.seconds, state)?,
        }),

        StepConfig::Request(c) => {
            let mut headers = HashMap::new();
            for (name, value) in &c.headers {
                headers.insert(name.clone(), resolved(value, state)?);
            }
            StepConfig::Request(RequestConfig {
                url: resolved(&c.url, state)?,
                method: c.method,
                headers,
                body: c
                    .body
                    .as_ref()
                    .map(|body| resolved(body, state))
                    .transpose()?,
                timeout_secs: c.timeout_secs,
            })
        }

        StepConfig::SetState(c) => StepConfig::SetState(SetStateConfig {
            key: c.key.clone(),
            value: resolved(&c.value, state)?,
        }),

        StepConfig::Conditional(c) => StepConfig::Conditional(ConditionalConfig {
            left: resolved(&c.left, state)?,
            operator: c.operator,
            right: resolved(&c.right, state)?,
        }),

        StepConfig::Switch(c) => StepConfig::Switch(SwitchConfig {
            value: resolved(&c.value, state)?,
            cases: c
                .cases
                .iter()
                .map(|case| {
                    Ok(SwitchCase {
                        name: case.name.clone(),
                        value: resolved(&case.value, state)?,
                    })
                })
                .collect::<Result<Vec<_>, InterpolationError>>()?,
        }),

        StepConfig::Reply(c) => StepConfig::Reply(ReplyConfig {
            template: resolved(&c.template, state)?,
        }),
    };
    Ok(result)
}

fn collect_refs_in(field: &str, raw: &str, refs: &mut Vec<(String, String)>) {
    for caps in ref_pattern().captures_iter(raw) {
        refs.push((field.to_string(), caps[1].trim().to_string()));
    }
}

fn collect_string_field(field: &str, value: &Interpolated<String>, refs: &mut Vec<(String, String)>) {
    match value {
        Interpolated::Value(s) | Interpolated::Template(s) => collect_refs_in(field, s, refs),
    }
}

fn collect_template_field<T>(field: &str, value: &Interpolated<T>, refs: &mut Vec<(String, String)>) {
    if let Interpolated::Template(s) = value {
        collect_refs_in(field, s, refs);
    }
}

/// Collect `(field, path)` pairs for every `{{path}}` reference in a config.
pub fn extract_refs(config: &StepConfig) -> Vec<(String, String)> {
    let mut refs = Vec::new();
    match config {
        StepConfig::TriggerWebhook(_)
        | StepConfig::TriggerSchedule(_)
        | StepConfig::TriggerEvent(_)
        | StepConfig::ConversationStart
        | StepConfig::UserMessage => {}

        StepConfig::Delay(c) => collect_template_field("seconds", &c.seconds, &mut refs),

        StepConfig::Request(c) => {
            collect_string_field("url", &c.url, &mut refs);
            for value in c.headers.values() {
                collect_string_field("headers", value, &mut refs);
            }
            if let Some(body) = &c.body {
                collect_string_field("body", body, &mut refs);
            }
        }

        StepConfig::SetState(c) => collect_string_field("value", &c.value, &mut refs),

        StepConfig::Conditional(c) => {
            collect_string_field("left", &c.left, &mut refs);
            collect_string_field("right", &c.right, &mut refs);
        }

        StepConfig::Switch(c) => {
            collect_string_field("value", &c.value, &mut refs);
            for case in &c.cases {
                collect_string_field("value", &case.value, &mut refs);
            }
        }

        StepConfig::Reply(c) => collect_string_field("template", &c.template, &mut refs),
    }
    refs
}
