//! Static validation of flows.
//!
//! Three passes: reference availability (every `{{ref}}` root must be
//! producible by some upstream step), edge sanity (endpoints exist, source
//! ports exist on the live port list), and trigger presence. Validation
//! never executes steps.

use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use flowrun_workflow::{Flow, Step, StepConfig};

use crate::interpolation::extract_refs;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FindingLevel {
    Error,
    Warning,
}

/// A single finding from flow validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationFinding {
    pub step_id: Uuid,
    pub field: String,
    pub reference: String,
    pub message: String,
    pub level: FindingLevel,
}

/// State keys available to a step before it executes.
///
/// The union over every upstream step of its declared outputs, plus the
/// configured key of any upstream set-state step. Upstream is the full BFS
/// closure over incoming edges, ignoring ports — availability is an
/// over-approximation for branches that cannot both fire.
pub fn available_keys_before(flow: &Flow, step: &Step) -> HashSet<String> {
    let mut keys = HashSet::new();
    for upstream in flow.steps_before(step.id) {
        for output in upstream.outputs() {
            keys.insert(output.key);
        }
        if let StepConfig::SetState(config) = &upstream.config {
            if !config.key.is_empty() {
                keys.insert(config.key.clone());
            }
        }
    }
    keys
}

/// Check that every `{{ref}}` in every step config has its root key
/// available at that point in the flow.
pub fn validate_references(flow: &Flow) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    for step in &flow.steps {
        let mut available = available_keys_before(flow, step);

        // Triggers produce their outputs before the run begins, so their own
        // declarations are available to their own config.
        if step.is_trigger() {
            for output in step.outputs() {
                available.insert(output.key);
            }
        }

        for (field, reference) in extract_refs(&step.config) {
            let root = reference.split('.').next().unwrap_or(&reference);
            if !available.contains(root) {
                let mut known: Vec<&String> = available.iter().collect();
                known.sort();
                findings.push(ValidationFinding {
                    step_id: step.id,
                    field,
                    message: format!("'{reference}' not found. Available: {known:?}"),
                    reference,
                    level: FindingLevel::Error,
                });
            }
        }
    }

    findings
}

/// Check that every edge references existing steps and an existing source
/// port (against the live port list, so switch case renames are honored).
pub fn validate_edges(flow: &Flow) -> Vec<ValidationFinding> {
    let mut findings = Vec::new();

    for edge in &flow.edges {
        let source = flow.get_step(edge.source_step_id);
        let target = flow.get_step(edge.target_step_id);

        let Some(source) = source else {
            findings.push(ValidationFinding {
                step_id: edge.source_step_id,
                field: "edge".to_string(),
                reference: edge.id.to_string(),
                message: format!("Source step {} not found", edge.source_step_id),
                level: FindingLevel::Error,
            });
            continue;
        };

        if target.is_none() {
            findings.push(ValidationFinding {
                step_id: edge.target_step_id,
                field: "edge".to_string(),
                reference: edge.id.to_string(),
                message: format!("Target step {} not found", edge.target_step_id),
                level: FindingLevel::Error,
            });
            continue;
        }

        let ports = source.ports();
        if !ports.iter().any(|p| p == &edge.source_port) {
            findings.push(ValidationFinding {
                step_id: edge.source_step_id,
                field: "source_port".to_string(),
                reference: edge.source_port.clone(),
                message: format!(
                    "Port '{}' not found. Available: {:?}",
                    edge.source_port, ports
                ),
                level: FindingLevel::Error,
            });
        }
    }

    findings
}

/// Warn when a flow has no trigger step.
pub fn validate_triggers(flow: &Flow) -> Vec<ValidationFinding> {
    if !flow.trigger_steps().is_empty() {
        return Vec::new();
    }

    let step_id = flow.steps.first().map(|s| s.id).unwrap_or(Uuid::nil());
    vec![ValidationFinding {
        step_id,
        field: "flow".to_string(),
        reference: "triggers".to_string(),
        message: "Flow has no trigger steps".to_string(),
        level: FindingLevel::Warning,
    }]
}

/// Run all validations on a flow.
pub fn validate_flow(flow: &Flow) -> Vec<ValidationFinding> {
    let mut findings = validate_references(flow);
    findings.extend(validate_edges(flow));
    findings.extend(validate_triggers(flow));
    findings
}
