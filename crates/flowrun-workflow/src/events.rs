//! Events emitted during flow execution.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::step::StepRunResult;
use crate::types::{RunStatus, StepType};

/// Event stream items emitted by the runner.
///
/// Ordering guarantee: `FlowStarted` is first and `FlowCompleted` is last;
/// for any single step, `StepStarted` precedes its `StepCompleted`. Across
/// different steps no ordering is guaranteed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    FlowStarted {
        run_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        flow_name: Option<String>,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        run_id: Uuid,
        step_id: Uuid,
        step_type: StepType,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        run_id: Uuid,
        step_id: Uuid,
        result: StepRunResult,
        duration_ms: f64,
        /// Shallow copy of the state values map at completion.
        state_snapshot: HashMap<String, Value>,
        timestamp: DateTime<Utc>,
    },
    FlowCompleted {
        run_id: Uuid,
        status: RunStatus,
        timestamp: DateTime<Utc>,
    },
}

impl FlowEvent {
    pub fn flow_started(run_id: Uuid, flow_name: Option<String>) -> Self {
        FlowEvent::FlowStarted {
            run_id,
            flow_name,
            timestamp: Utc::now(),
        }
    }

    pub fn step_started(run_id: Uuid, step_id: Uuid, step_type: StepType) -> Self {
        FlowEvent::StepStarted {
            run_id,
            step_id,
            step_type,
            timestamp: Utc::now(),
        }
    }

    pub fn step_completed(
        run_id: Uuid,
        step_id: Uuid,
        result: StepRunResult,
        duration_ms: f64,
        state_snapshot: HashMap<String, Value>,
    ) -> Self {
        FlowEvent::StepCompleted {
            run_id,
            step_id,
            result,
            duration_ms,
            state_snapshot,
            timestamp: Utc::now(),
        }
    }

    pub fn flow_completed(run_id: Uuid, status: RunStatus) -> Self {
        FlowEvent::FlowCompleted {
            run_id,
            status,
            timestamp: Utc::now(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            FlowEvent::FlowStarted { run_id, .. }
            | FlowEvent::StepStarted { run_id, .. }
            | FlowEvent::StepCompleted { run_id, .. }
            | FlowEvent::FlowCompleted { run_id, .. } => *run_id,
        }
    }
}
