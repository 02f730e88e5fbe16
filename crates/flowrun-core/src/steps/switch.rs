//! Switch step handler.

use async_trait::async_trait;
use serde_json::Value;

use flowrun_workflow::{Step, StepConfig, StepRunResult, StepType, ELSE_PORT};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Routes flow based on matching a value against configured cases.
///
/// Ports are dynamic: one per configured case, plus `else`. The first case
/// whose resolved value equals the switch value wins; no match fires `else`.
pub struct SwitchHandler;

#[async_trait]
impl StepHandler for SwitchHandler {
    fn step_type(&self) -> StepType {
        StepType::Switch
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::Switch(config) = config else {
            return Err(config_mismatch(StepType::Switch));
        };

        let value = config.value.as_value().cloned().unwrap_or_default();

        for case in &config.cases {
            if case.value.as_value().map(|v| v == &value).unwrap_or(false) {
                return Ok(StepRunResult::success(step.id)
                    .with_fired_ports(vec![case.name.clone()])
                    .with_output("matched_case", Value::String(case.name.clone())));
            }
        }

        Ok(StepRunResult::success(step.id)
            .with_fired_ports(vec![ELSE_PORT.to_string()])
            .with_output("matched_case", Value::Null))
    }
}
