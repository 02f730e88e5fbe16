//! Set-state step handler.

use async_trait::async_trait;
use serde_json::Value;

use flowrun_workflow::{Step, StepConfig, StepRunResult, StepType};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Saves a value to the state container.
///
/// The key is user-defined, so this step declares no outputs; the validator
/// reads `config.key` instead. Writes coerce through a declared slot when one
/// exists for the key.
pub struct SetStateHandler;

#[async_trait]
impl StepHandler for SetStateHandler {
    fn step_type(&self) -> StepType {
        StepType::SetState
    }

    async fn run(
        &self,
        step: &Step,
        state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::SetState(config) = config else {
            return Err(config_mismatch(StepType::SetState));
        };

        let value = config.value.as_value().cloned().unwrap_or_default();
        state
            .write()
            .set(config.key.clone(), Value::String(value.clone()))?;

        Ok(StepRunResult::success(step.id).with_output(config.key.clone(), Value::String(value)))
    }
}
