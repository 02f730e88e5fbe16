//! Delay step handler.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use flowrun_workflow::{Step, StepConfig, StepRunResult, StepType};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Pauses flow execution for a configured number of seconds (0 to 300).
///
/// Writes `delayed_seconds` with the actual duration used.
pub struct DelayHandler;

#[async_trait]
impl StepHandler for DelayHandler {
    fn step_type(&self) -> StepType {
        StepType::Delay
    }

    async fn run(
        &self,
        step: &Step,
        state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::Delay(config) = config else {
            return Err(config_mismatch(StepType::Delay));
        };

        let seconds = config.seconds.as_value().copied().unwrap_or(1.0);
        let seconds = if seconds.is_finite() {
            seconds.clamp(0.0, 300.0)
        } else {
            0.0
        };

        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;

        state.write().set("delayed_seconds", seconds)?;

        Ok(StepRunResult::success(step.id).with_output("delayed_seconds", Value::from(seconds)))
    }
}
