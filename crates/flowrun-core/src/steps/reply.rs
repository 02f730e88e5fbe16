//! Reply step handler.

use async_trait::async_trait;
use serde_json::Value;

use flowrun_workflow::{Step, StepConfig, StepRunResult, StepType};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Generates a reply message from a template and stores it under `reply`.
pub struct ReplyHandler;

#[async_trait]
impl StepHandler for ReplyHandler {
    fn step_type(&self) -> StepType {
        StepType::Reply
    }

    async fn run(
        &self,
        step: &Step,
        state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::Reply(config) = config else {
            return Err(config_mismatch(StepType::Reply));
        };

        let reply = config.template.as_value().cloned().unwrap_or_default();
        state.write().set("reply", Value::String(reply.clone()))?;

        Ok(StepRunResult::success(step.id).with_output("reply", Value::String(reply)))
    }
}
