//! Trigger step handlers.
//!
//! Triggers receive their data via state injection: the embedder (webhook
//! handler, scheduler, event dispatcher) seeds the state container before the
//! run starts, and the handler bodies simply pass through. The keys each
//! trigger promises are declared on [`Step::outputs`].

use async_trait::async_trait;

use flowrun_workflow::{Step, StepConfig, StepRunResult, StepType};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Starts a flow when an HTTP request is received.
///
/// The webhook handler injects `body`, `headers`, `method` and `query` into
/// state before the run.
pub struct WebhookTriggerHandler;

#[async_trait]
impl StepHandler for WebhookTriggerHandler {
    fn step_type(&self) -> StepType {
        StepType::TriggerWebhook
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::TriggerWebhook(_) = config else {
            return Err(config_mismatch(StepType::TriggerWebhook));
        };
        Ok(StepRunResult::success(step.id))
    }
}

/// Starts a flow on a schedule (cron expression).
///
/// The scheduler injects `scheduled_time` and `actual_time` into state.
pub struct ScheduleTriggerHandler;

#[async_trait]
impl StepHandler for ScheduleTriggerHandler {
    fn step_type(&self) -> StepType {
        StepType::TriggerSchedule
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::TriggerSchedule(_) = config else {
            return Err(config_mismatch(StepType::TriggerSchedule));
        };
        Ok(StepRunResult::success(step.id))
    }
}

/// Starts a flow when a named event fires.
///
/// The dispatcher injects `event_name`, `event_data` and `event_timestamp`
/// into state.
pub struct EventTriggerHandler;

#[async_trait]
impl StepHandler for EventTriggerHandler {
    fn step_type(&self) -> StepType {
        StepType::TriggerEvent
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::TriggerEvent(_) = config else {
            return Err(config_mismatch(StepType::TriggerEvent));
        };
        Ok(StepRunResult::success(step.id))
    }
}
