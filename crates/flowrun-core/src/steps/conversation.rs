//! Conversation step handlers: entry points for conversational flows.

use async_trait::async_trait;

use flowrun_workflow::{Step, StepConfig, StepRunResult, StepType};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Marks the start of a conversational flow.
///
/// A trigger with no configuration; `conversation_id` is injected into state
/// by the embedder before the run.
pub struct ConversationStartHandler;

#[async_trait]
impl StepHandler for ConversationStartHandler {
    fn step_type(&self) -> StepType {
        StepType::ConversationStart
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::ConversationStart = config else {
            return Err(config_mismatch(StepType::ConversationStart));
        };
        Ok(StepRunResult::success(step.id))
    }
}

/// Represents receipt of a user message.
///
/// `user_message` and `user_id` are injected into state by the embedder.
pub struct UserMessageHandler;

#[async_trait]
impl StepHandler for UserMessageHandler {
    fn step_type(&self) -> StepType {
        StepType::UserMessage
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::UserMessage = config else {
            return Err(config_mismatch(StepType::UserMessage));
        };
        Ok(StepRunResult::success(step.id))
    }
}
