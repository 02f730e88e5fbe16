//! Step handlers and the dispatch registry.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use flowrun_workflow::{StateContainer, Step, StepConfig, StepRunResult, StepType};

use crate::error::EngineError;

mod conditional;
mod conversation;
mod delay;
mod reply;
mod request;
mod set_state;
mod switch;
mod triggers;

pub use conditional::{evaluate_condition, ConditionalHandler};
pub use conversation::{ConversationStartHandler, UserMessageHandler};
pub use delay::DelayHandler;
pub use reply::ReplyHandler;
pub use request::RequestHandler;
pub use set_state::SetStateHandler;
pub use switch::SwitchHandler;
pub use triggers::{EventTriggerHandler, ScheduleTriggerHandler, WebhookTriggerHandler};

/// State shared by every step task within a single run.
///
/// Writes are not serialized beyond the lock itself: two concurrent steps
/// writing the same key race with last-writer-wins semantics. Callers
/// needing determinism must serialize through the flow's edges.
pub type SharedState = Arc<RwLock<StateContainer>>;

/// Wrap a state container for use in a run.
pub fn shared_state(state: StateContainer) -> SharedState {
    Arc::new(RwLock::new(state))
}

/// The contract a step presents to the runner.
///
/// `run` receives the step, the run's shared state, and a config snapshot
/// with all `{{path}}` references already resolved. Errors escaping `run`
/// are converted by the runner into ERROR results with code
/// `EXECUTION_ERROR`; they never abort the run.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// The step type this handler executes.
    fn step_type(&self) -> StepType;

    /// Execute the step.
    async fn run(
        &self,
        step: &Step,
        state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError>;
}

pub(crate) fn config_mismatch(step_type: StepType) -> EngineError {
    EngineError::ConfigMismatch { step_type }
}

/// Registry of step handlers keyed by step type.
pub struct StepRegistry {
    handlers: HashMap<StepType, Arc<dyn StepHandler>>,
}

impl StepRegistry {
    /// A registry with all built-in handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };

        // Triggers
        registry.register(Arc::new(WebhookTriggerHandler));
        registry.register(Arc::new(ScheduleTriggerHandler));
        registry.register(Arc::new(EventTriggerHandler));

        // Execution steps
        registry.register(Arc::new(DelayHandler));
        registry.register(Arc::new(RequestHandler::new()));
        registry.register(Arc::new(SetStateHandler));
        registry.register(Arc::new(ConditionalHandler));
        registry.register(Arc::new(SwitchHandler));
        registry.register(Arc::new(ReplyHandler));
        registry.register(Arc::new(ConversationStartHandler));
        registry.register(Arc::new(UserMessageHandler));

        registry
    }

    /// Register a handler, replacing any existing one for its step type.
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) {
        self.handlers.insert(handler.step_type(), handler);
    }

    /// Get the handler for a step type.
    pub fn get(&self, step_type: StepType) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(&step_type).cloned()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
