//! Concurrent flow execution: the DAG scheduler with port routing and join
//! semantics.
//!
//! The driver owns all bookkeeping (`pending`, the running task set, join
//! trackers, results); step tasks communicate back only through task
//! completion. Events are emitted into the caller's channel as execution
//! progresses, so a slow consumer applies backpressure to the driver.

use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use flowrun_workflow::{
    Edge, Flow, FlowEvent, FlowRunResult, JoinMode, RunStatus, Step, StepConfig, StepError,
    StepRunResult, DEFAULT_PORT, ERROR_PORT,
};

use crate::error::EngineError;
use crate::interpolation::resolve_config;
use crate::steps::{SharedState, StepHandler, StepRegistry};

/// Tracks incoming-edge completions for a step with converging edges.
///
/// Arrivals are keyed on the source step, so parallel edges from the same
/// source coalesce into its most recent result.
#[derive(Debug, Clone, Default)]
pub struct JoinTracker {
    arrivals: HashMap<Uuid, StepRunResult>,
}

impl JoinTracker {
    /// Record that an edge has delivered a result from its source step.
    pub fn record(&mut self, result: StepRunResult, edge: &Edge) {
        self.arrivals.insert(edge.source_step_id, result);
    }

    /// Whether the owning step may launch under `join_mode`, given all edges
    /// pointing at it.
    pub fn is_ready(&self, join_mode: JoinMode, incoming_edges: &[&Edge]) -> bool {
        let expected: HashSet<Uuid> = incoming_edges.iter().map(|e| e.source_step_id).collect();
        let arrived: HashSet<Uuid> = self.arrivals.keys().copied().collect();

        match join_mode {
            // Any arrival launches; the runner special-cases this mode and
            // enqueues on every arrival without consulting the tracker.
            JoinMode::NoWait => !self.arrivals.is_empty(),
            JoinMode::AllSuccess => {
                arrived == expected && self.arrivals.values().all(|r| r.is_success())
            }
            JoinMode::AllDone => arrived == expected,
            JoinMode::FirstSuccess => self.arrivals.values().any(|r| r.is_success()),
        }
    }
}

/// `["error"]` when the step's live port list declares an error port,
/// `["default"]` otherwise.
fn error_ports(step: &Step) -> Vec<String> {
    if step.ports().iter().any(|p| p == ERROR_PORT) {
        vec![ERROR_PORT.to_string()]
    } else {
        vec![DEFAULT_PORT.to_string()]
    }
}

/// Run a single step body, converting escaped errors and panics into ERROR
/// results so nothing raises out of a step task.
async fn execute_step(
    handler: Arc<dyn StepHandler>,
    step: Step,
    state: SharedState,
    config: StepConfig,
) -> StepRunResult {
    let ports = error_ports(&step);
    match AssertUnwindSafe(handler.run(&step, &state, &config))
        .catch_unwind()
        .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => StepRunResult::failure(
            step.id,
            format!("Step execution failed: {e}"),
            StepError::EXECUTION_ERROR,
        )
        .with_error_details(HashMap::from([(
            "error".to_string(),
            serde_json::Value::String(e.to_string()),
        )]))
        .with_fired_ports(ports),
        Err(_) => StepRunResult::failure(
            step.id,
            "Step execution panicked".to_string(),
            StepError::EXECUTION_ERROR,
        )
        .with_error_details(HashMap::from([(
            "panic".to_string(),
            serde_json::Value::Bool(true),
        )]))
        .with_fired_ports(ports),
    }
}

/// Flow execution engine.
///
/// Holds the step handler registry; each call to [`FlowRunner::execute`] (or
/// its variants) performs one run to quiescence. Triggers produce their
/// inputs by external injection: seed the state container before the run.
pub struct FlowRunner {
    registry: Arc<StepRegistry>,
}

impl FlowRunner {
    /// A runner with all built-in step handlers.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(StepRegistry::new()),
        }
    }

    /// A runner with a custom handler registry.
    pub fn with_registry(registry: StepRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Execute a flow to quiescence, discarding events.
    pub async fn execute(
        &self,
        flow: &Flow,
        trigger_step_id: Uuid,
        state: SharedState,
    ) -> Result<FlowRunResult, EngineError> {
        let (event_tx, event_rx) = mpsc::channel(1);
        // No consumer: close the channel so sends become no-ops instead of
        // blocking the driver.
        drop(event_rx);
        self.execute_with_events(flow, trigger_step_id, state, event_tx)
            .await
    }

    /// Execute a flow on a background task, returning the event stream and a
    /// handle resolving to the final result.
    pub fn run_streamed(
        &self,
        flow: Flow,
        trigger_step_id: Uuid,
        state: SharedState,
        capacity: usize,
    ) -> (
        ReceiverStream<FlowEvent>,
        JoinHandle<Result<FlowRunResult, EngineError>>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let runner = FlowRunner {
            registry: Arc::clone(&self.registry),
        };
        let handle = tokio::spawn(async move {
            runner
                .execute_with_events(&flow, trigger_step_id, state, event_tx)
                .await
        });
        (ReceiverStream::new(event_rx), handle)
    }

    /// Execute a flow to quiescence, emitting events into `event_tx`.
    ///
    /// Exactly one `FlowStarted` and one `FlowCompleted` are emitted per run;
    /// every launched step gets a `StepStarted` and a matching
    /// `StepCompleted`. Step errors never abort the run: the final status is
    /// `failed` iff any recorded result is an error.
    pub async fn execute_with_events(
        &self,
        flow: &Flow,
        trigger_step_id: Uuid,
        state: SharedState,
        event_tx: mpsc::Sender<FlowEvent>,
    ) -> Result<FlowRunResult, EngineError> {
        let run_id = Uuid::new_v4();

        let mut pending: HashSet<Uuid> = HashSet::from([trigger_step_id]);
        let mut running: JoinSet<(Uuid, StepRunResult)> = JoinSet::new();
        let mut join_trackers: HashMap<Uuid, JoinTracker> = HashMap::new();
        let mut results: Vec<StepRunResult> = Vec::new();
        let mut start_times: HashMap<Uuid, Instant> = HashMap::new();

        let _ = event_tx
            .send(FlowEvent::flow_started(run_id, flow.name.clone()))
            .await;

        loop {
            // Select launchable steps: everything pending whose join
            // predicate (if any) is satisfied.
            let mut to_launch: Vec<Uuid> = Vec::new();
            for step_id in pending.iter().copied().collect::<Vec<_>>() {
                let Some(step) = flow.get_step(step_id) else {
                    warn!(%step_id, "pending step not found in flow, discarding");
                    pending.remove(&step_id);
                    continue;
                };

                let incoming = flow.edges_to(step_id);
                if !incoming.is_empty() && step.join_mode != JoinMode::NoWait {
                    let ready = join_trackers
                        .entry(step_id)
                        .or_default()
                        .is_ready(step.join_mode, &incoming);
                    if !ready {
                        continue;
                    }
                }

                to_launch.push(step_id);
            }

            for step_id in to_launch {
                pending.remove(&step_id);
                let Some(step) = flow.get_step(step_id) else {
                    continue;
                };

                let _ = event_tx
                    .send(FlowEvent::step_started(run_id, step_id, step.step_type()))
                    .await;
                debug!(%step_id, step_type = %step.step_type(), "launching step");

                // Resolve config before execution; a resolution failure is a
                // terminal ERROR result with no routing.
                let resolved = {
                    let state = state.read();
                    resolve_config(&step.config, &state)
                };
                let resolved = match resolved {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(%step_id, error = %e, "config resolution failed");
                        let result = StepRunResult::failure(
                            step_id,
                            format!("Config resolution failed: {e}"),
                            StepError::CONFIG_RESOLUTION_ERROR,
                        );
                        results.push(result.clone());
                        let snapshot = state.read().values.clone();
                        let _ = event_tx
                            .send(FlowEvent::step_completed(
                                run_id, step_id, result, 0.0, snapshot,
                            ))
                            .await;
                        continue;
                    }
                };

                let Some(handler) = self.registry.get(step.step_type()) else {
                    // No handler for this type: terminal ERROR, no routing.
                    warn!(%step_id, step_type = %step.step_type(), "no handler registered");
                    let result = StepRunResult::failure(
                        step_id,
                        format!("No handler registered for step type '{}'", step.step_type()),
                        StepError::EXECUTION_ERROR,
                    );
                    results.push(result.clone());
                    let snapshot = state.read().values.clone();
                    let _ = event_tx
                        .send(FlowEvent::step_completed(
                            run_id, step_id, result, 0.0, snapshot,
                        ))
                        .await;
                    continue;
                };

                start_times.insert(step_id, Instant::now());
                let step = step.clone();
                let state = Arc::clone(&state);
                running.spawn(async move {
                    let id = step.id;
                    let result = execute_step(handler, step, state, resolved).await;
                    (id, result)
                });
            }

            if running.is_empty() {
                break;
            }

            // Wait for any running task to complete, then route its result.
            let Some(joined) = running.join_next().await else {
                break;
            };
            let (step_id, result) = match joined {
                Ok(completed) => completed,
                Err(e) => {
                    // Step panics are caught inside the task; a join error
                    // here means the task was aborted externally.
                    warn!(error = %e, "step task failed to join");
                    continue;
                }
            };

            results.push(result.clone());
            let duration_ms = start_times
                .remove(&step_id)
                .map(|started| started.elapsed().as_secs_f64() * 1000.0)
                .unwrap_or(0.0);

            let snapshot = state.read().values.clone();
            let _ = event_tx
                .send(FlowEvent::step_completed(
                    run_id,
                    step_id,
                    result.clone(),
                    duration_ms,
                    snapshot,
                ))
                .await;
            debug!(
                %step_id,
                status = result.status.as_str(),
                duration_ms,
                "step completed"
            );

            // Fire-and-forget: no routing from this result.
            if result.continue_without_waiting {
                continue;
            }

            for port in &result.fired_ports {
                for edge in flow.edges_from_port(step_id, port) {
                    join_trackers
                        .entry(edge.target_step_id)
                        .or_default()
                        .record(result.clone(), edge);
                    pending.insert(edge.target_step_id);
                }
            }
        }

        let status = if results.iter().all(|r| r.is_success()) {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        };
        let _ = event_tx.send(FlowEvent::flow_completed(run_id, status)).await;
        info!(%run_id, status = %status, steps = results.len(), "flow run completed");

        let final_state = state.read().clone();
        Ok(FlowRunResult {
            run_id,
            status,
            step_results: results,
            final_state,
        })
    }
}

impl Default for FlowRunner {
    fn default() -> Self {
        Self::new()
    }
}
