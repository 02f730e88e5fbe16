//! End-to-end runner tests: linear flows, branching, fan-out, join modes,
//! fire-and-forget, and error handling.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use flowrun_core::{
    shared_state, FlowRunner, JoinTracker, SharedState, StepHandler, StepRegistry,
};
use flowrun_workflow::{
    ConditionalConfig, ConditionalOperator, DelayConfig, Edge, Flow, FlowEvent, HttpMethod,
    Interpolated, JoinMode, RequestConfig, RunStatus, SetStateConfig, StateContainer, Step,
    StepConfig, StepError, StepRunResult, StepRunStatus, WebhookTriggerConfig,
};

fn webhook_trigger(path: &str) -> Step {
    Step::new(StepConfig::TriggerWebhook(WebhookTriggerConfig {
        method: HttpMethod::Post,
        path: path.to_string(),
    }))
}

fn set_state(key: &str, value: &str) -> Step {
    Step::new(StepConfig::SetState(SetStateConfig {
        key: key.to_string(),
        value: value.into(),
    }))
}

fn conditional(left: &str, right: &str) -> Step {
    Step::new(StepConfig::Conditional(ConditionalConfig {
        left: left.into(),
        operator: ConditionalOperator::Equals,
        right: right.into(),
    }))
}

fn delay(seconds: f64) -> Step {
    Step::new(StepConfig::Delay(DelayConfig {
        seconds: Interpolated::Value(seconds),
    }))
}

/// A request step with an unparseable URL; fails with INVALID_URL before any
/// network access and routes along its error port.
fn failing_request() -> Step {
    Step::new(StepConfig::Request(RequestConfig {
        url: "not a url".into(),
        method: HttpMethod::Get,
        headers: Default::default(),
        body: None,
        timeout_secs: 30,
    }))
}

/// Run a flow and collect every emitted event alongside the final result.
async fn run_collecting(
    runner: &FlowRunner,
    flow: &Flow,
    trigger: Uuid,
    state: SharedState,
) -> (Vec<FlowEvent>, flowrun_workflow::FlowRunResult) {
    let (tx, mut rx) = mpsc::channel(256);
    let result = runner
        .execute_with_events(flow, trigger, state, tx)
        .await
        .unwrap();
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (events, result)
}

fn completed_step_ids(events: &[FlowEvent]) -> Vec<Uuid> {
    events
        .iter()
        .filter_map(|e| match e {
            FlowEvent::StepCompleted { step_id, .. } => Some(*step_id),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn linear_flow_propagates_state_and_events() {
    let mut flow = Flow::new("linear");
    let t = flow.add_step(webhook_trigger("/t"));
    let a = flow.add_step(set_state("x", "a"));
    let b = flow.add_step(set_state("y", "{{x}}!"));
    flow.connect(t, a).unwrap();
    flow.connect(a, b).unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, Arc::clone(&state)).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.final_state.get("x"), Some(&json!("a")));
    assert_eq!(result.final_state.get("y"), Some(&json!("a!")));

    // FlowStarted + 3 x (StepStarted, StepCompleted) + FlowCompleted.
    assert_eq!(events.len(), 8);
    assert!(matches!(events.first(), Some(FlowEvent::FlowStarted { .. })));
    assert!(matches!(
        events.last(),
        Some(FlowEvent::FlowCompleted {
            status: RunStatus::Succeeded,
            ..
        })
    ));

    // Every StepStarted has a matching StepCompleted, started first.
    for step in [t, a, b] {
        let started = events
            .iter()
            .position(|e| matches!(e, FlowEvent::StepStarted { step_id, .. } if *step_id == step));
        let completed = events
            .iter()
            .position(|e| matches!(e, FlowEvent::StepCompleted { step_id, .. } if *step_id == step));
        assert!(started.unwrap() < completed.unwrap());
    }

    // All events carry the same run id.
    let run_id = events[0].run_id();
    assert!(events.iter().all(|e| e.run_id() == run_id));
}

#[tokio::test]
async fn conditional_true_branch_skips_the_false_step() {
    let mut flow = Flow::new("branch");
    let t = flow.add_step(webhook_trigger("/t"));
    let cond = flow.add_step(conditional("admin", "admin"));
    let yes = flow.add_step(set_state("branch", "true"));
    let no = flow.add_step(set_state("branch", "false"));
    flow.connect(t, cond).unwrap();
    flow.connect_ports(cond, "true", yes, "default").unwrap();
    flow.connect_ports(cond, "false", no, "default").unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.final_state.get("branch"), Some(&json!("true")));

    let completed = completed_step_ids(&events);
    assert_eq!(completed.len(), 3);
    assert!(!completed.contains(&no));
}

#[tokio::test]
async fn conditional_false_branch_skips_the_true_step() {
    let mut flow = Flow::new("branch");
    let t = flow.add_step(webhook_trigger("/t"));
    let cond = flow.add_step(conditional("user", "admin"));
    let yes = flow.add_step(set_state("branch", "true"));
    let no = flow.add_step(set_state("branch", "false"));
    flow.connect(t, cond).unwrap();
    flow.connect_ports(cond, "true", yes, "default").unwrap();
    flow.connect_ports(cond, "false", no, "default").unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.final_state.get("branch"), Some(&json!("false")));
    let completed = completed_step_ids(&events);
    assert_eq!(completed.len(), 3);
    assert!(!completed.contains(&yes));
}

#[tokio::test(start_paused = true)]
async fn fan_out_runs_branches_concurrently() {
    let mut flow = Flow::new("fan-out");
    let t = flow.add_step(webhook_trigger("/t"));
    let d1 = flow.add_step(delay(0.01));
    let d2 = flow.add_step(delay(0.01));
    flow.connect(t, d1).unwrap();
    flow.connect(t, d2).unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();

    let started = tokio::time::Instant::now();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;
    let elapsed = started.elapsed();

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(completed_step_ids(&events).len(), 3);
    // Parallel, not sequential: total is the max of the two delays.
    assert!(elapsed.as_millis() < 20, "elapsed {elapsed:?}");
}

#[tokio::test]
async fn all_success_join_blocks_after_a_failed_branch() {
    let mut flow = Flow::new("join");
    let t = flow.add_step(webhook_trigger("/t"));
    let ok = flow.add_step(set_state("a", "1"));
    let bad = flow.add_step(failing_request());
    let join = flow.add_step(set_state("joined", "yes").with_join_mode(JoinMode::AllSuccess));
    flow.connect(t, ok).unwrap();
    flow.connect(t, bad).unwrap();
    flow.connect(ok, join).unwrap();
    flow.connect_ports(bad, "error", join, "default").unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.final_state.get("joined"), None);

    let completed = completed_step_ids(&events);
    assert_eq!(completed.len(), 3);
    assert!(!completed.contains(&join));

    let failed = result
        .step_results
        .iter()
        .find(|r| r.status == StepRunStatus::Error)
        .unwrap();
    assert_eq!(
        failed.error.as_ref().and_then(|e| e.code.as_deref()),
        Some(StepError::INVALID_URL)
    );
}

#[tokio::test]
async fn all_success_join_launches_once_after_all_branches_succeed() {
    let mut flow = Flow::new("join");
    let t = flow.add_step(webhook_trigger("/t"));
    let a = flow.add_step(set_state("a", "1"));
    let b = flow.add_step(set_state("b", "2"));
    let join = flow.add_step(set_state("joined", "yes").with_join_mode(JoinMode::AllSuccess));
    flow.connect(t, a).unwrap();
    flow.connect(t, b).unwrap();
    flow.connect(a, join).unwrap();
    flow.connect(b, join).unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.final_state.get("joined"), Some(&json!("yes")));

    let join_runs = completed_step_ids(&events)
        .iter()
        .filter(|id| **id == join)
        .count();
    assert_eq!(join_runs, 1);
}

#[tokio::test]
async fn no_wait_join_runs_target_once_per_arrival() {
    let mut flow = Flow::new("no-wait");
    let t = flow.add_step(webhook_trigger("/t"));
    let a = flow.add_step(set_state("a", "1"));
    let b = flow.add_step(set_state("b", "2"));
    let target = flow.add_step(set_state("hits", "x"));
    flow.connect(t, a).unwrap();
    flow.connect(t, b).unwrap();
    flow.connect(a, target).unwrap();
    flow.connect(b, target).unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    // Default join mode: each arrival enqueues the target independently.
    // Depending on completion interleaving both arrivals may coalesce into
    // the pending set before the first launch, so one or two runs occur.
    let target_runs = completed_step_ids(&events)
        .iter()
        .filter(|id| **id == target)
        .count();
    assert!((1..=2).contains(&target_runs), "ran {target_runs} times");
}

#[tokio::test]
async fn interpolated_config_reads_live_state() {
    let mut flow = Flow::new("interpolation");
    let t = flow.add_step(webhook_trigger("/t"));
    let name = flow.add_step(set_state("name", "Alice"));
    let greet = flow.add_step(set_state("greeting", "Hello, {{name}}!"));
    flow.connect(t, name).unwrap();
    flow.connect(name, greet).unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (_, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.final_state.get("greeting"), Some(&json!("Hello, Alice!")));
}

// ============================================================================
// Error handling
// ============================================================================

#[tokio::test]
async fn config_resolution_failure_is_terminal_with_no_routing() {
    let mut flow = Flow::new("bad-config");
    let t = flow.add_step(webhook_trigger("/t"));
    let d = flow.add_step(Step::new(StepConfig::Delay(DelayConfig {
        seconds: Interpolated::template("{{wait}}"),
    })));
    let after = flow.add_step(set_state("after", "yes"));
    flow.connect(t, d).unwrap();
    flow.connect(d, after).unwrap();

    let mut initial = StateContainer::new();
    initial.set("wait", json!("not a number")).unwrap();
    let state = shared_state(initial);

    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.final_state.get("after"), None);

    let failed = result
        .step_results
        .iter()
        .find(|r| r.step_id == d)
        .unwrap();
    assert_eq!(failed.status, StepRunStatus::Error);
    assert_eq!(
        failed.error.as_ref().and_then(|e| e.code.as_deref()),
        Some(StepError::CONFIG_RESOLUTION_ERROR)
    );

    // Zero duration on the completion event, and no downstream launch.
    let completed = completed_step_ids(&events);
    assert_eq!(completed.len(), 2);
    assert!(!completed.contains(&after));
    for event in &events {
        if let FlowEvent::StepCompleted {
            step_id,
            duration_ms,
            ..
        } = event
        {
            if *step_id == d {
                assert_eq!(*duration_ms, 0.0);
            }
        }
    }
}

#[tokio::test]
async fn failed_step_routes_along_its_error_port() {
    let mut flow = Flow::new("error-routing");
    let t = flow.add_step(webhook_trigger("/t"));
    let bad = flow.add_step(failing_request());
    let rescue = flow.add_step(set_state("handled", "yes"));
    flow.connect(t, bad).unwrap();
    flow.connect_ports(bad, "error", rescue, "default").unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (_, result) = run_collecting(&runner, &flow, t, state).await;

    // The graph handled the failure, but the run still records it.
    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.final_state.get("handled"), Some(&json!("yes")));
}

#[tokio::test]
async fn missing_trigger_id_quiesces_immediately() {
    let mut flow = Flow::new("empty");
    flow.add_step(webhook_trigger("/t"));

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (events, result) = run_collecting(&runner, &flow, Uuid::new_v4(), state).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert!(result.step_results.is_empty());
    assert_eq!(events.len(), 2);
}

// ============================================================================
// Fire-and-forget
// ============================================================================

/// Reply handler double that completes without scheduling successors.
struct DetachedReplyHandler;

#[async_trait]
impl StepHandler for DetachedReplyHandler {
    fn step_type(&self) -> flowrun_workflow::StepType {
        flowrun_workflow::StepType::Reply
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        _config: &StepConfig,
    ) -> Result<StepRunResult, flowrun_core::EngineError> {
        Ok(StepRunResult::success(step.id).with_continue_without_waiting())
    }
}

#[tokio::test]
async fn continue_without_waiting_suppresses_routing() {
    let mut flow = Flow::new("fire-and-forget");
    let t = flow.add_step(webhook_trigger("/t"));
    let reply = flow.add_step(Step::new(StepConfig::Reply(Default::default())));
    let after = flow.add_step(set_state("after", "yes"));
    flow.connect(t, reply).unwrap();
    flow.connect(reply, after).unwrap();

    let mut registry = StepRegistry::new();
    registry.register(Arc::new(DetachedReplyHandler));
    let runner = FlowRunner::with_registry(registry);

    let state = shared_state(StateContainer::new());
    let (events, result) = run_collecting(&runner, &flow, t, state).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(result.final_state.get("after"), None);
    assert_eq!(completed_step_ids(&events).len(), 2);
}

// ============================================================================
// Streaming
// ============================================================================

#[tokio::test]
async fn run_streamed_delivers_events_while_running() {
    use tokio_stream::StreamExt;

    let mut flow = Flow::new("streamed");
    let t = flow.add_step(webhook_trigger("/t"));
    let a = flow.add_step(set_state("x", "1"));
    flow.connect(t, a).unwrap();

    let state = shared_state(StateContainer::new());
    let runner = FlowRunner::new();
    let (mut events, handle) = runner.run_streamed(flow, t, state, 16);

    let mut collected = Vec::new();
    while let Some(event) = events.next().await {
        collected.push(event);
    }
    let result = handle.await.unwrap().unwrap();

    assert_eq!(result.status, RunStatus::Succeeded);
    assert_eq!(collected.len(), 6);
    assert!(matches!(collected.first(), Some(FlowEvent::FlowStarted { .. })));
    assert!(matches!(collected.last(), Some(FlowEvent::FlowCompleted { .. })));
}

// ============================================================================
// Join tracker
// ============================================================================

fn edge_between(source: Uuid, target: Uuid) -> Edge {
    Edge::new(source, target)
}

fn success_result(step_id: Uuid) -> StepRunResult {
    StepRunResult::success(step_id)
}

fn error_result(step_id: Uuid) -> StepRunResult {
    StepRunResult::failure(step_id, "boom", StepError::EXECUTION_ERROR)
}

#[test]
fn no_wait_is_ready_after_any_arrival() {
    let target = Uuid::new_v4();
    let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
    let edges = [edge_between(s1, target), edge_between(s2, target)];
    let edge_refs: Vec<&Edge> = edges.iter().collect();

    let mut tracker = JoinTracker::default();
    assert!(!tracker.is_ready(JoinMode::NoWait, &edge_refs));

    tracker.record(success_result(s1), &edges[0]);
    assert!(tracker.is_ready(JoinMode::NoWait, &edge_refs));
}

#[test]
fn all_success_waits_for_every_source() {
    let target = Uuid::new_v4();
    let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
    let edges = [edge_between(s1, target), edge_between(s2, target)];
    let edge_refs: Vec<&Edge> = edges.iter().collect();

    let mut tracker = JoinTracker::default();
    tracker.record(success_result(s1), &edges[0]);
    assert!(!tracker.is_ready(JoinMode::AllSuccess, &edge_refs));

    tracker.record(success_result(s2), &edges[1]);
    assert!(tracker.is_ready(JoinMode::AllSuccess, &edge_refs));
}

#[test]
fn all_success_rejects_any_failure() {
    let target = Uuid::new_v4();
    let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
    let edges = [edge_between(s1, target), edge_between(s2, target)];
    let edge_refs: Vec<&Edge> = edges.iter().collect();

    let mut tracker = JoinTracker::default();
    tracker.record(success_result(s1), &edges[0]);
    tracker.record(error_result(s2), &edges[1]);
    assert!(!tracker.is_ready(JoinMode::AllSuccess, &edge_refs));
}

#[test]
fn all_done_ignores_status() {
    let target = Uuid::new_v4();
    let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
    let edges = [edge_between(s1, target), edge_between(s2, target)];
    let edge_refs: Vec<&Edge> = edges.iter().collect();

    let mut tracker = JoinTracker::default();
    tracker.record(success_result(s1), &edges[0]);
    assert!(!tracker.is_ready(JoinMode::AllDone, &edge_refs));

    tracker.record(error_result(s2), &edges[1]);
    assert!(tracker.is_ready(JoinMode::AllDone, &edge_refs));
}

#[test]
fn first_success_requires_one_successful_arrival() {
    let target = Uuid::new_v4();
    let (s1, s2) = (Uuid::new_v4(), Uuid::new_v4());
    let edges = [edge_between(s1, target), edge_between(s2, target)];
    let edge_refs: Vec<&Edge> = edges.iter().collect();

    let mut tracker = JoinTracker::default();
    tracker.record(error_result(s1), &edges[0]);
    assert!(!tracker.is_ready(JoinMode::FirstSuccess, &edge_refs));

    tracker.record(success_result(s2), &edges[1]);
    assert!(tracker.is_ready(JoinMode::FirstSuccess, &edge_refs));
}

#[test]
fn parallel_edges_from_one_source_coalesce() {
    let target = Uuid::new_v4();
    let source = Uuid::new_v4();
    let edges = [edge_between(source, target), edge_between(source, target)];
    let edge_refs: Vec<&Edge> = edges.iter().collect();

    let mut tracker = JoinTracker::default();
    tracker.record(success_result(source), &edges[0]);
    // One distinct source delivered on both edges: all-done is satisfied.
    assert!(tracker.is_ready(JoinMode::AllDone, &edge_refs));
}
