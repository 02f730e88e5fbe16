//! Tests for flow construction: edges, ports, trigger discovery, and
//! upstream traversal.

use flowrun_workflow::{
    ConditionalConfig, ConditionalOperator, Flow, FlowError, HttpMethod, Interpolated,
    RequestConfig, SetStateConfig, Step, StepConfig, SwitchCase, SwitchConfig, WebhookTriggerConfig,
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

fn switch(value: &str, cases: &[&str]) -> Step {
    Step::new(StepConfig::Switch(SwitchConfig {
        value: value.into(),
        cases: cases
            .iter()
            .map(|name| SwitchCase {
                name: name.to_string(),
                value: Interpolated::from(*name),
            })
            .collect(),
    }))
}

#[test]
fn connect_links_default_ports() {
    let mut flow = Flow::new("test");
    let a = flow.add_step(webhook_trigger("/t"));
    let b = flow.add_step(set_state("x", "1"));

    flow.connect(a, b).unwrap();

    assert_eq!(flow.edges.len(), 1);
    assert_eq!(flow.edges_from_port(a, "default").len(), 1);
    assert_eq!(flow.edges_to(b).len(), 1);
}

#[test]
fn connect_rejects_unknown_source_port() {
    let mut flow = Flow::new("test");
    let a = flow.add_step(webhook_trigger("/t"));
    let b = flow.add_step(set_state("x", "1"));

    let err = flow.connect_ports(a, "nope", b, "default").unwrap_err();
    assert!(matches!(err, FlowError::PortNotFound { .. }));
}

#[test]
fn connect_rejects_missing_steps() {
    let mut flow = Flow::new("test");
    let a = flow.add_step(webhook_trigger("/t"));
    let ghost = uuid::Uuid::new_v4();

    assert!(matches!(
        flow.connect(ghost, a),
        Err(FlowError::StepNotFound(_))
    ));
    assert!(matches!(
        flow.connect(a, ghost),
        Err(FlowError::StepNotFound(_))
    ));
}

#[test]
fn parallel_edges_are_not_deduplicated() {
    let mut flow = Flow::new("test");
    let a = flow.add_step(webhook_trigger("/t"));
    let b = flow.add_step(set_state("x", "1"));

    flow.connect(a, b).unwrap();
    flow.connect(a, b).unwrap();
    assert_eq!(flow.edges_from(a).len(), 2);
}

#[test]
fn static_port_lists() {
    let cond = conditional("a", "b");
    assert_eq!(cond.ports(), vec!["true", "false"]);

    let request = Step::new(StepConfig::Request(RequestConfig {
        url: "https://api.example.com".into(),
        method: HttpMethod::Get,
        headers: Default::default(),
        body: None,
        timeout_secs: 30,
    }));
    assert_eq!(request.ports(), vec!["success", "error"]);

    assert_eq!(set_state("x", "1").ports(), vec!["default"]);
}

#[test]
fn switch_ports_are_cases_plus_else_in_order() {
    let step = switch("{{tier}}", &["premium", "pro", "free"]);
    assert_eq!(step.ports(), vec!["premium", "pro", "free", "else"]);

    let empty = switch("{{tier}}", &[]);
    assert_eq!(empty.ports(), vec!["else"]);
}

#[test]
fn switch_ports_follow_live_config_edits() {
    let mut flow = Flow::new("test");
    let s = flow.add_step(switch("{{tier}}", &["premium"]));

    // Renaming the case changes the port list everywhere it is consulted.
    if let Some(step) = flow.get_step_mut(s) {
        if let StepConfig::Switch(config) = &mut step.config {
            config.cases[0].name = "gold".to_string();
        }
    }
    assert_eq!(flow.get_step(s).unwrap().ports(), vec!["gold", "else"]);

    let target = flow.add_step(set_state("x", "1"));
    assert!(flow.connect_ports(s, "premium", target, "default").is_err());
    assert!(flow.connect_ports(s, "gold", target, "default").is_ok());
}

#[test]
fn trigger_steps_finds_entry_points() {
    let mut flow = Flow::new("test");
    let t = flow.add_step(webhook_trigger("/t"));
    flow.add_step(set_state("x", "1"));
    flow.add_step(Step::new(StepConfig::ConversationStart));

    let triggers: Vec<_> = flow.trigger_steps().iter().map(|s| s.id).collect();
    assert_eq!(triggers.len(), 2);
    assert!(triggers.contains(&t));
}

#[test]
fn steps_before_walks_the_upstream_closure() {
    let mut flow = Flow::new("test");
    let t = flow.add_step(webhook_trigger("/t"));
    let cond = flow.add_step(conditional("a", "a"));
    let a = flow.add_step(set_state("x", "1"));
    let b = flow.add_step(set_state("y", "2"));
    let join = flow.add_step(set_state("z", "3"));

    flow.connect(t, cond).unwrap();
    flow.connect_ports(cond, "true", a, "default").unwrap();
    flow.connect_ports(cond, "false", b, "default").unwrap();
    flow.connect(a, join).unwrap();
    flow.connect(b, join).unwrap();

    let upstream: Vec<_> = flow.steps_before(join).iter().map(|s| s.id).collect();
    // Both branches count, ports are ignored.
    assert_eq!(upstream.len(), 4);
    for id in [a, b, cond, t] {
        assert!(upstream.contains(&id));
    }

    assert!(flow.steps_before(t).is_empty());
}

#[test]
fn serde_round_trip_rebuilds_the_step_index() {
    let mut flow = Flow::new("round-trip");
    let t = flow.add_step(webhook_trigger("/t"));
    let s = flow.add_step(set_state("x", "{{body}}"));
    flow.connect(t, s).unwrap();

    let encoded = serde_json::to_string(&flow).unwrap();
    let decoded: Flow = serde_json::from_str(&encoded).unwrap();

    assert_eq!(decoded.get_step(t).unwrap().step_type().as_str(), "trigger_webhook");
    assert_eq!(decoded.get_step(s).unwrap().ports(), vec!["default"]);
    assert_eq!(decoded.edges.len(), 1);
}
