//! Flow definition: a container for steps and the edges connecting them.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

use crate::edge::Edge;
use crate::error::FlowError;
use crate::state::StateContainer;
use crate::step::{Step, StepRunResult};
use crate::types::RunStatus;

/// A named graph of steps and edges.
///
/// Flows are directed graphs where steps are nodes and edges define
/// execution paths between their ports. Cycles are not rejected; a cyclic
/// flow will replay nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "FlowSerde")]
pub struct Flow {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: Vec<Step>,
    pub edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<Uuid, usize>,
}

// Deserialization helper: the step index is rebuilt, not stored.
#[derive(Deserialize)]
struct FlowSerde {
    id: Uuid,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    steps: Vec<Step>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl From<FlowSerde> for Flow {
    fn from(raw: FlowSerde) -> Self {
        let mut flow = Flow {
            id: raw.id,
            name: raw.name,
            steps: raw.steps,
            edges: raw.edges,
            index: HashMap::new(),
        };
        flow.rebuild_index();
        flow
    }
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Some(name.into()),
            steps: Vec::new(),
            edges: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| (step.id, i))
            .collect();
    }

    /// Add a step and return its id.
    pub fn add_step(&mut self, step: Step) -> Uuid {
        let id = step.id;
        self.index.insert(id, self.steps.len());
        self.steps.push(step);
        id
    }

    /// Connect two steps via their default ports. Returns the edge id.
    pub fn connect(&mut self, source: Uuid, target: Uuid) -> Result<Uuid, FlowError> {
        self.connect_ports(source, crate::step::DEFAULT_PORT, target, crate::step::DEFAULT_PORT)
    }

    /// Connect two steps via explicit ports. The source port must exist in
    /// the source step's current port list.
    pub fn connect_ports(
        &mut self,
        source: Uuid,
        source_port: &str,
        target: Uuid,
        target_port: &str,
    ) -> Result<Uuid, FlowError> {
        let source_step = self.get_step(source).ok_or(FlowError::StepNotFound(source))?;
        let available = source_step.ports();
        if !available.iter().any(|p| p == source_port) {
            return Err(FlowError::PortNotFound {
                step_id: source,
                port: source_port.to_string(),
                available,
            });
        }
        if self.get_step(target).is_none() {
            return Err(FlowError::StepNotFound(target));
        }

        let edge = Edge::new(source, target)
            .with_source_port(source_port)
            .with_target_port(target_port);
        let id = edge.id;
        self.edges.push(edge);
        Ok(id)
    }

    /// Find a step by id.
    pub fn get_step(&self, step_id: Uuid) -> Option<&Step> {
        self.index.get(&step_id).and_then(|&i| self.steps.get(i))
    }

    /// Find a step by id for mutation (e.g. editing switch cases).
    pub fn get_step_mut(&mut self, step_id: Uuid) -> Option<&mut Step> {
        let i = *self.index.get(&step_id)?;
        self.steps.get_mut(i)
    }

    /// All edges originating from a step.
    pub fn edges_from(&self, step_id: Uuid) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.source_step_id == step_id)
            .collect()
    }

    /// Edges originating from a specific port of a step.
    pub fn edges_from_port(&self, step_id: Uuid, port: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.source_step_id == step_id && e.source_port == port)
            .collect()
    }

    /// All edges targeting a step.
    pub fn edges_to(&self, step_id: Uuid) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.target_step_id == step_id)
            .collect()
    }

    /// All steps that are triggers (entry points).
    pub fn trigger_steps(&self) -> Vec<&Step> {
        self.steps.iter().filter(|s| s.is_trigger()).collect()
    }

    /// All steps upstream of the given step, by BFS over incoming edges.
    ///
    /// Ports are ignored: a predecessor reachable only through a branch that
    /// cannot fire at runtime still counts. Availability analysis built on
    /// this is deliberately an over-approximation.
    pub fn steps_before(&self, step_id: Uuid) -> Vec<&Step> {
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut result: Vec<&Step> = Vec::new();
        let mut queue: VecDeque<Uuid> = self
            .edges_to(step_id)
            .iter()
            .map(|e| e.source_step_id)
            .collect();

        while let Some(upstream_id) = queue.pop_front() {
            if !visited.insert(upstream_id) {
                continue;
            }
            if let Some(upstream) = self.get_step(upstream_id) {
                result.push(upstream);
                queue.extend(self.edges_to(upstream_id).iter().map(|e| e.source_step_id));
            }
        }

        result
    }
}

/// Result of a complete flow execution.
#[derive(Debug, Clone, Serialize)]
pub struct FlowRunResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub step_results: Vec<StepRunResult>,
    pub final_state: StateContainer,
}
