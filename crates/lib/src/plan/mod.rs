//! The static step graph.
//!
//! A [`Plan`] is an ordered list of [`Step`]s. Order is execution order;
//! every address a step consumes must come from a step earlier in the list,
//! which [`Plan::new`] checks. The dependency edges are also kept as a
//! petgraph [`DiGraph`] so the orchestrator can ask what sits downstream of a
//! resource that had to be redeployed.

mod protocol;

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use thiserror::Error;

use crate::ledger::{Address, Arg, ContractKind};
use crate::store::StepKey;

pub use protocol::protocol_plan;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
  #[error("step name {0:?} is used more than once")]
  Duplicate(String),

  #[error("step name {0:?} collides with a reserved key prefix")]
  Reserved(String),

  #[error("step name must not be empty")]
  EmptyName,

  #[error("step {step} references {reference}, which is not an earlier resource")]
  UnknownReference { step: String, reference: String },
}

/// Where an argument's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSource {
  Literal(Arg),
  /// The address of an earlier resource or external step.
  AddressOf(String),
}

impl ArgSource {
  pub fn address_of(name: impl Into<String>) -> Self {
    ArgSource::AddressOf(name.into())
  }

  fn reference(&self) -> Option<&str> {
    match self {
      ArgSource::Literal(_) => None,
      ArgSource::AddressOf(name) => Some(name),
    }
  }
}

impl From<Arg> for ArgSource {
  fn from(value: Arg) -> Self {
    ArgSource::Literal(value)
  }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
  /// A contract deployed and tracked by the record.
  Resource {
    name: String,
    kind: ContractKind,
    args: Vec<ArgSource>,
  },
  /// A contract that already exists; attached to, never deployed or recorded.
  External {
    name: String,
    kind: ContractKind,
    address: Address,
  },
  /// A one-time call `target.method(args)`.
  Task {
    name: String,
    target: String,
    method: String,
    args: Vec<ArgSource>,
  },
}

impl Step {
  pub fn name(&self) -> &str {
    match self {
      Step::Resource { name, .. } | Step::External { name, .. } | Step::Task { name, .. } => name,
    }
  }

  /// The record key this step writes.
  ///
  /// External steps pin their configured address under a resource key so a
  /// changed address can be detected on the next run.
  pub fn key(&self) -> StepKey {
    match self {
      Step::Resource { name, .. } | Step::External { name, .. } => StepKey::resource(name.as_str()),
      Step::Task { name, .. } => StepKey::task(name.as_str()),
    }
  }

  /// Names of the steps whose addresses this step consumes.
  pub fn dependencies(&self) -> Vec<&str> {
    match self {
      Step::Resource { args, .. } => args.iter().filter_map(ArgSource::reference).collect(),
      Step::External { .. } => Vec::new(),
      Step::Task { target, args, .. } => std::iter::once(target.as_str())
        .chain(args.iter().filter_map(ArgSource::reference))
        .collect(),
    }
  }

  fn provides_address(&self) -> bool {
    !matches!(self, Step::Task { .. })
  }
}

/// A validated, ordered set of steps.
#[derive(Debug, Clone)]
pub struct Plan {
  steps: Vec<Step>,
  /// Edges point from a dependency to its dependent; weights are step indices.
  graph: DiGraph<usize, ()>,
  nodes: HashMap<String, NodeIndex>,
}

impl Plan {
  pub fn new(steps: Vec<Step>) -> Result<Self, PlanError> {
    let mut graph = DiGraph::new();
    let mut nodes: HashMap<String, NodeIndex> = HashMap::new();

    for (index, step) in steps.iter().enumerate() {
      let name = step.name();
      if name.is_empty() {
        return Err(PlanError::EmptyName);
      }
      if StepKey::is_reserved_name(name) {
        return Err(PlanError::Reserved(name.to_string()));
      }
      if nodes.contains_key(name) {
        return Err(PlanError::Duplicate(name.to_string()));
      }

      let node = graph.add_node(index);
      for dependency in step.dependencies() {
        let provider = nodes
          .get(dependency)
          .copied()
          .filter(|&n| steps[graph[n]].provides_address())
          .ok_or_else(|| PlanError::UnknownReference {
            step: name.to_string(),
            reference: dependency.to_string(),
          })?;
        graph.update_edge(provider, node, ());
      }
      nodes.insert(name.to_string(), node);
    }

    Ok(Self { steps, graph, nodes })
  }

  pub fn steps(&self) -> &[Step] {
    &self.steps
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn get(&self, name: &str) -> Option<&Step> {
    self.nodes.get(name).map(|&n| &self.steps[self.graph[n]])
  }

  /// Every step that transitively consumes `name`'s address, in plan order.
  pub fn downstream(&self, name: &str) -> Vec<&Step> {
    let Some(&start) = self.nodes.get(name) else {
      return Vec::new();
    };

    let mut found = BTreeSet::new();
    let mut bfs = Bfs::new(&self.graph, start);
    while let Some(node) = bfs.next(&self.graph) {
      if node != start {
        found.insert(self.graph[node]);
      }
    }
    found.into_iter().map(|i| &self.steps[i]).collect()
  }
}
