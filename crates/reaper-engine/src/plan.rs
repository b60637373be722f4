use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use reaper_core::ResourceRef;
use reaper_ledger::{PlanSnapshot, PlannedNode, RunId};
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, PlanError};
use crate::graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Pending,
    Ready,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Succeeded | NodeState::Failed | NodeState::Skipped
        )
    }

    /// Forward-only: Pending -> Ready -> Running -> {Succeeded | Failed},
    /// and Skipped from Pending or Ready.
    pub fn can_transition_to(self, next: NodeState) -> bool {
        matches!(
            (self, next),
            (NodeState::Pending, NodeState::Ready)
                | (NodeState::Ready, NodeState::Running)
                | (NodeState::Running, NodeState::Succeeded)
                | (NodeState::Running, NodeState::Failed)
                | (NodeState::Pending, NodeState::Skipped)
                | (NodeState::Ready, NodeState::Skipped)
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            NodeState::Pending => "pending",
            NodeState::Ready => "ready",
            NodeState::Running => "running",
            NodeState::Succeeded => "succeeded",
            NodeState::Failed => "failed",
            NodeState::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub resource: ResourceRef,
    /// Nodes waiting on this one: dispatched only after it succeeds.
    pub dependents: BTreeSet<ResourceRef>,
    /// Nodes that must succeed before this one is dispatched.
    pub dependencies: BTreeSet<ResourceRef>,
    pub state: NodeState,
}

impl PlanNode {
    pub fn new(resource: ResourceRef) -> Self {
        Self {
            resource,
            dependents: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            state: NodeState::Pending,
        }
    }
}

/// All nodes of one run plus their deterministic execution layers.
///
/// Built once by [`crate::graph::DependencyGraphBuilder`], then owned and
/// mutated in place by the orchestrator.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    run_id: RunId,
    nodes: BTreeMap<ResourceRef, PlanNode>,
    /// Topological layers; within a layer nodes are sorted by (kind, id).
    layers: Vec<Vec<ResourceRef>>,
}

impl DeletionPlan {
    pub(crate) fn from_parts(
        run_id: RunId,
        nodes: BTreeMap<ResourceRef, PlanNode>,
        layers: Vec<Vec<ResourceRef>>,
    ) -> Self {
        Self {
            run_id,
            nodes,
            layers,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, resource: &ResourceRef) -> Option<&PlanNode> {
        self.nodes.get(resource)
    }

    pub fn state_of(&self, resource: &ResourceRef) -> Option<NodeState> {
        self.nodes.get(resource).map(|n| n.state)
    }

    pub fn layers(&self) -> &[Vec<ResourceRef>] {
        &self.layers
    }

    /// Every resource in execution order.
    pub fn order(&self) -> impl Iterator<Item = &ResourceRef> {
        self.layers.iter().flatten()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.order().filter_map(|r| self.nodes.get(r))
    }

    pub fn all_terminal(&self) -> bool {
        self.nodes.values().all(|n| n.state.is_terminal())
    }

    pub fn count(&self, state: NodeState) -> usize {
        self.nodes.values().filter(|n| n.state == state).count()
    }

    /// Move a node forward, returning its previous state.
    pub fn transition(
        &mut self,
        resource: &ResourceRef,
        to: NodeState,
    ) -> Result<NodeState, PlanError> {
        let node = self
            .nodes
            .get_mut(resource)
            .ok_or_else(|| PlanError::UnknownNode(resource.clone()))?;
        let from = node.state;
        if !from.can_transition_to(to) {
            return Err(PlanError::IllegalTransition {
                resource: resource.clone(),
                from,
                to,
            });
        }
        node.state = to;
        Ok(from)
    }

    /// Set a node's state from ledger history, bypassing the forward-only
    /// rule. Only used while rebuilding a plan for resume.
    pub(crate) fn restore_state(&mut self, resource: &ResourceRef, state: NodeState) -> bool {
        match self.nodes.get_mut(resource) {
            Some(node) => {
                node.state = state;
                true
            }
            None => false,
        }
    }

    /// True when every dependency of `resource` has succeeded.
    pub fn dependencies_satisfied(&self, resource: &ResourceRef) -> bool {
        self.nodes.get(resource).is_some_and(|node| {
            node.dependencies
                .iter()
                .all(|dep| self.state_of(dep) == Some(NodeState::Succeeded))
        })
    }

    pub fn to_snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            nodes: self
                .nodes()
                .map(|node| PlannedNode {
                    resource: node.resource.clone(),
                    dependencies: node.dependencies.iter().cloned().collect(),
                })
                .collect(),
        }
    }

    /// Rebuild a plan from its persisted shape. Re-validates acyclicity.
    pub fn from_snapshot(run_id: RunId, snapshot: &PlanSnapshot) -> Result<Self, GraphError> {
        let mut nodes: BTreeMap<ResourceRef, PlanNode> = snapshot
            .nodes
            .iter()
            .map(|n| (n.resource.clone(), PlanNode::new(n.resource.clone())))
            .collect();

        for planned in &snapshot.nodes {
            for dep in &planned.dependencies {
                if !nodes.contains_key(dep) {
                    return Err(GraphError::DanglingDependency {
                        missing: dep.clone(),
                    });
                }
                graph::link(&mut nodes, dep, &planned.resource);
            }
        }

        graph::finalize(run_id, nodes)
    }
}
