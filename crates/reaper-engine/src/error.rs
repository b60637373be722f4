use std::collections::BTreeSet;

use reaper_core::{ProviderError, ResourceRef};
use reaper_ledger::{LedgerError, RunId};
use thiserror::Error;

use crate::plan::NodeState;

/// Planning failures. Nothing has been deleted when one of these surfaces.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("dependency cycle detected among {} resources: {}", involved.len(), render(involved))]
    CycleDetected { involved: BTreeSet<ResourceRef> },

    #[error("dependent discovery failed for {resource}: {source}")]
    DiscoveryFailed {
        resource: ResourceRef,
        #[source]
        source: ProviderError,
    },

    #[error("{dependent} was reported as a dependent of {origin} but belongs to another instance")]
    CrossInstance {
        origin: ResourceRef,
        dependent: ResourceRef,
    },

    #[error(
        "{dependent} was reported as a dependent of {origin}, but no {} -> {} relation is known",
        dependent.kind,
        origin.kind
    )]
    UndeclaredDependency {
        origin: ResourceRef,
        dependent: ResourceRef,
    },

    #[error("plan snapshot references {missing}, which is not a node of the plan")]
    DanglingDependency { missing: ResourceRef },
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("illegal transition for {resource}: {from} -> {to}")]
    IllegalTransition {
        resource: ResourceRef,
        from: NodeState,
        to: NodeState,
    },

    #[error("resource is not part of the plan: {0}")]
    UnknownNode(ResourceRef),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("no plan recorded for run {0}")]
    RunNotFound(RunId),

    #[error("run {0} already has ledger entries; resume it instead")]
    RunAlreadyStarted(RunId),

    #[error("{0} is already in flight")]
    AlreadyInFlight(ResourceRef),

    #[error("worker pool closed")]
    ExecutorClosed,

    #[error("deletion task for {resource} panicked")]
    TaskPanicked { resource: ResourceRef },

    #[error("run task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

fn render(refs: &BTreeSet<ResourceRef>) -> String {
    refs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
