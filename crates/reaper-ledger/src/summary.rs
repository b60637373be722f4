use std::collections::HashMap;

use reaper_core::ResourceRef;
use serde::{Deserialize, Serialize};

use crate::record::{AttemptOutcome, LedgerEntry, RunId, RunState};

/// Terminal (or explicitly unresolved) outcome of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FinalOutcome {
    Succeeded,
    Failed { reason: String },
    Skipped { blocked_by: ResourceRef },
    /// No terminal entry: never attempted, mid-retry, or cut off by
    /// cancellation or abort.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub resource: ResourceRef,
    pub outcome: FinalOutcome,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedResource {
    pub resource: ResourceRef,
    pub reason: String,
}

/// Read-only view of one run, derived from its ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    /// Last recorded run state, if the run reached a boundary entry.
    pub state: Option<RunState>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub unresolved: usize,
    pub failures: Vec<FailedResource>,
    /// Every planned resource, in plan order, then any extras seen only
    /// in attempt records.
    pub resources: Vec<ResourceOutcome>,
}

impl RunSummary {
    pub fn from_entries(run_id: RunId, entries: &[LedgerEntry]) -> Self {
        let mut order: Vec<ResourceRef> = Vec::new();
        let mut outcomes: HashMap<ResourceRef, (FinalOutcome, u32)> = HashMap::new();
        let mut state = None;

        for entry in entries {
            match entry {
                LedgerEntry::Planned { plan, .. } => {
                    state = Some(RunState::Initialized);
                    for node in &plan.nodes {
                        if !outcomes.contains_key(&node.resource) {
                            order.push(node.resource.clone());
                            outcomes.insert(node.resource.clone(), (FinalOutcome::Unresolved, 0));
                        }
                    }
                }
                LedgerEntry::Attempt(record) => {
                    let slot = outcomes.entry(record.resource.clone()).or_insert_with(|| {
                        order.push(record.resource.clone());
                        (FinalOutcome::Unresolved, 0)
                    });
                    slot.1 += 1;
                    slot.0 = match record.outcome {
                        AttemptOutcome::Success => FinalOutcome::Succeeded,
                        AttemptOutcome::PermanentFailure => FinalOutcome::Failed {
                            reason: record
                                .error_detail
                                .clone()
                                .unwrap_or_else(|| "unknown error".to_string()),
                        },
                        AttemptOutcome::TransientFailure => FinalOutcome::Unresolved,
                    };
                }
                LedgerEntry::Skipped {
                    resource,
                    blocked_by,
                    ..
                } => {
                    let slot = outcomes.entry(resource.clone()).or_insert_with(|| {
                        order.push(resource.clone());
                        (FinalOutcome::Unresolved, 0)
                    });
                    slot.0 = FinalOutcome::Skipped {
                        blocked_by: blocked_by.clone(),
                    };
                }
                LedgerEntry::Resumed { .. } => state = Some(RunState::Running),
                LedgerEntry::Finished { state: s, .. } => state = Some(*s),
            }
        }

        let mut summary = RunSummary {
            run_id,
            state,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            unresolved: 0,
            failures: Vec::new(),
            resources: Vec::with_capacity(order.len()),
        };

        for resource in order {
            let Some((outcome, attempts)) = outcomes.remove(&resource) else {
                continue;
            };
            match &outcome {
                FinalOutcome::Succeeded => summary.succeeded += 1,
                FinalOutcome::Failed { reason } => {
                    summary.failed += 1;
                    summary.failures.push(FailedResource {
                        resource: resource.clone(),
                        reason: reason.clone(),
                    });
                }
                FinalOutcome::Skipped { .. } => summary.skipped += 1,
                FinalOutcome::Unresolved => summary.unresolved += 1,
            }
            summary.resources.push(ResourceOutcome {
                resource,
                outcome,
                attempts,
            });
        }

        summary
    }

    pub fn total(&self) -> usize {
        self.resources.len()
    }

    pub fn outcome_of(&self, resource: &ResourceRef) -> Option<&FinalOutcome> {
        self.resources
            .iter()
            .find(|r| &r.resource == resource)
            .map(|r| &r.outcome)
    }
}
