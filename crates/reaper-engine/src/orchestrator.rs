use std::collections::{BTreeSet, HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use jiff::Timestamp;
use reaper_core::{ResourceProvider, ResourceRef};
use reaper_ledger::{AttemptOutcome, LedgerEntry, OutcomeLedger, RunId, RunState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::EngineError;
use crate::executor::{Dispatch, RateLimitedExecutor};
use crate::plan::{DeletionPlan, NodeState};
use crate::progress::{EventFeed, StateChange};

/// How a run ended, with the plan in its final state for inspection or
/// manual recovery.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub state: RunState,
    pub plan: DeletionPlan,
    /// Why the run aborted, when it did.
    pub detail: Option<String>,
}

/// Messages from submission tasks back to the scheduling loop. The loop
/// is the only writer of node state.
enum Completion {
    Started(ResourceRef),
    Finished(ResourceRef, Result<Dispatch, EngineError>),
}

/// Drives one deletion plan to a terminal run state.
///
/// A single scheduling loop owns the plan. Ready nodes are handed to the
/// executor as spawned tasks; their completions come back over one
/// channel and are applied in arrival order.
pub struct DeletionOrchestrator {
    plan: DeletionPlan,
    state: RunState,
    provider: Arc<dyn ResourceProvider>,
    ledger: Arc<dyn OutcomeLedger>,
    executor: Arc<RateLimitedExecutor>,
    feed: Arc<EventFeed>,
    cancel: CancellationToken,
    /// Child of `cancel`, also fired on an internal fault.
    dispatch: CancellationToken,
    ready: VecDeque<ResourceRef>,
    in_flight: usize,
    fault: Option<String>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
}

impl DeletionOrchestrator {
    pub fn new(
        plan: DeletionPlan,
        provider: Arc<dyn ResourceProvider>,
        ledger: Arc<dyn OutcomeLedger>,
        executor: Arc<RateLimitedExecutor>,
        feed: Arc<EventFeed>,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatch = cancel.child_token();
        Self {
            plan,
            state: RunState::Initialized,
            provider,
            ledger,
            executor,
            feed,
            cancel,
            dispatch,
            ready: VecDeque::new(),
            in_flight: 0,
            fault: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn plan(&self) -> &DeletionPlan {
        &self.plan
    }

    /// Run the plan to completion, cancellation, or abort.
    pub async fn run(mut self) -> RunOutcome {
        let run_id = self.plan.run_id();
        let span = tracing::info_span!("run", run_id = %run_id);
        async move {
            self.start().await;
            self.schedule().await;
            self.finish().await
        }
        .instrument(span)
        .await
    }

    /// Move to Running and seed the ready queue.
    async fn start(&mut self) {
        self.state = RunState::Running;
        tracing::info!(
            resources = self.plan.len(),
            succeeded = self.plan.count(NodeState::Succeeded),
            "run started"
        );

        // 1. Failures carried over from an earlier session block their
        //    dependents before anything is dispatched
        let failed: Vec<ResourceRef> = self
            .plan
            .nodes()
            .filter(|n| n.state == NodeState::Failed)
            .map(|n| n.resource.clone())
            .collect();
        for resource in failed {
            self.cascade_skip(&resource).await;
        }

        // 2. Everything whose dependencies are satisfied becomes ready
        let seeds: Vec<ResourceRef> = self
            .plan
            .nodes()
            .filter(|n| n.state == NodeState::Pending)
            .map(|n| n.resource.clone())
            .collect();
        for resource in seeds {
            if self.plan.dependencies_satisfied(&resource) {
                self.mark_ready(&resource);
            }
        }
    }

    async fn schedule(&mut self) {
        loop {
            while self.fault.is_none() && !self.cancel.is_cancelled() {
                let Some(next) = self.ready.pop_front() else {
                    break;
                };
                self.spawn_submission(next);
            }

            if self.in_flight == 0 {
                break;
            }

            match self.rx.recv().await {
                Some(completion) => self.apply(completion).await,
                None => break,
            }
        }

        if self.fault.is_none() && !self.cancel.is_cancelled() && !self.plan.all_terminal() {
            let stuck = self.plan.len()
                - self.plan.count(NodeState::Succeeded)
                - self.plan.count(NodeState::Failed)
                - self.plan.count(NodeState::Skipped);
            self.set_fault(format!("scheduling stalled with {stuck} unresolved resources"));
        }
    }

    fn spawn_submission(&mut self, resource: ResourceRef) {
        let run_id = self.plan.run_id();
        let executor = Arc::clone(&self.executor);
        let provider = Arc::clone(&self.provider);
        let cancel = self.dispatch.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let started_tx = tx.clone();
            let started = resource.clone();
            let on_dispatch = move || {
                let _ = started_tx.send(Completion::Started(started));
            };

            let result = AssertUnwindSafe(executor.submit(
                run_id,
                &resource,
                provider.as_ref(),
                &cancel,
                on_dispatch,
            ))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(EngineError::TaskPanicked {
                    resource: resource.clone(),
                })
            });

            let _ = tx.send(Completion::Finished(resource, result));
        });
    }

    async fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Started(resource) => {
                self.advance(&resource, NodeState::Running);
            }
            Completion::Finished(resource, result) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                match result {
                    Ok(Dispatch::Completed(record)) => match record.outcome {
                        AttemptOutcome::Success => {
                            if self.advance(&resource, NodeState::Succeeded) {
                                self.promote_dependents(&resource);
                            }
                        }
                        AttemptOutcome::PermanentFailure | AttemptOutcome::TransientFailure => {
                            if self.advance(&resource, NodeState::Failed) {
                                self.cascade_skip(&resource).await;
                            }
                        }
                    },
                    Ok(Dispatch::Withdrawn) => {
                        tracing::debug!(resource = %resource, "submission withdrawn");
                    }
                    Err(e) => {
                        self.set_fault(format!("{resource}: {e}"));
                    }
                }
            }
        }
    }

    /// Apply a forward transition and publish it. An illegal transition is
    /// an internal fault.
    fn advance(&mut self, resource: &ResourceRef, to: NodeState) -> bool {
        match self.plan.transition(resource, to) {
            Ok(from) => {
                self.publish(resource, from, to);
                true
            }
            Err(e) => {
                self.set_fault(e.to_string());
                false
            }
        }
    }

    fn mark_ready(&mut self, resource: &ResourceRef) {
        if self.advance(resource, NodeState::Ready) {
            self.ready.push_back(resource.clone());
        }
    }

    fn promote_dependents(&mut self, resource: &ResourceRef) {
        let dependents: Vec<ResourceRef> = self
            .plan
            .node(resource)
            .map(|n| n.dependents.iter().cloned().collect())
            .unwrap_or_default();

        for dependent in dependents {
            if self.plan.state_of(&dependent) == Some(NodeState::Pending)
                && self.plan.dependencies_satisfied(&dependent)
            {
                self.mark_ready(&dependent);
            }
        }
    }

    /// Skip every transitive dependent of a failed node that has not yet
    /// reached a terminal state.
    async fn cascade_skip(&mut self, failed: &ResourceRef) {
        let mut queue: VecDeque<ResourceRef> = VecDeque::from([failed.clone()]);
        let mut seen: HashSet<ResourceRef> = HashSet::from([failed.clone()]);

        while let Some(current) = queue.pop_front() {
            let dependents: BTreeSet<ResourceRef> = self
                .plan
                .node(&current)
                .map(|n| n.dependents.clone())
                .unwrap_or_default();

            for dependent in dependents {
                if !seen.insert(dependent.clone()) {
                    continue;
                }
                queue.push_back(dependent.clone());

                if self
                    .plan
                    .state_of(&dependent)
                    .is_some_and(|s| s.is_terminal())
                {
                    continue;
                }
                if !self.advance(&dependent, NodeState::Skipped) {
                    continue;
                }
                self.ready.retain(|r| r != &dependent);
                tracing::info!(resource = %dependent, blocked_by = %failed, "skipped");

                let entry = LedgerEntry::Skipped {
                    run_id: self.plan.run_id(),
                    at: Timestamp::now(),
                    resource: dependent.clone(),
                    blocked_by: failed.clone(),
                };
                if let Err(e) = self.ledger.append(&entry).await {
                    self.set_fault(format!("recording skip of {dependent}: {e}"));
                }
            }
        }
    }

    fn publish(&self, resource: &ResourceRef, from: NodeState, to: NodeState) {
        tracing::debug!(resource = %resource, from = %from, to = %to, "state change");
        self.feed.push(StateChange {
            resource: resource.clone(),
            from,
            to,
            at: Timestamp::now(),
        });
    }

    /// Record the first unrecoverable fault and stop dispatching.
    /// Submissions already dispatched still run to completion.
    fn set_fault(&mut self, detail: String) {
        tracing::error!(error = %detail, "run fault, stopping dispatch");
        if self.fault.is_none() {
            self.fault = Some(detail);
        }
        self.dispatch.cancel();
    }

    async fn finish(mut self) -> RunOutcome {
        let run_id = self.plan.run_id();
        let mut state = if self.fault.is_some() {
            RunState::Aborted
        } else if self.cancel.is_cancelled() {
            RunState::Cancelled
        } else {
            RunState::Completed
        };
        let mut detail = self.fault.take();

        let entry = LedgerEntry::Finished {
            run_id,
            at: Timestamp::now(),
            state,
            detail: detail.clone(),
        };
        if let Err(e) = self.ledger.append(&entry).await {
            tracing::error!(error = %e, "failed to record run end");
            if state != RunState::Aborted {
                state = RunState::Aborted;
                detail = Some(format!("recording run end: {e}"));
            }
        }

        self.state = state;
        self.feed.close();

        tracing::info!(
            state = %state,
            succeeded = self.plan.count(NodeState::Succeeded),
            failed = self.plan.count(NodeState::Failed),
            skipped = self.plan.count(NodeState::Skipped),
            "run finished"
        );

        RunOutcome {
            run_id,
            state,
            plan: self.plan,
            detail,
        }
    }
}
