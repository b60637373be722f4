use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use jiff::Timestamp;
use reaper_core::{ResourceProvider, ResourceRef};
use reaper_ledger::{AttemptOutcome, LedgerEntry, OutcomeLedger, RunId, RunSummary};
use tokio_util::sync::CancellationToken;

use crate::config::ExecutorConfig;
use crate::error::{EngineError, GraphError};
use crate::executor::RateLimitedExecutor;
use crate::graph::DependencyGraphBuilder;
use crate::handle::RunHandle;
use crate::orchestrator::DeletionOrchestrator;
use crate::plan::{DeletionPlan, NodeState};
use crate::progress::EventFeed;

/// Entry point for planning, running, and resuming deletion runs against
/// one provider and one ledger.
///
/// Holds no per-run state beyond the run id counter; every run gets its
/// own plan, executor, and event feed.
pub struct Reaper {
    provider: Arc<dyn ResourceProvider>,
    ledger: Arc<dyn OutcomeLedger>,
    next_run: AtomicU64,
}

impl Reaper {
    /// Run ids continue after the highest one already in the ledger.
    pub async fn new(
        provider: Arc<dyn ResourceProvider>,
        ledger: Arc<dyn OutcomeLedger>,
    ) -> Result<Self, EngineError> {
        let latest = ledger.latest_run_id().await?;
        let next = latest.map_or(1, |id| id.0 + 1);
        Ok(Self {
            provider,
            ledger,
            next_run: AtomicU64::new(next),
        })
    }

    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }

    pub fn ledger(&self) -> &Arc<dyn OutcomeLedger> {
        &self.ledger
    }

    fn allocate_run_id(&self) -> RunId {
        RunId(self.next_run.fetch_add(1, Ordering::SeqCst))
    }

    /// Discover every dependent of `targets` and build a deletion plan
    /// under a fresh run id. Nothing is deleted or recorded.
    pub async fn plan_deletion(
        &self,
        targets: impl IntoIterator<Item = ResourceRef>,
    ) -> Result<DeletionPlan, GraphError> {
        let run_id = self.allocate_run_id();
        DependencyGraphBuilder::new(self.provider.as_ref())
            .build(run_id, targets)
            .await
    }

    /// Record the plan and start executing it in the background.
    pub async fn execute_plan(
        &self,
        plan: DeletionPlan,
        config: ExecutorConfig,
    ) -> Result<RunHandle, EngineError> {
        let run_id = plan.run_id();
        if !self.ledger.entries_for(run_id).await?.is_empty() {
            return Err(EngineError::RunAlreadyStarted(run_id));
        }

        self.ledger
            .append(&LedgerEntry::Planned {
                run_id,
                at: Timestamp::now(),
                caller: self.provider.caller_identity(),
                plan: plan.to_snapshot(),
            })
            .await?;

        Ok(self.launch(plan, config))
    }

    /// Rebuild a recorded run from the ledger and drive whatever is left.
    ///
    /// Resources whose last attempt succeeded are not deleted again;
    /// failed and skipped resources stay as they were.
    pub async fn resume(
        &self,
        run_id: RunId,
        config: ExecutorConfig,
    ) -> Result<RunHandle, EngineError> {
        let entries = self.ledger.entries_for(run_id).await?;
        let snapshot = entries
            .iter()
            .rev()
            .find_map(|entry| match entry {
                LedgerEntry::Planned { plan, .. } => Some(plan),
                _ => None,
            })
            .ok_or(EngineError::RunNotFound(run_id))?;

        let mut plan = DeletionPlan::from_snapshot(run_id, snapshot)?;
        for entry in &entries {
            match entry {
                LedgerEntry::Attempt(record) => {
                    let state = match record.outcome {
                        AttemptOutcome::Success => NodeState::Succeeded,
                        AttemptOutcome::PermanentFailure => NodeState::Failed,
                        AttemptOutcome::TransientFailure => NodeState::Pending,
                    };
                    plan.restore_state(&record.resource, state);
                }
                LedgerEntry::Skipped { resource, .. } => {
                    plan.restore_state(resource, NodeState::Skipped);
                }
                _ => {}
            }
        }

        tracing::info!(
            run_id = %run_id,
            succeeded = plan.count(NodeState::Succeeded),
            failed = plan.count(NodeState::Failed),
            skipped = plan.count(NodeState::Skipped),
            remaining = plan.count(NodeState::Pending),
            "resuming run"
        );

        self.ledger
            .append(&LedgerEntry::Resumed {
                run_id,
                at: Timestamp::now(),
            })
            .await?;

        Ok(self.launch(plan, config))
    }

    pub async fn summary(&self, run_id: RunId) -> Result<RunSummary, EngineError> {
        Ok(self.ledger.summarize(run_id).await?)
    }

    fn launch(&self, plan: DeletionPlan, config: ExecutorConfig) -> RunHandle {
        let run_id = plan.run_id();
        let executor = Arc::new(RateLimitedExecutor::new(config, Arc::clone(&self.ledger)));
        let feed = Arc::new(EventFeed::new());
        let cancel = CancellationToken::new();

        let orchestrator = DeletionOrchestrator::new(
            plan,
            Arc::clone(&self.provider),
            Arc::clone(&self.ledger),
            executor,
            Arc::clone(&feed),
            cancel.clone(),
        );
        let task = tokio::spawn(orchestrator.run());

        RunHandle::new(run_id, feed, cancel, Arc::clone(&self.ledger), task)
    }
}
