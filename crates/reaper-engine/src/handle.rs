use std::sync::Arc;

use futures::stream::BoxStream;
use reaper_ledger::{OutcomeLedger, RunId, RunSummary};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::orchestrator::RunOutcome;
use crate::progress::{EventFeed, StateChange};

/// Caller-side handle to a run executing in the background.
pub struct RunHandle {
    run_id: RunId,
    feed: Arc<EventFeed>,
    cancel: CancellationToken,
    ledger: Arc<dyn OutcomeLedger>,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: RunId,
        feed: Arc<EventFeed>,
        cancel: CancellationToken,
        ledger: Arc<dyn OutcomeLedger>,
        task: JoinHandle<RunOutcome>,
    ) -> Self {
        Self {
            run_id,
            feed,
            cancel,
            ledger,
            task,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// State changes of this run. Each call starts again from the first
    /// event; the stream ends when the run does.
    pub fn progress(&self) -> BoxStream<'static, StateChange> {
        self.feed.stream()
    }

    /// Stop issuing new deletes. Calls already dispatched finish normally.
    pub fn cancel(&self) {
        tracing::info!(run_id = %self.run_id, "cancellation requested");
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Summary of what the ledger holds for this run so far.
    pub async fn summary(&self) -> Result<RunSummary, EngineError> {
        Ok(self.ledger.summarize(self.run_id).await?)
    }

    pub async fn wait(self) -> Result<RunOutcome, EngineError> {
        Ok(self.task.await?)
    }
}
