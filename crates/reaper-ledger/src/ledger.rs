use reaper_core::BoxFuture;

use crate::error::LedgerError;
use crate::record::{AttemptRecord, LedgerEntry, RunId};
use crate::summary::RunSummary;

/// Append-only store of run entries.
///
/// Implementations must return entries for a run in append order; that
/// order is what reconstructs the last known outcome per resource.
pub trait OutcomeLedger: Send + Sync {
    /// Durably append one entry. An error here is fatal to the run.
    fn append<'a>(&'a self, entry: &'a LedgerEntry) -> BoxFuture<'a, Result<(), LedgerError>>;

    /// All entries of a run, in append order. Unknown runs yield none.
    fn entries_for(&self, run_id: RunId) -> BoxFuture<'_, Result<Vec<LedgerEntry>, LedgerError>>;

    /// Highest run id ever recorded.
    fn latest_run_id(&self) -> BoxFuture<'_, Result<Option<RunId>, LedgerError>>;

    /// Attempt records of a run, in append order.
    fn records_for(&self, run_id: RunId) -> BoxFuture<'_, Result<Vec<AttemptRecord>, LedgerError>> {
        Box::pin(async move {
            let records = self
                .entries_for(run_id)
                .await?
                .into_iter()
                .filter_map(|entry| match entry {
                    LedgerEntry::Attempt(record) => Some(record),
                    _ => None,
                })
                .collect();
            Ok(records)
        })
    }

    fn summarize(&self, run_id: RunId) -> BoxFuture<'_, Result<RunSummary, LedgerError>> {
        Box::pin(async move {
            let entries = self.entries_for(run_id).await?;
            Ok(RunSummary::from_entries(run_id, &entries))
        })
    }
}
