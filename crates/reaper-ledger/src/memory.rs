use std::collections::BTreeMap;

use reaper_core::BoxFuture;
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::OutcomeLedger;
use crate::record::{LedgerEntry, RunId};

/// In-process ledger. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    runs: Mutex<BTreeMap<RunId, Vec<LedgerEntry>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutcomeLedger for MemoryLedger {
    fn append<'a>(&'a self, entry: &'a LedgerEntry) -> BoxFuture<'a, Result<(), LedgerError>> {
        Box::pin(async move {
            self.runs
                .lock()
                .await
                .entry(entry.run_id())
                .or_default()
                .push(entry.clone());
            Ok(())
        })
    }

    fn entries_for(&self, run_id: RunId) -> BoxFuture<'_, Result<Vec<LedgerEntry>, LedgerError>> {
        Box::pin(async move {
            Ok(self
                .runs
                .lock()
                .await
                .get(&run_id)
                .cloned()
                .unwrap_or_default())
        })
    }

    fn latest_run_id(&self) -> BoxFuture<'_, Result<Option<RunId>, LedgerError>> {
        Box::pin(async move { Ok(self.runs.lock().await.keys().next_back().copied()) })
    }
}
