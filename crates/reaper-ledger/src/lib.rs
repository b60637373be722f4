//! reaper-ledger
//!
//! Append-only outcome ledger for deletion runs.
//!
//! Every delete attempt, cascade skip, and run boundary is appended as a
//! [`LedgerEntry`] keyed by [`RunId`]. Entries are never rewritten; the
//! latest entry per resource is its known outcome. Two backends:
//! - [`MemoryLedger`] for tests and embedding
//! - [`FileLedger`], one JSON-lines file per run, synced per append

pub mod error;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod record;
pub mod summary;

pub use crate::error::LedgerError;
pub use crate::file::FileLedger;
pub use crate::ledger::OutcomeLedger;
pub use crate::memory::MemoryLedger;
pub use crate::record::{
    AttemptOutcome, AttemptRecord, LedgerEntry, PlanSnapshot, PlannedNode, RunId, RunState,
};
pub use crate::summary::{FailedResource, FinalOutcome, ResourceOutcome, RunSummary};
