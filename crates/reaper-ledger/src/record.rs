use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use reaper_core::ResourceRef;
use serde::{Deserialize, Serialize};

/// Monotonically increasing identifier of one deletion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub u64);

impl RunId {
    pub fn next(self) -> Self {
        RunId(self.0 + 1)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(RunId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    TransientFailure,
    PermanentFailure,
}

/// One delete call against one resource. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub run_id: RunId,
    pub resource: ResourceRef,
    /// 1-based within the submission
    pub attempt: u32,
    pub started_at: Timestamp,
    pub outcome: AttemptOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Lifecycle of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Initialized,
    Running,
    Completed,
    Cancelled,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Aborted
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            RunState::Initialized => "initialized",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Cancelled => "cancelled",
            RunState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Persisted shape of a deletion plan, enough to rebuild it on resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    /// Nodes in execution order.
    pub nodes: Vec<PlannedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedNode {
    pub resource: ResourceRef,
    /// Resources that must be deleted before this one.
    #[serde(default)]
    pub dependencies: Vec<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum LedgerEntry {
    Planned {
        run_id: RunId,
        at: Timestamp,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caller: Option<String>,
        plan: PlanSnapshot,
    },
    Attempt(AttemptRecord),
    Skipped {
        run_id: RunId,
        at: Timestamp,
        resource: ResourceRef,
        /// The failed resource that made this one unsafe to delete.
        blocked_by: ResourceRef,
    },
    Resumed {
        run_id: RunId,
        at: Timestamp,
    },
    Finished {
        run_id: RunId,
        at: Timestamp,
        state: RunState,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl LedgerEntry {
    pub fn run_id(&self) -> RunId {
        match self {
            LedgerEntry::Planned { run_id, .. }
            | LedgerEntry::Skipped { run_id, .. }
            | LedgerEntry::Resumed { run_id, .. }
            | LedgerEntry::Finished { run_id, .. } => *run_id,
            LedgerEntry::Attempt(record) => record.run_id,
        }
    }
}
