//! reaper-engine
//!
//! Dependency-aware bulk deletion: plan, throttle, execute, resume.
//!
//! A run goes through three stages:
//! 1. [`DependencyGraphBuilder`] expands the targets into a [`DeletionPlan`]
//!    by asking the provider for concrete dependents, and rejects cycles.
//! 2. [`DeletionOrchestrator`] walks the plan, dispatching nodes whose
//!    dependencies have succeeded and cascade-skipping behind failures.
//! 3. [`RateLimitedExecutor`] performs each delete under per-kind slot and
//!    token-bucket limits, retrying transient failures and recording every
//!    attempt in the ledger.
//!
//! [`Reaper`] ties these together; [`RunHandle`] is the caller's view of a
//! run in progress.

pub mod bucket;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod handle;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod reaper;

pub use crate::bucket::TokenBucket;
pub use crate::config::{ExecutorConfig, KindLimits, RetryPolicy};
pub use crate::error::{EngineError, GraphError, PlanError};
pub use crate::executor::{Dispatch, RateLimitedExecutor};
pub use crate::graph::DependencyGraphBuilder;
pub use crate::handle::RunHandle;
pub use crate::orchestrator::{DeletionOrchestrator, RunOutcome};
pub use crate::plan::{DeletionPlan, NodeState, PlanNode};
pub use crate::progress::{EventFeed, StateChange};
pub use crate::reaper::Reaper;
