use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use jiff::Timestamp;
use reaper_core::{ProviderError, ResourceKind, ResourceProvider, ResourceRef};
use reaper_ledger::{AttemptOutcome, AttemptRecord, LedgerEntry, OutcomeLedger, RunId};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::bucket::TokenBucket;
use crate::config::ExecutorConfig;
use crate::error::EngineError;

/// Result of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The delete was dispatched; this is the final attempt record.
    Completed(AttemptRecord),
    /// Cancellation arrived before a slot and token were granted. No
    /// delete call was made.
    Withdrawn,
}

struct Lane {
    bucket: TokenBucket,
    slots: Semaphore,
}

/// Runs delete calls under per-kind concurrency and rate ceilings, with
/// retries for transient failures.
pub struct RateLimitedExecutor {
    config: ExecutorConfig,
    lanes: HashMap<ResourceKind, Lane>,
    ledger: Arc<dyn OutcomeLedger>,
    in_flight: Mutex<HashSet<ResourceRef>>,
}

/// Releases the at-most-one-in-flight claim on drop, however the
/// submission ends.
struct InFlightClaim<'a> {
    set: &'a Mutex<HashSet<ResourceRef>>,
    resource: ResourceRef,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.resource);
    }
}

impl RateLimitedExecutor {
    pub fn new(config: ExecutorConfig, ledger: Arc<dyn OutcomeLedger>) -> Self {
        let lanes = ResourceKind::ALL
            .into_iter()
            .map(|kind| {
                let limits = config.limits_for(kind);
                let lane = Lane {
                    bucket: TokenBucket::new(limits.bucket_capacity, limits.refill_per_second),
                    slots: Semaphore::new(limits.max_concurrency.max(1)),
                };
                (kind, lane)
            })
            .collect();

        Self {
            config,
            lanes,
            ledger,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Resources currently claimed by a submission.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delete `target`, waiting cooperatively for a worker slot and a rate
    /// token of its kind first.
    ///
    /// `on_dispatch` runs once, right before the first delete call. If
    /// `cancel` fires while still waiting, nothing is called and the
    /// submission is withdrawn. Once dispatched, the submission runs to
    /// completion, retries included. Every attempt is appended to the
    /// ledger before this returns.
    pub async fn submit<F>(
        &self,
        run_id: RunId,
        target: &ResourceRef,
        provider: &dyn ResourceProvider,
        cancel: &CancellationToken,
        on_dispatch: F,
    ) -> Result<Dispatch, EngineError>
    where
        F: FnOnce() + Send,
    {
        let _claim = self.claim(target)?;
        let lane = self
            .lanes
            .get(&target.kind)
            .ok_or(EngineError::ExecutorClosed)?;

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Dispatch::Withdrawn),
            permit = lane.slots.acquire() => permit.map_err(|_| EngineError::ExecutorClosed)?,
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(Dispatch::Withdrawn),
            _ = lane.bucket.acquire() => {}
        }

        on_dispatch();
        tracing::debug!(run_id = %run_id, resource = %target, "delete dispatched");

        let retry = &self.config.retry;
        let mut attempt: u32 = 1;
        let mut waited = Duration::ZERO;
        loop {
            let started_at = Timestamp::now();
            let result = provider.delete(target).await;

            let (outcome, error_detail, backoff) = match result {
                Ok(()) => (AttemptOutcome::Success, None, None),
                Err(e @ ProviderError::NotFound { .. }) => (
                    AttemptOutcome::Success,
                    Some(format!("already absent: {e}")),
                    None,
                ),
                Err(e) if e.is_retryable() => match retry.next_delay(attempt, waited) {
                    Some(delay) => (
                        AttemptOutcome::TransientFailure,
                        Some(e.to_string()),
                        Some(delay),
                    ),
                    None => (
                        AttemptOutcome::PermanentFailure,
                        Some(format!("retry budget exhausted after {attempt} attempts: {e}")),
                        None,
                    ),
                },
                Err(e) => (AttemptOutcome::PermanentFailure, Some(e.to_string()), None),
            };

            let record = AttemptRecord {
                run_id,
                resource: target.clone(),
                attempt,
                started_at,
                outcome,
                error_detail,
            };
            self.ledger
                .append(&LedgerEntry::Attempt(record.clone()))
                .await?;

            let Some(delay) = backoff else {
                match record.outcome {
                    AttemptOutcome::Success => {
                        tracing::info!(resource = %target, attempt, "deleted");
                    }
                    _ => tracing::warn!(
                        resource = %target,
                        attempt,
                        error = record.error_detail.as_deref().unwrap_or_default(),
                        "delete failed"
                    ),
                }
                return Ok(Dispatch::Completed(record));
            };

            tracing::warn!(
                resource = %target,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = record.error_detail.as_deref().unwrap_or_default(),
                "transient delete failure, retrying"
            );
            tokio::time::sleep(delay).await;
            waited += delay;
            attempt += 1;
            lane.bucket.acquire().await;
        }
    }

    fn claim(&self, target: &ResourceRef) -> Result<InFlightClaim<'_>, EngineError> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(target.clone()) {
            return Err(EngineError::AlreadyInFlight(target.clone()));
        }
        Ok(InFlightClaim {
            set: &self.in_flight,
            resource: target.clone(),
        })
    }
}
