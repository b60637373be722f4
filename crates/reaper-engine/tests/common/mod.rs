//! Scripted in-memory stand-in for an Amazon Connect instance.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reaper_core::{BoxFuture, ProviderError, ResourceKind, ResourceProvider, ResourceRef};
use reaper_engine::{ExecutorConfig, KindLimits, RetryPolicy};
use reaper_ledger::{LedgerEntry, LedgerError, MemoryLedger, OutcomeLedger, RunId};

pub const INSTANCE: &str = "inst-1";

pub fn queue(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Queue, INSTANCE, id)
}

pub fn quick_connect(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::QuickConnect, INSTANCE, id)
}

pub fn routing_profile(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::RoutingProfile, INSTANCE, id)
}

pub fn user(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::User, INSTANCE, id)
}

pub fn flow(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Flow, INSTANCE, id)
}

pub fn phone(id: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::PhoneNumberAssociation, INSTANCE, id)
}

/// Generous limits and millisecond backoff so tests run quickly.
pub fn fast_config() -> ExecutorConfig {
    ExecutorConfig {
        default_limits: KindLimits {
            max_concurrency: 8,
            bucket_capacity: 1000,
            refill_per_second: 1000.0,
        },
        per_kind: HashMap::new(),
        retry: RetryPolicy {
            max_attempts: 5,
            max_total_wait: Duration::from_secs(10),
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(10),
        },
    }
}

#[derive(Default)]
struct FakeState {
    dependents: HashMap<ResourceRef, Vec<ResourceRef>>,
    scripts: HashMap<ResourceRef, VecDeque<Result<(), ProviderError>>>,
    discovery_failures: HashSet<ResourceRef>,
    deleted: HashSet<ResourceRef>,
    deletes: Vec<ResourceRef>,
    in_flight: HashMap<ResourceKind, usize>,
    peak: HashMap<ResourceKind, usize>,
    delay: Duration,
}

#[derive(Default)]
pub struct FakeConnect {
    state: Mutex<FakeState>,
}

impl FakeConnect {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `dependent` references `origin`.
    pub fn add_dependent(&self, origin: &ResourceRef, dependent: &ResourceRef) {
        self.state
            .lock()
            .unwrap()
            .dependents
            .entry(origin.clone())
            .or_default()
            .push(dependent.clone());
    }

    /// Results returned by successive delete calls for `resource`. Once
    /// exhausted, deletes behave normally.
    pub fn script(&self, resource: &ResourceRef, results: Vec<Result<(), ProviderError>>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(resource.clone(), results.into());
    }

    pub fn fail_permanently(&self, resource: &ResourceRef) {
        self.script(
            resource,
            vec![Err(ProviderError::permanent(
                "DeleteResource",
                "InvalidRequestException: resource is locked",
            ))],
        );
    }

    pub fn fail_discovery(&self, resource: &ResourceRef) {
        self.state
            .lock()
            .unwrap()
            .discovery_failures
            .insert(resource.clone());
    }

    /// The resource is already gone on the remote side.
    pub fn mark_absent(&self, resource: &ResourceRef) {
        self.state.lock().unwrap().deleted.insert(resource.clone());
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Every delete call, in call order.
    pub fn deletes(&self) -> Vec<ResourceRef> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn delete_count(&self, resource: &ResourceRef) -> usize {
        self.deletes().iter().filter(|r| *r == resource).count()
    }

    /// Most delete calls of `kind` ever observed in flight together.
    pub fn peak_in_flight(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .peak
            .get(&kind)
            .copied()
            .unwrap_or(0)
    }
}

impl ResourceProvider for FakeConnect {
    fn list_dependents<'a>(
        &'a self,
        target: &'a ResourceRef,
    ) -> BoxFuture<'a, Result<Vec<ResourceRef>, ProviderError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            if state.discovery_failures.contains(target) {
                return Err(ProviderError::transient(
                    "ListDependents",
                    "ServiceUnavailableException",
                ));
            }
            Ok(state.dependents.get(target).cloned().unwrap_or_default())
        })
    }

    fn delete<'a>(&'a self, target: &'a ResourceRef) -> BoxFuture<'a, Result<(), ProviderError>> {
        Box::pin(async move {
            let delay = {
                let mut state = self.state.lock().unwrap();
                state.deletes.push(target.clone());
                let current = {
                    let count = state.in_flight.entry(target.kind).or_default();
                    *count += 1;
                    *count
                };
                let peak = state.peak.entry(target.kind).or_default();
                *peak = (*peak).max(current);
                state.delay
            };

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let mut state = self.state.lock().unwrap();
            if let Some(count) = state.in_flight.get_mut(&target.kind) {
                *count -= 1;
            }
            let scripted = state
                .scripts
                .get_mut(target)
                .and_then(|results| results.pop_front());
            let result = match scripted {
                Some(result) => result,
                None if state.deleted.contains(target) => Err(ProviderError::not_found(
                    "DeleteResource",
                    "ResourceNotFoundException",
                )),
                None => Ok(()),
            };
            if result.is_ok() {
                state.deleted.insert(target.clone());
            }
            result
        })
    }

    fn caller_identity(&self) -> Option<String> {
        Some("arn:aws:iam::123456789012:user/ops".to_string())
    }
}

/// Ledger that starts refusing writes after a number of appends.
pub struct FailingLedger {
    inner: MemoryLedger,
    remaining: Mutex<usize>,
}

impl FailingLedger {
    pub fn after(successful_appends: usize) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryLedger::new(),
            remaining: Mutex::new(successful_appends),
        })
    }
}

impl OutcomeLedger for FailingLedger {
    fn append<'a>(&'a self, entry: &'a LedgerEntry) -> BoxFuture<'a, Result<(), LedgerError>> {
        Box::pin(async move {
            {
                let mut remaining = self.remaining.lock().unwrap();
                if *remaining == 0 {
                    return Err(LedgerError::WriteFailed {
                        run_id: entry.run_id(),
                        message: "disk full".to_string(),
                    });
                }
                *remaining -= 1;
            }
            self.inner.append(entry).await
        })
    }

    fn entries_for(&self, run_id: RunId) -> BoxFuture<'_, Result<Vec<LedgerEntry>, LedgerError>> {
        self.inner.entries_for(run_id)
    }

    fn latest_run_id(&self) -> BoxFuture<'_, Result<Option<RunId>, LedgerError>> {
        self.inner.latest_run_id()
    }
}
