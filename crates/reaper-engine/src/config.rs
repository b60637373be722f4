use std::collections::HashMap;
use std::time::Duration;

use reaper_core::ResourceKind;
use serde::{Deserialize, Serialize};

/// Throughput ceilings for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindLimits {
    /// Delete calls of this kind allowed in flight at once.
    pub max_concurrency: usize,
    pub bucket_capacity: u32,
    pub refill_per_second: f64,
}

impl Default for KindLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            bucket_capacity: 5,
            refill_per_second: 2.0,
        }
    }
}

impl KindLimits {
    /// DeleteInstance is heavily throttled and slow to settle.
    pub fn instance() -> Self {
        Self {
            max_concurrency: 1,
            bucket_capacity: 1,
            refill_per_second: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total delete calls per submission, including the first.
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub max_total_wait: Duration,
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_total_wait: Duration::from_secs(120),
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` (1-based), or `None`
    /// when the attempt cap or total wait budget is spent.
    ///
    /// Exponential with equal jitter: half of the capped delay is fixed,
    /// the other half random.
    pub fn next_delay(&self, attempt: u32, waited: Duration) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        let half = exp / 2;
        let delay = half + half.mul_f64(fastrand::f64());
        if waited.saturating_add(delay) > self.max_total_wait {
            return None;
        }
        Some(delay)
    }
}

/// Per-run executor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub default_limits: KindLimits,
    pub per_kind: HashMap<ResourceKind, KindLimits>,
    pub retry: RetryPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_limits: KindLimits::default(),
            per_kind: HashMap::from([(ResourceKind::Instance, KindLimits::instance())]),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn limits_for(&self, kind: ResourceKind) -> KindLimits {
        self.per_kind
            .get(&kind)
            .copied()
            .unwrap_or(self.default_limits)
    }

    pub fn with_limits(mut self, kind: ResourceKind, limits: KindLimits) -> Self {
        self.per_kind.insert(kind, limits);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
