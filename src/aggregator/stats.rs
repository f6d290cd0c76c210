//! Usage counters kept by the aggregator.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::ProviderTag;

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    successes: u64,
    failures: u64,
    skipped: u64,
}

#[derive(Debug, Default)]
struct Inner {
    requests: u64,
    fallbacks_used: u64,
    unanswered: u64,
    providers: BTreeMap<ProviderTag, Counters>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    pub provider: ProviderTag,
    pub successes: u64,
    pub failures: u64,
    /// Calls not made because the provider's circuit was open.
    pub skipped: u64,
    /// Percentage of attempted calls that succeeded, rounded to two decimals.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    /// Requests answered by a provider other than the primary.
    pub fallbacks_used: u64,
    /// Requests no provider could answer.
    pub unanswered: u64,
    pub providers: Vec<ProviderStats>,
}

#[derive(Debug, Default)]
pub struct UsageStats {
    inner: Mutex<Inner>,
}

impl UsageStats {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn request(&self) {
        self.lock().requests += 1;
    }

    pub fn success(&self, provider: ProviderTag, rank: usize) {
        let mut inner = self.lock();
        inner.providers.entry(provider).or_default().successes += 1;
        if rank > 0 {
            inner.fallbacks_used += 1;
        }
    }

    pub fn failure(&self, provider: ProviderTag) {
        self.lock().providers.entry(provider).or_default().failures += 1;
    }

    pub fn skipped(&self, provider: ProviderTag) {
        self.lock().providers.entry(provider).or_default().skipped += 1;
    }

    pub fn unanswered(&self) {
        self.lock().unanswered += 1;
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.lock();
        let providers = inner
            .providers
            .iter()
            .map(|(provider, c)| {
                let attempted = c.successes + c.failures;
                let success_rate = if attempted == 0 {
                    0.0
                } else {
                    (c.successes as f64 / attempted as f64 * 10_000.0).round() / 100.0
                };
                ProviderStats {
                    provider: *provider,
                    successes: c.successes,
                    failures: c.failures,
                    skipped: c.skipped,
                    success_rate,
                }
            })
            .collect();
        StatsSnapshot {
            total_requests: inner.requests,
            fallbacks_used: inner.fallbacks_used,
            unanswered: inner.unanswered,
            providers,
        }
    }
}
