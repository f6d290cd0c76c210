//! Per-provider circuit breaker.
//!
//! Each provider has a consecutive-failure counter and an optional
//! `disabled_until` deadline. Only failures whose [`ErrorKind`] the policy
//! counts advance the counter; reaching the threshold disables the provider
//! for the cooldown. A success clears both. State is in-memory and shared by
//! every concurrent aggregator call.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ErrorKind;
use crate::models::ProviderTag;

const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone)]
pub struct HealthPolicy {
    /// Consecutive counted failures that open the circuit.
    pub failure_threshold: u32,
    /// How long an open circuit stays open.
    pub cooldown: Duration,
    /// Failure kinds that advance the counter. Others leave it unchanged.
    pub counted: Vec<ErrorKind>,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        HealthPolicy {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
            counted: vec![ErrorKind::CapabilityDenied],
        }
    }
}

impl HealthPolicy {
    pub fn counts(&self, kind: ErrorKind) -> bool {
        self.counted.contains(&kind)
    }
}

#[derive(Debug, Default)]
struct ProviderHealth {
    consecutive_failures: u32,
    disabled_until: Option<Instant>,
}

/// Point-in-time view of one provider's breaker, for logs and the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthSnapshot {
    pub provider: ProviderTag,
    pub consecutive_failures: u32,
    pub disabled: bool,
    /// Seconds until the provider is re-enabled, when disabled.
    pub disabled_for_secs: Option<u64>,
}

pub struct HealthTracker {
    policy: HealthPolicy,
    providers: Mutex<HashMap<ProviderTag, ProviderHealth>>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new(HealthPolicy::default())
    }
}

impl HealthTracker {
    pub fn new(policy: HealthPolicy) -> Self {
        HealthTracker {
            policy,
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &HealthPolicy {
        &self.policy
    }

    /// Lock the state map, recovering from poison: a slightly stale counter
    /// is preferable to taking the whole aggregator down.
    fn lock(&self) -> MutexGuard<'_, HashMap<ProviderTag, ProviderHealth>> {
        self.providers.lock().unwrap_or_else(|poisoned| {
            warn!("Health tracker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether calls may be sent to `provider`. An expired cooldown resets
    /// the provider's state as a side effect.
    pub fn is_available(&self, provider: ProviderTag) -> bool {
        let mut map = self.lock();
        let health = map.entry(provider).or_default();
        match health.disabled_until {
            Some(until) if Instant::now() < until => false,
            Some(_) => {
                *health = ProviderHealth::default();
                info!("{} re-enabled after cooldown", provider);
                true
            }
            None => true,
        }
    }

    pub fn record_success(&self, provider: ProviderTag) {
        let mut map = self.lock();
        let health = map.entry(provider).or_default();
        if health.consecutive_failures > 0 {
            debug!(
                "{} succeeded, clearing {} consecutive failures",
                provider, health.consecutive_failures
            );
        }
        *health = ProviderHealth::default();
    }

    /// Record a failed call. Returns true when this failure opened the circuit.
    pub fn record_failure(&self, provider: ProviderTag, kind: ErrorKind) -> bool {
        if !self.policy.counts(kind) {
            debug!("{} failure of kind {:?} does not count toward the breaker", provider, kind);
            return false;
        }
        let mut map = self.lock();
        let health = map.entry(provider).or_default();
        health.consecutive_failures += 1;
        debug!(
            "{} counted failure {}/{}",
            provider, health.consecutive_failures, self.policy.failure_threshold
        );
        if health.consecutive_failures >= self.policy.failure_threshold && health.disabled_until.is_none() {
            health.disabled_until = Some(Instant::now() + self.policy.cooldown);
            warn!(
                "{} disabled for {:?} after {} consecutive failures",
                provider, self.policy.cooldown, health.consecutive_failures
            );
            return true;
        }
        false
    }

    /// Force `provider` off until `until`.
    pub fn disable_until(&self, provider: ProviderTag, until: Instant) {
        let mut map = self.lock();
        map.entry(provider).or_default().disabled_until = Some(until);
        warn!("{} disabled until {:?}", provider, until);
    }

    pub fn disable_for(&self, provider: ProviderTag, duration: Duration) {
        self.disable_until(provider, Instant::now() + duration);
    }

    pub fn snapshot(&self, provider: ProviderTag) -> HealthSnapshot {
        let map = self.lock();
        let now = Instant::now();
        let (failures, until) = map
            .get(&provider)
            .map(|h| (h.consecutive_failures, h.disabled_until))
            .unwrap_or((0, None));
        let remaining = until.filter(|u| *u > now).map(|u| u - now);
        HealthSnapshot {
            provider,
            consecutive_failures: failures,
            disabled: remaining.is_some(),
            disabled_for_secs: remaining.map(|d| d.as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P: ProviderTag = ProviderTag::SportMonks;

    fn tracker(threshold: u32) -> HealthTracker {
        HealthTracker::new(HealthPolicy {
            failure_threshold: threshold,
            ..HealthPolicy::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn opens_at_threshold() {
        let t = tracker(5);
        for _ in 0..4 {
            assert!(!t.record_failure(P, ErrorKind::CapabilityDenied));
            assert!(t.is_available(P));
        }
        assert!(t.record_failure(P, ErrorKind::CapabilityDenied));
        assert!(!t.is_available(P));
        assert!(t.is_available(ProviderTag::ApiFootball));
    }

    #[tokio::test(start_paused = true)]
    async fn reenables_after_cooldown() {
        let t = tracker(1);
        t.record_failure(P, ErrorKind::CapabilityDenied);
        assert!(!t.is_available(P));

        tokio::time::advance(DEFAULT_COOLDOWN - Duration::from_secs(1)).await;
        assert!(!t.is_available(P));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(t.is_available(P));
        let snap = t.snapshot(P);
        assert_eq!(snap.consecutive_failures, 0);
        assert!(!snap.disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn uncounted_kinds_leave_counter_unchanged() {
        let t = tracker(3);
        t.record_failure(P, ErrorKind::CapabilityDenied);
        t.record_failure(P, ErrorKind::Transient);
        t.record_failure(P, ErrorKind::AmbiguousEmpty);
        assert_eq!(t.snapshot(P).consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_counter() {
        let t = tracker(3);
        t.record_failure(P, ErrorKind::CapabilityDenied);
        t.record_failure(P, ErrorKind::CapabilityDenied);
        t.record_success(P);
        t.record_failure(P, ErrorKind::CapabilityDenied);
        t.record_failure(P, ErrorKind::CapabilityDenied);
        assert!(t.is_available(P));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_counted_kinds() {
        let t = HealthTracker::new(HealthPolicy {
            failure_threshold: 2,
            cooldown: Duration::from_secs(60),
            counted: vec![ErrorKind::Transient, ErrorKind::RateLimited],
        });
        t.record_failure(P, ErrorKind::CapabilityDenied);
        t.record_failure(P, ErrorKind::Transient);
        assert!(t.record_failure(P, ErrorKind::RateLimited));
        assert!(!t.is_available(P));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_disable_reports_remaining_time() {
        let t = HealthTracker::default();
        t.disable_for(P, Duration::from_secs(600));
        let snap = t.snapshot(P);
        assert!(snap.disabled);
        assert_eq!(snap.disabled_for_secs, Some(600));
        assert!(!t.is_available(P));
    }
}
