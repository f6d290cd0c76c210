//! Cross-provider fixture identity resolution.
//!
//! Fixture ids are provider-scoped. To ask provider A about a fixture that
//! was listed by provider B, the resolver scans A's fixtures for the same
//! date and looks for one whose home and away names both match. Candidates
//! are ranked by match quality and then by kickoff proximity; when the best
//! ones still cannot be told apart the fixture stays unresolved. Hits are
//! cached for the lifetime of the resolver; misses are not, so a fixture
//! that appears later can still be found.

pub mod names;

pub use names::{MatchMode, MatchQuality, NameMatcher};

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::aggregator::HealthTracker;
use crate::models::{CanonicalFixture, FixtureId, ProviderTag};
use crate::providers::FixtureProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(FixtureId),
    /// No counterpart found. Not every fixture is listed by every provider.
    Unresolved,
}

impl Resolution {
    pub fn id(&self) -> Option<FixtureId> {
        match self {
            Resolution::Resolved(id) => Some(*id),
            Resolution::Unresolved => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    target: ProviderTag,
    home: String,
    away: String,
    date: NaiveDate,
}

pub struct IdentityResolver {
    matcher: NameMatcher,
    cache: Mutex<HashMap<CacheKey, FixtureId>>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(NameMatcher::default())
    }
}

impl IdentityResolver {
    pub fn new(matcher: NameMatcher) -> Self {
        IdentityResolver {
            matcher,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn matcher(&self) -> NameMatcher {
        self.matcher
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, FixtureId>> {
        self.cache.lock().unwrap_or_else(|poisoned| {
            warn!("Identity cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn cached_len(&self) -> usize {
        self.lock().len()
    }

    /// Map `fixture` into `target`'s id space.
    ///
    /// The scan respects `target`'s circuit breaker and reports its outcome
    /// to `health`. A fixture without a kickoff date cannot be resolved.
    pub async fn resolve(
        &self,
        fixture: &CanonicalFixture,
        target: &dyn FixtureProvider,
        health: &HealthTracker,
    ) -> Resolution {
        if fixture.provider == target.tag() {
            return Resolution::Resolved(fixture.fixture_id);
        }
        let Some(date) = fixture.kickoff_date() else {
            debug!("fixture {} has no kickoff date, cannot resolve", fixture.fixture_id);
            return Resolution::Unresolved;
        };
        let key = CacheKey {
            target: target.tag(),
            home: self.matcher.key(&fixture.home_team),
            away: self.matcher.key(&fixture.away_team),
            date,
        };
        let cached = self.lock().get(&key).copied();
        if let Some(id) = cached {
            return Resolution::Resolved(id);
        }

        if !health.is_available(target.tag()) {
            debug!("{} unavailable, skipping identity scan", target.tag());
            return Resolution::Unresolved;
        }
        let records = match target.fixtures_on(date).await {
            Ok(records) => {
                health.record_success(target.tag());
                records
            }
            Err(e) => {
                health.record_failure(target.tag(), e.kind());
                warn!("identity scan on {} for {} failed: {}", target.tag(), date, e);
                return Resolution::Unresolved;
            }
        };

        let candidates: Vec<(MatchQuality, CanonicalFixture)> = records
            .iter()
            .map(|r| target.normalize(r))
            .filter_map(|c| {
                let home = self.matcher.quality(&fixture.home_team, &c.home_team)?;
                let away = self.matcher.quality(&fixture.away_team, &c.away_team)?;
                Some((home.min(away), c))
            })
            .collect();
        match pick_candidate(fixture, candidates) {
            Pick::Found(c) => {
                debug!(
                    "{} {} v {} on {} -> {} {}",
                    fixture.provider, fixture.home_team, fixture.away_team, date, target.tag(), c.fixture_id
                );
                self.lock().insert(key, c.fixture_id);
                Resolution::Resolved(c.fixture_id)
            }
            Pick::Ambiguous(n) => {
                warn!(
                    "{} v {} on {} matches {} {} fixtures equally well, leaving unresolved",
                    fixture.home_team, fixture.away_team, date, n, target.tag()
                );
                Resolution::Unresolved
            }
            Pick::NoMatch => {
                debug!(
                    "no {} fixture for {} v {} on {}",
                    target.tag(), fixture.home_team, fixture.away_team, date
                );
                Resolution::Unresolved
            }
        }
    }
}

enum Pick {
    Found(CanonicalFixture),
    Ambiguous(usize),
    NoMatch,
}

/// Best candidate by match quality, then by distance between kickoffs.
/// A candidate without a kickoff is the farthest possible.
fn pick_candidate(fixture: &CanonicalFixture, mut candidates: Vec<(MatchQuality, CanonicalFixture)>) -> Pick {
    candidates.sort_by_key(|(_, c)| c.fixture_id);
    candidates.dedup_by_key(|(_, c)| c.fixture_id);
    let Some(best) = candidates.iter().map(|(q, _)| *q).max() else {
        return Pick::NoMatch;
    };
    let top: Vec<CanonicalFixture> = candidates
        .into_iter()
        .filter(|(q, _)| *q == best)
        .map(|(_, c)| c)
        .collect();

    let distance = |c: &CanonicalFixture| match (fixture.kickoff, c.kickoff) {
        (Some(a), Some(b)) => (a - b).num_seconds().unsigned_abs(),
        _ => u64::MAX,
    };
    let nearest = top.iter().map(distance).min().unwrap_or(u64::MAX);
    let mut closest: Vec<CanonicalFixture> = top.into_iter().filter(|c| distance(c) == nearest).collect();
    if closest.len() == 1 {
        Pick::Found(closest.remove(0))
    } else {
        Pick::Ambiguous(closest.len())
    }
}
