//! Primary-then-secondary cascade over the configured providers.
//!
//! Every logical operation walks the ordered provider list. Providers whose
//! circuit is open are skipped without a network call. A provider's answer
//! is accepted when it is non-empty, or when the operation's
//! [`EmptyPolicy`] says an empty answer is definitive. Providers are never
//! raced: rank N+1 is only called after rank N has failed.

pub mod health;
pub mod stats;

pub use health::{HealthPolicy, HealthSnapshot, HealthTracker};
pub use stats::{ProviderStats, StatsSnapshot, UsageStats};

use anyhow::{bail, Result};
use chrono::NaiveDate;
use futures_util::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{FetchResult, ProviderError};
use crate::identity::{IdentityResolver, Resolution};
use crate::models::{
    CanonicalFixture, ExpectedGoals, FixtureId, FixtureStatistics, LeagueId, OddsSnapshot,
    PredictionSnapshot, ProviderTag, RawProviderRecord, RoiDataset, RoiMetadata, RoiRecord, TeamId,
};
use crate::normalize;
use crate::providers::FixtureProvider;

/// Whether an empty answer ends the cascade or sends it to the next provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyPolicy {
    EmptyIsFailure,
    EmptyIsValid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TodayMatches,
    LiveScores,
    FixtureDetails,
    MatchOdds,
    Predictions,
    TeamForm,
    FixtureStatistics,
    ExpectedGoals,
    EventsInRange,
    OddsInRange,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::TodayMatches,
        Operation::LiveScores,
        Operation::FixtureDetails,
        Operation::MatchOdds,
        Operation::Predictions,
        Operation::TeamForm,
        Operation::FixtureStatistics,
        Operation::ExpectedGoals,
        Operation::EventsInRange,
        Operation::OddsInRange,
    ];

    /// Odds, predictions and statistics are legitimately missing for many
    /// fixtures, so an empty answer is final for them.
    pub fn empty_policy(&self) -> EmptyPolicy {
        match self {
            Operation::MatchOdds
            | Operation::Predictions
            | Operation::FixtureStatistics
            | Operation::ExpectedGoals
            | Operation::OddsInRange => EmptyPolicy::EmptyIsValid,
            Operation::TodayMatches
            | Operation::LiveScores
            | Operation::FixtureDetails
            | Operation::TeamForm
            | Operation::EventsInRange => EmptyPolicy::EmptyIsFailure,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::TodayMatches => "today_matches",
            Operation::LiveScores => "live_scores",
            Operation::FixtureDetails => "fixture_details",
            Operation::MatchOdds => "match_odds",
            Operation::Predictions => "predictions",
            Operation::TeamForm => "team_form",
            Operation::FixtureStatistics => "fixture_statistics",
            Operation::ExpectedGoals => "expected_goals",
            Operation::EventsInRange => "events_in_range",
            Operation::OddsInRange => "odds_in_range",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a successful answer carries nothing.
pub trait Emptiness {
    fn is_empty_result(&self) -> bool;
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Emptiness for Option<T> {
    fn is_empty_result(&self) -> bool {
        self.is_none()
    }
}

impl Emptiness for OddsSnapshot {
    fn is_empty_result(&self) -> bool {
        !self.has_odds()
    }
}

/// Which provider answered, by tag and position in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Provider { tag: ProviderTag, rank: usize },
    None,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::Provider { rank: 0, .. } => "primary",
            Source::Provider { rank: 1, .. } => "secondary",
            Source::Provider { .. } => "fallback",
            Source::None => "none",
        }
    }

    pub fn provider(&self) -> Option<ProviderTag> {
        match self {
            Source::Provider { tag, .. } => Some(*tag),
            Source::None => None,
        }
    }
}

impl Serialize for Source {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Source", 2)?;
        s.serialize_field("label", self.label())?;
        s.serialize_field("provider", &self.provider())?;
        s.end()
    }
}

/// Result of an aggregated operation: the data and who supplied it, or
/// `(None, Source::None)` when no provider could answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregated<T> {
    pub data: Option<T>,
    pub source: Source,
}

impl<T> Aggregated<T> {
    pub fn none() -> Self {
        Aggregated {
            data: None,
            source: Source::None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregated<U> {
        Aggregated {
            data: self.data.map(f),
            source: self.source,
        }
    }

    pub fn is_answered(&self) -> bool {
        self.data.is_some()
    }
}

impl<T> Aggregated<Option<T>> {
    /// Collapse an optional answer; an accepted `None` becomes unanswered.
    pub fn flatten(self) -> Aggregated<T> {
        match self.data.flatten() {
            Some(v) => Aggregated {
                data: Some(v),
                source: self.source,
            },
            None => Aggregated::none(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionReport {
    pub provider: ProviderTag,
    pub reachable: bool,
    pub fixtures_today: usize,
    pub error: Option<String>,
}

pub struct Aggregator {
    providers: Vec<Arc<dyn FixtureProvider>>,
    health: Arc<HealthTracker>,
    resolver: IdentityResolver,
    stats: UsageStats,
    form_lookback: u32,
    max_range_days: u32,
}

impl Aggregator {
    pub const DEFAULT_FORM_LOOKBACK: u32 = 5;
    /// Date-range operations cost one upstream request per day, so longer
    /// ranges are refused.
    pub const DEFAULT_MAX_RANGE_DAYS: u32 = 31;

    /// Providers are tried in the given order; the first is the primary.
    pub fn new(
        providers: Vec<Arc<dyn FixtureProvider>>,
        health: Arc<HealthTracker>,
        resolver: IdentityResolver,
    ) -> Result<Self> {
        if providers.is_empty() {
            bail!("Aggregator needs at least one provider");
        }
        let mut seen = Vec::new();
        for p in &providers {
            if seen.contains(&p.tag()) {
                bail!("Provider {} configured twice", p.tag());
            }
            seen.push(p.tag());
        }
        Ok(Aggregator {
            providers,
            health,
            resolver,
            stats: UsageStats::default(),
            form_lookback: Self::DEFAULT_FORM_LOOKBACK,
            max_range_days: Self::DEFAULT_MAX_RANGE_DAYS,
        })
    }

    pub fn with_form_lookback(mut self, last: u32) -> Self {
        self.form_lookback = last;
        self
    }

    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days;
        self
    }

    pub fn max_range_days(&self) -> u32 {
        self.max_range_days
    }

    /// Whether `start..=end` is short enough to fetch. An inverted range is
    /// allowed and yields nothing.
    pub fn range_allowed(&self, start: NaiveDate, end: NaiveDate) -> bool {
        (end - start).num_days() < i64::from(self.max_range_days)
    }

    fn check_range(&self, op: Operation, start: NaiveDate, end: NaiveDate) -> bool {
        if self.range_allowed(start, end) {
            return true;
        }
        warn!(
            "{}: {}..{} exceeds {} days, not calling any provider",
            op, start, end, self.max_range_days
        );
        false
    }

    pub fn providers(&self) -> Vec<ProviderTag> {
        self.providers.iter().map(|p| p.tag()).collect()
    }

    pub fn health_tracker(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    pub fn health(&self) -> Vec<HealthSnapshot> {
        self.providers
            .iter()
            .map(|p| self.health.snapshot(p.tag()))
            .collect()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn available(&self, op: Operation, tag: ProviderTag) -> bool {
        if self.health.is_available(tag) {
            return true;
        }
        debug!("{}: skipping {}, circuit open", op, tag);
        self.stats.skipped(tag);
        false
    }

    /// Await one provider call and classify it. Returns the value when the
    /// cascade should stop with it.
    async fn attempt<T: Emptiness + Send + 'static>(
        &self,
        op: Operation,
        policy: EmptyPolicy,
        tag: ProviderTag,
        rank: usize,
        call: BoxFuture<'static, FetchResult<T>>,
    ) -> Option<T> {
        if rank > 0 {
            info!("{}: falling back to {}", op, tag);
        }
        match call.await {
            Ok(v) if policy == EmptyPolicy::EmptyIsValid || !v.is_empty_result() => {
                self.health.record_success(tag);
                self.stats.success(tag, rank);
                Some(v)
            }
            Ok(_) => {
                debug!("{}: {} returned nothing, trying next provider", op, tag);
                self.stats.failure(tag);
                None
            }
            Err(e) => {
                self.health.record_failure(tag, e.kind());
                self.stats.failure(tag);
                if rank == 0 {
                    info!("{}: primary failed: {}", op, e);
                } else {
                    warn!("{}: {} failed: {}", op, tag, e);
                }
                None
            }
        }
    }

    fn unanswered<T>(&self, op: Operation) -> Aggregated<T> {
        warn!("{}: no provider returned a result", op);
        self.stats.unanswered();
        Aggregated::none()
    }

    /// Run `call` against each available provider in order under `policy`.
    pub async fn cascade<T, F>(&self, op: Operation, policy: EmptyPolicy, call: F) -> Aggregated<T>
    where
        T: Emptiness + Send + 'static,
        F: Fn(Arc<dyn FixtureProvider>) -> BoxFuture<'static, FetchResult<T>>,
    {
        self.stats.request();
        for (rank, provider) in self.providers.iter().enumerate() {
            let tag = provider.tag();
            if !self.available(op, tag) {
                continue;
            }
            if let Some(v) = self.attempt(op, policy, tag, rank, call(provider.clone())).await {
                return Aggregated {
                    data: Some(v),
                    source: Source::Provider { tag, rank },
                };
            }
        }
        self.unanswered(op)
    }

    async fn run<T, F>(&self, op: Operation, call: F) -> Aggregated<T>
    where
        T: Emptiness + Send + 'static,
        F: Fn(Arc<dyn FixtureProvider>) -> BoxFuture<'static, FetchResult<T>>,
    {
        self.cascade(op, op.empty_policy(), call).await
    }

    pub async fn today_matches(&self) -> Aggregated<Vec<RawProviderRecord>> {
        self.run(Operation::TodayMatches, |p| async move { p.today_matches().await }.boxed())
            .await
    }

    pub async fn live_scores(&self) -> Aggregated<Vec<RawProviderRecord>> {
        self.run(Operation::LiveScores, |p| async move { p.live_scores().await }.boxed())
            .await
    }

    /// Fixture details by id. The id is passed unchanged to every provider;
    /// use [`fixture_details_for`](Self::fixture_details_for) when the
    /// fixture came from a specific provider.
    pub async fn fixture_details(&self, id: FixtureId) -> Aggregated<RawProviderRecord> {
        self.run(Operation::FixtureDetails, move |p| {
            async move { p.fixture_details(id).await }.boxed()
        })
        .await
        .flatten()
    }

    pub async fn match_odds(&self, id: FixtureId) -> Aggregated<OddsSnapshot> {
        self.run(Operation::MatchOdds, move |p| async move { p.match_odds(id).await }.boxed())
            .await
    }

    pub async fn predictions(&self, id: FixtureId) -> Aggregated<Option<PredictionSnapshot>> {
        self.run(Operation::Predictions, move |p| async move { p.predictions(id).await }.boxed())
            .await
    }

    pub async fn team_form(&self, team: TeamId) -> Aggregated<Vec<RawProviderRecord>> {
        self.team_form_last(team, self.form_lookback).await
    }

    pub async fn team_form_last(&self, team: TeamId, last: u32) -> Aggregated<Vec<RawProviderRecord>> {
        self.run(Operation::TeamForm, move |p| {
            async move { p.team_form(team, last).await }.boxed()
        })
        .await
    }

    pub async fn fixture_statistics(&self, id: FixtureId) -> Aggregated<Option<FixtureStatistics>> {
        self.run(Operation::FixtureStatistics, move |p| {
            async move { p.fixture_statistics(id).await }.boxed()
        })
        .await
    }

    /// Expected goals read from the fixture's statistics. Missing statistics
    /// are a definitive answer here too.
    pub async fn expected_goals(&self, id: FixtureId) -> Aggregated<Option<ExpectedGoals>> {
        self.run(Operation::ExpectedGoals, move |p| {
            async move {
                let stats = p.fixture_statistics(id).await?;
                Ok::<_, ProviderError>(stats.map(|s| normalize::expected_goals(&s)))
            }
            .boxed()
        })
        .await
    }

    pub async fn events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> Aggregated<Vec<RawProviderRecord>> {
        if !self.check_range(Operation::EventsInRange, start, end) {
            return Aggregated::none();
        }
        self.run(Operation::EventsInRange, move |p| {
            async move { p.events_in_range(start, end, league).await }.boxed()
        })
        .await
    }

    pub async fn odds_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> Aggregated<Vec<OddsSnapshot>> {
        if !self.check_range(Operation::OddsInRange, start, end) {
            return Aggregated::none();
        }
        self.run(Operation::OddsInRange, move |p| {
            async move { p.odds_in_range(start, end, league).await }.boxed()
        })
        .await
    }

    /// Today's matches in canonical form, normalized by the provider that
    /// supplied them.
    pub async fn today_fixtures(&self) -> Aggregated<Vec<CanonicalFixture>> {
        self.today_matches().await.map(|r| normalize::canonicalize_all(&r))
    }

    pub async fn live_fixtures(&self) -> Aggregated<Vec<CanonicalFixture>> {
        self.live_scores().await.map(|r| normalize::canonicalize_all(&r))
    }

    /// Run a per-fixture call in each provider's own id space. The fixture's
    /// own provider uses its id directly; others go through the identity
    /// resolver and are skipped when it finds no counterpart.
    async fn follow_up<T, F>(&self, op: Operation, fixture: &CanonicalFixture, call: F) -> Aggregated<T>
    where
        T: Emptiness + Send + 'static,
        F: Fn(Arc<dyn FixtureProvider>, FixtureId) -> BoxFuture<'static, FetchResult<T>>,
    {
        self.stats.request();
        let policy = op.empty_policy();
        for (rank, provider) in self.providers.iter().enumerate() {
            let tag = provider.tag();
            if !self.available(op, tag) {
                continue;
            }
            let id = if tag == fixture.provider {
                fixture.fixture_id
            } else {
                match self.resolver.resolve(fixture, provider.as_ref(), &self.health).await {
                    Resolution::Resolved(id) => id,
                    Resolution::Unresolved => {
                        debug!("{}: fixture {} has no {} counterpart", op, fixture.fixture_id, tag);
                        continue;
                    }
                }
            };
            if let Some(v) = self.attempt(op, policy, tag, rank, call(provider.clone(), id)).await {
                return Aggregated {
                    data: Some(v),
                    source: Source::Provider { tag, rank },
                };
            }
        }
        self.unanswered(op)
    }

    pub async fn fixture_details_for(&self, fixture: &CanonicalFixture) -> Aggregated<RawProviderRecord> {
        self.follow_up(Operation::FixtureDetails, fixture, |p, id| {
            async move { p.fixture_details(id).await }.boxed()
        })
        .await
        .flatten()
    }

    pub async fn odds_for(&self, fixture: &CanonicalFixture) -> Aggregated<OddsSnapshot> {
        self.follow_up(Operation::MatchOdds, fixture, |p, id| {
            async move { p.match_odds(id).await }.boxed()
        })
        .await
    }

    pub async fn predictions_for(&self, fixture: &CanonicalFixture) -> Aggregated<Option<PredictionSnapshot>> {
        self.follow_up(Operation::Predictions, fixture, |p, id| {
            async move { p.predictions(id).await }.boxed()
        })
        .await
    }

    pub async fn statistics_for(&self, fixture: &CanonicalFixture) -> Aggregated<Option<FixtureStatistics>> {
        self.follow_up(Operation::FixtureStatistics, fixture, |p, id| {
            async move { p.fixture_statistics(id).await }.boxed()
        })
        .await
    }

    pub async fn expected_goals_for(&self, fixture: &CanonicalFixture) -> Aggregated<Option<ExpectedGoals>> {
        self.follow_up(Operation::ExpectedGoals, fixture, |p, id| {
            async move {
                let stats = p.fixture_statistics(id).await?;
                Ok::<_, ProviderError>(stats.map(|s| normalize::expected_goals(&s)))
            }
            .boxed()
        })
        .await
    }

    /// Events and odds for a date range, both taken from the same provider
    /// so that fixture ids line up. Odds failures degrade to events without
    /// odds rather than failing the dataset.
    pub async fn roi_data(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> Aggregated<RoiDataset> {
        let op = Operation::EventsInRange;
        if !self.check_range(op, start, end) {
            return Aggregated::none();
        }
        self.stats.request();
        for (rank, provider) in self.providers.iter().enumerate() {
            let tag = provider.tag();
            if !self.available(op, tag) {
                continue;
            }
            let p = provider.clone();
            let events_call = async move { p.events_in_range(start, end, league).await }.boxed();
            let Some(events) = self.attempt(op, op.empty_policy(), tag, rank, events_call).await else {
                continue;
            };

            let odds = match provider.odds_in_range(start, end, league).await {
                Ok(odds) => odds,
                Err(e) => {
                    self.health.record_failure(tag, e.kind());
                    warn!("roi: {} odds unavailable, returning events only: {}", tag, e);
                    Vec::new()
                }
            };
            let dataset = build_roi_dataset(provider.as_ref(), events, odds, start, end, league);
            info!(
                "roi: {} events ({} with odds) from {}",
                dataset.metadata.total_events, dataset.metadata.events_with_odds, tag
            );
            return Aggregated {
                data: Some(dataset),
                source: Source::Provider { tag, rank },
            };
        }
        self.unanswered(op)
    }

    /// Call every provider's today's-matches endpoint directly, bypassing
    /// the circuit breaker and leaving its state untouched.
    pub async fn test_connection(&self) -> Vec<ConnectionReport> {
        let mut reports = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let report = match provider.today_matches().await {
                Ok(records) => ConnectionReport {
                    provider: provider.tag(),
                    reachable: true,
                    fixtures_today: records.len(),
                    error: None,
                },
                Err(e) => ConnectionReport {
                    provider: provider.tag(),
                    reachable: false,
                    fixtures_today: 0,
                    error: Some(e.to_string()),
                },
            };
            info!(
                "{} connection test: {}",
                report.provider,
                if report.reachable { "ok" } else { "failed" }
            );
            reports.push(report);
        }
        reports
    }
}

fn build_roi_dataset(
    provider: &dyn FixtureProvider,
    events: Vec<RawProviderRecord>,
    odds: Vec<OddsSnapshot>,
    start: NaiveDate,
    end: NaiveDate,
    league: Option<LeagueId>,
) -> RoiDataset {
    let mut by_fixture: HashMap<FixtureId, OddsSnapshot> =
        odds.into_iter().map(|o| (o.fixture_id, o)).collect();
    let data: Vec<RoiRecord> = events
        .into_iter()
        .map(|event| {
            let fixture = provider.normalize(&event);
            let odds = by_fixture.remove(&fixture.fixture_id);
            let has_odds = odds.as_ref().is_some_and(OddsSnapshot::has_odds);
            RoiRecord {
                fixture,
                event,
                odds,
                has_odds,
            }
        })
        .collect();
    let events_with_odds = data.iter().filter(|r| r.has_odds).count();
    RoiDataset {
        metadata: RoiMetadata {
            provider: Some(provider.tag()),
            start_date: start,
            end_date: end,
            league_id: league,
            total_events: data.len(),
            events_with_odds,
        },
        data,
    }
}
