pub mod api_football;
pub mod http;
pub mod sportmonks;
pub mod throttle;

#[cfg(test)]
pub(crate) mod testing;

pub use api_football::ApiFootball;
pub use http::{ClientSettings, RetryPolicy};
pub use sportmonks::SportMonks;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::error::FetchResult;
use crate::models::{
    CanonicalFixture, FixtureId, FixtureStatistics, LeagueId, OddsSnapshot, PredictionSnapshot,
    ProviderTag, RawProviderRecord, TeamId,
};

/// Trait that every upstream sports-data provider must implement.
///
/// Every operation resolves to data, a definitive absence (empty `Vec` or
/// `None`), or a typed [`ProviderError`](crate::error::ProviderError).
/// Implementations own their rate limiting and retries.
#[async_trait]
pub trait FixtureProvider: Send + Sync {
    fn tag(&self) -> ProviderTag;

    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Map one of this provider's raw records into canonical form.
    fn normalize(&self, record: &RawProviderRecord) -> CanonicalFixture {
        crate::normalize::canonicalize(record)
    }

    /// All fixtures kicking off on `date`.
    async fn fixtures_on(&self, date: NaiveDate) -> FetchResult<Vec<RawProviderRecord>>;

    async fn today_matches(&self) -> FetchResult<Vec<RawProviderRecord>> {
        self.fixtures_on(Utc::now().date_naive()).await
    }

    async fn live_scores(&self) -> FetchResult<Vec<RawProviderRecord>>;

    async fn fixture_details(&self, id: FixtureId) -> FetchResult<Option<RawProviderRecord>>;

    async fn match_odds(&self, id: FixtureId) -> FetchResult<OddsSnapshot>;

    async fn predictions(&self, id: FixtureId) -> FetchResult<Option<PredictionSnapshot>>;

    /// The team's most recent `last` fixtures, newest first.
    async fn team_form(&self, team: TeamId, last: u32) -> FetchResult<Vec<RawProviderRecord>>;

    async fn fixture_statistics(&self, id: FixtureId) -> FetchResult<Option<FixtureStatistics>>;

    /// Fixtures between `start` and `end` inclusive. Days that fail are
    /// skipped; the call only fails when every day failed.
    async fn events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> FetchResult<Vec<RawProviderRecord>>;

    /// Pre-match odds for fixtures between `start` and `end` inclusive, with
    /// the same per-day skipping as [`events_in_range`](Self::events_in_range).
    async fn odds_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> FetchResult<Vec<OddsSnapshot>>;
}

/// Inclusive list of days from `start` to `end`. Empty when `end < start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// Run `fetch` for every day in the range, skipping failed days with a
/// warning. Fails only when no day succeeded, returning the last error.
pub(crate) async fn collect_days<T, F, Fut>(
    provider: ProviderTag,
    start: NaiveDate,
    end: NaiveDate,
    mut fetch: F,
) -> FetchResult<Vec<T>>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: std::future::Future<Output = FetchResult<Vec<T>>>,
{
    let mut out = Vec::new();
    let mut last_err = None;
    let mut any_ok = false;
    for day in days_between(start, end) {
        match fetch(day).await {
            Ok(items) => {
                any_ok = true;
                out.extend(items);
            }
            Err(e) => {
                tracing::warn!("{}: skipping {} in range fetch: {}", provider, day, e);
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) if !any_ok => Err(e),
        _ => Ok(out),
    }
}
