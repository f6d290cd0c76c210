use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixture id, scoped to the provider that issued it.
pub type FixtureId = i64;
pub type TeamId = i64;
pub type LeagueId = i64;

/// Identifies an upstream provider. Determines which normalizer and which
/// follow-up endpoints apply to a record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTag {
    #[value(name = "api_football")]
    ApiFootball,
    #[serde(rename = "sportmonks")]
    #[value(name = "sportmonks")]
    SportMonks,
}

impl ProviderTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderTag::ApiFootball => "api_football",
            ProviderTag::SportMonks => "sportmonks",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-native payload as fetched, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProviderRecord {
    pub provider: ProviderTag,
    pub fetched_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl RawProviderRecord {
    pub fn new(provider: ProviderTag, payload: serde_json::Value) -> Self {
        RawProviderRecord {
            provider,
            fetched_at: Utc::now(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FixtureStatus {
    NotStarted,
    Live,
    Finished,
    Unknown,
}

/// Provider-agnostic view of one fixture. Built fresh from a raw record on
/// every fetch and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFixture {
    pub fixture_id: FixtureId,
    pub provider: ProviderTag,
    pub home_team: String,
    pub away_team: String,
    pub home_team_id: Option<TeamId>,
    pub away_team_id: Option<TeamId>,
    pub status: FixtureStatus,
    pub home_score: u32,
    pub away_score: u32,
    pub kickoff: Option<DateTime<Utc>>,
    pub league_id: Option<LeagueId>,
}

impl CanonicalFixture {
    pub fn score(&self) -> (u32, u32) {
        (self.home_score, self.away_score)
    }

    pub fn kickoff_date(&self) -> Option<NaiveDate> {
        self.kickoff.map(|k| k.date_naive())
    }
}

/// Bookmaker odds for one fixture. An empty `entries` list means the provider
/// answered but has no odds for this fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsSnapshot {
    pub fixture_id: FixtureId,
    pub provider: ProviderTag,
    pub fetched_at: DateTime<Utc>,
    pub entries: Vec<serde_json::Value>,
}

impl OddsSnapshot {
    pub fn new(fixture_id: FixtureId, provider: ProviderTag, entries: Vec<serde_json::Value>) -> Self {
        OddsSnapshot {
            fixture_id,
            provider,
            fetched_at: Utc::now(),
            entries,
        }
    }

    pub fn has_odds(&self) -> bool {
        !self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSnapshot {
    pub fixture_id: FixtureId,
    pub provider: ProviderTag,
    pub fetched_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Per-team match statistics. Either side may be missing on lower data tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureStatistics {
    pub fixture_id: FixtureId,
    pub provider: ProviderTag,
    pub home: Option<serde_json::Value>,
    pub away: Option<serde_json::Value>,
}

/// Expected goals (xG) per side, read from a fixture's statistics. A side
/// is `None` when the provider's statistics carry no xG for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpectedGoals {
    pub fixture_id: FixtureId,
    pub provider: ProviderTag,
    pub home: Option<f64>,
    pub away: Option<f64>,
    pub statistics: FixtureStatistics,
}

/// One fixture of a date-range ROI fetch, joined with its odds when the
/// same provider had any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiRecord {
    pub fixture: CanonicalFixture,
    pub event: RawProviderRecord,
    pub odds: Option<OddsSnapshot>,
    pub has_odds: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiMetadata {
    pub provider: Option<ProviderTag>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub league_id: Option<LeagueId>,
    pub total_events: usize,
    pub events_with_odds: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiDataset {
    pub data: Vec<RoiRecord>,
    pub metadata: RoiMetadata,
}
