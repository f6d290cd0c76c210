//! Canonical accessors over raw provider records.
//!
//! Dispatch is by the record's provider tag only, never by sniffing field
//! names, so two providers whose payloads happen to share keys still go
//! through their own extraction rules. Missing or oddly typed fields fall
//! back to defaults: `"Unknown"` team names, zero scores, `None` for ids and
//! kickoff, and [`MISSING_FIXTURE_ID`] for the fixture id.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{
    CanonicalFixture, ExpectedGoals, FixtureId, FixtureStatistics, FixtureStatus, LeagueId,
    ProviderTag, RawProviderRecord,
};
use crate::providers::{api_football, sportmonks};

/// Fixture id reported when a record carries none.
pub const MISSING_FIXTURE_ID: FixtureId = 0;

pub const UNKNOWN_TEAM: &str = "Unknown";

pub fn canonicalize(record: &RawProviderRecord) -> CanonicalFixture {
    match record.provider {
        ProviderTag::ApiFootball => api_football::normalize_fixture(record),
        ProviderTag::SportMonks => sportmonks::normalize_fixture(record),
    }
}

/// Canonicalize a batch. Records without a fixture id are dropped since no
/// follow-up call could be made for them.
pub fn canonicalize_all(records: &[RawProviderRecord]) -> Vec<CanonicalFixture> {
    records
        .iter()
        .map(canonicalize)
        .filter(|f| {
            if f.fixture_id == MISSING_FIXTURE_ID {
                tracing::debug!("{}: dropping record without fixture id", f.provider);
                false
            } else {
                true
            }
        })
        .collect()
}

/// Pull xG out of per-team statistics, using the rules of the provider that
/// produced them.
pub fn expected_goals(stats: &FixtureStatistics) -> ExpectedGoals {
    let read = |side: &Option<Value>| {
        side.as_ref().and_then(|v| match stats.provider {
            ProviderTag::ApiFootball => api_football::expected_goals_of(v),
            ProviderTag::SportMonks => sportmonks::expected_goals_of(v),
        })
    };
    ExpectedGoals {
        fixture_id: stats.fixture_id,
        provider: stats.provider,
        home: read(&stats.home),
        away: read(&stats.away),
        statistics: stats.clone(),
    }
}

pub fn status(record: &RawProviderRecord) -> FixtureStatus {
    canonicalize(record).status
}

pub fn team_names(record: &RawProviderRecord) -> (String, String) {
    let f = canonicalize(record);
    (f.home_team, f.away_team)
}

pub fn score(record: &RawProviderRecord) -> (u32, u32) {
    canonicalize(record).score()
}

pub fn fixture_id(record: &RawProviderRecord) -> Option<FixtureId> {
    Some(canonicalize(record).fixture_id).filter(|id| *id != MISSING_FIXTURE_ID)
}

pub fn league_id(record: &RawProviderRecord) -> Option<LeagueId> {
    canonicalize(record).league_id
}

// ── JSON helpers shared by the provider normalizers ─────────────────────────

/// Integer from a JSON number or a numeric string.
pub(crate) fn json_i64(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Non-negative score from a JSON number or numeric string.
pub(crate) fn json_u32(v: &Value) -> Option<u32> {
    json_i64(v).and_then(|n| u32::try_from(n).ok())
}

/// Float from a JSON number or a numeric string such as `"1.27"`.
pub(crate) fn json_f64(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

pub(crate) fn json_string(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse an RFC 3339 timestamp or a `YYYY-MM-DD HH:MM:SS` string taken as UTC.
pub(crate) fn parse_kickoff(v: &Value) -> Option<DateTime<Utc>> {
    let s = v.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

pub(crate) fn kickoff_from_timestamp(v: &Value) -> Option<DateTime<Utc>> {
    json_i64(v).and_then(|ts| Utc.timestamp_opt(ts, 0).single())
}
