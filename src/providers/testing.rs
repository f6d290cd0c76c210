//! Scripted in-memory provider for aggregator and resolver tests.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

use super::FixtureProvider;
use crate::aggregator::Operation;
use crate::error::{ErrorKind, FetchResult, ProviderError};
use crate::models::{
    FixtureId, FixtureStatistics, LeagueId, OddsSnapshot, PredictionSnapshot, ProviderTag,
    RawProviderRecord, TeamId,
};
use crate::normalize::parse_kickoff;

/// What an operation answers with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Data,
    Empty,
    Fail(ErrorKind),
}

pub fn error_of(provider: ProviderTag, kind: ErrorKind) -> ProviderError {
    let message = "scripted".to_string();
    match kind {
        ErrorKind::Transient => ProviderError::Timeout { provider },
        ErrorKind::RateLimited => ProviderError::RateLimited { provider },
        ErrorKind::CapabilityDenied => ProviderError::CapabilityDenied { provider, message },
        ErrorKind::Unauthorized => ProviderError::Unauthorized { provider, message },
        ErrorKind::NotFound => ProviderError::NotFound { provider },
        ErrorKind::Status => ProviderError::Status { provider, status: 500 },
        ErrorKind::Rejected => ProviderError::Rejected { provider, message },
        ErrorKind::Malformed => ProviderError::Malformed { provider, message },
        ErrorKind::AmbiguousEmpty => ProviderError::AmbiguousEmpty { provider, message },
    }
}

/// Provider answering from a fixed fixture list. Every operation answers
/// `Data` unless scripted otherwise, and every call is counted.
pub struct FakeProvider {
    tag: ProviderTag,
    fixtures: Vec<Value>,
    outcomes: HashMap<Operation, Outcome>,
    calls: Mutex<HashMap<Operation, usize>>,
    scans: Mutex<usize>,
    requested: Mutex<Vec<FixtureId>>,
}

impl FakeProvider {
    pub fn new(tag: ProviderTag) -> Self {
        FakeProvider {
            tag,
            fixtures: Vec::new(),
            outcomes: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
            scans: Mutex::new(0),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Add a fixture in this provider's native payload shape.
    pub fn with_fixture(mut self, id: FixtureId, home: &str, away: &str, kickoff: &str) -> Self {
        let payload = match self.tag {
            ProviderTag::ApiFootball => json!({
                "fixture": {"id": id, "date": kickoff, "status": {"short": "NS"}},
                "league": {"id": 39},
                "teams": {"home": {"id": id * 10, "name": home}, "away": {"id": id * 10 + 1, "name": away}},
                "goals": {"home": null, "away": null}
            }),
            ProviderTag::SportMonks => json!({
                "id": id,
                "league_id": 8,
                "starting_at": kickoff,
                "state": {"developer_name": "NS"},
                "participants": [
                    {"id": id * 10, "name": home, "meta": {"location": "home"}},
                    {"id": id * 10 + 1, "name": away, "meta": {"location": "away"}}
                ]
            }),
        };
        self.fixtures.push(payload);
        self
    }

    pub fn with(mut self, op: Operation, outcome: Outcome) -> Self {
        self.outcomes.insert(op, outcome);
        self
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum::<usize>() + self.scans()
    }

    /// Number of `fixtures_on` calls, the resolver's scan.
    pub fn scans(&self) -> usize {
        *self.scans.lock().unwrap()
    }

    /// Fixture ids passed to per-fixture operations, in call order.
    pub fn requested_ids(&self) -> Vec<FixtureId> {
        self.requested.lock().unwrap().clone()
    }

    fn enter(&self, op: Operation) -> FetchResult<bool> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        self.outcome(op)
    }

    fn outcome(&self, op: Operation) -> FetchResult<bool> {
        match self.outcomes.get(&op).copied().unwrap_or(Outcome::Data) {
            Outcome::Data => Ok(true),
            Outcome::Empty => Ok(false),
            Outcome::Fail(kind) => Err(error_of(self.tag, kind)),
        }
    }

    fn records(&self) -> Vec<RawProviderRecord> {
        self.fixtures
            .iter()
            .map(|p| RawProviderRecord::new(self.tag, p.clone()))
            .collect()
    }

    fn fixture_date(&self, payload: &Value) -> Option<NaiveDate> {
        let raw = match self.tag {
            ProviderTag::ApiFootball => &payload["fixture"]["date"],
            ProviderTag::SportMonks => &payload["starting_at"],
        };
        parse_kickoff(raw).map(|k| k.date_naive())
    }

    fn note(&self, id: FixtureId) {
        self.requested.lock().unwrap().push(id);
    }
}

#[async_trait]
impl FixtureProvider for FakeProvider {
    fn tag(&self) -> ProviderTag {
        self.tag
    }

    fn name(&self) -> &str {
        "fake"
    }

    async fn fixtures_on(&self, date: NaiveDate) -> FetchResult<Vec<RawProviderRecord>> {
        *self.scans.lock().unwrap() += 1;
        if !self.outcome(Operation::TodayMatches)? {
            return Ok(Vec::new());
        }
        Ok(self
            .records()
            .into_iter()
            .filter(|r| self.fixture_date(&r.payload) == Some(date))
            .collect())
    }

    async fn today_matches(&self) -> FetchResult<Vec<RawProviderRecord>> {
        let data = self.enter(Operation::TodayMatches)?;
        Ok(if data { self.records() } else { Vec::new() })
    }

    async fn live_scores(&self) -> FetchResult<Vec<RawProviderRecord>> {
        let data = self.enter(Operation::LiveScores)?;
        Ok(if data { self.records() } else { Vec::new() })
    }

    async fn fixture_details(&self, id: FixtureId) -> FetchResult<Option<RawProviderRecord>> {
        self.note(id);
        let data = self.enter(Operation::FixtureDetails)?;
        Ok(data.then(|| RawProviderRecord::new(self.tag, json!({"id": id, "fixture": {"id": id}}))))
    }

    async fn match_odds(&self, id: FixtureId) -> FetchResult<OddsSnapshot> {
        self.note(id);
        let data = self.enter(Operation::MatchOdds)?;
        let entries = if data { vec![json!({"bookmaker": self.tag.as_str(), "home": 1.9})] } else { Vec::new() };
        Ok(OddsSnapshot::new(id, self.tag, entries))
    }

    async fn predictions(&self, id: FixtureId) -> FetchResult<Option<PredictionSnapshot>> {
        self.note(id);
        let data = self.enter(Operation::Predictions)?;
        Ok(data.then(|| PredictionSnapshot {
            fixture_id: id,
            provider: self.tag,
            fetched_at: Utc::now(),
            payload: json!({"home": 0.5}),
        }))
    }

    async fn team_form(&self, _team: TeamId, last: u32) -> FetchResult<Vec<RawProviderRecord>> {
        let data = self.enter(Operation::TeamForm)?;
        let mut form = if data { self.records() } else { Vec::new() };
        form.truncate(last as usize);
        Ok(form)
    }

    async fn fixture_statistics(&self, id: FixtureId) -> FetchResult<Option<FixtureStatistics>> {
        self.note(id);
        let data = self.enter(Operation::FixtureStatistics)?;
        let (home, away) = match self.tag {
            ProviderTag::ApiFootball => (
                json!({"statistics": [{"type": "Shots on Goal", "value": 5}, {"type": "expected_goals", "value": "1.45"}]}),
                json!({"statistics": [{"type": "Shots on Goal", "value": 3}, {"type": "expected_goals", "value": "0.62"}]}),
            ),
            ProviderTag::SportMonks => (
                json!([{"type_id": 5304, "location": "home", "data": {"value": 0.9}}]),
                json!([{"type_id": 5304, "location": "away", "data": {"value": 1.1}}]),
            ),
        };
        Ok(data.then(|| FixtureStatistics {
            fixture_id: id,
            provider: self.tag,
            home: Some(home),
            away: Some(away),
        }))
    }

    async fn events_in_range(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
        _league: Option<LeagueId>,
    ) -> FetchResult<Vec<RawProviderRecord>> {
        let data = self.enter(Operation::EventsInRange)?;
        Ok(if data { self.records() } else { Vec::new() })
    }

    async fn odds_in_range(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
        _league: Option<LeagueId>,
    ) -> FetchResult<Vec<OddsSnapshot>> {
        let data = self.enter(Operation::OddsInRange)?;
        if !data {
            return Ok(Vec::new());
        }
        // Odds for the first fixture only, so joins see both cases.
        Ok(self
            .records()
            .iter()
            .take(1)
            .map(|r| {
                let id = self.normalize(r).fixture_id;
                OddsSnapshot::new(id, self.tag, vec![json!({"market": "1X2"})])
            })
            .collect())
    }
}
