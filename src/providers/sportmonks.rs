use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, info};

use super::http::{ApiClient, Auth, ClientSettings};
use super::{collect_days, FixtureProvider};
use crate::error::{ErrorKind, FetchResult, ProviderError};
use crate::models::{
    CanonicalFixture, FixtureId, FixtureStatistics, FixtureStatus, LeagueId, OddsSnapshot,
    PredictionSnapshot, ProviderTag, RawProviderRecord, TeamId,
};
use crate::normalize::{
    json_f64, json_i64, json_string, json_u32, kickoff_from_timestamp, parse_kickoff,
    MISSING_FIXTURE_ID, UNKNOWN_TEAM,
};

pub const DEFAULT_BASE_URL: &str = "https://api.sportmonks.com/v3/football";

const FIXTURE_INCLUDES: &str = "participants;scores;state";
const MAX_PAGES: u32 = 10;

/// Statistic type id of expected goals (xG).
const EXPECTED_GOALS_TYPE_ID: i64 = 5304;

/// SportMonks state codes (`developer_name` and the shorter `short_name`
/// spellings) and their canonical status.
pub const STATUS_TABLE: &[(&str, FixtureStatus)] = &[
    ("NS", FixtureStatus::NotStarted),
    ("TBA", FixtureStatus::NotStarted),
    ("PENDING", FixtureStatus::NotStarted),
    ("DELAYED", FixtureStatus::NotStarted),
    ("INPLAY_1ST_HALF", FixtureStatus::Live),
    ("INPLAY_2ND_HALF", FixtureStatus::Live),
    ("INPLAY_ET", FixtureStatus::Live),
    ("INPLAY_ET_2ND_HALF", FixtureStatus::Live),
    ("INPLAY_PENALTIES", FixtureStatus::Live),
    ("HT", FixtureStatus::Live),
    ("BREAK", FixtureStatus::Live),
    ("EXTRA_TIME_BREAK", FixtureStatus::Live),
    ("PEN_BREAK", FixtureStatus::Live),
    ("SUSPENDED", FixtureStatus::Live),
    ("INTERRUPTED", FixtureStatus::Live),
    ("LIVE", FixtureStatus::Live),
    ("1ST", FixtureStatus::Live),
    ("2ND", FixtureStatus::Live),
    ("ET", FixtureStatus::Live),
    ("PEN_LIVE", FixtureStatus::Live),
    ("FT", FixtureStatus::Finished),
    ("AET", FixtureStatus::Finished),
    ("FT_PEN", FixtureStatus::Finished),
    ("AWARDED", FixtureStatus::Finished),
    ("WO", FixtureStatus::Finished),
    ("POSTPONED", FixtureStatus::Unknown),
    ("CANCELLED", FixtureStatus::Unknown),
    ("ABANDONED", FixtureStatus::Unknown),
    ("DELETED", FixtureStatus::Unknown),
    ("AWAITING_UPDATES", FixtureStatus::Unknown),
];

/// `state_id` values, used when the `state` include is missing.
const STATE_IDS: &[(i64, &str)] = &[
    (1, "NS"),
    (2, "INPLAY_1ST_HALF"),
    (3, "HT"),
    (4, "BREAK"),
    (5, "FT"),
    (6, "INPLAY_ET"),
    (7, "AET"),
    (8, "FT_PEN"),
    (9, "INPLAY_PENALTIES"),
    (10, "POSTPONED"),
    (11, "SUSPENDED"),
    (12, "CANCELLED"),
    (13, "TBA"),
    (14, "WO"),
    (15, "ABANDONED"),
    (16, "DELAYED"),
    (17, "AWARDED"),
    (18, "INTERRUPTED"),
    (19, "AWAITING_UPDATES"),
    (20, "DELETED"),
    (21, "EXTRA_TIME_BREAK"),
    (22, "INPLAY_2ND_HALF"),
    (25, "PEN_BREAK"),
    (26, "PENDING"),
];

pub fn map_status(code: &str) -> FixtureStatus {
    let code = code.trim().to_ascii_uppercase();
    STATUS_TABLE
        .iter()
        .find(|(k, _)| *k == code)
        .map(|(_, s)| *s)
        .unwrap_or(FixtureStatus::Unknown)
}

/// SportMonks v3 football adapter.
/// Docs: <https://docs.sportmonks.com/football>
///
/// Authenticates with the `api_token` query parameter and signals most
/// failures with explicit 4xx statuses.
pub struct SportMonks {
    client: ApiClient,
}

impl SportMonks {
    pub fn new(api_token: &str, settings: &ClientSettings) -> Result<Self> {
        let client = ApiClient::new(
            ProviderTag::SportMonks,
            settings,
            Auth::Query {
                name: "api_token",
                key: api_token.to_string(),
            },
            check_envelope,
        )?;
        Ok(SportMonks { client })
    }

    /// GET a list endpoint, following `pagination.has_more` up to [`MAX_PAGES`].
    async fn paged(&self, path: &str, params: &[(&str, String)]) -> FetchResult<Vec<Value>> {
        let mut out = Vec::new();
        let mut page = 1u32;
        loop {
            let mut query = params.to_vec();
            query.push(("page", page.to_string()));
            let body = self.client.get_json(path, &query).await?;
            out.extend(data_list(&body)?);

            let has_more = body["pagination"]["has_more"].as_bool().unwrap_or(false);
            if !has_more || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }
        Ok(out)
    }

    /// GET a single-entity endpoint. A 404 or a `null` data field is `None`.
    async fn single(&self, path: &str, params: &[(&str, String)]) -> FetchResult<Option<Value>> {
        match self.client.get_json(path, params).await {
            Ok(body) => Ok(match body.get("data") {
                Some(Value::Null) | None => None,
                Some(v) => Some(v.clone()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("SportMonks: {} not found", path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn records(items: Vec<Value>) -> Vec<RawProviderRecord> {
        items
            .into_iter()
            .map(|v| RawProviderRecord::new(ProviderTag::SportMonks, v))
            .collect()
    }

    async fn odds_on(&self, date: NaiveDate, league: Option<LeagueId>) -> FetchResult<Vec<OddsSnapshot>> {
        let fixtures = self
            .paged(
                &format!("fixtures/date/{}", date),
                &[("include", "odds".to_string())],
            )
            .await?;
        Ok(fixtures
            .into_iter()
            .filter(|f| league.is_none() || json_i64(&f["league_id"]) == league)
            .filter_map(|f| {
                let id = json_i64(&f["id"])?;
                let entries = f["odds"].as_array().cloned().unwrap_or_default();
                Some(OddsSnapshot::new(id, ProviderTag::SportMonks, entries))
            })
            .collect())
    }
}

fn includes() -> (&'static str, String) {
    ("include", FIXTURE_INCLUDES.to_string())
}

#[async_trait]
impl FixtureProvider for SportMonks {
    fn tag(&self) -> ProviderTag {
        ProviderTag::SportMonks
    }

    fn name(&self) -> &str {
        "SportMonks"
    }

    fn normalize(&self, record: &RawProviderRecord) -> CanonicalFixture {
        normalize_fixture(record)
    }

    async fn fixtures_on(&self, date: NaiveDate) -> FetchResult<Vec<RawProviderRecord>> {
        let items = self.paged(&format!("fixtures/date/{}", date), &[includes()]).await?;
        info!("SportMonks: {} fixtures on {}", items.len(), date);
        Ok(Self::records(items))
    }

    async fn live_scores(&self) -> FetchResult<Vec<RawProviderRecord>> {
        let items = self.paged("livescores/inplay", &[includes()]).await?;
        info!("SportMonks: {} live fixtures", items.len());
        Ok(Self::records(items))
    }

    async fn fixture_details(&self, id: FixtureId) -> FetchResult<Option<RawProviderRecord>> {
        let data = self.single(&format!("fixtures/{}", id), &[includes()]).await?;
        Ok(data.map(|v| RawProviderRecord::new(ProviderTag::SportMonks, v)))
    }

    async fn match_odds(&self, id: FixtureId) -> FetchResult<OddsSnapshot> {
        let entries = match self.single(&format!("odds/pre-match/fixtures/{}", id), &[]).await? {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        Ok(OddsSnapshot::new(id, ProviderTag::SportMonks, entries))
    }

    async fn predictions(&self, id: FixtureId) -> FetchResult<Option<PredictionSnapshot>> {
        let data = self
            .single(&format!("predictions/probabilities/fixtures/{}", id), &[])
            .await?;
        Ok(data
            .filter(|v| !matches!(v, Value::Array(items) if items.is_empty()))
            .map(|payload| PredictionSnapshot {
                fixture_id: id,
                provider: ProviderTag::SportMonks,
                fetched_at: Utc::now(),
                payload,
            }))
    }

    async fn team_form(&self, team: TeamId, last: u32) -> FetchResult<Vec<RawProviderRecord>> {
        let Some(data) = self
            .single(
                &format!("teams/{}", team),
                &[("include", "latest.participants;latest.scores;latest.state".to_string())],
            )
            .await?
        else {
            return Ok(Vec::new());
        };
        let mut latest = data["latest"].as_array().cloned().unwrap_or_default();
        // Newest first; `starting_at` sorts lexically.
        latest.sort_by(|a, b| {
            b["starting_at"]
                .as_str()
                .unwrap_or_default()
                .cmp(a["starting_at"].as_str().unwrap_or_default())
        });
        latest.truncate(last as usize);
        Ok(Self::records(latest))
    }

    async fn fixture_statistics(&self, id: FixtureId) -> FetchResult<Option<FixtureStatistics>> {
        let Some(data) = self
            .single(
                &format!("fixtures/{}", id),
                &[("include", "statistics;participants".to_string())],
            )
            .await?
        else {
            return Ok(None);
        };
        let stats = data["statistics"].as_array().cloned().unwrap_or_default();
        if stats.is_empty() {
            return Ok(None);
        }
        let (home_id, away_id) = participant_ids(&data);
        let side = |location: &str, team: Option<i64>| -> Option<Value> {
            let rows: Vec<Value> = stats
                .iter()
                .filter(|s| {
                    s["location"].as_str() == Some(location)
                        || (team.is_some() && json_i64(&s["participant_id"]) == team)
                })
                .cloned()
                .collect();
            (!rows.is_empty()).then(|| Value::Array(rows))
        };
        Ok(Some(FixtureStatistics {
            fixture_id: id,
            provider: ProviderTag::SportMonks,
            home: side("home", home_id),
            away: side("away", away_id),
        }))
    }

    async fn events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> FetchResult<Vec<RawProviderRecord>> {
        let events = collect_days(ProviderTag::SportMonks, start, end, |day| self.fixtures_on(day)).await?;
        Ok(match league {
            Some(l) => events
                .into_iter()
                .filter(|r| json_i64(&r.payload["league_id"]) == Some(l))
                .collect(),
            None => events,
        })
    }

    async fn odds_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> FetchResult<Vec<OddsSnapshot>> {
        collect_days(ProviderTag::SportMonks, start, end, |day| self.odds_on(day, league)).await
    }
}

/// A 200 body must carry `data`. Without it, a `message` cannot tell "no
/// rows" apart from a subscription restriction, so it is reported as
/// [`ProviderError::AmbiguousEmpty`].
pub fn check_envelope(provider: ProviderTag, body: Value) -> FetchResult<Value> {
    if body.get("data").is_some() {
        return Ok(body);
    }
    match json_string(&body["message"]) {
        Some(message) => Err(ProviderError::AmbiguousEmpty { provider, message }),
        None => Err(ProviderError::Malformed {
            provider,
            message: "missing `data` field".to_string(),
        }),
    }
}

/// xG from one side's statistic rows, matched by type id or, when the
/// `type` include is present, by its developer name.
pub fn expected_goals_of(rows: &Value) -> Option<f64> {
    rows.as_array()?
        .iter()
        .find(|row| {
            json_i64(&row["type_id"]) == Some(EXPECTED_GOALS_TYPE_ID)
                || row["type"]["developer_name"].as_str() == Some("EXPECTED_GOALS")
        })
        .and_then(|row| json_f64(&row["data"]["value"]))
}

fn data_list(body: &Value) -> FetchResult<Vec<Value>> {
    match &body["data"] {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        _ => Err(ProviderError::Malformed {
            provider: ProviderTag::SportMonks,
            message: "expected `data` to be a list".to_string(),
        }),
    }
}

fn participant<'a>(fixture: &'a Value, location: &str) -> Option<&'a Value> {
    fixture["participants"]
        .as_array()?
        .iter()
        .find(|p| p["meta"]["location"].as_str() == Some(location))
}

fn participant_ids(fixture: &Value) -> (Option<TeamId>, Option<TeamId>) {
    (
        participant(fixture, "home").and_then(|p| json_i64(&p["id"])),
        participant(fixture, "away").and_then(|p| json_i64(&p["id"])),
    )
}

fn status_of(fixture: &Value) -> FixtureStatus {
    let state = &fixture["state"];
    let code = json_string(&state["developer_name"])
        .or_else(|| json_string(&state["short_name"]))
        .or_else(|| json_string(&state["state"]))
        .or_else(|| {
            let id = json_i64(&fixture["state_id"])?;
            STATE_IDS
                .iter()
                .find(|(k, _)| *k == id)
                .map(|(_, name)| name.to_string())
        });
    code.as_deref().map(map_status).unwrap_or(FixtureStatus::Unknown)
}

/// Scores come either as a `{home, away}` object or as the v3 list of
/// per-participant entries, of which only `CURRENT` ones are read.
fn score_of(fixture: &Value, home_id: Option<TeamId>, away_id: Option<TeamId>) -> (u32, u32) {
    let scores = &fixture["scores"];
    if scores.is_object() {
        let home = json_u32(&scores["home"]).or_else(|| json_u32(&scores["localteam_score"]));
        let away = json_u32(&scores["away"]).or_else(|| json_u32(&scores["visitorteam_score"]));
        return (home.unwrap_or(0), away.unwrap_or(0));
    }

    let (mut home, mut away) = (0, 0);
    for entry in scores.as_array().into_iter().flatten() {
        if entry["description"].as_str() != Some("CURRENT") {
            continue;
        }
        let goals = json_u32(&entry["score"]["goals"]).unwrap_or(0);
        let owner = json_i64(&entry["participant_id"]);
        match entry["score"]["participant"].as_str() {
            Some("home") => home = goals,
            Some("away") => away = goals,
            _ if owner.is_some() && owner == home_id => home = goals,
            _ if owner.is_some() && owner == away_id => away = goals,
            _ => {}
        }
    }
    (home, away)
}

/// Canonicalize a SportMonks v3 fixture. Teams come from `participants`
/// by `meta.location`; missing pieces fall back to defaults.
pub fn normalize_fixture(record: &RawProviderRecord) -> CanonicalFixture {
    let p = &record.payload;
    let home = participant(p, "home");
    let away = participant(p, "away");
    let (home_team_id, away_team_id) = participant_ids(p);
    let (home_score, away_score) = score_of(p, home_team_id, away_team_id);

    CanonicalFixture {
        fixture_id: json_i64(&p["id"]).unwrap_or(MISSING_FIXTURE_ID),
        provider: ProviderTag::SportMonks,
        home_team: home
            .and_then(|t| json_string(&t["name"]))
            .unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        away_team: away
            .and_then(|t| json_string(&t["name"]))
            .unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        home_team_id,
        away_team_id,
        status: status_of(p),
        home_score,
        away_score,
        kickoff: parse_kickoff(&p["starting_at"])
            .or_else(|| kickoff_from_timestamp(&p["starting_at_timestamp"])),
        league_id: json_i64(&p["league_id"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::http::test_server::serve;
    use crate::providers::http::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;

    fn sample_fixture() -> Value {
        json!({
            "id": 19134454,
            "league_id": 8,
            "starting_at": "2024-08-17 14:00:00",
            "starting_at_timestamp": 1723903200,
            "state": {"id": 5, "state": "FT", "short_name": "FT", "developer_name": "FT"},
            "participants": [
                {"id": 14, "name": "Manchester United", "meta": {"location": "home"}},
                {"id": 11, "name": "Fulham", "meta": {"location": "away"}}
            ],
            "scores": [
                {"participant_id": 14, "description": "1ST_HALF", "score": {"goals": 0, "participant": "home"}},
                {"participant_id": 14, "description": "CURRENT", "score": {"goals": 1, "participant": "home"}},
                {"participant_id": 11, "description": "CURRENT", "score": {"goals": 0, "participant": "away"}}
            ]
        })
    }

    fn adapter(base_url: &str) -> SportMonks {
        let settings = ClientSettings {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
            min_request_interval: Duration::from_millis(1),
            retry: RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(2),
                max_jitter: Duration::ZERO,
            },
        };
        SportMonks::new("token", &settings).unwrap()
    }

    fn record(payload: Value) -> RawProviderRecord {
        RawProviderRecord::new(ProviderTag::SportMonks, payload)
    }

    #[test]
    fn test_normalize_v3_fixture() {
        let f = normalize_fixture(&record(sample_fixture()));
        assert_eq!(f.fixture_id, 19134454);
        assert_eq!(f.home_team, "Manchester United");
        assert_eq!(f.away_team, "Fulham");
        assert_eq!(f.away_team_id, Some(11));
        assert_eq!(f.status, FixtureStatus::Finished);
        assert_eq!(f.score(), (1, 0));
        assert_eq!(f.league_id, Some(8));
        assert_eq!(f.kickoff, kickoff_from_timestamp(&json!(1723903200)));
    }

    #[test]
    fn test_object_scores_are_read() {
        let mut payload = sample_fixture();
        payload["scores"] = json!({"home": 2, "away": "3"});
        assert_eq!(normalize_fixture(&record(payload)).score(), (2, 3));
    }

    #[test]
    fn test_scores_fall_back_to_participant_id() {
        let mut payload = sample_fixture();
        payload["scores"] = json!([
            {"participant_id": 11, "description": "CURRENT", "score": {"goals": 4}},
            {"participant_id": 14, "description": "CURRENT", "score": {"goals": 2}}
        ]);
        assert_eq!(normalize_fixture(&record(payload)).score(), (2, 4));
    }

    #[test]
    fn test_status_falls_back_to_state_id() {
        let f = normalize_fixture(&record(json!({"id": 1, "state_id": 22})));
        assert_eq!(f.status, FixtureStatus::Live);
        let f = normalize_fixture(&record(json!({"id": 1, "state_id": 999})));
        assert_eq!(f.status, FixtureStatus::Unknown);
    }

    #[test]
    fn test_status_table_is_total() {
        for (code, expected) in STATUS_TABLE {
            assert_eq!(map_status(code), *expected, "code {}", code);
        }
        for (_, name) in STATE_IDS {
            assert!(STATUS_TABLE.iter().any(|(k, _)| k == name), "{} unmapped", name);
        }
        assert_eq!(map_status("INPLAY"), FixtureStatus::Unknown);
        assert_eq!(map_status("whatever"), FixtureStatus::Unknown);
    }

    #[test]
    fn test_envelope_without_data() {
        let err = check_envelope(
            ProviderTag::SportMonks,
            json!({"message": "No result(s) found matching your request. Either the query did not return any results or you don't have access to it via your current subscription."}),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousEmpty);

        let err = check_envelope(ProviderTag::SportMonks, json!({"foo": 1})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);

        assert!(check_envelope(ProviderTag::SportMonks, json!({"data": []})).is_ok());
    }

    #[tokio::test]
    async fn fixtures_follow_pagination() {
        let (url, script) = serve(vec![
            (200, json!({"data": [sample_fixture()], "pagination": {"has_more": true}})),
            (200, json!({"data": [sample_fixture()], "pagination": {"has_more": false}})),
        ])
        .await;
        let day = NaiveDate::from_ymd_opt(2024, 8, 17).unwrap();
        let records = adapter(&url).fixtures_on(day).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(script.hits(), 2);
        let queries = script.queries.lock().unwrap().clone();
        assert!(queries[0].contains("api_token=token"));
        assert!(queries[1].contains("page=2"));
    }

    #[tokio::test]
    async fn missing_fixture_is_none() {
        let (url, script) = serve(vec![(404, json!({"message": "not found"}))]).await;
        assert!(adapter(&url).fixture_details(1).await.unwrap().is_none());
        assert_eq!(script.hits(), 1);
    }

    #[tokio::test]
    async fn odds_404_is_empty_snapshot() {
        let (url, _script) = serve(vec![(404, json!({}))]).await;
        let odds = adapter(&url).match_odds(7).await.unwrap();
        assert!(!odds.has_odds());
    }

    #[tokio::test]
    async fn forbidden_odds_are_capability_denied() {
        let (url, _script) = serve(vec![(403, json!({"message": "Insufficient plan"}))]).await;
        let err = adapter(&url).match_odds(7).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityDenied);
    }

    #[tokio::test]
    async fn ambiguous_empty_is_not_retried() {
        let (url, script) = serve(vec![(200, json!({"message": "No result(s) found"}))]).await;
        let err = adapter(&url).live_scores().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousEmpty);
        assert_eq!(script.hits(), 1);
    }

    #[tokio::test]
    async fn team_form_is_newest_first_and_bounded() {
        let mut older = sample_fixture();
        older["id"] = json!(1);
        older["starting_at"] = json!("2024-05-01 14:00:00");
        let mut newer = sample_fixture();
        newer["id"] = json!(2);
        newer["starting_at"] = json!("2024-08-01 14:00:00");
        let mut newest = sample_fixture();
        newest["id"] = json!(3);
        let (url, _script) = serve(vec![(200, json!({"data": {"id": 14, "latest": [older, newest, newer]}}))]).await;
        let form = adapter(&url).team_form(14, 2).await.unwrap();
        let ids: Vec<_> = form.iter().map(|r| r.payload["id"].clone()).collect();
        assert_eq!(ids, vec![json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn statistics_split_by_location() {
        let mut data = sample_fixture();
        data["statistics"] = json!([
            {"type_id": 42, "participant_id": 14, "location": "home", "data": {"value": 5}},
            {"type_id": 42, "participant_id": 11, "location": "away", "data": {"value": 2}}
        ]);
        let (url, _script) = serve(vec![(200, json!({"data": data}))]).await;
        let stats = adapter(&url).fixture_statistics(19134454).await.unwrap().unwrap();
        assert_eq!(stats.home.unwrap()[0]["data"]["value"], json!(5));
        assert_eq!(stats.away.unwrap()[0]["data"]["value"], json!(2));
    }

    #[tokio::test]
    async fn no_statistics_is_none() {
        let (url, _script) = serve(vec![(200, json!({"data": sample_fixture()}))]).await;
        assert!(adapter(&url).fixture_statistics(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn range_odds_filter_by_league() {
        let mut other = sample_fixture();
        other["id"] = json!(99);
        other["league_id"] = json!(564);
        let mut ours = sample_fixture();
        ours["odds"] = json!([{"market_id": 1, "value": "1.80"}]);
        let (url, _script) = serve(vec![(200, json!({"data": [ours, other]}))]).await;
        let day = NaiveDate::from_ymd_opt(2024, 8, 17).unwrap();
        let odds = adapter(&url).odds_in_range(day, day, Some(8)).await.unwrap();
        assert_eq!(odds.len(), 1);
        assert_eq!(odds[0].fixture_id, 19134454);
        assert!(odds[0].has_odds());
    }
}
