use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::future;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::http::{ApiClient, Auth, ClientSettings};
use super::{collect_days, FixtureProvider};
use crate::error::{FetchResult, ProviderError};
use crate::models::{
    CanonicalFixture, FixtureId, FixtureStatistics, FixtureStatus, LeagueId, OddsSnapshot,
    PredictionSnapshot, ProviderTag, RawProviderRecord, TeamId,
};
use crate::normalize::{
    json_f64, json_i64, json_string, json_u32, kickoff_from_timestamp, parse_kickoff,
    MISSING_FIXTURE_ID, UNKNOWN_TEAM,
};

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";

/// Odds endpoints are paginated; never follow more than this many pages.
const MAX_ODDS_PAGES: i64 = 10;

/// API-Football `fixture.status.short` codes and their canonical status.
pub const STATUS_TABLE: &[(&str, FixtureStatus)] = &[
    ("TBD", FixtureStatus::NotStarted),
    ("NS", FixtureStatus::NotStarted),
    ("1H", FixtureStatus::Live),
    ("HT", FixtureStatus::Live),
    ("2H", FixtureStatus::Live),
    ("ET", FixtureStatus::Live),
    ("BT", FixtureStatus::Live),
    ("P", FixtureStatus::Live),
    ("SUSP", FixtureStatus::Live),
    ("INT", FixtureStatus::Live),
    ("LIVE", FixtureStatus::Live),
    ("FT", FixtureStatus::Finished),
    ("AET", FixtureStatus::Finished),
    ("PEN", FixtureStatus::Finished),
    ("AWD", FixtureStatus::Finished),
    ("WO", FixtureStatus::Finished),
    ("PST", FixtureStatus::Unknown),
    ("CANC", FixtureStatus::Unknown),
    ("ABD", FixtureStatus::Unknown),
];

pub fn map_status(code: &str) -> FixtureStatus {
    let code = code.trim().to_ascii_uppercase();
    STATUS_TABLE
        .iter()
        .find(|(k, _)| *k == code)
        .map(|(_, s)| *s)
        .unwrap_or(FixtureStatus::Unknown)
}

/// API-Football adapter (api-sports.io v3).
/// Docs: <https://www.api-football.com/documentation-v3>
///
/// Authenticates with the `x-apisports-key` header. Errors usually arrive as
/// HTTP 200 with a non-empty `errors` object, which [`check_envelope`] turns
/// into typed failures.
pub struct ApiFootball {
    client: ApiClient,
    timezone: String,
}

impl ApiFootball {
    pub fn new(api_key: &str, settings: &ClientSettings, timezone: &str) -> Result<Self> {
        let client = ApiClient::new(
            ProviderTag::ApiFootball,
            settings,
            Auth::Header {
                name: "x-apisports-key",
                key: api_key.to_string(),
            },
            check_envelope,
        )?;
        Ok(ApiFootball {
            client,
            timezone: timezone.to_string(),
        })
    }

    /// GET an endpoint and return its `response` array.
    async fn response(&self, path: &str, params: &[(&str, String)]) -> FetchResult<Vec<Value>> {
        let body = self.client.get_json(path, params).await?;
        match body.get("response") {
            Some(Value::Array(items)) => Ok(items.clone()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(ProviderError::Malformed {
                provider: ProviderTag::ApiFootball,
                message: format!("unexpected response type: {}", type_name(other)),
            }),
        }
    }

    fn records(items: Vec<Value>) -> Vec<RawProviderRecord> {
        items
            .into_iter()
            .map(|v| RawProviderRecord::new(ProviderTag::ApiFootball, v))
            .collect()
    }

    fn tz(&self) -> (&'static str, String) {
        ("timezone", self.timezone.clone())
    }

    async fn team_statistics(&self, fixture: FixtureId, team: TeamId) -> FetchResult<Option<Value>> {
        let items = self
            .response(
                "fixtures/statistics",
                &[("fixture", fixture.to_string()), ("team", team.to_string())],
            )
            .await?;
        Ok(items.into_iter().next())
    }

    /// All odds published for fixtures on `date`, following pagination.
    async fn odds_on(&self, date: NaiveDate, league: Option<LeagueId>) -> FetchResult<Vec<OddsSnapshot>> {
        let mut out = Vec::new();
        let mut page = 1i64;
        loop {
            let body = self
                .client
                .get_json(
                    "odds",
                    &[("date", date.to_string()), ("page", page.to_string()), self.tz()],
                )
                .await?;
            let items = body["response"].as_array().cloned().unwrap_or_default();
            for item in items {
                if league.is_some() && json_i64(&item["league"]["id"]) != league {
                    continue;
                }
                if let Some(id) = json_i64(&item["fixture"]["id"]) {
                    out.push(OddsSnapshot::new(id, ProviderTag::ApiFootball, bookmakers(&item)));
                }
            }
            let total = json_i64(&body["paging"]["total"]).unwrap_or(1);
            if page >= total.min(MAX_ODDS_PAGES) {
                break;
            }
            page += 1;
        }
        debug!("API-Football: {} odds snapshots for {}", out.len(), date);
        Ok(out)
    }
}

#[async_trait]
impl FixtureProvider for ApiFootball {
    fn tag(&self) -> ProviderTag {
        ProviderTag::ApiFootball
    }

    fn name(&self) -> &str {
        "API-Football"
    }

    fn normalize(&self, record: &RawProviderRecord) -> CanonicalFixture {
        normalize_fixture(record)
    }

    async fn fixtures_on(&self, date: NaiveDate) -> FetchResult<Vec<RawProviderRecord>> {
        let items = self
            .response("fixtures", &[("date", date.to_string()), self.tz()])
            .await?;
        info!("API-Football: {} fixtures on {}", items.len(), date);
        Ok(Self::records(items))
    }

    async fn live_scores(&self) -> FetchResult<Vec<RawProviderRecord>> {
        let items = self
            .response("fixtures", &[("live", "all".to_string()), self.tz()])
            .await?;
        info!("API-Football: {} live fixtures", items.len());
        Ok(Self::records(items))
    }

    async fn fixture_details(&self, id: FixtureId) -> FetchResult<Option<RawProviderRecord>> {
        let items = self
            .response("fixtures", &[("id", id.to_string()), self.tz()])
            .await?;
        Ok(Self::records(items).into_iter().next())
    }

    async fn match_odds(&self, id: FixtureId) -> FetchResult<OddsSnapshot> {
        let items = self.response("odds", &[("fixture", id.to_string())]).await?;
        let entries: Vec<Value> = items.iter().flat_map(bookmakers).collect();
        if entries.is_empty() {
            debug!("API-Football: no odds for fixture {}", id);
        }
        Ok(OddsSnapshot::new(id, ProviderTag::ApiFootball, entries))
    }

    async fn predictions(&self, id: FixtureId) -> FetchResult<Option<PredictionSnapshot>> {
        let items = self.response("predictions", &[("fixture", id.to_string())]).await?;
        Ok(items.into_iter().next().map(|first| {
            let payload = first
                .get("predictions")
                .filter(|p| !p.is_null())
                .cloned()
                .unwrap_or(first);
            PredictionSnapshot {
                fixture_id: id,
                provider: ProviderTag::ApiFootball,
                fetched_at: chrono::Utc::now(),
                payload,
            }
        }))
    }

    async fn team_form(&self, team: TeamId, last: u32) -> FetchResult<Vec<RawProviderRecord>> {
        let items = self
            .response(
                "fixtures",
                &[("team", team.to_string()), ("last", last.to_string()), self.tz()],
            )
            .await?;
        Ok(Self::records(items))
    }

    async fn fixture_statistics(&self, id: FixtureId) -> FetchResult<Option<FixtureStatistics>> {
        let Some(details) = self.fixture_details(id).await? else {
            return Ok(None);
        };
        let fixture = normalize_fixture(&details);
        let (Some(home_id), Some(away_id)) = (fixture.home_team_id, fixture.away_team_id) else {
            debug!("API-Football: fixture {} has no team ids, no statistics", id);
            return Ok(None);
        };

        let (home, away) = future::join(
            self.team_statistics(id, home_id),
            self.team_statistics(id, away_id),
        )
        .await;
        let (home, away) = match (home, away) {
            (Err(e), Err(_)) => return Err(e),
            (h, a) => (h.ok().flatten(), a.ok().flatten()),
        };
        if home.is_none() && away.is_none() {
            return Ok(None);
        }
        Ok(Some(FixtureStatistics {
            fixture_id: id,
            provider: ProviderTag::ApiFootball,
            home,
            away,
        }))
    }

    async fn events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        league: Option<LeagueId>,
    ) -> FetchResult<Vec<RawProviderRecord>> {
        let events = collect_days(ProviderTag::ApiFootball, start, end, |day| self.fixtures_on(day)).await?;
        Ok(match league {
            Some(l) => events
                .into_iter()
                .filter(|r| json_i64(&r.payload["league"]["id"]) == Some(l))
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
        collect_days(ProviderTag::ApiFootball, start, end, |day| self.odds_on(day, league)).await
    }
}

/// xG from one team's statistics entry, reported as the `expected_goals`
/// statistic type on plans that include it.
pub fn expected_goals_of(team_stats: &Value) -> Option<f64> {
    team_stats["statistics"]
        .as_array()?
        .iter()
        .find(|s| {
            s["type"]
                .as_str()
                .is_some_and(|t| t.eq_ignore_ascii_case("expected_goals"))
        })
        .and_then(|s| json_f64(&s["value"]))
}

/// Classify a decoded 200 body. A non-empty `errors` payload with zero
/// results is a failure, and a body without `response` is malformed.
pub fn check_envelope(provider: ProviderTag, body: Value) -> FetchResult<Value> {
    let results = json_i64(&body["results"]).unwrap_or(0);
    if has_errors(&body["errors"]) {
        if results == 0 {
            return Err(classify_errors(provider, &body["errors"]));
        }
        warn!(
            "{}: response carries errors alongside {} results: {}",
            provider, results, body["errors"]
        );
    }
    if body.get("response").is_none() {
        return Err(ProviderError::Malformed {
            provider,
            message: "missing `response` field".to_string(),
        });
    }
    Ok(body)
}

fn has_errors(errors: &Value) -> bool {
    match errors {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

/// Map the keys of an `errors` object to an error kind.
fn classify_errors(provider: ProviderTag, errors: &Value) -> ProviderError {
    let message = match errors {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(text) => format!("{}: {}", k, text),
                None => format!("{}: {}", k, v),
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    };
    let has_key = |key: &str| errors.get(key).is_some();

    if has_key("token") {
        ProviderError::Unauthorized { provider, message }
    } else if has_key("rateLimit") {
        ProviderError::RateLimited { provider }
    } else if has_key("plan") || has_key("access") || has_key("requests") || has_key("subscription") {
        ProviderError::CapabilityDenied { provider, message }
    } else {
        ProviderError::Rejected { provider, message }
    }
}

fn bookmakers(item: &Value) -> Vec<Value> {
    item["bookmakers"].as_array().cloned().unwrap_or_default()
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Canonicalize an API-Football fixture (`fixture`, `teams`, `goals`,
/// `league` sub-objects). Missing pieces fall back to defaults.
pub fn normalize_fixture(record: &RawProviderRecord) -> CanonicalFixture {
    let p = &record.payload;
    let fixture = &p["fixture"];
    let teams = &p["teams"];

    CanonicalFixture {
        fixture_id: json_i64(&fixture["id"])
            .or_else(|| json_i64(&p["id"]))
            .unwrap_or(MISSING_FIXTURE_ID),
        provider: ProviderTag::ApiFootball,
        home_team: json_string(&teams["home"]["name"]).unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        away_team: json_string(&teams["away"]["name"]).unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        home_team_id: json_i64(&teams["home"]["id"]),
        away_team_id: json_i64(&teams["away"]["id"]),
        status: fixture["status"]["short"]
            .as_str()
            .map(map_status)
            .unwrap_or(FixtureStatus::Unknown),
        home_score: json_u32(&p["goals"]["home"]).unwrap_or(0),
        away_score: json_u32(&p["goals"]["away"]).unwrap_or(0),
        kickoff: parse_kickoff(&fixture["date"]).or_else(|| kickoff_from_timestamp(&fixture["timestamp"])),
        league_id: json_i64(&p["league"]["id"]),
    }
}
