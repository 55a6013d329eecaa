//! Extra Innings Live — MLB Monitor
//!
//! Reads the public MLB Stats API:
//!   - schedule:  /api/v1/schedule?sportId=1&date=YYYY-MM-DD
//!   - live feed: /api/v1/game/{gamePk}/feed/live
//!
//! Provider JSON is decoded into optional-field structs and resolved into
//! [`Game`] / [`LineScore`] right here, so callers never deal with missing keys.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_API_BASE: &str = "https://statsapi.mlb.com";
/// MLB in the provider's sport vocabulary.
pub const MLB_SPORT_ID: u32 = 1;
pub const REGULATION_INNINGS: u32 = 9;
const UNKNOWN_TEAM: &str = "Unknown";

// ── Domain types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GamePk(pub u64);

impl fmt::Display for GamePk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// `None` when the provider omitted `gamePk`; such games are never polled.
    pub game_pk: Option<GamePk>,
    pub home:    String,
    pub away:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineScore {
    /// 0 when the provider has no inning yet.
    pub current_inning: u32,
    /// "Top" | "Bottom" | "Middle" | "End" | "" when absent.
    pub inning_state:   String,
}

impl LineScore {
    pub fn is_extra_innings(&self) -> bool {
        is_extra_innings(self.current_inning, &self.inning_state)
    }
}

/// True once play is past the ninth with a side actually batting.
/// "Middle"/"End" breaks between halves don't count.
pub fn is_extra_innings(inning: u32, half: &str) -> bool {
    inning > REGULATION_INNINGS && matches!(half, "Top" | "Bottom")
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{endpoint} request failed: {reason}")]
    Transport { endpoint: &'static str, reason: String },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint} body could not be decoded: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ── Lenient field decoding ───────────────────────────────────────────────────

/// Wrong-typed field → `None`. Missing fields need `#[serde(default)]` alongside.
fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(de)?;
    Ok(T::deserialize(value).ok())
}

/// Keeps the array elements that decode and drops the rest; a non-array is empty.
fn lenient_vec<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(de)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items.into_iter().filter_map(|v| T::deserialize(v).ok()).collect())
}

// ── Provider JSON (schedule) ─────────────────────────────────────────────────

#[derive(Deserialize, Debug, Default)]
struct ScheduleResponse {
    #[serde(default, deserialize_with = "lenient_vec")]
    dates: Vec<ScheduleDate>,
}

#[derive(Deserialize, Debug, Default)]
struct ScheduleDate {
    #[serde(default, deserialize_with = "lenient_vec")]
    games: Vec<ScheduleGame>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ScheduleGame {
    #[serde(default, deserialize_with = "lenient")]
    game_pk: Option<GamePk>,
    #[serde(default, deserialize_with = "lenient")]
    teams:   Option<ScheduleTeams>,
}

#[derive(Deserialize, Debug)]
struct ScheduleTeams {
    #[serde(default, deserialize_with = "lenient")]
    home: Option<ScheduleSide>,
    #[serde(default, deserialize_with = "lenient")]
    away: Option<ScheduleSide>,
}

#[derive(Deserialize, Debug)]
struct ScheduleSide {
    #[serde(default, deserialize_with = "lenient")]
    team: Option<TeamInfo>,
}

#[derive(Deserialize, Debug)]
struct TeamInfo {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

fn side_name(side: Option<ScheduleSide>) -> String {
    side.and_then(|s| s.team)
        .and_then(|t| t.name)
        .unwrap_or_else(|| UNKNOWN_TEAM.to_string())
}

impl From<ScheduleGame> for Game {
    fn from(raw: ScheduleGame) -> Self {
        let (home, away) = match raw.teams {
            Some(t) => (side_name(t.home), side_name(t.away)),
            None    => (UNKNOWN_TEAM.to_string(), UNKNOWN_TEAM.to_string()),
        };
        Game { game_pk: raw.game_pk, home, away }
    }
}

// ── Provider JSON (live feed) ────────────────────────────────────────────────

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LiveFeed {
    #[serde(default, deserialize_with = "lenient")]
    live_data: Option<LiveData>,
}

#[derive(Deserialize, Debug)]
struct LiveData {
    #[serde(default, deserialize_with = "lenient")]
    linescore: Option<RawLineScore>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawLineScore {
    #[serde(default, deserialize_with = "lenient")]
    current_inning: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    inning_state:   Option<String>,
}

impl From<RawLineScore> for LineScore {
    fn from(raw: RawLineScore) -> Self {
        LineScore {
            current_inning: raw.current_inning.unwrap_or(0),
            inning_state:   raw.inning_state.unwrap_or_default(),
        }
    }
}

// ── Parsing boundary ─────────────────────────────────────────────────────────

/// Games from the first date bucket. Unparsable bodies and empty schedules
/// both come back as an empty list; a single malformed game only loses its
/// own bad fields.
pub fn parse_schedule(body: &str) -> Vec<Game> {
    let parsed: ScheduleResponse = match serde_json::from_str(body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Schedule JSON parse failed: {e} (body starts: {})", preview(body));
            return Vec::new();
        }
    };

    match parsed.dates.into_iter().next() {
        Some(bucket) => bucket.games.into_iter().map(Game::from).collect(),
        None => {
            info!("No games scheduled today");
            Vec::new()
        }
    }
}

/// Missing or wrong-typed `liveData` / `linescore` / fields degrade to
/// [`LineScore::default`]. A body that isn't JSON at all is an error.
pub fn parse_linescore(body: &str) -> Result<LineScore, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|source| FetchError::Decode { endpoint: "live feed", source })?;

    Ok(LiveFeed::deserialize(value)
        .ok()
        .and_then(|feed| feed.live_data)
        .and_then(|d| d.linescore)
        .map(LineScore::from)
        .unwrap_or_default())
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(120);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

// ── GameSource ───────────────────────────────────────────────────────────────

#[async_trait]
pub trait GameSource: Send + Sync {
    async fn schedule(&self, date: NaiveDate) -> Result<Vec<Game>, FetchError>;
    async fn linescore(&self, game_pk: GamePk) -> Result<LineScore, FetchError>;
}

pub struct MlbClient {
    client:   reqwest::Client,
    base_url: String,
}

impl MlbClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("extra-innings-live/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url,
        }
    }

    pub fn schedule_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/api/v1/schedule?sportId={}&date={}",
            self.base_url,
            MLB_SPORT_ID,
            date.format("%Y-%m-%d")
        )
    }

    pub fn live_feed_url(&self, game_pk: GamePk) -> String {
        format!("{}/api/v1/game/{}/feed/live", self.base_url, game_pk)
    }

    async fn get_text(&self, endpoint: &'static str, url: &str) -> Result<String, FetchError> {
        debug!("GET {url}");
        let resp = self.client.get(url).send().await
            .map_err(|e| FetchError::Transport { endpoint, reason: e.to_string() })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status: status.as_u16() });
        }

        resp.text().await
            .map_err(|e| FetchError::Transport { endpoint, reason: e.to_string() })
    }

    pub async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<Game>, FetchError> {
        let body = self.get_text("schedule", &self.schedule_url(date)).await?;
        let games = parse_schedule(&body);
        debug!("Schedule {date}: {} games", games.len());
        Ok(games)
    }

    pub async fn fetch_linescore(&self, game_pk: GamePk) -> Result<LineScore, FetchError> {
        let body = self.get_text("live feed", &self.live_feed_url(game_pk)).await?;
        parse_linescore(&body)
    }
}

#[async_trait]
impl GameSource for MlbClient {
    async fn schedule(&self, date: NaiveDate) -> Result<Vec<Game>, FetchError> {
        self.fetch_schedule(date).await
    }

    async fn linescore(&self, game_pk: GamePk) -> Result<LineScore, FetchError> {
        self.fetch_linescore(game_pk).await
    }
}
