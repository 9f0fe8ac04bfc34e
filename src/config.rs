use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AppError, Result};
use crate::types::MoodPools;

/// Season start used by the "Season" lookback when SEASON_START is unset.
pub const DEFAULT_SEASON_START: &str = "2022-06-20T00:00:00Z";

/// Page size for composite aggregations keyed by entity.
pub const ENTITY_PAGE_SIZE: usize = 10_000;

/// Page size for composite aggregations keyed by time bucket.
pub const TIME_PAGE_SIZE: usize = 5_000;

/// Named aggregations, echoed back under `aggregations.<name>` in responses.
pub mod agg_names {
    pub const MOOD: &str = "window_sentiment";
    pub const SERIES: &str = "sentiment_buckets";
    pub const ENTITIES: &str = "player_buckets";
    pub const HISTORY: &str = "daily_sentiment";
}

/// Document fields queried in the store index.
pub mod fields {
    pub const CREATED_AT: &str = "created_at";
    pub const SENTIMENT_LABEL: &str = "sentiment.label";
    pub const ENTITIES: &str = "player_entities";
    pub const OPPOSING_FAN: &str = "is_opposing_fan";
}

/// Ratio thresholds for the categorical mood.
pub mod mood_thresholds {
    /// ratio >= POSITIVE_MIN is positive.
    pub const POSITIVE_MIN: f64 = 0.60;
    /// ratio < NEGATIVE_MAX is negative.
    pub const NEGATIVE_MAX: f64 = 0.40;
}

/// Names must match the NER model's output strings exactly.
pub const DEFAULT_ROSTER: &[&str] = &[
    "Francisco Lindor",
    "Pete Alonso",
    "Max Scherzer",
    "Jacob deGrom",
    "Buck Showalter",
    "Steve Cohen",
    "Tomas Nido",
    "Carlos Carrasco",
    "Dom Smith",
    "Brandon Nimmo",
    "Mark Canha",
    "Luis Guillorme",
    "James McCann",
    "Starling Marte",
    "Eduardo Escobar",
    "Jeff McNeil",
    "Tylor Megill",
    "Chris Bassitt",
    "Edwin Diaz",
    "Nick Plummer",
    "Taijuan Walker",
    "Adam Ottavino",
    "David Peterson",
    "Drew Smith",
    "J.D. Davis",
    "Trevor Williams",
    "Adonis Medina",
    "Seth Lugo",
    "Patrick Mazeika",
    "Trevor May",
    "Chasen Shreve",
    "Francisco Alvarez",
    "Tommy Hunter",
    "Yoan Lopez",
    "Joely Rodriguez",
    "Billy Eppler",
    "Ender Inciarte",
    "Jake Reed",
];

pub const DEFAULT_POSITIVE_SYMBOLS: &[&str] = &["😀", "😁", "🤩", "🥳", "😎", "🔥", "🍎"];
pub const DEFAULT_NEUTRAL_SYMBOLS: &[&str] = &["😐", "🤔", "😶", "🙃", "🫤"];
pub const DEFAULT_NEGATIVE_SYMBOLS: &[&str] = &["😡", "😭", "🤬", "😩", "🤮", "💀"];

#[derive(Clone)]
pub struct Config {
    /// Base URL of the store, scheme included (ELASTIC_URL; https assumed when absent)
    pub store_url: String,
    pub store_index: String,
    pub store_user: String,
    pub store_pass: String,
    pub log_level: String,
    pub api_port: u16,
    /// Per-request timeout for store calls (STORE_TIMEOUT_SECS)
    pub store_timeout_secs: u64,
    /// Idle connections kept per store host (STORE_MAX_IDLE_PER_HOST)
    pub store_max_idle_per_host: usize,
    /// Upper bound on `after_key` pages followed per composite query (COMPOSITE_MAX_PAGES)
    pub composite_max_pages: usize,
    /// Lower bound of the "Season" lookback (SEASON_START)
    pub season_start: DateTime<Utc>,
    /// Recognised entity names (ROSTER_PATH, JSON array)
    pub roster: Vec<String>,
    /// Display symbols per mood (MOODS_PATH, JSON object)
    pub moods: MoodPools,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::Config(format!("{key} must be set")))
        };

        let store_url = normalize_store_url(&required("ELASTIC_URL")?);
        let store_index = required("ELASTIC_INDEX")?;
        let store_user = required("ELASTIC_USER")?;
        let store_pass = required("ELASTIC_PASS")?;

        let season_start = match get("SEASON_START") {
            Some(raw) => parse_season_start(&raw)?,
            None => parse_season_start(DEFAULT_SEASON_START)?,
        };

        let roster = match get("ROSTER_PATH") {
            Some(path) => load_json::<Vec<String>>(&path)?,
            None => DEFAULT_ROSTER.iter().map(|s| s.to_string()).collect(),
        };
        if roster.is_empty() {
            return Err(AppError::Config("roster is empty".to_string()));
        }

        let moods = match get("MOODS_PATH") {
            Some(path) => load_json::<MoodPools>(&path)?,
            None => MoodPools::default(),
        };
        moods.validate()?;

        let composite_max_pages =
            parse_or("COMPOSITE_MAX_PAGES", get("COMPOSITE_MAX_PAGES"), 20usize)?;
        if composite_max_pages == 0 {
            return Err(AppError::Config("COMPOSITE_MAX_PAGES must be at least 1".to_string()));
        }

        Ok(Self {
            store_url,
            store_index,
            store_user,
            store_pass,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            api_port: parse_or("API_PORT", get("API_PORT"), 3000u16)?,
            store_timeout_secs: parse_or("STORE_TIMEOUT_SECS", get("STORE_TIMEOUT_SECS"), 30u64)?,
            store_max_idle_per_host: parse_or(
                "STORE_MAX_IDLE_PER_HOST",
                get("STORE_MAX_IDLE_PER_HOST"),
                8usize,
            )?,
            composite_max_pages,
            season_start,
            roster,
            moods,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("store_url", &self.store_url)
            .field("store_index", &self.store_index)
            .field("store_user", &self.store_user)
            .field("store_pass", &"<redacted>")
            .field("log_level", &self.log_level)
            .field("api_port", &self.api_port)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("store_max_idle_per_host", &self.store_max_idle_per_host)
            .field("composite_max_pages", &self.composite_max_pages)
            .field("season_start", &self.season_start)
            .field("roster", &self.roster.len())
            .field("moods", &self.moods)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {v:?}"))),
        None => Ok(default),
    }
}

fn normalize_store_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare `YYYY-MM-DD`.
pub fn parse_season_start(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::Config(format!("SEASON_START is not a date: {raw:?}")))
}

fn load_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {path}: {e}")))?;
    serde_json::from_str(&text).map_err(|e| AppError::Config(format!("cannot parse {path}: {e}")))
}
