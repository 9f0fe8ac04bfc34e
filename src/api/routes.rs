use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::health::HealthState;
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::engine::ranking::{bottom, top};
use crate::engine::SentimentEngine;
use crate::error::AppError;
use crate::lookback::{LookbackProfile, TickGranularity, LAST_24_HOURS};
use crate::store::Earliest;
use crate::types::{HistoryPoint, MoodLabel, RankedEntity, SentimentPoint};

/// Number of entities in each of the top/bottom call-outs.
const CALLOUT_COUNT: usize = 3;

/// Windows shown as headline metrics, in display order.
const SUMMARY_WINDOWS: [(&str, &str); 3] = [
    ("Previous 7 Days", "now-7d"),
    ("Last 24 Hours", "now-1d"),
    ("Previous Hour", "now-1h"),
];

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<SentimentEngine>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/periods", get(get_periods))
        .route("/roster", get(get_roster))
        .route("/mood", get(get_mood))
        .route("/mood/summary", get(get_mood_summary))
        .route("/sentiment", get(get_sentiment))
        .route("/players", get(get_players))
        .route("/players/:name/history", get(get_player_history))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct MoodQuery {
    pub since: Option<String>,
}

#[derive(Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

impl PeriodQuery {
    fn label(&self) -> &str {
        self.period.as_deref().unwrap_or(LAST_24_HOURS)
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct PeriodResponse {
    pub label: String,
    pub earliest: String,
    pub bucket_interval: String,
    pub smoothing_window: usize,
    pub tick_granularity: TickGranularity,
}

impl From<&LookbackProfile> for PeriodResponse {
    fn from(p: &LookbackProfile) -> Self {
        Self {
            label: p.label.to_string(),
            earliest: p.earliest.to_query_value(),
            bucket_interval: p.bucket_interval.as_str().to_string(),
            smoothing_window: p.smoothing_window,
            tick_granularity: p.tick_granularity,
        }
    }
}

#[derive(Serialize)]
pub struct MoodSummaryEntry {
    pub label: String,
    pub since: String,
    pub mood: Option<MoodLabel>,
    /// Set instead of `mood` when this window could not be computed.
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct SeriesResponse {
    pub period: PeriodResponse,
    pub points: Vec<SentimentPoint>,
}

#[derive(Serialize)]
pub struct RankingsResponse {
    pub period: String,
    pub rankings: Vec<RankedEntity>,
    pub top: Vec<RankedEntity>,
    pub bottom: Vec<RankedEntity>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub entity: String,
    pub points: Vec<HistoryPoint>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub store_reachable: bool,
    pub last_success_at_ns: u64,
    pub store_failures: u64,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub sample_count: u64,
    pub aggregations: Vec<LatencySummary>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_periods(State(state): State<ApiState>) -> Json<Vec<PeriodResponse>> {
    Json(state.engine.lookbacks().profiles().iter().map(PeriodResponse::from).collect())
}

async fn get_roster(State(state): State<ApiState>) -> Json<Vec<String>> {
    Json(state.engine.roster())
}

async fn get_mood(
    State(state): State<ApiState>,
    Query(params): Query<MoodQuery>,
) -> Result<Json<MoodLabel>, AppError> {
    let since = parse_earliest(params.since.as_deref().unwrap_or("now-1d"));
    Ok(Json(state.engine.mood_snapshot(&since).await?))
}

async fn get_mood_summary(State(state): State<ApiState>) -> Json<Vec<MoodSummaryEntry>> {
    let windows = SUMMARY_WINDOWS.map(|(_, since)| Earliest::DateMath(since.to_string()));
    let engine = &state.engine;

    let (week, day, hour) = tokio::join!(
        engine.mood_snapshot(&windows[0]),
        engine.mood_snapshot(&windows[1]),
        engine.mood_snapshot(&windows[2]),
    );

    let entries = SUMMARY_WINDOWS
        .iter()
        .zip([week, day, hour])
        .map(|((label, since), result)| {
            let (mood, error) = match result {
                Ok(m) => (Some(m), None),
                Err(e) => {
                    tracing::warn!(window = %since, "mood unavailable: {e}");
                    (None, Some(e.to_string()))
                }
            };
            MoodSummaryEntry {
                label: label.to_string(),
                since: since.to_string(),
                mood,
                error,
            }
        })
        .collect();

    Json(entries)
}

async fn get_sentiment(
    State(state): State<ApiState>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<SeriesResponse>, AppError> {
    let label = params.label();
    let profile = state.engine.lookbacks().resolve(label)?;
    let points = state.engine.sentiment_series(label).await?;
    Ok(Json(SeriesResponse {
        period: PeriodResponse::from(profile),
        points,
    }))
}

async fn get_players(
    State(state): State<ApiState>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<RankingsResponse>, AppError> {
    let label = params.label();
    let rankings = state.engine.entity_rankings(label).await?;
    Ok(Json(RankingsResponse {
        period: label.to_string(),
        top: top(&rankings, CALLOUT_COUNT),
        bottom: bottom(&rankings, CALLOUT_COUNT),
        rankings,
    }))
}

async fn get_player_history(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<HistoryResponse>, AppError> {
    let points = state.engine.entity_history(&name).await?;
    Ok(Json(HistoryResponse { entity: name, points }))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        store_reachable: state.health.store_reachable(),
        last_success_at_ns: state.health.last_success_at_ns(),
        store_failures: state.health.store_failures(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        sample_count: state.latency.total_samples(),
        aggregations: state.latency.summaries(),
    })
}

/// RFC 3339 instants pass through as fixed bounds; anything else is store date-math.
fn parse_earliest(raw: &str) -> Earliest {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(at) => Earliest::At(at.with_timezone(&Utc)),
        Err(_) => Earliest::DateMath(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::test_config;
    use crate::store::testing::FakeStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(store: FakeStore) -> Router {
        let engine = SentimentEngine::new(Arc::new(store), &test_config())
            .with_rng(StdRng::seed_from_u64(0));
        router(ApiState {
            engine: Arc::new(engine),
            health: Arc::new(HealthState::new()),
            latency: Arc::new(LatencyStats::new()),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn mood_response(pos: u64, neg: u64) -> Value {
        json!({ "aggregations": { "window_sentiment": { "buckets": [
            { "key": "POS", "doc_count": pos },
            { "key": "NEG", "doc_count": neg }
        ] } } })
    }

    #[tokio::test]
    async fn lists_periods_in_registry_order() {
        let (status, body) = get_json(app(FakeStore::new(vec![])), "/periods").await;
        assert_eq!(status, StatusCode::OK);
        let labels: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["label"].as_str().unwrap())
            .collect();
        assert_eq!(labels, vec!["Last 12 Hours", "Last 24 Hours", "Last 7 Days", "Season"]);
        assert_eq!(body[0]["tick_granularity"], "hour");
    }

    #[tokio::test]
    async fn mood_returns_category_and_symbol() {
        let store = FakeStore::new(vec![mood_response(1, 9)]);
        let (status, body) = get_json(app(store), "/mood?since=now-1h").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mood"], "negative");
        assert!(!body["symbol"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_window_is_reported_not_crashed() {
        let store = FakeStore::new(vec![mood_response(0, 0)]);
        let (status, body) = get_json(app(store), "/mood").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "insufficient_data");
    }

    #[tokio::test]
    async fn summary_degrades_per_window() {
        let store = FakeStore::new(vec![
            mood_response(7, 3),
            json!({ "unexpected": true }),
            mood_response(5, 5),
        ]);
        let (status, body) = get_json(app(store), "/mood/summary").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["label"], "Previous 7 Days");
        assert!(entries.iter().filter(|e| e["error"].is_string()).count() == 1);
        assert!(entries.iter().filter(|e| e["mood"].is_object()).count() == 2);
    }

    #[tokio::test]
    async fn unknown_period_is_bad_request() {
        let (status, body) =
            get_json(app(FakeStore::new(vec![])), "/sentiment?period=Last%20Decade").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "unknown_period");
    }

    #[tokio::test]
    async fn sentiment_carries_profile_and_points() {
        let bucket = json!({
            "key": { "created_at": 1_656_961_200_000i64, "sentiment": "POS" },
            "doc_count": 2
        });
        let store = FakeStore::new(vec![json!({
            "aggregations": { "sentiment_buckets": { "buckets": [bucket] } }
        })]);
        let (status, body) = get_json(app(store), "/sentiment?period=Last%207%20Days").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["period"]["smoothing_window"], 4);
        assert_eq!(body["points"][0]["rolling_ratio"], 1.0);
    }

    #[tokio::test]
    async fn players_include_callouts() {
        let store = FakeStore::new(vec![json!({ "aggregations": { "player_buckets": { "buckets": [
            { "key": { "player": "Pete Alonso", "sentiment": "POS" }, "doc_count": 4 },
            { "key": { "player": "Edwin Diaz", "sentiment": "NEG" }, "doc_count": 2 }
        ] } } })]);
        let (status, body) = get_json(app(store), "/players?period=Season").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rankings"][0]["entity_name"], "Pete Alonso");
        assert_eq!(body["rankings"][0]["rank"], 1);
        assert_eq!(body["bottom"][0]["entity_name"], "Edwin Diaz");
    }

    #[tokio::test]
    async fn player_history_decodes_path() {
        let store = FakeStore::new(vec![json!({
            "aggregations": { "daily_sentiment": { "buckets": [] } }
        })]);
        let (status, body) = get_json(app(store), "/players/J.D.%20Davis/history").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entity"], "J.D. Davis");
        assert_eq!(body["points"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_bad_gateway() {
        let store = FakeStore::failing(AppError::Remote { status: 500, body: "boom".into() });
        let (status, body) = get_json(app(store), "/players").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["kind"], "remote");
    }

    #[test]
    fn earliest_parsing() {
        assert_eq!(parse_earliest("now-7d"), Earliest::DateMath("now-7d".to_string()));
        assert!(matches!(parse_earliest("2022-10-01T00:00:00Z"), Earliest::At(_)));
    }
}
