use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Fallback when /periods cannot be reached on the first refresh.
pub const DEFAULT_PERIODS: [&str; 4] = ["Last 12 Hours", "Last 24 Hours", "Last 7 Days", "Season"];

/// LOWESS span for the sentiment trend line.
pub const TREND_FRAC: f64 = 0.03;

// ---------------------------------------------------------------------------
// API response types (mirror routes.rs shapes)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct PeriodResponse {
    pub label: String,
    pub earliest: String,
    pub bucket_interval: String,
    pub smoothing_window: usize,
    pub tick_granularity: String,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct MoodLabel {
    pub mood: String,
    pub symbol: String,
    pub ratio: f64,
    pub positive_count: u64,
    pub negative_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct MoodSummaryEntry {
    pub label: String,
    pub since: String,
    pub mood: Option<MoodLabel>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct SentimentPoint {
    pub timestamp: DateTime<Utc>,
    pub positive_count: u64,
    pub negative_count: u64,
    pub rolling_positive: u64,
    pub rolling_negative: u64,
    pub rolling_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResponse {
    pub period: PeriodResponse,
    pub points: Vec<SentimentPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankedEntity {
    pub rank: usize,
    pub entity_name: String,
    pub positive_count: u64,
    pub negative_count: u64,
    pub overall_score: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct RankingsResponse {
    pub period: String,
    pub rankings: Vec<RankedEntity>,
    pub top: Vec<RankedEntity>,
    pub bottom: Vec<RankedEntity>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct HistoryPoint {
    pub date: DateTime<Utc>,
    pub positive_count: u64,
    pub negative_count: u64,
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub entity: String,
    pub points: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Connected,
    Error(String),
    Connecting,
}

/// Either the widget's data or the reason it is unavailable.
pub type Widget<T> = Option<Result<T, String>>;

#[derive(Debug, Clone)]
pub struct AppState {
    pub status: ConnectionStatus,
    pub base_url: String,
    pub periods: Vec<String>,
    pub period_idx: usize,
    pub summary: Vec<MoodSummaryEntry>,
    pub series: Widget<SeriesResponse>,
    pub rankings: Widget<RankingsResponse>,
    pub history: Widget<HistoryResponse>,
    pub last_refresh: std::time::Instant,
}

impl AppState {
    pub fn new(base_url: String) -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            base_url,
            periods: DEFAULT_PERIODS.iter().map(|s| s.to_string()).collect(),
            // "Last 24 Hours"
            period_idx: 1,
            summary: Vec::new(),
            series: None,
            rankings: None,
            history: None,
            last_refresh: std::time::Instant::now(),
        }
    }

    pub fn period(&self) -> &str {
        self.periods
            .get(self.period_idx)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PERIODS[1])
    }

    pub fn next_period(&mut self) {
        self.period_idx = (self.period_idx + 1) % self.periods.len().max(1);
    }

    pub fn prev_period(&mut self) {
        let n = self.periods.len().max(1);
        self.period_idx = (self.period_idx + n - 1) % n;
    }

    pub fn ranked(&self) -> &[RankedEntity] {
        match &self.rankings {
            Some(Ok(r)) => &r.rankings,
            _ => &[],
        }
    }

    pub async fn refresh(&mut self, client: &reqwest::Client) {
        let periods = client.get(format!("{}/periods", self.base_url));
        let summary = client.get(format!("{}/mood/summary", self.base_url));
        let series = self.period_request(client, "sentiment");
        let rankings = self.period_request(client, "players");

        let (periods, summary, series, rankings) = tokio::join!(
            fetch_json::<Vec<PeriodResponse>>(periods),
            fetch_json::<Vec<MoodSummaryEntry>>(summary),
            fetch_json::<SeriesResponse>(series),
            fetch_json::<RankingsResponse>(rankings),
        );

        match summary {
            Ok(s) => {
                self.summary = s;
                self.status = ConnectionStatus::Connected;
            }
            Err(e) => {
                self.status = ConnectionStatus::Error(e);
                return;
            }
        }

        if let Ok(p) = periods {
            if !p.is_empty() {
                let current = self.period().to_string();
                self.periods = p.into_iter().map(|p| p.label).collect();
                self.period_idx = self.periods.iter().position(|l| *l == current).unwrap_or(0);
            }
        }
        self.series = Some(series);
        self.rankings = Some(rankings);
        self.last_refresh = std::time::Instant::now();
    }

    /// `GET /{route}?period=<selected period>`.
    fn period_request(&self, client: &reqwest::Client, route: &str) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/{route}", self.base_url))
            .query(&[("period", self.period())])
    }

    fn history_request(&self, client: &reqwest::Client, entity: &str) -> reqwest::RequestBuilder {
        client.get(format!(
            "{}/players/{}/history",
            self.base_url,
            urlencoding::encode(entity)
        ))
    }

    /// Daily history for one entity (GET /players/:name/history).
    pub async fn fetch_history(&mut self, client: &reqwest::Client, entity: &str) {
        let request = self.history_request(client, entity);
        self.history = Some(fetch_json::<HistoryResponse>(request).await);
    }

    pub fn clear_history(&mut self) {
        self.history = None;
    }
}

/// GET and decode; API error bodies become "data unavailable" messages.
async fn fetch_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, String> {
    let resp = request.send().await.map_err(|e| format!("{e}"))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let reason = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(format!("data unavailable: {reason}"));
    }
    resp.json::<T>().await.map_err(|e| format!("parse error: {e}"))
}

// ---------------------------------------------------------------------------
// Trend smoothing
// ---------------------------------------------------------------------------

/// Bisquare reweighting passes after the initial fit.
const LOWESS_ROBUST_ITERS: usize = 3;

/// Locally weighted linear regression over evenly spaced x (0, 1, 2, ...).
/// Each fit uses the `ceil(frac * n)` nearest points with tricube weights, then
/// reweights by bisquare of the residuals so isolated outliers stop pulling the curve.
/// Reweighting stops early once the median absolute residual is zero.
pub fn lowess(y: &[f64], frac: f64) -> Vec<f64> {
    let n = y.len();
    if n < 3 {
        return y.to_vec();
    }
    let k = ((frac * n as f64).ceil() as usize).clamp(3, n);

    let mut robust = vec![1.0; n];
    let mut fit = lowess_pass(y, k, &robust);
    for _ in 0..LOWESS_ROBUST_ITERS {
        let residuals: Vec<f64> = y.iter().zip(&fit).map(|(a, b)| a - b).collect();
        let scale = 6.0 * median_abs(&residuals);
        if scale <= f64::EPSILON {
            break;
        }
        for (w, r) in robust.iter_mut().zip(&residuals) {
            let u = r / scale;
            *w = if u.abs() < 1.0 { (1.0 - u * u).powi(2) } else { 0.0 };
        }
        fit = lowess_pass(y, k, &robust);
    }
    fit
}

fn lowess_pass(y: &[f64], k: usize, robust: &[f64]) -> Vec<f64> {
    let n = y.len();
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(k / 2).min(n - k);
            let hi = lo + k;
            let h = (i - lo).max(hi - 1 - i) as f64 + 1.0;
            let weight = |j: usize| {
                let d = (j as f64 - i as f64).abs() / h;
                (1.0 - d.powi(3)).powi(3) * robust[j]
            };

            let mut sw = 0.0;
            let mut sx = 0.0;
            let mut sy = 0.0;
            for (j, &yj) in y.iter().enumerate().take(hi).skip(lo) {
                let w = weight(j);
                sw += w;
                sx += w * j as f64;
                sy += w * yj;
            }
            if sw <= f64::EPSILON {
                return y[i];
            }
            let mx = sx / sw;
            let my = sy / sw;

            let mut sxx = 0.0;
            let mut sxy = 0.0;
            for (j, &yj) in y.iter().enumerate().take(hi).skip(lo) {
                let w = weight(j);
                sxx += w * (j as f64 - mx).powi(2);
                sxy += w * (j as f64 - mx) * (yj - my);
            }
            if sxx > 1e-12 {
                my + sxy / sxx * (i as f64 - mx)
            } else {
                my
            }
        })
        .collect()
}

fn median_abs(values: &[f64]) -> f64 {
    let mut abs: Vec<f64> = values.iter().map(|v| v.abs()).collect();
    abs.sort_by(f64::total_cmp);
    let mid = abs.len() / 2;
    if abs.len() % 2 == 0 {
        (abs[mid - 1] + abs[mid]) / 2.0
    } else {
        abs[mid]
    }
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Axis tick text for a bucket start at the period's granularity.
pub fn format_tick(ts: &DateTime<Utc>, granularity: &str) -> String {
    match granularity {
        "hour" => ts.format("%H:%M").to_string(),
        "day" => ts.format("%a %d").to_string(),
        _ => ts.format("%b %d").to_string(),
    }
}

/// First, middle and last tick labels.
pub fn axis_labels(stamps: &[DateTime<Utc>], granularity: &str) -> Vec<String> {
    match stamps.len() {
        0 => Vec::new(),
        1 => vec![format_tick(&stamps[0], granularity)],
        n => vec![
            format_tick(&stamps[0], granularity),
            format_tick(&stamps[n / 2], granularity),
            format_tick(&stamps[n - 1], granularity),
        ],
    }
}

/// One glyph per day of history; height tracks |score|.
pub fn history_glyph(score: f64) -> char {
    const LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    let idx = (score.abs().clamp(0.0, 1.0) * 7.0).round() as usize;
    LEVELS[idx]
}

pub fn format_score(score: i64) -> String {
    if score > 0 {
        format!("+{score}")
    } else {
        score.to_string()
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{head}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lowess_preserves_lines_and_constants() {
        let flat = vec![0.5; 200];
        assert!(lowess(&flat, TREND_FRAC).iter().all(|v| (v - 0.5).abs() < 1e-9));

        let line: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let fit = lowess(&line, 0.2);
        assert_eq!(fit.len(), line.len());
        for (a, b) in fit.iter().zip(&line) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn lowess_damps_a_spike() {
        let mut y = vec![0.5; 101];
        y[50] = 1.0;
        let fit = lowess(&y, 0.2);
        assert!(fit[50] < 0.9 && fit[50] > 0.5);
    }

    #[test]
    fn lowess_reweighting_ignores_outlier() {
        let mut y: Vec<f64> = (0..101)
            .map(|j| if j % 2 == 0 { 0.51 } else { 0.49 })
            .collect();
        y[50] = 1.0;
        let fit = lowess(&y, 0.2);
        assert!((fit[50] - 0.5).abs() < 0.02, "fit[50] = {}", fit[50]);
    }

    #[test]
    fn lowess_short_input_is_identity() {
        assert_eq!(lowess(&[0.2, 0.8], 0.03), vec![0.2, 0.8]);
        assert!(lowess(&[], 0.03).is_empty());
    }

    #[test]
    fn period_cycling_wraps() {
        let mut app = AppState::new("http://localhost:3000".to_string());
        assert_eq!(app.period(), "Last 24 Hours");
        app.next_period();
        app.next_period();
        assert_eq!(app.period(), "Season");
        app.next_period();
        assert_eq!(app.period(), "Last 12 Hours");
        app.prev_period();
        assert_eq!(app.period(), "Season");
    }

    #[test]
    fn requests_encode_period_and_player() {
        let client = reqwest::Client::new();
        let mut app = AppState::new("http://localhost:3000".to_string());
        app.period_idx = 2;

        let series = app.period_request(&client, "sentiment").build().unwrap();
        assert_eq!(series.url().path(), "/sentiment");
        let pairs: Vec<(String, String)> = series.url().query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("period".to_string(), "Last 7 Days".to_string())]);

        let history = app.history_request(&client, "J.D. Davis").build().unwrap();
        assert_eq!(history.url().as_str(), "http://localhost:3000/players/J.D.%20Davis/history");
    }

    #[test]
    fn ticks_follow_granularity() {
        let ts = Utc.with_ymd_and_hms(2022, 7, 4, 19, 5, 0).unwrap();
        assert_eq!(format_tick(&ts, "hour"), "19:05");
        assert_eq!(format_tick(&ts, "day"), "Mon 04");
        assert_eq!(format_tick(&ts, "week"), "Jul 04");
        assert_eq!(axis_labels(&[ts, ts, ts], "hour").len(), 3);
    }

    #[test]
    fn glyphs_and_scores() {
        assert_eq!(history_glyph(0.0), '▁');
        assert_eq!(history_glyph(-1.0), '█');
        assert_eq!(format_score(4), "+4");
        assert_eq!(format_score(-2), "-2");
        assert_eq!(truncate("Francisco Lindor", 9), "Francisc…");
    }
}
