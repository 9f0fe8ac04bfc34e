//! Store round-trip latency, one histogram per aggregation name.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;
use tracing::warn;

/// 1us to 10 minutes.
const MAX_TRACKED_US: u64 = 600_000_000;
const SIGFIG: u8 = 3;

/// Percentiles in milliseconds for one aggregation (or `"all"`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySummary {
    pub aggregation: String,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub sample_count: u64,
}

/// Shared between the store client (writer) and the API (reader).
#[derive(Default)]
pub struct LatencyStats {
    by_aggregation: Mutex<BTreeMap<String, Histogram<u64>>>,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, aggregation: &str, elapsed: Duration) {
        let us = (elapsed.as_micros().min(u128::from(MAX_TRACKED_US)) as u64).max(1);
        let Ok(mut map) = self.by_aggregation.lock() else {
            return;
        };
        if !map.contains_key(aggregation) {
            match Histogram::new_with_bounds(1, MAX_TRACKED_US, SIGFIG) {
                Ok(h) => {
                    map.insert(aggregation.to_string(), h);
                }
                Err(e) => {
                    warn!(aggregation, "latency histogram unavailable: {e}");
                    return;
                }
            }
        }
        if let Some(h) = map.get_mut(aggregation) {
            let _ = h.record(us);
        }
    }

    pub fn total_samples(&self) -> u64 {
        self.by_aggregation
            .lock()
            .map(|map| map.values().map(Histogram::len).sum())
            .unwrap_or(0)
    }

    /// `"all"` first (merged), then each aggregation by name. Empty with no samples.
    pub fn summaries(&self) -> Vec<LatencySummary> {
        let Ok(map) = self.by_aggregation.lock() else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(map.len() + 1);
        let mut merged: Option<Histogram<u64>> = None;
        for h in map.values() {
            match merged.as_mut() {
                Some(m) => {
                    let _ = m.add(h);
                }
                None => merged = Some(h.clone()),
            }
        }
        if let Some(all) = merged.filter(|h| h.len() > 0) {
            out.push(summarize("all", &all));
        }
        out.extend(map.iter().map(|(name, h)| summarize(name, h)));
        out
    }
}

fn summarize(name: &str, h: &Histogram<u64>) -> LatencySummary {
    let ms = |q: f64| h.value_at_quantile(q) as f64 / 1000.0;
    LatencySummary {
        aggregation: name.to_string(),
        p50_ms: ms(0.5),
        p95_ms: ms(0.95),
        p99_ms: ms(0.99),
        sample_count: h.len(),
    }
}
