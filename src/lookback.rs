use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::store::{Earliest, Interval};

pub const LAST_12_HOURS: &str = "Last 12 Hours";
pub const LAST_24_HOURS: &str = "Last 24 Hours";
pub const LAST_7_DAYS: &str = "Last 7 Days";
pub const SEASON: &str = "Season";

/// X-axis tick spacing the dashboard uses for a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TickGranularity {
    Hour,
    Day,
    Week,
}

/// A named time range. Coarser buckets for longer ranges keep the point count bounded
/// and the smoothing span near 30-60 minutes of wall clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookbackProfile {
    pub label: &'static str,
    pub earliest: Earliest,
    pub bucket_interval: Interval,
    /// Trailing buckets summed per point; always >= 1.
    pub smoothing_window: usize,
    pub tick_granularity: TickGranularity,
}

impl LookbackProfile {
    fn new(
        label: &'static str,
        earliest: Earliest,
        bucket_interval: Interval,
        smoothing_window: usize,
        tick_granularity: TickGranularity,
    ) -> Self {
        Self {
            label,
            earliest,
            bucket_interval,
            smoothing_window: smoothing_window.max(1),
            tick_granularity,
        }
    }
}

/// Fixed set of periods, built once from config.
#[derive(Debug, Clone)]
pub struct LookbackRegistry {
    profiles: Vec<LookbackProfile>,
}

impl LookbackRegistry {
    pub fn new(season_start: DateTime<Utc>) -> Self {
        use TickGranularity::{Day, Hour, Week};

        let date_math = |s: &str| Earliest::DateMath(s.to_string());
        let minutes = Interval::minutes;
        Self {
            profiles: vec![
                LookbackProfile::new(LAST_12_HOURS, date_math("now-12h/h"), minutes(1), 30, Hour),
                LookbackProfile::new(LAST_24_HOURS, date_math("now-24h/h"), minutes(1), 30, Hour),
                LookbackProfile::new(LAST_7_DAYS, date_math("now-168h/h"), minutes(15), 4, Day),
                LookbackProfile::new(SEASON, Earliest::At(season_start), minutes(60), 1, Week),
            ],
        }
    }

    pub fn resolve(&self, label: &str) -> Result<&LookbackProfile> {
        self.profiles
            .iter()
            .find(|p| p.label == label)
            .ok_or_else(|| AppError::UnknownPeriod(label.to_string()))
    }

    pub fn profiles(&self) -> &[LookbackProfile] {
        &self.profiles
    }
}
