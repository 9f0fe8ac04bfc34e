use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{
    mood_thresholds, DEFAULT_NEGATIVE_SYMBOLS, DEFAULT_NEUTRAL_SYMBOLS, DEFAULT_POSITIVE_SYMBOLS,
};
use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// Sentiment labels
// ---------------------------------------------------------------------------

/// Labels attached to each document by the upstream classifier.
/// Anything other than POS/NEG (e.g. NEU) is carried as `Other` and never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SentimentLabel {
    Pos,
    Neg,
    Other,
}

impl SentimentLabel {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "POS" => SentimentLabel::Pos,
            "NEG" => SentimentLabel::Neg,
            _ => SentimentLabel::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// One aggregation cell after reshaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub bucket_start: DateTime<Utc>,
    pub positive_count: u64,
    pub negative_count: u64,
}

/// One row of a smoothed sentiment series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentPoint {
    pub timestamp: DateTime<Utc>,
    pub positive_count: u64,
    pub negative_count: u64,
    pub rolling_positive: u64,
    pub rolling_negative: u64,
    /// In [0, 1]; 0 when the trailing window holds no POS/NEG documents.
    pub rolling_ratio: f64,
}

/// Per-day entity sentiment with the ratio rescaled to [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: DateTime<Utc>,
    pub positive_count: u64,
    pub negative_count: u64,
    pub score: f64,
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySentiment {
    pub entity_name: String,
    pub positive_count: u64,
    pub negative_count: u64,
    pub overall_score: i64,
}

impl EntitySentiment {
    pub fn new(entity_name: String, positive_count: u64, negative_count: u64) -> Self {
        let overall_score = positive_count as i64 - negative_count as i64;
        Self {
            entity_name,
            positive_count,
            negative_count,
            overall_score,
        }
    }
}

/// Tied scores share a rank; the next distinct score ranks at its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub rank: usize,
    #[serde(flatten)]
    pub entity: EntitySentiment,
}

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    Neutral,
    Negative,
}

impl Mood {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= mood_thresholds::POSITIVE_MIN {
            Mood::Positive
        } else if ratio < mood_thresholds::NEGATIVE_MAX {
            Mood::Negative
        } else {
            Mood::Neutral
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mood::Positive => "positive",
            Mood::Neutral => "neutral",
            Mood::Negative => "negative",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodLabel {
    pub mood: Mood,
    pub symbol: String,
    pub ratio: f64,
    pub positive_count: u64,
    pub negative_count: u64,
}

/// Display symbols for each mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodPools {
    pub positive: Vec<String>,
    pub neutral: Vec<String>,
    pub negative: Vec<String>,
}

impl MoodPools {
    pub fn for_mood(&self, mood: Mood) -> &[String] {
        match mood {
            Mood::Positive => &self.positive,
            Mood::Neutral => &self.neutral,
            Mood::Negative => &self.negative,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for mood in [Mood::Positive, Mood::Neutral, Mood::Negative] {
            if self.for_mood(mood).is_empty() {
                return Err(AppError::Config(format!("mood pool {mood} is empty")));
            }
        }
        Ok(())
    }
}

impl Default for MoodPools {
    fn default() -> Self {
        let owned = |pool: &[&str]| -> Vec<String> { pool.iter().map(|s| s.to_string()).collect() };
        Self {
            positive: owned(DEFAULT_POSITIVE_SYMBOLS),
            neutral: owned(DEFAULT_NEUTRAL_SYMBOLS),
            negative: owned(DEFAULT_NEGATIVE_SYMBOLS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_thresholds_are_inclusive_at_sixty_exclusive_at_forty() {
        assert_eq!(Mood::from_ratio(0.60), Mood::Positive);
        assert_eq!(Mood::from_ratio(0.599999), Mood::Neutral);
        assert_eq!(Mood::from_ratio(0.4), Mood::Neutral);
        assert_eq!(Mood::from_ratio(0.39999), Mood::Negative);
        assert_eq!(Mood::from_ratio(0.0), Mood::Negative);
        assert_eq!(Mood::from_ratio(1.0), Mood::Positive);
    }

    #[test]
    fn overall_score_can_go_negative() {
        let e = EntitySentiment::new("Edwin Diaz".to_string(), 3, 10);
        assert_eq!(e.overall_score, -7);
    }

    #[test]
    fn unknown_labels_are_other() {
        assert_eq!(SentimentLabel::parse("POS"), SentimentLabel::Pos);
        assert_eq!(SentimentLabel::parse("NEU"), SentimentLabel::Other);
        assert_eq!(SentimentLabel::parse("pos"), SentimentLabel::Other);
    }

    #[test]
    fn empty_pool_is_rejected() {
        let mut pools = MoodPools::default();
        pools.neutral.clear();
        assert!(pools.validate().is_err());
    }
}
