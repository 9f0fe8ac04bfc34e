use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

use crate::engine::rolling::ratio;
use crate::error::{AppError, Result};
use crate::store::response::doc_count;
use crate::types::{Mood, MoodLabel, MoodPools, SentimentLabel};

/// POS/NEG totals from a plain `terms` aggregation on the label field.
pub fn label_totals(buckets: &[Value]) -> (u64, u64) {
    let mut pos = 0;
    let mut neg = 0;
    for bucket in buckets {
        let label = bucket.get("key").and_then(|k| k.as_str()).map(SentimentLabel::parse);
        match label {
            Some(SentimentLabel::Pos) => pos += doc_count(bucket),
            Some(SentimentLabel::Neg) => neg += doc_count(bucket),
            _ => {}
        }
    }
    (pos, neg)
}

/// The category is decided by the ratio alone; `rng` only picks the display symbol.
pub fn mood_label<R: Rng + ?Sized>(
    positive_count: u64,
    negative_count: u64,
    pools: &MoodPools,
    rng: &mut R,
    window: &str,
) -> Result<MoodLabel> {
    let ratio = ratio(positive_count, negative_count).ok_or_else(|| {
        AppError::InsufficientData(format!("no positive or negative documents since {window}"))
    })?;
    let mood = Mood::from_ratio(ratio);
    Ok(MoodLabel {
        mood,
        symbol: pick_symbol(pools, mood, rng),
        ratio,
        positive_count,
        negative_count,
    })
}

pub fn pick_symbol<R: Rng + ?Sized>(pools: &MoodPools, mood: Mood, rng: &mut R) -> String {
    pools.for_mood(mood).choose(rng).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn totals_ignore_neutral_and_missing_labels() {
        let buckets = vec![
            json!({ "key": "NEU", "doc_count": 50 }),
            json!({ "key": "POS", "doc_count": 6 }),
        ];
        assert_eq!(label_totals(&buckets), (6, 0));
    }

    #[test]
    fn zero_documents_is_insufficient_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let err = mood_label(0, 0, &MoodPools::default(), &mut rng, "now-1h").unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(ref m) if m.contains("now-1h")));
    }

    #[test]
    fn threshold_boundaries() {
        let pools = MoodPools::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(mood_label(60, 40, &pools, &mut rng, "w").unwrap().mood, Mood::Positive);
        assert_eq!(mood_label(40, 60, &pools, &mut rng, "w").unwrap().mood, Mood::Neutral);
        assert_eq!(mood_label(39, 61, &pools, &mut rng, "w").unwrap().mood, Mood::Negative);
        assert_eq!(mood_label(0, 3, &pools, &mut rng, "w").unwrap().mood, Mood::Negative);
    }

    #[test]
    fn symbol_comes_from_the_category_pool_for_any_seed() {
        let pools = MoodPools::default();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let label = mood_label(9, 1, &pools, &mut rng, "w").unwrap();
            assert_eq!(label.mood, Mood::Positive);
            assert!(pools.positive.contains(&label.symbol));
        }
    }

    #[test]
    fn same_seed_same_symbol() {
        let pools = MoodPools::default();
        let a = pick_symbol(&pools, Mood::Negative, &mut StdRng::seed_from_u64(99));
        let b = pick_symbol(&pools, Mood::Negative, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
