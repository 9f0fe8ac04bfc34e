//! Pivot raw composite buckets into typed tables.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::store::response::{doc_count, key_millis, key_str};
use crate::types::{SentimentLabel, TimeBucket};

/// Sum `doc_count` into a `primary -> secondary -> count` table.
/// Buckets whose keys cannot be read are skipped.
pub fn group_buckets_by<K1, K2, F1, F2>(
    buckets: &[Value],
    primary: F1,
    secondary: F2,
) -> BTreeMap<K1, BTreeMap<K2, u64>>
where
    K1: Ord,
    K2: Ord,
    F1: Fn(&Value) -> Option<K1>,
    F2: Fn(&Value) -> Option<K2>,
{
    let mut table: BTreeMap<K1, BTreeMap<K2, u64>> = BTreeMap::new();
    let mut skipped = 0usize;

    for bucket in buckets {
        let (Some(p), Some(s)) = (primary(bucket), secondary(bucket)) else {
            skipped += 1;
            continue;
        };
        *table.entry(p).or_default().entry(s).or_insert(0) += doc_count(bucket);
    }

    if skipped > 0 {
        warn!(skipped, "buckets with unreadable keys skipped");
    }
    table
}

/// Sentiment label read from composite source `source`.
pub fn label_key(source: &'static str) -> impl Fn(&Value) -> Option<SentimentLabel> {
    move |bucket: &Value| key_str(bucket, source).map(SentimentLabel::parse)
}

/// Bucket start read from an epoch-millisecond composite source.
pub fn time_key(source: &'static str) -> impl Fn(&Value) -> Option<DateTime<Utc>> {
    move |bucket: &Value| {
        key_millis(bucket, source).and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// POS/NEG counts out of one pivoted row; absent labels count as 0.
pub fn pos_neg(row: &BTreeMap<SentimentLabel, u64>) -> (u64, u64) {
    (
        row.get(&SentimentLabel::Pos).copied().unwrap_or(0),
        row.get(&SentimentLabel::Neg).copied().unwrap_or(0),
    )
}

/// Ascending time buckets, one per distinct bucket start present in the response.
/// Bucket starts the store omitted (no documents) are not synthesized.
pub fn time_buckets(
    buckets: &[Value],
    time_source: &'static str,
    label_source: &'static str,
) -> Vec<TimeBucket> {
    group_buckets_by(buckets, time_key(time_source), label_key(label_source))
        .into_iter()
        .map(|(bucket_start, row)| {
            let (positive_count, negative_count) = pos_neg(&row);
            TimeBucket {
                bucket_start,
                positive_count,
                negative_count,
            }
        })
        .collect()
}
