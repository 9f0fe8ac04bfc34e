use crate::types::{HistoryPoint, SentimentPoint, TimeBucket};

/// Trailing sum over `window` elements including the current one.
/// The first `window - 1` positions sum whatever is available.
pub fn rolling_sum(values: &[u64], window: usize) -> Vec<u64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0u64;
    for (i, v) in values.iter().enumerate() {
        acc += v;
        if i >= window {
            acc -= values[i - window];
        }
        out.push(acc);
    }
    out
}

/// `pos / (pos + neg)`, or None when both are zero.
pub fn ratio(pos: u64, neg: u64) -> Option<f64> {
    let total = pos + neg;
    (total > 0).then(|| pos as f64 / total as f64)
}

/// Map a [0, 1] ratio onto [-1, 1]. Non-finite input yields 0.
pub fn rescale_signed(ratio: f64) -> f64 {
    let scaled = (ratio - 0.5) * 2.0;
    if scaled.is_finite() {
        scaled.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

pub fn sentiment_series(buckets: &[TimeBucket], window: usize) -> Vec<SentimentPoint> {
    let pos: Vec<u64> = buckets.iter().map(|b| b.positive_count).collect();
    let neg: Vec<u64> = buckets.iter().map(|b| b.negative_count).collect();
    let rolling_pos = rolling_sum(&pos, window);
    let rolling_neg = rolling_sum(&neg, window);

    buckets
        .iter()
        .zip(rolling_pos.into_iter().zip(rolling_neg))
        .map(|(b, (rp, rn))| SentimentPoint {
            timestamp: b.bucket_start,
            positive_count: b.positive_count,
            negative_count: b.negative_count,
            rolling_positive: rp,
            rolling_negative: rn,
            rolling_ratio: ratio(rp, rn).unwrap_or(0.0),
        })
        .collect()
}

/// Per-bucket history with the ratio on [-1, 1]. Buckets with no POS/NEG documents score 0.
pub fn signed_history(buckets: &[TimeBucket]) -> Vec<HistoryPoint> {
    sentiment_series(buckets, 1)
        .into_iter()
        .map(|p| HistoryPoint {
            date: p.timestamp,
            positive_count: p.positive_count,
            negative_count: p.negative_count,
            score: ratio(p.rolling_positive, p.rolling_negative)
                .map(rescale_signed)
                .unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn buckets(counts: &[(u64, u64)]) -> Vec<TimeBucket> {
        let t0: DateTime<Utc> = Utc.with_ymd_and_hms(2022, 7, 4, 19, 0, 0).unwrap();
        counts
            .iter()
            .enumerate()
            .map(|(i, &(p, n))| TimeBucket {
                bucket_start: t0 + Duration::minutes(i as i64),
                positive_count: p,
                negative_count: n,
            })
            .collect()
    }

    #[test]
    fn rolling_sum_uses_partial_windows_at_the_start() {
        assert_eq!(rolling_sum(&[1, 2, 3, 4, 5], 3), vec![1, 3, 6, 9, 12]);
        assert_eq!(rolling_sum(&[], 3), Vec::<u64>::new());
    }

    #[test]
    fn window_of_one_reproduces_raw_counts() {
        let input = buckets(&[(3, 1), (0, 0), (7, 2), (1, 9)]);
        let series = sentiment_series(&input, 1);
        assert_eq!(series.len(), input.len());
        for (p, b) in series.iter().zip(&input) {
            assert_eq!(p.rolling_positive, b.positive_count);
            assert_eq!(p.rolling_negative, b.negative_count);
            assert_eq!(p.timestamp, b.bucket_start);
        }
    }

    #[test]
    fn ratio_is_zero_for_empty_window_and_bounded_otherwise() {
        let rows = buckets(&[(0, 0), (0, 0), (4, 0), (0, 4), (0, 0), (0, 0)]);
        let series = sentiment_series(&rows, 2);
        let ratios: Vec<f64> = series.iter().map(|p| p.rolling_ratio).collect();
        assert_eq!(ratios, vec![0.0, 0.0, 1.0, 0.5, 0.0, 0.0]);
        assert!(series.iter().all(|p| (0.0..=1.0).contains(&p.rolling_ratio)));
    }

    #[test]
    fn smoothing_spans_the_trailing_window() {
        let series = sentiment_series(&buckets(&[(3, 1), (1, 3), (2, 2)]), 30);
        let last = series.last().unwrap();
        assert_eq!((last.rolling_positive, last.rolling_negative), (6, 6));
        assert_eq!(last.rolling_ratio, 0.5);
    }

    #[test]
    fn signed_history_is_bounded_and_empty_days_score_zero() {
        let history = signed_history(&buckets(&[(10, 0), (0, 10), (5, 5), (0, 0), (3, 1)]));
        let scores: Vec<f64> = history.iter().map(|h| h.score).collect();
        assert_eq!(scores, vec![1.0, -1.0, 0.0, 0.0, 0.5]);
        assert!(history.iter().all(|h| (-1.0..=1.0).contains(&h.score)));
    }

    #[test]
    fn rescale_handles_non_finite() {
        assert_eq!(rescale_signed(f64::NAN), 0.0);
        assert_eq!(rescale_signed(f64::INFINITY), 0.0);
        assert_eq!(rescale_signed(0.75), 0.5);
    }
}
