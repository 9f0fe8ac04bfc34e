use std::collections::HashSet;

use serde_json::Value;

use crate::engine::reshape::{group_buckets_by, label_key, pos_neg};
use crate::store::response::key_str;
use crate::types::{EntitySentiment, RankedEntity};

/// Per-entity POS/NEG totals for roster members, ordered by name.
/// Roster membership is an exact string match.
pub fn entity_sentiments(
    buckets: &[Value],
    entity_source: &'static str,
    label_source: &'static str,
    roster: &HashSet<String>,
) -> Vec<EntitySentiment> {
    let entity_key = |bucket: &Value| {
        key_str(bucket, entity_source)
            .filter(|name| roster.contains(*name))
            .map(str::to_string)
    };

    group_buckets_by(buckets, entity_key, label_key(label_source))
        .into_iter()
        .map(|(name, row)| {
            let (pos, neg) = pos_neg(&row);
            EntitySentiment::new(name, pos, neg)
        })
        .collect()
}

/// Sort by score descending, keeping input order among ties, and assign min-ranks:
/// `{A: 5, B: 5, C: 2}` ranks `1, 1, 3`.
pub fn rank_entities(mut entities: Vec<EntitySentiment>) -> Vec<RankedEntity> {
    entities.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));

    let mut ranked: Vec<RankedEntity> = Vec::with_capacity(entities.len());
    for (i, entity) in entities.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev) if prev.entity.overall_score == entity.overall_score => prev.rank,
            _ => i + 1,
        };
        ranked.push(RankedEntity { rank, entity });
    }
    ranked
}

pub fn top(ranked: &[RankedEntity], n: usize) -> Vec<RankedEntity> {
    ranked.iter().take(n).cloned().collect()
}

/// Lowest scores first.
pub fn bottom(ranked: &[RankedEntity], n: usize) -> Vec<RankedEntity> {
    ranked.iter().rev().take(n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roster(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn cell(player: &str, label: &str, count: u64) -> Value {
        json!({ "key": { "player": player, "sentiment": label }, "doc_count": count })
    }

    fn scored(name: &str, pos: u64, neg: u64) -> EntitySentiment {
        EntitySentiment::new(name.to_string(), pos, neg)
    }

    #[test]
    fn roster_filter_is_exact() {
        let raw = vec![
            cell("Pete Alonso", "POS", 4),
            cell("Random Person", "POS", 40),
            cell("pete alonso", "NEG", 2),
        ];
        let out = entity_sentiments(&raw, "player", "sentiment", &roster(&["Pete Alonso"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].entity_name, "Pete Alonso");
        assert_eq!(out[0].overall_score, 4);
    }

    #[test]
    fn missing_label_counts_as_zero() {
        let raw = vec![cell("Edwin Diaz", "NEG", 3), cell("Edwin Diaz", "NEU", 10)];
        let out = entity_sentiments(&raw, "player", "sentiment", &roster(&["Edwin Diaz"]));
        let row = &out[0];
        assert_eq!((row.positive_count, row.negative_count, row.overall_score), (0, 3, -3));
    }

    #[test]
    fn ties_share_the_min_rank() {
        let ranked = rank_entities(vec![scored("A", 5, 0), scored("B", 6, 1), scored("C", 2, 0)]);
        let ranks: Vec<(&str, usize)> = ranked
            .iter()
            .map(|r| (r.entity.entity_name.as_str(), r.rank))
            .collect();
        assert_eq!(ranks, vec![("A", 1), ("B", 1), ("C", 3)]);
    }

    #[test]
    fn ranking_is_stable_for_ties_and_handles_negatives() {
        let ranked = rank_entities(vec![
            scored("Carrasco", 0, 4),
            scored("Alonso", 9, 1),
            scored("Bassitt", 0, 4),
            scored("Diaz", 3, 3),
        ]);
        let order: Vec<&str> = ranked.iter().map(|r| r.entity.entity_name.as_str()).collect();
        assert_eq!(order, vec!["Alonso", "Diaz", "Carrasco", "Bassitt"]);
        assert_eq!(ranked.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![1, 2, 3, 3]);
    }

    #[test]
    fn top_and_bottom_callouts() {
        let ranked = rank_entities(vec![scored("A", 9, 0), scored("B", 5, 0), scored("C", 0, 5)]);
        let best: Vec<_> = top(&ranked, 2).into_iter().map(|r| r.entity.entity_name).collect();
        let worst: Vec<_> = bottom(&ranked, 2).into_iter().map(|r| r.entity.entity_name).collect();
        assert_eq!(best, vec!["A", "B"]);
        assert_eq!(worst, vec!["C", "B"]);
        assert!(top(&[], 3).is_empty());
    }
}
