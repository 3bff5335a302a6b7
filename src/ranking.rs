//! Ranking engine.
//!
//! Assigns competition ranks ("1, 1, 3") with tie counts to any list of
//! scored items. Every placement decision in the engine, from hole junk to
//! settlement pools, goes through [`rank_with_ties`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which end of the score range wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankDirection {
    /// Lowest score ranks first (golf strokes).
    #[default]
    Lower,
    /// Highest score ranks first (points, money).
    Higher,
}

impl RankDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            RankDirection::Lower => RankDirection::Higher,
            RankDirection::Higher => RankDirection::Lower,
        }
    }

    /// Parse `"lower"` / `"higher"`, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lower" => Some(RankDirection::Lower),
            "higher" => Some(RankDirection::Higher),
            _ => None,
        }
    }
}

/// An item together with its competition rank and the size of its tie group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem<T> {
    pub item: T,
    pub rank: u32,
    pub tie_count: u32,
}

/// Rank items by score using competition ranking.
///
/// Items with equal scores share a rank and carry `tie_count` equal to the
/// size of their group; the next distinct score ranks at the previous rank
/// plus the previous tie count. The sort is stable, so tied items keep
/// their input order.
///
/// # Arguments
///
/// * `items` - The items to rank
/// * `score_fn` - Extracts the score of an item
/// * `direction` - Whether lower or higher scores win
///
/// # Examples
///
/// ```rust
/// use golfjunk::ranking::{rank_with_ties, RankDirection};
///
/// let ranked = rank_with_ties(vec![("a", 4), ("b", 3), ("c", 4)], |i| i.1 as f64, RankDirection::Lower);
/// let summary: Vec<_> = ranked.iter().map(|r| (r.item.0, r.rank, r.tie_count)).collect();
/// assert_eq!(summary, vec![("b", 1, 1), ("a", 2, 2), ("c", 2, 2)]);
/// ```
pub fn rank_with_ties<T, F>(
    items: impl IntoIterator<Item = T>,
    score_fn: F,
    direction: RankDirection,
) -> Vec<RankedItem<T>>
where
    F: Fn(&T) -> f64,
{
    let mut scored: Vec<(f64, T)> = items.into_iter().map(|i| (score_fn(&i), i)).collect();
    if scored.is_empty() {
        return Vec::new();
    }

    scored.sort_by(|a, b| match direction {
        RankDirection::Lower => a.0.total_cmp(&b.0),
        RankDirection::Higher => b.0.total_cmp(&a.0),
    });

    // Group sizes of consecutive equal scores
    let mut groups: Vec<usize> = Vec::new();
    let mut previous: Option<f64> = None;
    for (score, _) in &scored {
        match (previous, groups.last_mut()) {
            (Some(p), Some(size)) if p == *score => *size += 1,
            _ => groups.push(1),
        }
        previous = Some(*score);
    }

    let mut ranked = Vec::with_capacity(scored.len());
    let mut items = scored.into_iter().map(|(_, item)| item);
    let mut current_rank = 1u32;
    for size in groups {
        let tie_count = size as u32;
        for item in items.by_ref().take(size) {
            ranked.push(RankedItem {
                item,
                rank: current_rank,
                tie_count,
            });
        }
        current_rank += tie_count;
    }
    ranked
}

/// Check a rank/tie pair against a target condition.
pub fn matches_rank_condition(rank: u32, tie_count: u32, target_rank: u32, target_tie: u32) -> bool {
    rank == target_rank && tie_count == target_tie
}

/// Build a key → `(rank, tie_count)` lookup from ranked items.
///
/// # Examples
///
/// ```rust
/// use golfjunk::ranking::{rank_lookup, rank_with_ties, RankDirection};
///
/// let ranked = rank_with_ties(vec![("x", 10.0), ("y", 12.0)], |i| i.1, RankDirection::Higher);
/// let lookup = rank_lookup(&ranked, |i| i.0);
/// assert_eq!(lookup.get("y"), Some(&(1, 1)));
/// ```
pub fn rank_lookup<T, K, F>(ranked: &[RankedItem<T>], key_fn: F) -> BTreeMap<K, (u32, u32)>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    ranked
        .iter()
        .map(|r| (key_fn(&r.item), (r.rank, r.tie_count)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        let ranked = rank_with_ties(Vec::<f64>::new(), |v| *v, RankDirection::Lower);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_single_item() {
        let ranked = rank_with_ties(vec![72.0], |v| *v, RankDirection::Lower);
        assert_eq!(ranked.len(), 1);
        assert_eq!((ranked[0].rank, ranked[0].tie_count), (1, 1));
    }

    #[test]
    fn test_two_way_tie_for_first_skips_second() {
        let ranked = rank_with_ties(vec![3.0, 3.0, 5.0], |v| *v, RankDirection::Lower);
        let ranks: Vec<_> = ranked.iter().map(|r| (r.rank, r.tie_count)).collect();
        assert_eq!(ranks, vec![(1, 2), (1, 2), (3, 1)]);
    }

    #[test]
    fn test_higher_direction() {
        let ranked = rank_with_ties(vec![1.0, 9.0, 5.0], |v| *v, RankDirection::Higher);
        let scores: Vec<_> = ranked.iter().map(|r| r.item).collect();
        assert_eq!(scores, vec![9.0, 5.0, 1.0]);
    }

    #[test]
    fn test_stable_for_ties() {
        let ranked = rank_with_ties(vec![("b", 1.0), ("a", 1.0)], |i| i.1, RankDirection::Lower);
        assert_eq!(ranked[0].item.0, "b");
        assert_eq!(ranked[1].item.0, "a");
    }

    #[test]
    fn test_matches_rank_condition() {
        assert!(matches_rank_condition(1, 2, 1, 2));
        assert!(!matches_rank_condition(1, 1, 1, 2));
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!(RankDirection::parse(" Higher "), Some(RankDirection::Higher));
        assert_eq!(RankDirection::parse("best"), None);
        assert_eq!(RankDirection::Lower.reversed(), RankDirection::Higher);
    }

    proptest! {
        #[test]
        fn prop_rank_blocks_are_contiguous(scores in prop::collection::vec(-5i32..10, 0..20)) {
            let ranked = rank_with_ties(scores, |s| *s as f64, RankDirection::Lower);
            for pair in ranked.windows(2) {
                if pair[0].item == pair[1].item {
                    prop_assert_eq!(pair[1].rank, pair[0].rank);
                    prop_assert_eq!(pair[1].tie_count, pair[0].tie_count);
                } else {
                    prop_assert_eq!(pair[1].rank, pair[0].rank + pair[0].tie_count);
                }
            }
            if let Some(first) = ranked.first() {
                prop_assert_eq!(first.rank, 1);
            }
        }

        #[test]
        fn prop_tie_count_matches_group_size(scores in prop::collection::vec(0i32..4, 1..15)) {
            let ranked = rank_with_ties(scores.clone(), |s| *s as f64, RankDirection::Higher);
            for r in &ranked {
                let group = scores.iter().filter(|s| **s == r.item).count() as u32;
                prop_assert_eq!(r.tie_count, group);
            }
        }
    }
}
