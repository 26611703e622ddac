//! Property-based tests for the filtering and ranking invariants.
//!
//! These verify what must hold for any dataset and any score assignment:
//! - negatives and known-true objects partition the entity universe
//! - ranks stay within [1, num_entities] and detect rank-1 exactly
//! - aggregate metrics stay within their ranges and Hits@k is monotone in k

use std::collections::HashSet;

use proptest::prelude::*;

use kyanite_kge::{filtered_rank, negatives_for, PairIndex, RankMetrics, Triple, DEFAULT_KS};

const UNIVERSE: u32 = 20;

fn arb_triples() -> impl Strategy<Value = Vec<Triple>> {
    prop::collection::vec(
        (0..UNIVERSE, 0..4u32, 0..UNIVERSE).prop_map(|(s, r, o)| Triple::new(s, r, o)),
        1..60,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn negatives_and_objects_partition_the_universe(triples in arb_triples()) {
        let index = PairIndex::build(&triples);

        for &(s, r) in index.pairs() {
            let objects: HashSet<u32> = index.objects_for(s, r).iter().copied().collect();
            let negatives = negatives_for(&index, s, r, UNIVERSE as usize);
            let negative_set: HashSet<u32> = negatives.iter().copied().collect();

            prop_assert!(objects.is_disjoint(&negative_set));
            prop_assert_eq!(objects.len() + negative_set.len(), UNIVERSE as usize);

            // Deterministic ascending order.
            let mut sorted = negatives.clone();
            sorted.sort_unstable();
            prop_assert_eq!(&negatives, &sorted);
        }
    }

    #[test]
    fn rank_is_bounded_and_detects_first_place(
        scores in prop::collection::vec(0.0f32..1.0, 3..40),
        true_object in 0usize..3,
        extra_filtered in prop::collection::vec(0usize..40, 0..5),
    ) {
        let n = scores.len();
        let true_object = (true_object % n) as u32;

        let mut filtered: Vec<u32> = extra_filtered
            .into_iter()
            .map(|f| (f % n) as u32)
            .chain(std::iter::once(true_object))
            .collect();
        filtered.sort_unstable();
        filtered.dedup();

        let rank = filtered_rank(&scores, &filtered, true_object);
        prop_assert!(rank >= 1 && rank <= n);

        let filtered_set: HashSet<u32> = filtered.iter().copied().collect();
        let any_negative_at_or_above = scores.iter().enumerate().any(|(e, &score)| {
            !filtered_set.contains(&(e as u32)) && score >= scores[true_object as usize]
        });
        prop_assert_eq!(rank == 1, !any_negative_at_or_above);
    }

    #[test]
    fn metrics_stay_in_range(ranks in prop::collection::vec(1usize..200, 1..80)) {
        let metrics = RankMetrics::from_ranks(&ranks, &DEFAULT_KS);

        prop_assert!(metrics.mrr > 0.0 && metrics.mrr <= 1.0);
        for (&k, &hits) in &metrics.hits_at_k {
            prop_assert!((0.0..=1.0).contains(&hits), "hits@{} = {}", k, hits);
        }
        prop_assert!(metrics.hits_at_k[&1] <= metrics.hits_at_k[&3]);
        prop_assert!(metrics.hits_at_k[&3] <= metrics.hits_at_k[&10]);
        prop_assert_eq!(metrics.num_triples, ranks.len());
    }

    #[test]
    fn reciprocal_rank_of_all_firsts_is_one(count in 1usize..50) {
        let ranks = vec![1usize; count];
        let metrics = RankMetrics::from_ranks(&ranks, &DEFAULT_KS);
        prop_assert!((metrics.mrr - 1.0).abs() < 1e-12);
        prop_assert!((metrics.hits_at_k[&1] - 1.0).abs() < 1e-12);
    }
}
