use crate::integration::support::*;
use proptest::prelude::*;
use seda::tree::{order_independent_hash, unordered_hash};
use seda::{content_hash, merge, Episode, EpisodeId, Partition};
use std::iter::once;

fn partitions(times: &[u8]) -> Vec<Partition> {
    times
        .iter()
        .map(|t| {
            let time = format!("{:02}:00", t % 24);
            let mirror = format!("https://cdn.example.org/{}.mp3", t);
            partition(&time, &[mirror.as_str()], at(1, 8))
        })
        .collect()
}

proptest! {
    #[test]
    fn hash_ignores_order(
        (original, shuffled) in prop::collection::vec(any::<u32>(), 0..32)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        prop_assert_eq!(unordered_hash(&original), unordered_hash(&shuffled));
    }

    #[test]
    fn hash_sees_absent_sentinel(items in prop::collection::vec(any::<u64>(), 0..32)) {
        let plain = order_independent_hash(items.iter().map(Some));
        let with_none = order_independent_hash(items.iter().map(Some).chain(once(None)));
        prop_assert_ne!(plain, with_none);
    }

    #[test]
    fn hash_sees_duplicates(items in prop::collection::vec(any::<u64>(), 1..32)) {
        let mut doubled = items.clone();
        doubled.push(items[0]);
        prop_assert_ne!(unordered_hash(&items), unordered_hash(&doubled));
    }

    #[test]
    fn node_hash_ignores_child_order(
        (times, shuffled) in prop::collection::hash_set(0u8..24, 0..12)
            .prop_flat_map(|s| {
                let v: Vec<u8> = s.into_iter().collect();
                (Just(v.clone()), Just(v).prop_shuffle())
            })
    ) {
        let a = Episode::new(EpisodeId::new("01", "e"), at(1, 8)).with_partitions(partitions(&times));
        let b = Episode::new(EpisodeId::new("01", "e"), at(1, 8)).with_partitions(partitions(&shuffled));
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn merge_of_self_is_identity(times in prop::collection::hash_set(0u8..24, 0..12)) {
        let times: Vec<u8> = times.into_iter().collect();
        let a = Episode::new(EpisodeId::new("01", "e"), at(1, 8)).with_partitions(partitions(&times));
        let merged = merge(&a, &a).unwrap();
        prop_assert_eq!(&merged, &a);
        prop_assert_eq!(content_hash(&merged), content_hash(&a));
    }

    #[test]
    fn merge_of_disjoint_children_is_their_union(
        split in prop::collection::hash_set(0u8..24, 0..16),
        cut in 0usize..16,
    ) {
        let all: Vec<u8> = split.into_iter().collect();
        let cut = cut.min(all.len());
        let (left, right) = all.split_at(cut);
        let a = Episode::new(EpisodeId::new("01", "e"), at(1, 8)).with_partitions(partitions(left));
        let b = Episode::new(EpisodeId::new("01", "e"), at(2, 8)).with_partitions(partitions(right));

        let merged = merge(&a, &b).unwrap();
        let mut got: Vec<&str> = merged.partitions.iter().flatten().map(Partition::time).collect();
        got.sort();
        let mut want: Vec<String> = all.iter().map(|t| format!("{:02}:00", t)).collect();
        want.sort();
        prop_assert_eq!(got, want.iter().map(String::as_str).collect::<Vec<_>>());
    }
}
