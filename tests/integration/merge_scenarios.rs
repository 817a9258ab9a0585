use crate::integration::support::*;
use seda::tree::{CataloguesEqualityConfig, EpisodesEqualityConfig};
use seda::{equal, merge, merge_all, Assets, MergeError, Merger, Node};

#[test]
fn disjoint_episodes_union_under_newer_timestamp() {
    let older = channel(
        "Radio One",
        at(1, 8),
        vec![programme(
            "news",
            at(1, 8),
            vec![episode("e1", at(1, 8), vec![]), episode("e2", at(1, 8), vec![])],
        )],
    );
    let newer = channel(
        "Radio One",
        at(2, 8),
        vec![programme(
            "news",
            at(2, 8),
            vec![episode("e3", at(2, 8), vec![]), episode("e4", at(2, 8), vec![])],
        )],
    );

    let merged = merge(&older, &newer).unwrap();
    assert_eq!(episode_ids(&merged), vec!["e1", "e2", "e3", "e4"]);
    assert_eq!(merged.last_modified(), newer.last_modified());
    assert_eq!(merged.id(), "01");
}

#[test]
fn shared_partition_unions_mirrors_without_duplicates() {
    let m1 = "https://m1.example.org/a.mp3";
    let m2 = "https://m2.example.org/a.mp3";
    let m3 = "https://m3.example.org/a.mp3";
    let left = partition("08:00", &[m1, m2], at(1, 8));
    let right = partition("08:00", &[m2, m3], at(2, 8));

    let merged = merge(&left, &right).unwrap();
    let mut mirrors: Vec<&str> = merged.mirrors.iter().map(|m| m.as_str()).collect();
    mirrors.sort();
    assert_eq!(mirrors, vec![m1, m2, m3]);
}

#[test]
fn newer_snapshot_supplies_scalar_fields() {
    let older = channel("Old Name", at(1, 8), vec![]);
    let newer = channel("New Name", at(3, 8), vec![]);
    assert_eq!(merge(&older, &newer).unwrap().name.as_deref(), Some("New Name"));
    assert_eq!(merge(&newer, &older).unwrap().name.as_deref(), Some("New Name"));
}

#[test]
fn mismatched_identities_fail_loudly() {
    let radio = seda::Channel::new("01", at(1, 8));
    let tv = seda::Channel::new("02", at(1, 8));
    let err = merge(&radio, &tv).unwrap_err();
    assert!(matches!(err, MergeError::IdentityMismatch { level: "channel", .. }));

    let none: Vec<seda::Channel> = Vec::new();
    assert!(matches!(
        merge_all(&none),
        Err(MergeError::EmptyMergeSet { level: "channel" })
    ));
}

#[test]
fn merging_three_snapshots_keeps_everything_seen() {
    let day1 = catalogue(
        at(1, 8),
        vec![channel(
            "Radio One",
            at(1, 8),
            vec![programme(
                "news",
                at(1, 8),
                vec![episode("e1", at(1, 8), vec![partition("08:00", &["https://a.example.org/1"], at(1, 8))])],
            )],
        )],
    );
    let day2 = catalogue(
        at(2, 8),
        vec![channel(
            "Radio One",
            at(2, 8),
            vec![programme(
                "news",
                at(2, 8),
                vec![episode("e1", at(2, 8), vec![partition("09:00", &["https://a.example.org/2"], at(2, 8))])],
            )],
        )],
    );
    let day3 = catalogue(
        at(3, 8),
        vec![channel(
            "Radio 1",
            at(3, 8),
            vec![programme("talk", at(3, 8), vec![episode("e2", at(3, 8), vec![])])],
        )],
    );

    let merged = Merger::new(".").merge_all([&day1, &day2, &day3]).unwrap();
    let radio = merged.channel("01").unwrap();
    assert_eq!(radio.name.as_deref(), Some("Radio 1"));
    assert_eq!(episode_ids(radio), vec!["e1", "e2"]);
    assert_eq!(merged.partitions().len(), 2);
    assert_eq!(merged.last_modified(), at(3, 8));

    // Every node of the result points back at its owner.
    assert!(merged.partitions().iter().all(|p| p.parent().is_some()));
}

#[test]
fn merge_is_idempotent_and_pure() {
    let snapshot = catalogue(
        at(1, 8),
        vec![channel(
            "Radio One",
            at(1, 8),
            vec![programme(
                "news",
                at(1, 8),
                vec![episode("e1", at(1, 8), vec![partition("08:00", &["https://a.example.org/1"], at(1, 8))])],
            )],
        )],
    );
    let before = snapshot.clone();

    let merged = merge(&snapshot, &snapshot).unwrap();
    assert!(equal(Some(&merged), Some(&snapshot), &CataloguesEqualityConfig::default()));
    assert_eq!(snapshot, before);
}

#[test]
fn parent_check_distinguishes_otherwise_equal_nodes() {
    let under_news = programme("news", at(1, 8), vec![episode("e1", at(1, 8), vec![])]);
    let under_talk = programme("talk", at(1, 8), vec![episode("e1", at(1, 8), vec![])]);
    let a = &under_news.episodes.as_ref().unwrap()[0];
    let b = &under_talk.episodes.as_ref().unwrap()[0];

    let strict = EpisodesEqualityConfig {
        check_parent: true,
        ..Default::default()
    };
    assert!(!equal(Some(a), Some(b), &strict));
    assert!(equal(Some(a), Some(b), &EpisodesEqualityConfig::default()));
}
