use crate::integration::support::*;
use seda::store::{self, CatalogueStore, JsonFileStore};
use seda::tree::CataloguesEqualityConfig;
use seda::{content_hash, equal, Assets, DownloadRecord, Node};

fn with_everything() -> seda::Catalogue {
    let mut snapshot = catalogue(
        at(4, 8),
        vec![channel(
            "Radio One",
            at(4, 8),
            vec![
                programme(
                    "news",
                    at(4, 8),
                    vec![episode(
                        "e1",
                        at(4, 8),
                        vec![partition(
                            "08:00",
                            &["https://m1.example.org/a.mp3", "https://m2.example.org/a.mp3"],
                            at(4, 9),
                        )],
                    )],
                ),
                programme("talk", at(4, 8), vec![]),
            ],
        )],
    );
    snapshot.partitions_mut()[0].download = Some(DownloadRecord::new(
        url("https://m2.example.org/a.mp3"),
        "media/a.mp3",
        at(4, 10),
    ));
    snapshot
}

#[test]
fn file_round_trip_is_lossless() {
    let dir = tempfile::tempdir().unwrap();
    let file = JsonFileStore::new(dir.path().join("catalogue.json"));
    let original = with_everything();

    file.save(&original).unwrap();
    let loaded = file.load().unwrap();

    let mut with_parents = CataloguesEqualityConfig::default();
    with_parents.check_parent = true;
    with_parents.children.check_parent = true;
    with_parents.children.children.check_parent = true;
    with_parents.children.children.children.check_parent = true;
    with_parents.children.children.children.children.check_parent = true;
    assert!(equal(Some(&loaded), Some(&original), &with_parents));
    assert_eq!(content_hash(&loaded), content_hash(&original));
    assert_eq!(loaded.partitions()[0].download, original.partitions()[0].download);
    // The download time counts as a modification.
    assert_eq!(loaded.last_modified(), at(4, 10));
}

#[test]
fn json_keeps_unloaded_levels_distinct_from_empty_ones() {
    let json = store::to_json(&with_everything()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let programmes = &value["channels"][0]["programmes"];
    let talk = programmes
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["name"] == "TALK")
        .unwrap();
    assert_eq!(talk["episodes"], serde_json::json!([]));

    let loaded = store::from_json(&json).unwrap();
    let radio = loaded.channel("01").unwrap();
    assert_eq!(episode_ids(radio), vec!["e1"]);
}
