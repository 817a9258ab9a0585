use crate::integration::support::*;
use async_trait::async_trait;
use seda::collector::{CatalogueEntry, PartitionEntry};
use seda::download::RetryPolicy;
use seda::{
    merge, Assets, ChannelId, CollectError, Collector, EpisodeId, HarvestDepth, HarvestOptions,
    Harvester, Node, ProgrammeId, Timestamp,
};
use std::time::Duration;

/// An archive that lists one programme with a rolling window of episodes.
struct RollingArchive {
    episodes: Vec<&'static str>,
    seen: Timestamp,
}

#[async_trait]
impl Collector for RollingArchive {
    async fn channels(&self) -> Result<Vec<CatalogueEntry<ChannelId>>, CollectError> {
        Ok(vec![CatalogueEntry::new("01".to_string(), self.seen).with_name("Radio One")])
    }

    async fn programmes(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<CatalogueEntry<ProgrammeId>>, CollectError> {
        Ok(vec![CatalogueEntry::new(ProgrammeId::new(channel.as_str(), "news"), self.seen)])
    }

    async fn episodes(
        &self,
        _programme: &ProgrammeId,
    ) -> Result<Vec<CatalogueEntry<EpisodeId>>, CollectError> {
        Ok(self
            .episodes
            .iter()
            .map(|id| CatalogueEntry::new(EpisodeId::new("01", *id), self.seen))
            .collect())
    }

    async fn partitions(&self, episode: &EpisodeId) -> Result<Vec<PartitionEntry>, CollectError> {
        Ok(vec![PartitionEntry {
            time: "08:00".to_string(),
            mirrors: vec![url(&format!(
                "https://cdn.example.org/{}.mp3",
                episode.episode_id
            ))],
            observed_at: self.seen,
        }])
    }
}

fn options() -> HarvestOptions {
    HarvestOptions {
        depth: HarvestDepth::Partitions,
        retry: RetryPolicy::new(1, Duration::ZERO),
        skip_failures: false,
    }
}

#[tokio::test]
async fn successive_harvests_merge_into_the_full_history() {
    let monday = Harvester::new(
        RollingArchive {
            episodes: vec!["e1", "e2"],
            seen: at(6, 8),
        },
        options(),
    )
    .harvest()
    .await
    .unwrap();
    let tuesday = Harvester::new(
        RollingArchive {
            episodes: vec!["e2", "e3"],
            seen: at(7, 8),
        },
        options(),
    )
    .harvest()
    .await
    .unwrap();

    let merged = merge(&monday, &tuesday).unwrap();
    let radio = merged.channel("01").unwrap();
    assert_eq!(episode_ids(radio), vec!["e1", "e2", "e3"]);
    assert_eq!(merged.partitions().len(), 3);
    assert!(merged.last_modified() >= at(7, 8));
}

#[tokio::test]
async fn shallow_harvest_leaves_lower_levels_unloaded() {
    let shallow = Harvester::new(
        RollingArchive {
            episodes: vec!["e1"],
            seen: at(6, 8),
        },
        HarvestOptions {
            depth: HarvestDepth::Episodes,
            ..options()
        },
    )
    .harvest()
    .await
    .unwrap();
    let deep = Harvester::new(
        RollingArchive {
            episodes: vec!["e1"],
            seen: at(6, 9),
        },
        options(),
    )
    .harvest()
    .await
    .unwrap();

    assert!(shallow.partitions().is_empty());
    // Merging with a deeper snapshot fills the unloaded level in.
    let merged = merge(&shallow, &deep).unwrap();
    assert_eq!(merged.partitions().len(), 1);
}
