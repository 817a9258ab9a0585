use chrono::{TimeZone, Utc};
use seda::{
    Catalogue, Channel, Episode, EpisodeId, Node, Partition, Programme, ProgrammeId, Timestamp,
};
use url::Url;

pub fn at(day: u32, hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2023, 3, day, hour, 0, 0).unwrap()
}

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub fn partition(time: &str, mirrors: &[&str], stamp: Timestamp) -> Partition {
    Partition::new(time, mirrors.iter().map(|m| url(m)).collect(), stamp)
}

pub fn episode(id: &str, stamp: Timestamp, partitions: Vec<Partition>) -> Episode {
    Episode::new(EpisodeId::new("01", id), stamp)
        .with_name(format!("Episode {}", id))
        .with_partitions(partitions)
}

pub fn programme(id: &str, stamp: Timestamp, episodes: Vec<Episode>) -> Programme {
    Programme::new(ProgrammeId::new("01", id), stamp)
        .with_name(id.to_uppercase())
        .with_episodes(episodes)
}

pub fn channel(name: &str, stamp: Timestamp, programmes: Vec<Programme>) -> Channel {
    Channel::new("01", stamp)
        .with_name(name)
        .with_programmes(programmes)
}

pub fn catalogue(stamp: Timestamp, channels: Vec<Channel>) -> Catalogue {
    Catalogue::new(stamp).with_channels(channels)
}

/// Episode ids found anywhere under `channel`, sorted.
pub fn episode_ids(channel: &Channel) -> Vec<String> {
    let mut ids: Vec<String> = channel
        .programmes
        .iter()
        .flatten()
        .flat_map(|p| p.episodes.iter().flatten())
        .map(|e| e.id().episode_id.clone())
        .collect();
    ids.sort();
    ids
}
