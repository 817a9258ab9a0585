//! Catalogue harvesting
//!
//! A [`Collector`] answers one question per level ("which programmes does
//! this channel have?") and knows nothing about the tree. The [`Harvester`]
//! walks it top-down to the requested depth and assembles a [`Catalogue`]
//! snapshot ready to be merged with earlier ones.

use crate::download::retry::{retry, RetryPolicy};
use crate::error::CollectError;
use crate::tree::{Branch, Catalogue, Channel, Episode, Node, Partition, Programme};
use crate::types::{ChannelId, EpisodeId, PartitionTime, ProgrammeId, Timestamp};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};
use url::Url;

/// One entity listed by a collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry<Id> {
    pub id: Id,
    #[serde(default)]
    pub name: Option<String>,
    /// Broadcast date; only meaningful for episodes
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// When the collector saw this entry
    pub observed_at: Timestamp,
}

impl<Id> CatalogueEntry<Id> {
    pub fn new(id: Id, observed_at: Timestamp) -> Self {
        Self {
            id,
            name: None,
            date: None,
            observed_at,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// One media segment listed by a collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionEntry {
    pub time: PartitionTime,
    pub mirrors: Vec<Url>,
    pub observed_at: Timestamp,
}

/// Source of catalogue entries, one level at a time
#[async_trait]
pub trait Collector: Send + Sync {
    async fn channels(&self) -> Result<Vec<CatalogueEntry<ChannelId>>, CollectError>;

    async fn programmes(
        &self,
        channel: &ChannelId,
    ) -> Result<Vec<CatalogueEntry<ProgrammeId>>, CollectError>;

    async fn episodes(
        &self,
        programme: &ProgrammeId,
    ) -> Result<Vec<CatalogueEntry<EpisodeId>>, CollectError>;

    async fn partitions(&self, episode: &EpisodeId) -> Result<Vec<PartitionEntry>, CollectError>;
}

/// Deepest level a harvest loads; levels below it stay unloaded
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HarvestDepth {
    Channels,
    Programmes,
    Episodes,
    #[default]
    Partitions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestOptions {
    pub depth: HarvestDepth,
    /// Applied to every collector call
    pub retry: RetryPolicy,
    /// Leave a level unloaded when its listing fails instead of aborting
    pub skip_failures: bool,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            depth: HarvestDepth::default(),
            retry: RetryPolicy::default(),
            skip_failures: true,
        }
    }
}

/// Walks a [`Collector`] into a [`Catalogue`]
pub struct Harvester<C> {
    collector: C,
    options: HarvestOptions,
}

impl<C: Collector> Harvester<C> {
    pub fn new(collector: C, options: HarvestOptions) -> Self {
        Self { collector, options }
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    /// Collect a fresh snapshot.
    ///
    /// A failing channel listing is always fatal. Failures below it either
    /// abort or leave that level unloaded, per `skip_failures`.
    pub async fn harvest(&self) -> Result<Catalogue, CollectError> {
        let started = Utc::now();
        info!(depth = ?self.options.depth, "Harvesting catalogue");

        let entries = retry("channels", &self.options.retry, || self.collector.channels()).await?;
        let mut channels = Vec::with_capacity(entries.len());
        for entry in entries {
            channels.push(self.channel(entry).await?);
        }
        Catalogue::order_children(&mut channels);

        let mut catalogue = Catalogue::new(started).with_channels(channels);
        catalogue.refresh_last_modified();
        info!(
            channels = catalogue.channels.as_ref().map(Vec::len).unwrap_or(0),
            "Harvest finished"
        );
        Ok(catalogue)
    }

    async fn channel(&self, entry: CatalogueEntry<ChannelId>) -> Result<Channel, CollectError> {
        let mut channel = Channel::new(entry.id.clone(), entry.observed_at);
        channel.name = entry.name;
        if self.options.depth < HarvestDepth::Programmes {
            return Ok(channel);
        }

        let listed = self
            .level(Programme::LEVEL, &entry.id, || self.collector.programmes(&entry.id))
            .await?;
        if let Some(listed) = listed {
            let mut programmes = Vec::with_capacity(listed.len());
            for entry in listed {
                programmes.push(self.programme(entry).await?);
            }
            Channel::order_children(&mut programmes);
            channel = channel.with_programmes(programmes);
        }
        Ok(channel)
    }

    async fn programme(
        &self,
        entry: CatalogueEntry<ProgrammeId>,
    ) -> Result<Programme, CollectError> {
        let mut programme = Programme::new(entry.id.clone(), entry.observed_at);
        programme.name = entry.name;
        if self.options.depth < HarvestDepth::Episodes {
            return Ok(programme);
        }

        let listed = self
            .level(Episode::LEVEL, &entry.id, || self.collector.episodes(&entry.id))
            .await?;
        if let Some(listed) = listed {
            let mut episodes = Vec::with_capacity(listed.len());
            for entry in listed {
                episodes.push(self.episode(entry).await?);
            }
            Programme::order_children(&mut episodes);
            programme = programme.with_episodes(episodes);
        }
        Ok(programme)
    }

    async fn episode(&self, entry: CatalogueEntry<EpisodeId>) -> Result<Episode, CollectError> {
        let mut episode = Episode::new(entry.id.clone(), entry.observed_at);
        episode.name = entry.name;
        episode.date = entry.date;
        if self.options.depth < HarvestDepth::Partitions {
            return Ok(episode);
        }

        let listed = self
            .level(Partition::LEVEL, &entry.id, || self.collector.partitions(&entry.id))
            .await?;
        if let Some(listed) = listed {
            let mut partitions: Vec<Partition> = listed
                .into_iter()
                .map(|p| Partition::new(p.time, p.mirrors, p.observed_at))
                .collect();
            Episode::order_children(&mut partitions);
            episode = episode.with_partitions(partitions);
        }
        Ok(episode)
    }

    /// List one level below `parent`, honouring retries and `skip_failures`.
    async fn level<T, F, Fut>(
        &self,
        level: &'static str,
        parent: &(impl fmt::Display + ?Sized),
        list: F,
    ) -> Result<Option<Vec<T>>, CollectError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, CollectError>>,
    {
        match retry(level, &self.options.retry, list).await {
            Ok(items) => {
                debug!(level, parent = %parent, count = items.len(), "Listed");
                Ok(Some(items))
            }
            Err(err) if self.options.skip_failures => {
                warn!(level, parent = %parent, "Leaving level unloaded: {}", err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
