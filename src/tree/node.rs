//! Catalogue node types

use super::{
    attach_children, branch_last_modified, collect_branch_partitions,
    collect_branch_partitions_mut, refresh_branch, Assets, Branch, Node,
};
use crate::types::{ChannelId, EpisodeId, PartitionTime, ProgrammeId, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use url::Url;

/// Proof that a partition's file was fetched, and where it now lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Mirror the file was fetched from
    pub url: Url,
    /// Location of the file, relative to the base chosen at download time
    pub path: PathBuf,
    pub downloaded_at: Timestamp,
}

impl DownloadRecord {
    pub fn new(url: Url, path: impl Into<PathBuf>, downloaded_at: Timestamp) -> Self {
        Self {
            url,
            path: path.into(),
            downloaded_at,
        }
    }

    /// Resolve the recorded path against `base`.
    pub fn local_path(&self, base: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            base.join(&self.path)
        }
    }

    /// A record only counts while its file is still on disk.
    pub fn exists_under(&self, base: &Path) -> bool {
        !self.path.as_os_str().is_empty() && self.local_path(base).is_file()
    }
}

impl PartialEq for DownloadRecord {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.path == other.path
    }
}

impl Eq for DownloadRecord {}

impl std::hash::Hash for DownloadRecord {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.as_str().hash(state);
        self.path.hash(state);
    }
}

/// Root of a catalogue snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalogue {
    #[serde(default)]
    pub channels: Option<Vec<Channel>>,
    #[serde(rename = "last_modified")]
    pub modified_at: Timestamp,
}

impl Catalogue {
    pub fn new(modified_at: Timestamp) -> Self {
        Self {
            channels: None,
            modified_at,
        }
    }

    pub fn with_channels(mut self, channels: Vec<Channel>) -> Self {
        self.channels = Some(channels);
        self.attach_parents();
        self
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().flatten().find(|c| c.id == id)
    }
}

impl Node for Catalogue {
    type Id = ();
    type ParentId = ();
    const LEVEL: &'static str = "catalogue";

    fn id(&self) -> &() {
        &()
    }

    fn parent(&self) -> Option<&()> {
        None
    }

    fn set_parent(&mut self, _parent: Option<()>) {}

    fn stamp(&self) -> Timestamp {
        self.modified_at
    }

    fn set_stamp(&mut self, stamp: Timestamp) {
        self.modified_at = stamp;
    }

    fn last_modified(&self) -> Timestamp {
        branch_last_modified(self)
    }

    fn refresh_last_modified(&mut self) -> Timestamp {
        refresh_branch(self)
    }

    fn attach_parents(&mut self) {
        attach_children(self);
    }
}

impl Branch for Catalogue {
    type Child = Channel;

    fn children(&self) -> Option<&[Channel]> {
        self.channels.as_deref()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Channel>> {
        self.channels.as_mut()
    }

    /// Channels sort by name, then id.
    fn order_children(children: &mut [Channel]) {
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    }

    fn rebuild(&self, children: Option<Vec<Channel>>, stamp: Timestamp) -> Self {
        Self {
            channels: children,
            modified_at: stamp,
        }
    }
}

/// A broadcast station
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    id: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub programmes: Option<Vec<Programme>>,
    #[serde(rename = "last_modified")]
    pub modified_at: Timestamp,
    #[serde(skip)]
    parent: Option<()>,
}

impl Channel {
    pub fn new(id: impl Into<ChannelId>, modified_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            name: None,
            programmes: None,
            modified_at,
            parent: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_programmes(mut self, programmes: Vec<Programme>) -> Self {
        self.programmes = Some(programmes);
        self.attach_parents();
        self
    }
}

impl Node for Channel {
    type Id = ChannelId;
    type ParentId = ();
    const LEVEL: &'static str = "channel";

    fn id(&self) -> &ChannelId {
        &self.id
    }

    fn parent(&self) -> Option<&()> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: Option<()>) {
        self.parent = parent;
    }

    fn stamp(&self) -> Timestamp {
        self.modified_at
    }

    fn set_stamp(&mut self, stamp: Timestamp) {
        self.modified_at = stamp;
    }

    fn last_modified(&self) -> Timestamp {
        branch_last_modified(self)
    }

    fn refresh_last_modified(&mut self) -> Timestamp {
        refresh_branch(self)
    }

    fn attach_parents(&mut self) {
        attach_children(self);
    }
}

impl Branch for Channel {
    type Child = Programme;

    fn children(&self) -> Option<&[Programme]> {
        self.programmes.as_deref()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Programme>> {
        self.programmes.as_mut()
    }

    /// Programmes sort by name, then id.
    fn order_children(children: &mut [Programme]) {
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    }

    fn rebuild(&self, children: Option<Vec<Programme>>, stamp: Timestamp) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            programmes: children,
            modified_at: stamp,
            parent: self.parent,
        }
    }
}

/// A show broadcast on a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Programme {
    id: ProgrammeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub episodes: Option<Vec<Episode>>,
    #[serde(rename = "last_modified")]
    pub modified_at: Timestamp,
    #[serde(skip)]
    parent: Option<ChannelId>,
}

impl Programme {
    pub fn new(id: ProgrammeId, modified_at: Timestamp) -> Self {
        Self {
            id,
            name: None,
            episodes: None,
            modified_at,
            parent: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_episodes(mut self, episodes: Vec<Episode>) -> Self {
        self.episodes = Some(episodes);
        self.attach_parents();
        self
    }
}

impl Node for Programme {
    type Id = ProgrammeId;
    type ParentId = ChannelId;
    const LEVEL: &'static str = "programme";

    fn id(&self) -> &ProgrammeId {
        &self.id
    }

    fn parent(&self) -> Option<&ChannelId> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: Option<ChannelId>) {
        self.parent = parent;
    }

    fn stamp(&self) -> Timestamp {
        self.modified_at
    }

    fn set_stamp(&mut self, stamp: Timestamp) {
        self.modified_at = stamp;
    }

    fn last_modified(&self) -> Timestamp {
        branch_last_modified(self)
    }

    fn refresh_last_modified(&mut self) -> Timestamp {
        refresh_branch(self)
    }

    fn attach_parents(&mut self) {
        attach_children(self);
    }
}

impl Branch for Programme {
    type Child = Episode;

    fn children(&self) -> Option<&[Episode]> {
        self.episodes.as_deref()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Episode>> {
        self.episodes.as_mut()
    }

    /// Episodes sort newest broadcast date first, undated last, then by id.
    fn order_children(children: &mut [Episode]) {
        children.sort_by(|a, b| {
            let by_date = match (a.date, b.date) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_date.then_with(|| a.id.cmp(&b.id))
        });
    }

    fn rebuild(&self, children: Option<Vec<Episode>>, stamp: Timestamp) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            episodes: children,
            modified_at: stamp,
            parent: self.parent.clone(),
        }
    }
}

/// One airing of a programme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    id: EpisodeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub partitions: Option<Vec<Partition>>,
    #[serde(rename = "last_modified")]
    pub modified_at: Timestamp,
    #[serde(skip)]
    parent: Option<ProgrammeId>,
}

impl Episode {
    pub fn new(id: EpisodeId, modified_at: Timestamp) -> Self {
        Self {
            id,
            name: None,
            date: None,
            partitions: None,
            modified_at,
            parent: None,
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

    pub fn with_partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.partitions = Some(partitions);
        self.attach_parents();
        self
    }
}

impl Node for Episode {
    type Id = EpisodeId;
    type ParentId = ProgrammeId;
    const LEVEL: &'static str = "episode";

    fn id(&self) -> &EpisodeId {
        &self.id
    }

    fn parent(&self) -> Option<&ProgrammeId> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: Option<ProgrammeId>) {
        self.parent = parent;
    }

    fn stamp(&self) -> Timestamp {
        self.modified_at
    }

    fn set_stamp(&mut self, stamp: Timestamp) {
        self.modified_at = stamp;
    }

    fn last_modified(&self) -> Timestamp {
        branch_last_modified(self)
    }

    fn refresh_last_modified(&mut self) -> Timestamp {
        refresh_branch(self)
    }

    fn attach_parents(&mut self) {
        attach_children(self);
    }
}

impl Branch for Episode {
    type Child = Partition;

    fn children(&self) -> Option<&[Partition]> {
        self.partitions.as_deref()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Partition>> {
        self.partitions.as_mut()
    }

    /// Partitions sort by broadcast time.
    fn order_children(children: &mut [Partition]) {
        children.sort_by(|a, b| a.time.cmp(&b.time));
    }

    fn rebuild(&self, children: Option<Vec<Partition>>, stamp: Timestamp) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            date: self.date,
            partitions: children,
            modified_at: stamp,
            parent: self.parent.clone(),
        }
    }
}

/// A downloadable media segment of an episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    time: PartitionTime,
    /// Alternate locations serving the same file
    #[serde(default)]
    pub mirrors: Vec<Url>,
    #[serde(default)]
    pub download: Option<DownloadRecord>,
    #[serde(rename = "last_modified")]
    pub modified_at: Timestamp,
    #[serde(skip)]
    parent: Option<EpisodeId>,
}

impl Partition {
    pub fn new(time: impl Into<PartitionTime>, mirrors: Vec<Url>, modified_at: Timestamp) -> Self {
        Self {
            time: time.into(),
            mirrors,
            download: None,
            modified_at,
            parent: None,
        }
    }

    pub fn with_download(mut self, download: DownloadRecord) -> Self {
        self.download = Some(download);
        self
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    /// Whether the recorded file is still present under `base`.
    pub fn is_downloaded(&self, base: &Path) -> bool {
        self.download
            .as_ref()
            .map(|d| d.exists_under(base))
            .unwrap_or(false)
    }

    /// Delete the downloaded file, if any, and forget the record.
    ///
    /// Returns whether a record was cleared.
    pub fn clear_download(&mut self, base: &Path) -> std::io::Result<bool> {
        let Some(record) = self.download.take() else {
            return Ok(false);
        };
        match std::fs::remove_file(record.local_path(base)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                self.download = Some(record);
                return Err(e);
            }
        }
        tracing::debug!(time = %self.time, path = ?record.path, "Cleared download");
        Ok(true)
    }

    pub(crate) fn rebuild(
        &self,
        mirrors: Vec<Url>,
        download: Option<DownloadRecord>,
        stamp: Timestamp,
    ) -> Self {
        Self {
            time: self.time.clone(),
            mirrors,
            download,
            modified_at: stamp,
            parent: self.parent.clone(),
        }
    }
}

impl Node for Partition {
    type Id = PartitionTime;
    type ParentId = EpisodeId;
    const LEVEL: &'static str = "partition";

    fn id(&self) -> &PartitionTime {
        &self.time
    }

    fn parent(&self) -> Option<&EpisodeId> {
        self.parent.as_ref()
    }

    fn set_parent(&mut self, parent: Option<EpisodeId>) {
        self.parent = parent;
    }

    fn stamp(&self) -> Timestamp {
        self.modified_at
    }

    fn set_stamp(&mut self, stamp: Timestamp) {
        self.modified_at = stamp;
    }

    /// A fetch counts as a modification of the partition.
    fn last_modified(&self) -> Timestamp {
        match &self.download {
            Some(d) => self.modified_at.max(d.downloaded_at),
            None => self.modified_at,
        }
    }

    fn refresh_last_modified(&mut self) -> Timestamp {
        self.modified_at = self.last_modified();
        self.modified_at
    }
}

impl Assets for Catalogue {
    fn collect_partitions<'a>(&'a self, out: &mut Vec<&'a Partition>) {
        collect_branch_partitions(self, out);
    }

    fn collect_partitions_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Partition>) {
        collect_branch_partitions_mut(self, out);
    }
}

impl Assets for Channel {
    fn collect_partitions<'a>(&'a self, out: &mut Vec<&'a Partition>) {
        collect_branch_partitions(self, out);
    }

    fn collect_partitions_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Partition>) {
        collect_branch_partitions_mut(self, out);
    }
}

impl Assets for Programme {
    fn collect_partitions<'a>(&'a self, out: &mut Vec<&'a Partition>) {
        collect_branch_partitions(self, out);
    }

    fn collect_partitions_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Partition>) {
        collect_branch_partitions_mut(self, out);
    }
}

impl Assets for Episode {
    fn collect_partitions<'a>(&'a self, out: &mut Vec<&'a Partition>) {
        collect_branch_partitions(self, out);
    }

    fn collect_partitions_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Partition>) {
        collect_branch_partitions_mut(self, out);
    }
}

impl Assets for Partition {
    fn collect_partitions<'a>(&'a self, out: &mut Vec<&'a Partition>) {
        out.push(self);
    }

    fn collect_partitions_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Partition>) {
        out.push(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2023, 3, 1, hour, 0, 0).unwrap()
    }

    fn mirror(n: u32) -> Url {
        Url::parse(&format!("https://example.org/{}", n)).unwrap()
    }

    fn episode_with(stamps: &[(&str, u32)], own: u32) -> Episode {
        let partitions = stamps
            .iter()
            .map(|(time, hour)| Partition::new(*time, vec![mirror(1)], at(*hour)))
            .collect();
        Episode::new(EpisodeId::new("01", "e1"), at(own)).with_partitions(partitions)
    }

    #[test]
    fn test_last_modified_propagates_from_children() {
        let episode = episode_with(&[("08:00", 3), ("09:00", 7)], 5);
        assert_eq!(episode.stamp(), at(5));
        assert_eq!(episode.last_modified(), at(7));

        let programme = Programme::new(ProgrammeId::new("01", "p1"), at(1))
            .with_episodes(vec![episode]);
        assert_eq!(programme.last_modified(), at(7));
    }

    #[test]
    fn test_last_modified_keeps_own_stamp_when_newer() {
        let episode = episode_with(&[("08:00", 3)], 9);
        assert_eq!(episode.last_modified(), at(9));
    }

    #[test]
    fn test_partition_download_counts_as_modification() {
        let partition = Partition::new("08:00", vec![mirror(1)], at(2))
            .with_download(DownloadRecord::new(mirror(1), "a.mp3", at(6)));
        assert_eq!(partition.last_modified(), at(6));
    }

    #[test]
    fn test_refresh_ratchets_and_never_lowers() {
        let mut programme = Programme::new(ProgrammeId::new("01", "p1"), at(1))
            .with_episodes(vec![episode_with(&[("08:00", 4)], 2)]);
        assert_eq!(programme.refresh_last_modified(), at(4));
        assert_eq!(programme.stamp(), at(4));

        // Dropping the newest child must not move the ratchet back.
        programme.episodes = Some(Vec::new());
        assert_eq!(programme.refresh_last_modified(), at(4));
    }

    #[test]
    fn test_attach_parents_links_every_level() {
        let mut catalogue = Catalogue::new(at(0)).with_channels(vec![Channel::new("01", at(0))
            .with_programmes(vec![Programme::new(ProgrammeId::new("01", "p1"), at(0))
                .with_episodes(vec![episode_with(&[("08:00", 0)], 0)])])]);

        // Simulate a freshly deserialized tree.
        let json = serde_json::to_string(&catalogue).unwrap();
        catalogue = serde_json::from_str(&json).unwrap();
        assert!(catalogue.partitions()[0].parent().is_none());

        catalogue.attach_parents();
        let channel = &catalogue.channels.as_ref().unwrap()[0];
        assert_eq!(channel.parent(), Some(&()));
        let programme = &channel.programmes.as_ref().unwrap()[0];
        assert_eq!(programme.parent(), Some(&"01".to_string()));
        let episode = &programme.episodes.as_ref().unwrap()[0];
        assert_eq!(episode.parent(), Some(&ProgrammeId::new("01", "p1")));
        assert_eq!(
            episode.partitions.as_ref().unwrap()[0].parent(),
            Some(&EpisodeId::new("01", "e1"))
        );
    }

    #[test]
    fn test_absent_and_empty_children_survive_serialization() {
        let loaded = Programme::new(ProgrammeId::new("01", "p1"), at(0)).with_episodes(vec![]);
        let unloaded = Programme::new(ProgrammeId::new("01", "p2"), at(0));

        let loaded: Programme =
            serde_json::from_str(&serde_json::to_string(&loaded).unwrap()).unwrap();
        let unloaded: Programme =
            serde_json::from_str(&serde_json::to_string(&unloaded).unwrap()).unwrap();

        assert_eq!(loaded.episodes.as_deref().map(<[Episode]>::len), Some(0));
        assert!(unloaded.episodes.is_none());
    }

    #[test]
    fn test_stale_download_record_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mut partition = Partition::new("08:00", vec![mirror(1)], at(0))
            .with_download(DownloadRecord::new(mirror(1), "gone.mp3", at(1)));
        assert!(!partition.is_downloaded(dir.path()));

        std::fs::write(dir.path().join("gone.mp3"), b"data").unwrap();
        assert!(partition.is_downloaded(dir.path()));

        assert!(partition.clear_download(dir.path()).unwrap());
        assert!(partition.download.is_none());
        assert!(!dir.path().join("gone.mp3").exists());
    }

    #[test]
    fn test_clear_downloads_walks_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"a").unwrap();
        let mut episode = Episode::new(EpisodeId::new("01", "e1"), at(0)).with_partitions(vec![
            Partition::new("08:00", vec![mirror(1)], at(0))
                .with_download(DownloadRecord::new(mirror(1), "a.mp3", at(1))),
            Partition::new("09:00", vec![mirror(2)], at(0))
                .with_download(DownloadRecord::new(mirror(2), "missing.mp3", at(1))),
            Partition::new("10:00", vec![mirror(3)], at(0)),
        ]);

        assert_eq!(episode.clear_downloads(dir.path()).unwrap(), 2);
        assert!(episode.partitions().iter().all(|p| p.download.is_none()));
        assert!(!dir.path().join("a.mp3").exists());
    }

    #[test]
    fn test_order_children() {
        let mut episodes = vec![
            Episode::new(EpisodeId::new("01", "b"), at(0)),
            Episode::new(EpisodeId::new("01", "a"), at(0))
                .with_date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
            Episode::new(EpisodeId::new("01", "c"), at(0))
                .with_date(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()),
        ];
        Programme::order_children(&mut episodes);
        let ids: Vec<_> = episodes.iter().map(|e| e.id().episode_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }
}
