//! Core types for the catalogue reconciliation engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp: point in time a node was last observed or changed
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// ChannelId: archive-assigned station identifier (e.g. `"01"`)
pub type ChannelId = String;

/// PartitionTime: broadcast start time of a segment, unique within its episode
pub type PartitionTime = String;

/// ProgrammeId: programme identifier scoped to its channel
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgrammeId {
    pub channel_id: ChannelId,
    pub id: String,
}

impl ProgrammeId {
    pub fn new(channel_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ProgrammeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.id)
    }
}

/// EpisodeId: episode identifier scoped to its channel
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeId {
    pub channel_id: ChannelId,
    pub episode_id: String,
}

impl EpisodeId {
    pub fn new(channel_id: impl Into<String>, episode_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            episode_id: episode_id.into(),
        }
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.episode_id)
    }
}
