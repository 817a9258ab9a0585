//! Seda: Broadcast Archive Catalogue Reconciliation
//!
//! Keeps a `Catalogue → Channel → Programme → Episode → Partition` tree of a
//! remote broadcast archive, reconciles snapshots of it taken at different
//! times with a recency-biased merge, and materializes its media files from
//! alternate mirrors.

pub mod collector;
pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod presence;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;

pub use collector::{Collector, HarvestDepth, HarvestOptions, Harvester};
pub use config::{ConfigLoader, SedaConfig};
pub use download::{download_all, download_many, DownloadOptions, DownloadOutcome, HttpFetcher};
pub use error::{ApiError, CollectError, DownloadError, FetchError, MergeError, StorageError};
pub use tree::{
    content_hash, equal, merge, merge_all, Assets, Branch, Catalogue, Channel, DownloadRecord,
    Episode, Merger, Node, Partition, Programme, StructuralEq,
};
pub use types::{ChannelId, EpisodeId, PartitionTime, ProgrammeId, Timestamp};
