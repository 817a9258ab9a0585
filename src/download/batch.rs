//! Bounded concurrent downloads
//!
//! Every partition runs as its own unit of work on the current task, gated by
//! a semaphore of `max_concurrency` permits. A failure is recorded against
//! its partition and never stops siblings. Cancelling the token stops new
//! fetches from starting and aborts the ones in flight.

use super::{DownloadOptions, DownloadOutcome, MirrorFetcher};
use crate::error::DownloadError;
use crate::tree::{Assets, Node, Partition};
use crate::types::EpisodeId;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What a batch does when nothing succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Report per-asset results and return `Ok` regardless
    #[default]
    Collect,
    /// Return [`DownloadError::BatchFailed`] when every asset failed
    FailIfAllFailed,
}

/// Result for one partition of a batch
#[derive(Debug)]
pub struct AssetReport {
    pub time: String,
    pub episode: Option<EpisodeId>,
    pub result: Result<DownloadOutcome, DownloadError>,
}

/// Per-asset results of a batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub assets: Vec<AssetReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.assets.len()
    }

    pub fn fetched(&self) -> usize {
        self.count(|r| matches!(r, Ok(DownloadOutcome::Fetched(_))))
    }

    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, Ok(DownloadOutcome::Skipped(_))))
    }

    pub fn failed(&self) -> usize {
        self.count(Result::is_err)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&AssetReport, &DownloadError)> {
        self.assets
            .iter()
            .filter_map(|asset| asset.result.as_ref().err().map(|err| (asset, err)))
    }

    fn count(&self, predicate: impl Fn(&Result<DownloadOutcome, DownloadError>) -> bool) -> usize {
        self.assets.iter().filter(|a| predicate(&a.result)).count()
    }
}

/// Download every given partition, attaching records as they succeed.
pub async fn download_many(
    fetcher: &dyn MirrorFetcher,
    partitions: Vec<&mut Partition>,
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> Result<BatchReport, DownloadError> {
    let semaphore = Semaphore::new(options.max_concurrency.max(1));
    let total = partitions.len();
    info!(
        total,
        max_concurrency = options.max_concurrency,
        destination = %options.destination.display(),
        "Starting batch download"
    );

    let units = partitions.into_iter().map(|partition| {
        let semaphore = &semaphore;
        async move {
            let result = download_bounded(fetcher, &mut *partition, options, semaphore, cancel).await;
            AssetReport {
                time: partition.time().to_string(),
                episode: partition.parent().cloned(),
                result,
            }
        }
    });
    let report = BatchReport {
        assets: join_all(units).await,
    };

    info!(
        fetched = report.fetched(),
        skipped = report.skipped(),
        failed = report.failed(),
        "Batch download finished"
    );

    if cancel.is_cancelled() {
        warn!("Batch download cancelled");
    }

    if options.failure_policy == BatchFailurePolicy::FailIfAllFailed
        && total > 0
        && report.failed() == total
    {
        return Err(DownloadError::BatchFailed {
            failed: total,
            total,
        });
    }

    Ok(report)
}

async fn download_bounded(
    fetcher: &dyn MirrorFetcher,
    partition: &mut Partition,
    options: &DownloadOptions,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> Result<DownloadOutcome, DownloadError> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
        permit = semaphore.acquire() => permit.map_err(|_| DownloadError::Cancelled)?,
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
        result = partition.download(fetcher, options, None) => result,
    }
}

/// Download every partition below `node`.
pub async fn download_all<A: Assets + ?Sized>(
    fetcher: &dyn MirrorFetcher,
    node: &mut A,
    options: &DownloadOptions,
    cancel: &CancellationToken,
) -> Result<BatchReport, DownloadError> {
    download_many(fetcher, node.partitions_mut(), options, cancel).await
}
