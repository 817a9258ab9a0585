//! Mirror downloader
//!
//! A partition lists one or more mirrors serving the same file. Downloading
//! tries them strictly in sequence, preferred origin first, and stops at the
//! first that delivers a complete body. The resulting [`DownloadRecord`]
//! stores the mirror used and the file path relative to a caller-chosen base.

pub mod batch;
pub mod fetcher;
pub mod filename;
pub mod mirrors;
mod output;
pub mod retry;

pub use batch::{download_all, download_many, AssetReport, BatchFailurePolicy, BatchReport};
pub use fetcher::{AssetBody, FetchedAsset, HttpFetcher, MemoryBody, MirrorFetcher};
pub use retry::{MirrorFailure, RetryPolicy};

use crate::error::{DownloadError, FetchError};
use crate::tree::{DownloadRecord, Partition};
use output::WriteError;
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

/// Default bound on simultaneous downloads in a batch
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Settings shared by every download in a call
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Directory the files are written into; must already exist
    pub destination: PathBuf,
    /// Base for recorded paths; the destination when unset
    pub relative_to: Option<PathBuf>,
    /// Mirrors at or below this URL are tried first
    pub preferred_mirror: Option<Url>,
    /// Keep a record whose file still exists instead of fetching again
    pub skip_if_exists: bool,
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
    pub failure_policy: BatchFailurePolicy,
}

impl DownloadOptions {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            relative_to: None,
            preferred_mirror: None,
            skip_if_exists: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
            failure_policy: BatchFailurePolicy::default(),
        }
    }

    pub fn with_relative_to(mut self, base: impl Into<PathBuf>) -> Self {
        self.relative_to = Some(base.into());
        self
    }

    pub fn with_preferred_mirror(mut self, mirror: Url) -> Self {
        self.preferred_mirror = Some(mirror);
        self
    }

    pub fn with_skip_if_exists(mut self, skip: bool) -> Self {
        self.skip_if_exists = skip;
        self
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_failure_policy(mut self, policy: BatchFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Base that recorded paths are relative to.
    pub fn base(&self) -> &Path {
        self.relative_to.as_deref().unwrap_or(&self.destination)
    }
}

/// How a single download was satisfied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The existing record still pointed at a file; nothing was fetched
    Skipped(DownloadRecord),
    /// A mirror delivered the file
    Fetched(DownloadRecord),
}

impl DownloadOutcome {
    pub fn record(&self) -> &DownloadRecord {
        match self {
            DownloadOutcome::Skipped(record) | DownloadOutcome::Fetched(record) => record,
        }
    }

    pub fn into_record(self) -> DownloadRecord {
        match self {
            DownloadOutcome::Skipped(record) | DownloadOutcome::Fetched(record) => record,
        }
    }

    pub fn was_fetched(&self) -> bool {
        matches!(self, DownloadOutcome::Fetched(_))
    }
}

/// Download one partition without modifying it.
///
/// `filename` overrides the name derived from the response; it is rejected
/// up front when the filesystem cannot store it. With `skip_if_exists` off,
/// an existing file is replaced only after a mirror delivered the new body.
pub async fn download_one(
    fetcher: &dyn MirrorFetcher,
    partition: &Partition,
    options: &DownloadOptions,
    filename: Option<&str>,
) -> Result<DownloadOutcome, DownloadError> {
    let requested = filename.filter(|name| !name.trim().is_empty());
    if let Some(name) = requested {
        filename::validate_override(name)?;
    }
    ensure_directory(&options.destination).await?;

    let base = options.base();
    let mut replacing = None;
    if let Some(record) = &partition.download {
        if record.exists_under(base) {
            if options.skip_if_exists {
                debug!(time = partition.time(), path = ?record.path, "Already downloaded");
                return Ok(DownloadOutcome::Skipped(record.clone()));
            }
            replacing = Some(record.local_path(base));
        }
    }

    if partition.mirrors.is_empty() {
        return Err(DownloadError::NoMirrors(partition.time().to_string()));
    }

    let attempts = options.retry.attempts();
    let mut failures = Vec::new();

    for mirror in mirrors::order_mirrors(&partition.mirrors, options.preferred_mirror.as_ref()) {
        for attempt in 1..=attempts {
            let fetched = fetch_into(
                fetcher,
                mirror,
                requested,
                &options.destination,
                replacing.as_deref(),
            )
            .await;
            match fetched {
                Ok(path) => {
                    let relative = output::relative_path(base, &path)?;
                    info!(
                        time = partition.time(),
                        mirror = %mirror,
                        path = %relative.display(),
                        "Downloaded partition"
                    );
                    return Ok(DownloadOutcome::Fetched(DownloadRecord::new(
                        mirror.clone(),
                        relative,
                        Utc::now(),
                    )));
                }
                Err(AttemptError::Local(error)) => {
                    warn!(
                        time = partition.time(),
                        mirror = %mirror,
                        "Download aborted: {}",
                        error
                    );
                    return Err(error);
                }
                Err(AttemptError::Mirror(error)) => {
                    warn!(
                        time = partition.time(),
                        mirror = %mirror,
                        attempt,
                        "Mirror failed: {}",
                        error
                    );
                    failures.push(MirrorFailure {
                        mirror: mirror.clone(),
                        attempt,
                        error,
                    });
                    if attempt < attempts {
                        sleep(options.retry.delay_after(attempt)).await;
                    }
                }
            }
        }
    }

    Err(DownloadError::AllMirrorsExhausted {
        time: partition.time().to_string(),
        failures,
    })
}

/// Why one attempt against one mirror failed
enum AttemptError {
    /// The mirror misbehaved; the next attempt or mirror may do better
    Mirror(FetchError),
    /// Fatal to this download whichever mirror serves it
    Local(DownloadError),
}

impl From<WriteError> for AttemptError {
    fn from(error: WriteError) -> Self {
        match error {
            WriteError::Body(error) => AttemptError::Mirror(error),
            WriteError::Disk(error) => AttemptError::Local(DownloadError::Io(error)),
        }
    }
}

async fn fetch_into(
    fetcher: &dyn MirrorFetcher,
    mirror: &Url,
    requested: Option<&str>,
    destination: &Path,
    replacing: Option<&Path>,
) -> Result<PathBuf, AttemptError> {
    let mut asset = fetcher.fetch(mirror).await.map_err(AttemptError::Mirror)?;
    let name = filename::choose(requested, asset.suggested_filename.as_deref(), mirror)
        .map_err(AttemptError::Local)?;
    Ok(output::write_body(destination, &name, asset.body.as_mut(), replacing).await?)
}

async fn ensure_directory(path: &Path) -> Result<(), DownloadError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(DownloadError::InvalidDestination(format!(
            "{} is not a directory",
            path.display()
        ))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(DownloadError::InvalidDestination(
            format!("{} does not exist", path.display()),
        )),
        Err(e) => Err(e.into()),
    }
}

impl Partition {
    /// Download this partition and attach the resulting record.
    pub async fn download(
        &mut self,
        fetcher: &dyn MirrorFetcher,
        options: &DownloadOptions,
        filename: Option<&str>,
    ) -> Result<DownloadOutcome, DownloadError> {
        let outcome = download_one(fetcher, self, options, filename).await?;
        if let DownloadOutcome::Fetched(record) = &outcome {
            self.download = Some(record.clone());
        }
        Ok(outcome)
    }
}
