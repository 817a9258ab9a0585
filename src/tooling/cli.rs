//! CLI Tooling
//!
//! Command-line interface for catalogue operations. Every command reads
//! catalogue snapshots from disk (or HTTP for `merge`), does its work and
//! returns the text to print.

use crate::config::{ConfigLoader, SedaConfig};
use crate::download::{download_all, BatchReport, DownloadOutcome, HttpFetcher};
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::store;
use crate::tree::{
    content_hash, equal, Assets, Catalogue, CataloguesEqualityConfig, Merger, Node,
};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

/// Seda CLI - Broadcast archive catalogue reconciliation
#[derive(Parser)]
#[command(name = "seda")]
#[command(about = "Reconcile broadcast archive catalogues and download their media")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Shorthand for --log-level debug
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line logging flags over the configured settings.
    pub fn logging_config(&self, base: &LoggingConfig) -> LoggingConfig {
        let mut logging = base.clone();
        if self.verbose {
            logging.level = "debug".to_string();
        }
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
        }
        logging
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge catalogue snapshots into one
    Merge {
        /// Snapshot files or http(s) URLs, merged left to right
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<String>,
        /// Write the merged catalogue here instead of printing it
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Directory download records are resolved against
        #[arg(long)]
        download_root: Option<PathBuf>,
    },
    /// Download every partition of a catalogue and record the files
    Download {
        /// Catalogue file; updated in place with download records
        catalogue: PathBuf,
        /// Destination directory
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Only download this channel
        #[arg(long)]
        channel: Option<String>,
        /// Maximum concurrent downloads
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Mirror host tried first
        #[arg(long)]
        preferred_mirror: Option<Url>,
        /// Re-download files that already exist
        #[arg(long)]
        force: bool,
    },
    /// Delete downloaded files and drop their records
    ClearDownloads {
        /// Catalogue file; updated in place
        catalogue: PathBuf,
        /// Directory the records are relative to
        #[arg(long)]
        base: Option<PathBuf>,
    },
    /// Compare two catalogue snapshots structurally
    Compare {
        left: PathBuf,
        right: PathBuf,
        /// Ignore download records when comparing partitions
        #[arg(long)]
        ignore_downloads: bool,
    },
    /// Print the order-independent content hash of a catalogue
    Hash { catalogue: PathBuf },
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Merge { .. } => "merge",
        Commands::Download { .. } => "download",
        Commands::ClearDownloads { .. } => "clear-downloads",
        Commands::Compare { .. } => "compare",
        Commands::Hash { .. } => "hash",
    }
}

/// CLI context holding the resolved configuration
pub struct CliContext {
    config: SedaConfig,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load(config_path.as_deref())?;
        Ok(Self { config })
    }

    pub fn with_config(config: SedaConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SedaConfig {
        &self.config
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        let result = self.execute_inner(command).await;
        match &result {
            Ok(_) => info!(
                command = name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Command finished"
            ),
            Err(e) => warn!(command = name, "Command failed: {}", e),
        }
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Merge {
                inputs,
                output,
                download_root,
            } => {
                let mut snapshots = Vec::with_capacity(inputs.len());
                for input in inputs {
                    snapshots.push(self.read_snapshot(input).await?);
                }

                let root = download_root
                    .clone()
                    .or_else(|| self.config.download.relative_to.clone())
                    .or_else(|| self.config.download.destination.clone())
                    .unwrap_or_else(|| PathBuf::from("."));
                let merged = Merger::new(root).merge_all(&snapshots)?;

                match output {
                    Some(path) => {
                        store::save(&merged, path)?;
                        Ok(format!(
                            "Merged {} snapshot(s) into {} (hash {:016x})",
                            snapshots.len(),
                            path.display(),
                            content_hash(&merged)
                        ))
                    }
                    None => Ok(store::to_json(&merged)?),
                }
            }
            Commands::Download {
                catalogue: path,
                dest,
                channel,
                max_concurrency,
                preferred_mirror,
                force,
            } => {
                let destination = self.destination(dest.as_deref())?;
                let mut options = self.config.download.options(destination);
                if let Some(limit) = max_concurrency {
                    options = options.with_max_concurrency(*limit);
                }
                if let Some(mirror) = preferred_mirror {
                    options = options.with_preferred_mirror(mirror.clone());
                }
                if *force {
                    options = options.with_skip_if_exists(false);
                }

                let mut catalogue = store::load(path)?;
                let fetcher = HttpFetcher::new(&self.config.http).map_err(|e| {
                    ApiError::ConfigError(format!("Failed to build HTTP client: {}", e))
                })?;
                let cancel = cancel_on_ctrl_c();

                let report = match channel {
                    Some(id) => {
                        let target = catalogue
                            .channels
                            .iter_mut()
                            .flatten()
                            .find(|c| c.id() == id)
                            .ok_or_else(|| {
                                ApiError::ConfigError(format!("Unknown channel: {}", id))
                            })?;
                        download_all(&fetcher, target, &options, &cancel).await
                    }
                    None => download_all(&fetcher, &mut catalogue, &options, &cancel).await,
                };

                // Records from partitions that did succeed are kept even when
                // the batch as a whole is reported as failed.
                store::save(&catalogue, path)?;
                Ok(format_download_report(&report?))
            }
            Commands::ClearDownloads {
                catalogue: path,
                base,
            } => {
                let base = match base {
                    Some(base) => base.clone(),
                    None => {
                        let options = self.config.download.options(self.destination(None)?);
                        options.base().to_path_buf()
                    }
                };
                let mut catalogue = store::load(path)?;
                let cleared = catalogue
                    .clear_downloads(&base)
                    .map_err(|e| ApiError::StorageError(e.into()))?;
                store::save(&catalogue, path)?;
                Ok(format!("Cleared {} download record(s)", cleared))
            }
            Commands::Compare {
                left,
                right,
                ignore_downloads,
            } => {
                let left = store::load(left)?;
                let right = store::load(right)?;
                let mut config = CataloguesEqualityConfig::default();
                if *ignore_downloads {
                    config.children.children.children.children.check_download = false;
                }

                let verdict = if equal(Some(&left), Some(&right), &config) {
                    "equal"
                } else {
                    "different"
                };
                Ok(format!(
                    "{} (left {:016x}, right {:016x})",
                    verdict,
                    content_hash(&left),
                    content_hash(&right)
                ))
            }
            Commands::Hash { catalogue } => {
                let catalogue = store::load(catalogue)?;
                Ok(format!("{:016x}", content_hash(&catalogue)))
            }
        }
    }

    async fn read_snapshot(&self, input: &str) -> Result<Catalogue, ApiError> {
        match Url::parse(input) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                let fetcher = HttpFetcher::new(&self.config.http).map_err(|e| {
                    ApiError::ConfigError(format!("Failed to build HTTP client: {}", e))
                })?;
                let policy = self.config.download.retry_policy();
                Ok(store::fetch_remote(fetcher.client(), &url, &policy).await?)
            }
            _ => Ok(store::load(Path::new(input))?),
        }
    }

    fn destination(&self, explicit: Option<&Path>) -> Result<PathBuf, ApiError> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.config.download.destination.clone())
            .ok_or_else(|| {
                ApiError::ConfigError(
                    "No download destination: pass --dest or set download.destination".to_string(),
                )
            })
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling downloads");
            trigger.cancel();
        }
    });
    cancel
}

/// Format a batch report as a table followed by a one-line summary
fn format_download_report(report: &BatchReport) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Episode", "Time", "Status", "Detail"]);
    for asset in &report.assets {
        let episode = asset
            .episode
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        let (status, detail) = match &asset.result {
            Ok(outcome @ DownloadOutcome::Fetched(_)) => {
                ("fetched", outcome.record().path.display().to_string())
            }
            Ok(outcome @ DownloadOutcome::Skipped(_)) => {
                ("skipped", outcome.record().path.display().to_string())
            }
            Err(e) => ("failed", e.to_string()),
        };
        table.add_row(vec![episode, asset.time.clone(), status.to_string(), detail]);
    }

    format!(
        "{}\n{} fetched, {} skipped, {} failed of {}",
        table,
        report.fetched(),
        report.skipped(),
        report.failed(),
        report.total()
    )
}
