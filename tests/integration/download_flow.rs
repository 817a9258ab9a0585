use crate::integration::support::*;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use seda::download::{FetchedAsset, MemoryBody, MirrorFetcher, RetryPolicy};
use seda::{
    download_all, store, Assets, DownloadError, DownloadOptions, DownloadRecord, FetchError,
    Merger,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Serves fixed bodies for known URLs and 503 for the rest.
#[derive(Default)]
struct StaticMirrors {
    bodies: HashMap<String, &'static [u8]>,
    requested: Mutex<Vec<String>>,
}

impl StaticMirrors {
    fn serve(mut self, url: &str, body: &'static [u8]) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl MirrorFetcher for StaticMirrors {
    async fn fetch(&self, url: &Url) -> Result<FetchedAsset, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.bodies.get(url.as_str()) {
            Some(body) => Ok(FetchedAsset {
                suggested_filename: None,
                body: Box::new(MemoryBody::new([Bytes::from_static(*body)])),
            }),
            None => Err(FetchError::Status(503)),
        }
    }
}

const PRIMARY_A: &str = "https://primary.example.org/media/a.mp3";
const BACKUP_A: &str = "https://backup.example.org/media/a.mp3";
const BACKUP_B: &str = "https://backup.example.org/media/b.mp3";
const DEAD_C: &str = "https://dead.example.org/media/c.mp3";

fn snapshot() -> seda::Catalogue {
    catalogue(
        at(5, 8),
        vec![channel(
            "Radio One",
            at(5, 8),
            vec![programme(
                "news",
                at(5, 8),
                vec![episode(
                    "e1",
                    at(5, 8),
                    vec![
                        partition("08:00", &[PRIMARY_A, BACKUP_A], at(5, 8)),
                        partition("09:00", &[BACKUP_B], at(5, 8)),
                        partition("10:00", &[DEAD_C], at(5, 8)),
                    ],
                )],
            )],
        )],
    )
}

fn mirrors() -> StaticMirrors {
    StaticMirrors::default()
        .serve(BACKUP_A, b"audio a")
        .serve(BACKUP_B, b"audio b")
}

#[tokio::test]
async fn catalogue_download_records_successes_and_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("media");
    std::fs::create_dir(&media).unwrap();
    let options = DownloadOptions::new(&media)
        .with_relative_to(dir.path())
        .with_retry(RetryPolicy::once());
    let fetcher = mirrors();
    let mut catalogue = snapshot();

    let report = download_all(&fetcher, &mut catalogue, &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!((report.fetched(), report.skipped(), report.failed()), (2, 0, 1));
    let (failed, err) = report.failures().next().unwrap();
    assert_eq!(failed.time, "10:00");
    assert!(matches!(err, DownloadError::AllMirrorsExhausted { .. }));

    let partitions = catalogue.partitions();
    let first = partitions[0].download.as_ref().unwrap();
    assert_eq!(first.url.as_str(), BACKUP_A);
    assert_eq!(first.path, std::path::Path::new("media").join("a.mp3"));
    assert_eq!(std::fs::read(dir.path().join(&first.path)).unwrap(), b"audio a");
    assert!(partitions[2].download.is_none());
}

#[tokio::test]
async fn preferred_mirror_is_tried_first() {
    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path())
        .with_retry(RetryPolicy::once())
        .with_preferred_mirror(Url::parse("https://backup.example.org/").unwrap());
    let fetcher = mirrors();
    let mut first = snapshot().partitions()[0].clone();

    download_all(&fetcher, &mut first, &options, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fetcher.requested(), vec![BACKUP_A.to_string()]);
}

#[tokio::test]
async fn reloaded_catalogue_skips_present_files_and_refetches_missing_ones() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("catalogue.json");
    let options = DownloadOptions::new(dir.path()).with_retry(RetryPolicy::once());
    let cancel = CancellationToken::new();

    let mut catalogue = snapshot();
    download_all(&mirrors(), &mut catalogue, &options, &cancel).await.unwrap();
    store::save(&catalogue, &file).unwrap();

    let mut reloaded = store::load(&file).unwrap();
    let removed = reloaded.partitions()[1].download.as_ref().unwrap().local_path(dir.path());
    std::fs::remove_file(removed).unwrap();

    let fetcher = mirrors();
    let report = download_all(&fetcher, &mut reloaded, &options, &cancel).await.unwrap();
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.fetched(), 1);
    assert!(!fetcher.requested().contains(&BACKUP_A.to_string()));
    assert!(fetcher.requested().contains(&BACKUP_B.to_string()));
}

#[tokio::test]
async fn merge_keeps_the_record_whose_file_exists() {
    let dir = tempfile::tempdir().unwrap();
    let options = DownloadOptions::new(dir.path()).with_retry(RetryPolicy::once());

    let mut downloaded = snapshot();
    download_all(&mirrors(), &mut downloaded, &options, &CancellationToken::new())
        .await
        .unwrap();

    // A later scrape carries a record from some other machine.
    let later = Utc::now() + chrono::Duration::hours(1);
    let mut rescraped = snapshot();
    for partition in rescraped.partitions_mut() {
        partition.modified_at = later;
    }
    rescraped.partitions_mut()[0].download =
        Some(DownloadRecord::new(url(PRIMARY_A), "gone.mp3", later));

    let merged = Merger::new(dir.path()).merge(&downloaded, &rescraped).unwrap();
    let paths: Vec<Option<String>> = merged
        .partitions()
        .into_iter()
        .map(|p| p.download.as_ref().map(|d| d.path.display().to_string()))
        .collect();
    assert_eq!(
        paths,
        vec![Some("a.mp3".to_string()), Some("b.mp3".to_string()), None]
    );

    // Resolved elsewhere neither file exists, so the newer record wins.
    let elsewhere = Merger::new(dir.path().join("nowhere"))
        .merge(&downloaded, &rescraped)
        .unwrap();
    let first = elsewhere.partitions()[0].download.clone().unwrap();
    assert_eq!(first.path, std::path::PathBuf::from("gone.mp3"));
}
