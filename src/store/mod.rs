//! Catalogue Store
//!
//! Catalogue snapshots persist as pretty-printed JSON. Parent links are not
//! serialized, so every load path re-attaches them before handing the tree
//! out.

use crate::download::retry::{retry, RetryPolicy};
use crate::error::StorageError;
use crate::tree::{Catalogue, Node};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Catalogue store interface
pub trait CatalogueStore {
    fn load(&self) -> Result<Catalogue, StorageError>;
    fn save(&self, catalogue: &Catalogue) -> Result<(), StorageError>;
}

/// One catalogue snapshot in one JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogueStore for JsonFileStore {
    fn load(&self) -> Result<Catalogue, StorageError> {
        load(&self.path)
    }

    fn save(&self, catalogue: &Catalogue) -> Result<(), StorageError> {
        save(catalogue, &self.path)
    }
}

/// Parse a catalogue and re-link its descendants.
pub fn from_json(json: &str) -> Result<Catalogue, StorageError> {
    let mut catalogue: Catalogue = serde_json::from_str(json)?;
    catalogue.attach_parents();
    Ok(catalogue)
}

pub fn to_json(catalogue: &Catalogue) -> Result<String, StorageError> {
    Ok(serde_json::to_string_pretty(catalogue)?)
}

pub fn load(path: &Path) -> Result<Catalogue, StorageError> {
    debug!(path = %path.display(), "Loading catalogue");
    let json = std::fs::read_to_string(path)?;
    from_json(&json)
}

/// Write through a sibling temp file so readers never see half a snapshot.
pub fn save(catalogue: &Catalogue, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = to_json(catalogue)?;

    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    std::fs::write(&staging, json)?;
    if let Err(err) = std::fs::rename(&staging, path) {
        let _ = std::fs::remove_file(&staging);
        return Err(err.into());
    }

    debug!(path = %path.display(), "Saved catalogue");
    Ok(())
}

/// Download a published catalogue snapshot.
pub async fn fetch_remote(
    client: &reqwest::Client,
    url: &Url,
    policy: &RetryPolicy,
) -> Result<Catalogue, StorageError> {
    info!(%url, "Fetching remote catalogue");
    let mut catalogue: Catalogue = retry("fetch catalogue", policy, || async move {
        client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?
            .json::<Catalogue>()
            .await
    })
    .await?;
    catalogue.attach_parents();
    Ok(catalogue)
}
