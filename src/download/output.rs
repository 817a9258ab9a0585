//! Writing fetched bodies to the destination directory
//!
//! Bodies stream into a hidden `.part` file in the destination. The
//! temporary file is deleted when its guard drops, which covers failures and
//! cancelled futures alike. Publication hard-links the temporary file under
//! its final name, so an unrelated existing file is never overwritten. A
//! previous download being replaced is only touched once the new body is
//! complete on disk.

use super::fetcher::AssetBody;
use super::filename::split_extension;
use crate::error::FetchError;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Upper bound on `name-N.ext` candidates tried for one file
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Why a body could not be written
#[derive(Debug)]
pub(crate) enum WriteError {
    /// The mirror stopped delivering mid-body
    Body(FetchError),
    /// The local filesystem refused the file
    Disk(io::Error),
}

impl From<FetchError> for WriteError {
    fn from(error: FetchError) -> Self {
        WriteError::Body(error)
    }
}

impl From<io::Error> for WriteError {
    fn from(error: io::Error) -> Self {
        WriteError::Disk(error)
    }
}

/// Removes the temporary file on drop.
struct PartFile {
    path: PathBuf,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "Failed to remove temporary file: {}", e),
        }
    }
}

/// Stream `body` into `destination/filename`, or the first free
/// `stem-N.ext` variant. Returns the published path.
///
/// `replacing` names a previous download of the same asset. It is
/// overwritten in place when the new name matches, otherwise deleted after
/// the new file is published.
pub(crate) async fn write_body(
    destination: &Path,
    filename: &str,
    body: &mut dyn AssetBody,
    replacing: Option<&Path>,
) -> Result<PathBuf, WriteError> {
    let part = PartFile {
        path: destination.join(format!(".{}.part", Uuid::new_v4().simple())),
    };

    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&part.path)
        .await?;

    while let Some(chunk) = body.next_chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Some(previous) = replacing {
        if absolute(previous)? == absolute(&destination.join(filename))? {
            tokio::fs::rename(&part.path, previous).await?;
            debug!(path = %previous.display(), "Replaced previous download");
            return Ok(previous.to_path_buf());
        }
    }

    let published = publish(&part.path, destination, filename).await?;
    if let Some(previous) = replacing {
        remove_previous(previous).await;
    }
    Ok(published)
}

async fn publish(temp: &Path, destination: &Path, filename: &str) -> io::Result<PathBuf> {
    let (stem, extension) = split_extension(filename);

    for suffix in 0..MAX_COLLISION_SUFFIX {
        let candidate = if suffix == 0 {
            destination.join(filename)
        } else {
            destination.join(format!("{}-{}{}", stem, suffix, extension))
        };

        match tokio::fs::hard_link(temp, &candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", filename, destination.display()),
    ))
}

/// The new file is already published, so a stale copy only costs space.
async fn remove_previous(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed previous download"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "Failed to remove previous download: {}", e),
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    match dunce::canonicalize(path) {
        Ok(path) => Ok(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if path.is_absolute() {
                Ok(path.to_path_buf())
            } else {
                Ok(std::env::current_dir()?.join(path))
            }
        }
        Err(e) => Err(e),
    }
}

/// Path of `target` relative to `base`; absolute when they share no root.
pub(crate) fn relative_path(base: &Path, target: &Path) -> io::Result<PathBuf> {
    let base = absolute(base)?;
    let target = absolute(target)?;

    let base_parts: Vec<Component> = base.components().collect();
    let target_parts: Vec<Component> = target.components().collect();

    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    if common == 0 {
        return Ok(target);
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &target_parts[common..] {
        relative.push(part.as_os_str());
    }
    Ok(relative)
}
