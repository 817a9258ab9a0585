//! Recency-biased merge of catalogue snapshots
//!
//! Two nodes with the same identity merge into a new node: the newer side
//! supplies scalar fields and the effective modification time, children are
//! unioned by identity and merged recursively. Inputs are never mutated.

use super::equality::StructuralEq;
use super::hasher::content_hash;
use super::node::{Catalogue, Channel, DownloadRecord, Episode, Partition, Programme};
use super::{Branch, Node};
use crate::error::MergeError;
use crate::presence::Presence;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use url::Url;

/// Per-level reconciliation of two nodes already known to share an identity
pub trait Merge: StructuralEq + PartialEq + Hash {
    /// Build the merged node; `newer` has already won the recency comparison.
    fn merge_pair(newer: &Self, older: &Self, merger: &Merger) -> Result<Self, MergeError>;
}

/// Merge driver
///
/// `download_root` is the base against which download records are resolved
/// when deciding which side's record still points at a file.
#[derive(Debug, Clone)]
pub struct Merger {
    download_root: PathBuf,
}

impl Default for Merger {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("."),
        }
    }
}

impl Merger {
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            download_root: download_root.into(),
        }
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Merge two nodes of the same identity.
    pub fn merge<N: Merge>(&self, first: &N, second: &N) -> Result<N, MergeError> {
        if first.id() != second.id() {
            return Err(MergeError::IdentityMismatch {
                level: N::LEVEL,
                left: format!("{:?}", first.id()),
                right: format!("{:?}", second.id()),
            });
        }

        let (newer, older) = by_recency(first, second);
        if newer == older {
            trace!(level = N::LEVEL, id = ?newer.id(), "Sides already equal");
            return Ok(newer.clone());
        }

        debug!(level = N::LEVEL, id = ?newer.id(), "Merging");
        N::merge_pair(newer, older, self)
    }

    /// Fold `items` left to right with [`Merger::merge`].
    pub fn merge_all<'a, N, I>(&self, items: I) -> Result<N, MergeError>
    where
        N: Merge + 'a,
        I: IntoIterator<Item = &'a N>,
    {
        let mut items = items.into_iter();
        let first = items
            .next()
            .ok_or(MergeError::EmptyMergeSet { level: N::LEVEL })?;

        let mut merged = first.clone();
        for next in items {
            merged = self.merge(&merged, next)?;
        }
        Ok(merged)
    }
}

/// Merge two nodes, resolving download records against the current directory.
pub fn merge<N: Merge>(first: &N, second: &N) -> Result<N, MergeError> {
    Merger::default().merge(first, second)
}

pub fn merge_all<'a, N, I>(items: I) -> Result<N, MergeError>
where
    N: Merge + 'a,
    I: IntoIterator<Item = &'a N>,
{
    Merger::default().merge_all(items)
}

/// Order two nodes newest first.
///
/// Equal timestamps fall back to the larger content hash, then to the first
/// argument, so the outcome does not depend on argument order unless the
/// two sides also hash identically.
fn by_recency<'a, N: Node + Hash>(first: &'a N, second: &'a N) -> (&'a N, &'a N) {
    let by_time = first.last_modified().cmp(&second.last_modified());
    let ordering = by_time.then_with(|| content_hash(first).cmp(&content_hash(second)));
    match ordering {
        Ordering::Less => (second, first),
        Ordering::Greater | Ordering::Equal => (first, second),
    }
}

fn merge_branch<B>(newer: &B, older: &B, merger: &Merger) -> Result<B, MergeError>
where
    B: Branch,
    B::Child: Merge,
{
    let children = match (newer.children(), older.children()) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.to_vec()),
        (Some(n), Some(o)) => Some(merge_children(n, o, merger)?),
    };

    let children = children.map(|mut children| {
        B::order_children(&mut children);
        for child in children.iter_mut() {
            child.set_parent(Some(newer.id().clone()));
        }
        children
    });

    trace!(
        level = B::LEVEL,
        id = ?newer.id(),
        newer = newer.children().map(<[_]>::len),
        older = older.children().map(<[_]>::len),
        merged = children.as_ref().map(Vec::len),
        "Merged children"
    );

    Ok(newer.rebuild(children, newer.last_modified()))
}

/// Union two child lists by identity, merging every identity seen more than once.
fn merge_children<C: Merge>(
    newer: &[C],
    older: &[C],
    merger: &Merger,
) -> Result<Vec<C>, MergeError> {
    let mut groups: Vec<Vec<&C>> = Vec::new();
    let mut index: HashMap<&C::Id, usize> = HashMap::new();

    for child in newer.iter().chain(older) {
        match index.get(child.id()) {
            Some(&slot) => groups[slot].push(child),
            None => {
                index.insert(child.id(), groups.len());
                groups.push(vec![child]);
            }
        }
    }

    groups
        .into_iter()
        .map(|group| merger.merge_all(group))
        .collect()
}

/// Union of both mirror lists, newer side first, without duplicates.
fn union_mirrors(newer: &[Url], older: &[Url]) -> Vec<Url> {
    let mut mirrors: Vec<Url> = Vec::with_capacity(newer.len() + older.len());
    for mirror in newer.iter().chain(older) {
        if !mirrors.contains(mirror) {
            mirrors.push(mirror.clone());
        }
    }
    mirrors
}

/// Keep the record whose file still exists, favouring the newer side.
fn pick_download(
    newer: Option<&DownloadRecord>,
    older: Option<&DownloadRecord>,
    root: &Path,
) -> Option<DownloadRecord> {
    match Presence::of(newer, older) {
        Presence::BothAbsent => None,
        Presence::OneSideOnly => newer.or(older).cloned(),
        Presence::BothPresent => {
            let (newer, older) = (newer?, older?);
            if newer.exists_under(root) || !older.exists_under(root) {
                Some(newer.clone())
            } else {
                Some(older.clone())
            }
        }
    }
}

impl Merge for Partition {
    fn merge_pair(newer: &Self, older: &Self, merger: &Merger) -> Result<Self, MergeError> {
        let mirrors = union_mirrors(&newer.mirrors, &older.mirrors);
        let download = pick_download(
            newer.download.as_ref(),
            older.download.as_ref(),
            merger.download_root(),
        );
        Ok(newer.rebuild(mirrors, download, newer.last_modified()))
    }
}

impl Merge for Episode {
    fn merge_pair(newer: &Self, older: &Self, merger: &Merger) -> Result<Self, MergeError> {
        merge_branch(newer, older, merger)
    }
}

impl Merge for Programme {
    fn merge_pair(newer: &Self, older: &Self, merger: &Merger) -> Result<Self, MergeError> {
        merge_branch(newer, older, merger)
    }
}

impl Merge for Channel {
    fn merge_pair(newer: &Self, older: &Self, merger: &Merger) -> Result<Self, MergeError> {
        merge_branch(newer, older, merger)
    }
}

impl Merge for Catalogue {
    fn merge_pair(newer: &Self, older: &Self, merger: &Merger) -> Result<Self, MergeError> {
        merge_branch(newer, older, merger)
    }
}
