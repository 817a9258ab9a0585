//! Catalogue tree
//!
//! The archive is modelled as a five level tree:
//! `Catalogue → Channel → Programme → Episode → Partition`.
//! Equality, hashing and merging are written once against the [`Node`] and
//! [`Branch`] capabilities below; each level only supplies its identity, its
//! child list and how to rebuild itself around a new child list.

pub mod equality;
pub mod hasher;
pub mod merge;
pub mod node;

pub use equality::{
    equal, BranchEqualityConfig, CataloguesEqualityConfig, ChannelsEqualityConfig,
    EpisodesEqualityConfig, PartitionsEqualityConfig, ProgrammesEqualityConfig, StructuralEq,
};
pub use hasher::{content_hash, order_independent_hash, unordered_hash, StableHasher};
pub use merge::{merge, merge_all, Merge, Merger};
pub use node::{Catalogue, Channel, DownloadRecord, Episode, Partition, Programme};

use crate::types::Timestamp;
use std::fmt;
use std::hash::Hash;
use std::path::Path;

/// Capabilities shared by every level of the tree
pub trait Node: Clone + fmt::Debug {
    /// Key that decides whether two nodes describe the same entity
    type Id: Clone + Eq + Ord + Hash + fmt::Debug;
    /// Identity of the owning node
    type ParentId: Clone + Eq + Hash + fmt::Debug;

    /// Level name used in logs and errors
    const LEVEL: &'static str;

    fn id(&self) -> &Self::Id;

    /// Non-owning back-reference to the owning node, if attached
    fn parent(&self) -> Option<&Self::ParentId>;

    fn set_parent(&mut self, parent: Option<Self::ParentId>);

    /// The stamp stored on this node, ignoring descendants
    fn stamp(&self) -> Timestamp;

    fn set_stamp(&mut self, stamp: Timestamp);

    /// Effective modification time: never older than any descendant
    fn last_modified(&self) -> Timestamp;

    /// Ratchet stored stamps up to their effective values, bottom-up.
    fn refresh_last_modified(&mut self) -> Timestamp;

    /// Re-link every descendant to its owner (post-load fixup).
    fn attach_parents(&mut self) {}
}

/// Interior levels that own a collection of children
pub trait Branch: Node {
    type Child: Node<ParentId = Self::Id>;

    /// `None` means not loaded, `Some(&[])` means loaded and empty
    fn children(&self) -> Option<&[Self::Child]>;

    fn children_mut(&mut self) -> Option<&mut Vec<Self::Child>>;

    /// Sort children into this level's natural order.
    fn order_children(children: &mut [Self::Child]);

    /// Copy of this node's scalar fields around a new child list.
    fn rebuild(&self, children: Option<Vec<Self::Child>>, stamp: Timestamp) -> Self;
}

/// Access to the downloadable leaves below a node
pub trait Assets {
    fn collect_partitions<'a>(&'a self, out: &mut Vec<&'a Partition>);

    fn collect_partitions_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Partition>);

    fn partitions(&self) -> Vec<&Partition> {
        let mut out = Vec::new();
        self.collect_partitions(&mut out);
        out
    }

    fn partitions_mut(&mut self) -> Vec<&mut Partition> {
        let mut out = Vec::new();
        self.collect_partitions_mut(&mut out);
        out
    }

    /// Delete every downloaded file below this node and drop its record.
    ///
    /// Returns the number of records cleared.
    fn clear_downloads(&mut self, base: &Path) -> std::io::Result<usize> {
        let mut cleared = 0;
        for partition in self.partitions_mut() {
            if partition.clear_download(base)? {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

pub(crate) fn branch_last_modified<B: Branch>(node: &B) -> Timestamp {
    node.children()
        .into_iter()
        .flatten()
        .map(Node::last_modified)
        .fold(node.stamp(), std::cmp::max)
}

pub(crate) fn refresh_branch<B: Branch>(node: &mut B) -> Timestamp {
    let mut latest = node.stamp();
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            latest = latest.max(child.refresh_last_modified());
        }
    }
    node.set_stamp(latest);
    latest
}

pub(crate) fn attach_children<B: Branch>(node: &mut B) {
    let id = node.id().clone();
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            child.set_parent(Some(id.clone()));
            child.attach_parents();
        }
    }
}

pub(crate) fn collect_branch_partitions<'a, B>(node: &'a B, out: &mut Vec<&'a Partition>)
where
    B: Branch,
    B::Child: Assets,
{
    for child in node.children().into_iter().flatten() {
        child.collect_partitions(out);
    }
}

pub(crate) fn collect_branch_partitions_mut<'a, B>(
    node: &'a mut B,
    out: &mut Vec<&'a mut Partition>,
) where
    B: Branch,
    B::Child: Assets,
{
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            child.collect_partitions_mut(out);
        }
    }
}
