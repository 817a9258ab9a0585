//! Structural equality
//!
//! Each level compares with its own configuration: whether to look at the
//! identity, at the parent back-reference, and at the children (with a
//! nested configuration for the child level). Children compare as sets under
//! the recursive comparator, never by position. Parent comparison stops at the
//! parent's identity so that enabling both parent and children checks cannot
//! recurse through a parent → child → parent cycle.

use super::node::{Catalogue, Channel, Episode, Partition, Programme};
use super::{Branch, Node};
use crate::presence::Presence;
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_CHECK_IDENTITY: bool = true;
const DEFAULT_CHECK_PARENT: bool = false;
const DEFAULT_CHECK_CHILDREN: bool = true;
const DEFAULT_CHECK_MIRRORS: bool = true;
const DEFAULT_CHECK_DOWNLOAD: bool = true;

/// Per-level comparison with a configurable depth
pub trait StructuralEq: Node {
    type Config: Default + Clone + fmt::Debug;

    fn structurally_eq(&self, other: &Self, config: &Self::Config) -> bool;
}

/// Compare two optional nodes: both absent are equal, one absent is not.
pub fn equal<N: StructuralEq>(left: Option<&N>, right: Option<&N>, config: &N::Config) -> bool {
    match Presence::resolve(left, right) {
        Ok((l, r)) => l.structurally_eq(r, config),
        Err(answer) => answer,
    }
}

/// Equality configuration for partitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionsEqualityConfig {
    pub check_identity: bool,
    pub check_parent: bool,
    /// Compare mirror lists as sets
    pub check_mirrors: bool,
    /// Compare download records by url and path
    pub check_download: bool,
}

impl Default for PartitionsEqualityConfig {
    fn default() -> Self {
        Self {
            check_identity: DEFAULT_CHECK_IDENTITY,
            check_parent: DEFAULT_CHECK_PARENT,
            check_mirrors: DEFAULT_CHECK_MIRRORS,
            check_download: DEFAULT_CHECK_DOWNLOAD,
        }
    }
}

/// Equality configuration for a level with children of config `C`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchEqualityConfig<C> {
    pub check_identity: bool,
    pub check_parent: bool,
    pub check_children: bool,
    /// Configuration used when descending into children
    pub children: C,
}

impl<C: Default> Default for BranchEqualityConfig<C> {
    fn default() -> Self {
        Self {
            check_identity: DEFAULT_CHECK_IDENTITY,
            check_parent: DEFAULT_CHECK_PARENT,
            check_children: DEFAULT_CHECK_CHILDREN,
            children: C::default(),
        }
    }
}

pub type EpisodesEqualityConfig = BranchEqualityConfig<PartitionsEqualityConfig>;
pub type ProgrammesEqualityConfig = BranchEqualityConfig<EpisodesEqualityConfig>;
pub type ChannelsEqualityConfig = BranchEqualityConfig<ProgrammesEqualityConfig>;
pub type CataloguesEqualityConfig = BranchEqualityConfig<ChannelsEqualityConfig>;

/// Elements of `items` with later duplicates (under `==`) removed
pub(crate) fn distinct<T: PartialEq>(items: &[T]) -> Vec<&T> {
    let mut unique: Vec<&T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.iter().any(|seen| *seen == item) {
            unique.push(item);
        }
    }
    unique
}

/// Set equality under `matches`: every element on each side has a partner.
fn same_members<T>(left: &[T], right: &[T], matches: impl Fn(&T, &T) -> bool) -> bool {
    left.iter().all(|l| right.iter().any(|r| matches(l, r)))
        && right.iter().all(|r| left.iter().any(|l| matches(l, r)))
}

fn branch_eq<B>(
    left: &B,
    right: &B,
    config: &BranchEqualityConfig<<B::Child as StructuralEq>::Config>,
) -> bool
where
    B: Branch,
    B::Child: StructuralEq + PartialEq,
{
    if config.check_identity && left.id() != right.id() {
        return false;
    }

    if config.check_children {
        match Presence::resolve(left.children(), right.children()) {
            Err(true) => {}
            Err(false) => return false,
            Ok((l, r)) => {
                if distinct(l).len() != distinct(r).len() {
                    return false;
                }
                if !same_members(l, r, |a, b| a.structurally_eq(b, &config.children)) {
                    return false;
                }
            }
        }
    }

    if config.check_parent && left.parent() != right.parent() {
        return false;
    }

    true
}

impl StructuralEq for Partition {
    type Config = PartitionsEqualityConfig;

    fn structurally_eq(&self, other: &Self, config: &PartitionsEqualityConfig) -> bool {
        if config.check_identity && self.id() != other.id() {
            return false;
        }

        if config.check_mirrors
            && !same_members(&self.mirrors, &other.mirrors, |a, b| a == b)
        {
            return false;
        }

        if config.check_download && self.download != other.download {
            return false;
        }

        if config.check_parent && self.parent() != other.parent() {
            return false;
        }

        true
    }
}

impl StructuralEq for Episode {
    type Config = EpisodesEqualityConfig;

    fn structurally_eq(&self, other: &Self, config: &EpisodesEqualityConfig) -> bool {
        branch_eq(self, other, config)
    }
}

impl StructuralEq for Programme {
    type Config = ProgrammesEqualityConfig;

    fn structurally_eq(&self, other: &Self, config: &ProgrammesEqualityConfig) -> bool {
        branch_eq(self, other, config)
    }
}

impl StructuralEq for Channel {
    type Config = ChannelsEqualityConfig;

    fn structurally_eq(&self, other: &Self, config: &ChannelsEqualityConfig) -> bool {
        branch_eq(self, other, config)
    }
}

impl StructuralEq for Catalogue {
    type Config = CataloguesEqualityConfig;

    fn structurally_eq(&self, other: &Self, config: &CataloguesEqualityConfig) -> bool {
        branch_eq(self, other, config)
    }
}

impl PartialEq for Partition {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other, &PartitionsEqualityConfig::default())
    }
}

impl PartialEq for Episode {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other, &EpisodesEqualityConfig::default())
    }
}

impl PartialEq for Programme {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other, &ProgrammesEqualityConfig::default())
    }
}

impl PartialEq for Channel {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other, &ChannelsEqualityConfig::default())
    }
}

impl PartialEq for Catalogue {
    fn eq(&self, other: &Self) -> bool {
        self.structurally_eq(other, &CataloguesEqualityConfig::default())
    }
}

impl Eq for Partition {}
impl Eq for Episode {}
impl Eq for Programme {}
impl Eq for Channel {}
impl Eq for Catalogue {}
