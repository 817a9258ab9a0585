//! Hash computation for catalogue nodes
//!
//! Node hashes combine the node identity with an order-independent hash of
//! its children, so that two snapshots listing the same children in a
//! different order hash identically. Element hashes go through BLAKE3 to stay
//! stable across processes and runs.

use super::equality::distinct;
use super::node::{Catalogue, Channel, Episode, Partition, Programme};
use super::Node;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Deterministic 64-bit [`Hasher`] backed by BLAKE3
#[derive(Default, Clone)]
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hasher for StableHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    fn finish(&self) -> u64 {
        let digest = self.inner.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }
}

fn stable_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = StableHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Multiset hash over a collection, independent of element order.
///
/// Every repeated equal element is rotated by its occurrence count so that
/// duplicates add up instead of cancelling out; a `None` element adds one.
pub fn order_independent_hash<'a, T, I>(items: I) -> u64
where
    T: Hash + ?Sized + 'a,
    I: IntoIterator<Item = Option<&'a T>>,
{
    let mut hash: u64 = 0;
    let mut occurrences: HashMap<u64, u32> = HashMap::new();

    for item in items {
        let Some(item) = item else {
            hash = hash.wrapping_add(1);
            continue;
        };

        let current = stable_hash(item);
        let seen = occurrences.entry(current).or_insert(0);
        let rotation = *seen;
        *seen += 1;

        hash = hash.wrapping_add(current.rotate_left(rotation).wrapping_mul(37));
    }

    hash
}

/// [`order_independent_hash`] over a slice without absent elements
pub fn unordered_hash<T: Hash>(items: &[T]) -> u64 {
    order_independent_hash(items.iter().map(Some))
}

/// Stable hash of a whole node, consistent with its default equality
pub fn content_hash<N: Hash>(node: &N) -> u64 {
    stable_hash(node)
}

fn hash_children<C, H>(children: Option<&[C]>, state: &mut H)
where
    C: Hash + PartialEq,
    H: Hasher,
{
    match children {
        None => state.write_u8(0),
        Some(children) => {
            state.write_u8(1);
            state.write_u64(order_independent_hash(distinct(children).into_iter().map(Some)));
        }
    }
}

impl Hash for Catalogue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_children(self.channels.as_deref(), state);
    }
}

impl Hash for Channel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
        hash_children(self.programmes.as_deref(), state);
    }
}

impl Hash for Programme {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
        hash_children(self.episodes.as_deref(), state);
    }
}

impl Hash for Episode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
        hash_children(self.partitions.as_deref(), state);
    }
}

impl Hash for Partition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
        self.download.hash(state);
        let mirrors: Vec<&str> = distinct(&self.mirrors)
            .into_iter()
            .map(|m| m.as_str())
            .collect();
        state.write_u64(unordered_hash(&mirrors));
    }
}
