//! Reference bag
//!
//! A `LinkBag` is a multiset of record identities. Unlike a link set it
//! may hold the same identity more than once, and unlike a link list its
//! equality does not depend on order.

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Multiset of record identities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkBag {
    links: Vec<RecordId>,
}

impl LinkBag {
    /// Create an empty bag
    pub fn new() -> Self {
        LinkBag { links: Vec::new() }
    }

    /// Add one occurrence of `id`
    pub fn add(&mut self, id: RecordId) {
        self.links.push(id);
    }

    /// Remove one occurrence of `id`
    ///
    /// Returns false if the bag did not contain it.
    pub fn remove(&mut self, id: &RecordId) -> bool {
        match self.links.iter().position(|l| l == id) {
            Some(pos) => {
                self.links.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Does the bag hold at least one occurrence of `id`
    pub fn contains(&self, id: &RecordId) -> bool {
        self.links.contains(id)
    }

    /// Number of occurrences of `id`
    pub fn count(&self, id: &RecordId) -> usize {
        self.links.iter().filter(|l| *l == id).count()
    }

    /// Total number of entries, duplicates included
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True if the bag is empty
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &RecordId> {
        self.links.iter()
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.links.clear();
    }

    /// Merge another bag into this one
    ///
    /// With `merge_items` every identity of `other` missing here is added.
    /// Without it, nothing is merged and false is returned so the caller
    /// replaces the whole value instead.
    pub fn try_merge(&mut self, other: &LinkBag, merge_items: bool) -> bool {
        if !merge_items {
            return false;
        }
        for id in other.iter() {
            if !self.contains(id) {
                self.links.push(*id);
            }
        }
        true
    }
}

impl PartialEq for LinkBag {
    fn eq(&self, other: &Self) -> bool {
        if self.links.len() != other.links.len() {
            return false;
        }
        let mut a = self.links.clone();
        let mut b = other.links.clone();
        a.sort_unstable();
        b.sort_unstable();
        a == b
    }
}

impl FromIterator<RecordId> for LinkBag {
    fn from_iter<I: IntoIterator<Item = RecordId>>(iter: I) -> Self {
        LinkBag {
            links: iter.into_iter().collect(),
        }
    }
}
