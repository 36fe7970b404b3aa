//! Entry storage
//!
//! `EntryStore` maps field names to entries. Ordered stores keep insertion
//! order in a side vector; unordered stores iterate in hash order.
//!
//! The store also maintains the count of entries that logically exist.
//! The count is adjusted incrementally by the record engine and only
//! recomputed on repair paths (merge, undo).

use rustc_hash::FxHashMap;

use crate::entry::FieldEntry;

/// Field name to entry mapping of one record
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    map: FxHashMap<String, FieldEntry>,
    order: Option<Vec<String>>,
    field_size: usize,
}

impl EntryStore {
    /// Empty store
    pub fn new(ordered: bool) -> Self {
        EntryStore {
            map: FxHashMap::default(),
            order: ordered.then(Vec::new),
            field_size: 0,
        }
    }

    /// Does the store keep insertion order
    pub fn is_ordered(&self) -> bool {
        self.order.is_some()
    }

    /// Entry by name
    #[inline]
    pub fn get(&self, name: &str) -> Option<&FieldEntry> {
        self.map.get(name)
    }

    /// Mutable entry by name
    #[inline]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldEntry> {
        self.map.get_mut(name)
    }

    /// Entry present (existing or not)
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Entry present and logically existing
    pub fn exists(&self, name: &str) -> bool {
        self.map.get(name).map_or(false, |e| e.exists)
    }

    /// Insert or replace an entry; the field count is not touched
    pub fn insert(&mut self, name: impl Into<String>, entry: FieldEntry) -> Option<FieldEntry> {
        let name = name.into();
        let previous = self.map.insert(name.clone(), entry);
        if previous.is_none() {
            if let Some(order) = &mut self.order {
                order.push(name);
            }
        }
        previous
    }

    /// Remove an entry; the field count is not touched
    pub fn remove(&mut self, name: &str) -> Option<FieldEntry> {
        let removed = self.map.remove(name);
        if removed.is_some() {
            if let Some(order) = &mut self.order {
                order.retain(|n| n != name);
            }
        }
        removed
    }

    /// Iterate all entries, existing or not, in store order
    pub fn iter(&self) -> Box<dyn Iterator<Item = (&String, &FieldEntry)> + '_> {
        match &self.order {
            Some(order) => Box::new(order.iter().filter_map(move |n| self.map.get_key_value(n))),
            None => Box::new(self.map.iter()),
        }
    }

    /// Mutable access to every entry (hash order)
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut FieldEntry)> {
        self.map.iter_mut()
    }

    /// Names of all entries in store order
    pub fn entry_names(&self) -> Vec<String> {
        self.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Names of existing entries in store order
    pub fn names(&self) -> Vec<String> {
        self.iter()
            .filter(|(_, e)| e.exists)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Keep only entries matching `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &mut FieldEntry) -> bool) {
        self.map.retain(|n, e| keep(n, e));
        if let Some(order) = &mut self.order {
            let map = &self.map;
            order.retain(|n| map.contains_key(n));
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.map.clear();
        if let Some(order) = &mut self.order {
            order.clear();
        }
        self.field_size = 0;
    }

    /// Number of entries, existing or not
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if there are no entries at all
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of existing entries
    #[inline]
    pub fn field_size(&self) -> usize {
        self.field_size
    }

    pub(crate) fn inc_size(&mut self) {
        self.field_size += 1;
    }

    pub(crate) fn dec_size(&mut self) {
        self.field_size = self.field_size.saturating_sub(1);
    }

    /// Recompute the existing-entry count from scratch
    pub(crate) fn recount(&mut self) {
        self.field_size = self.map.values().filter(|e| e.exists).count();
    }
}
