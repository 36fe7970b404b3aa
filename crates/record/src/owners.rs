//! Ownership graph
//!
//! Embedded records point back at the records containing them. The edges
//! are plain handles: they keep nothing alive, and a released owner simply
//! leaves a stale handle behind that is pruned the next time the edges are
//! walked. Owners must form a DAG up to a root record.

use docrec_core::{Error, RecordHandle, Result};
use tracing::trace;

use crate::arena::Records;

impl Records {
    /// Live owners of a record, pruning stale back-references
    pub fn live_owners(&mut self, handle: RecordHandle) -> Result<Vec<RecordHandle>> {
        let recorded = self.record(handle)?.owners.clone();
        let live: Vec<RecordHandle> = recorded.iter().copied().filter(|o| self.is_live(*o)).collect();
        if live.len() != recorded.len() {
            trace!(
                handle = %handle,
                pruned = recorded.len() - live.len(),
                "pruned stale owners"
            );
            self.record_mut(handle)?.owners.retain(|o| live.contains(o));
        }
        Ok(live)
    }

    /// Does the record have at least one live owner
    pub fn has_owners(&mut self, handle: RecordHandle) -> Result<bool> {
        Ok(!self.live_owners(handle)?.is_empty())
    }

    /// Embedded records are the ones with live owners
    pub fn is_embedded(&mut self, handle: RecordHandle) -> Result<bool> {
        self.has_owners(handle)
    }

    /// Would making `owner` contain `child` close a cycle
    pub(crate) fn check_can_own(&self, child: RecordHandle, owner: RecordHandle) -> Result<()> {
        self.record(child)?;
        if child == owner {
            return Err(Error::invalid_argument(format!(
                "record {} cannot embed itself",
                child
            )));
        }
        let mut pending = vec![owner];
        let mut seen = Vec::new();
        while let Some(current) = pending.pop() {
            if current == child {
                return Err(Error::invalid_argument(format!(
                    "embedding {} into {} would create an ownership cycle",
                    child, owner
                )));
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Ok(rec) = self.record(current) {
                pending.extend(rec.owners.iter().copied().filter(|o| self.is_live(*o)));
            }
        }
        Ok(())
    }

    /// Record `owner` as a container of `child`
    pub fn add_owner(&mut self, child: RecordHandle, owner: RecordHandle) -> Result<()> {
        self.check_can_own(child, owner)?;
        self.record(owner)?;
        let rec = self.record_mut(child)?;
        if !rec.owners.contains(&owner) {
            rec.owners.push(owner);
        }
        Ok(())
    }

    /// Forget `owner` as a container of `child`
    ///
    /// Removing an edge that does not exist, or from a released child, is
    /// not an error.
    pub fn remove_owner(&mut self, child: RecordHandle, owner: RecordHandle) {
        if let Ok(rec) = self.record_mut(child) {
            rec.owners.retain(|o| *o != owner);
        }
    }

    /// Outermost container of a record (the record itself if top-level)
    pub fn root_of(&mut self, handle: RecordHandle) -> Result<RecordHandle> {
        let mut current = handle;
        loop {
            match self.live_owners(current)?.first() {
                Some(owner) => current = *owner,
                None => return Ok(current),
            }
        }
    }

    /// Apply the owner edges implied by replacing `before` with `after`
    /// in a field of `owner`
    pub(crate) fn reconcile_owners(
        &mut self,
        owner: RecordHandle,
        before: &[RecordHandle],
        after: &[RecordHandle],
    ) -> Result<()> {
        for gone in before.iter().filter(|h| !after.contains(h)) {
            if !self.holds_embedded(owner, *gone) {
                self.remove_owner(*gone, owner);
            }
        }
        for added in after.iter().filter(|h| !before.contains(h)) {
            self.add_owner(*added, owner)?;
        }
        Ok(())
    }

    /// Does any existing field of `owner` still contain `child`
    fn holds_embedded(&self, owner: RecordHandle, child: RecordHandle) -> bool {
        self.record(owner).map_or(false, |rec| {
            rec.store
                .iter()
                .any(|(_, e)| e.exists && e.value.embedded_handles().contains(&child))
        })
    }

    /// Cycle check for every embedded record about to enter `owner`
    pub(crate) fn check_attachable(
        &self,
        owner: RecordHandle,
        before: &[RecordHandle],
        after: &[RecordHandle],
    ) -> Result<()> {
        for added in after.iter().filter(|h| !before.contains(h)) {
            self.check_can_own(*added, owner)?;
        }
        Ok(())
    }
}
