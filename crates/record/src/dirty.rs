//! Dirty tracking
//!
//! Marking a record dirty walks its live owners up to the root records.
//! Only a root record with a persistent identity that was clean before is
//! handed to the session change list; embedded and new records just carry
//! the flag.

use docrec_core::{RecordHandle, Result};
use tracing::debug;

use crate::arena::Records;
use crate::context::Context;

impl Records {
    /// Mark a record and its containers dirty, registering the root
    pub fn mark_dirty(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        self.propagate_dirty(handle, Some(ctx))
    }

    /// Mark a record and its containers dirty without touching the session
    pub fn mark_dirty_no_signal(&mut self, handle: RecordHandle) -> Result<()> {
        self.propagate_dirty(handle, None)
    }

    fn propagate_dirty(&mut self, handle: RecordHandle, ctx: Option<&Context<'_>>) -> Result<()> {
        // a dirty record must be re-encoded from its entries, not its buffer
        if self.record(handle)?.source.is_some() {
            if let Some(ctx) = ctx {
                self.deserialize_fields(handle, None, ctx)?;
            }
        }

        let owners = self.live_owners(handle)?;
        let record = self.record_mut(handle)?;
        let was_dirty = record.dirty;
        record.dirty = true;
        record.content_changed = true;
        let id = record.id;

        if owners.is_empty() {
            if let Some(session) = ctx.and_then(|c| c.session) {
                if !was_dirty && id.is_persistent() {
                    debug!(handle = %handle, id = %id, "registering changed record");
                    session.register_changed_record(handle, &id);
                }
            }
            return Ok(());
        }

        for owner in owners {
            self.propagate_dirty(owner, ctx)?;
        }
        Ok(())
    }
}
