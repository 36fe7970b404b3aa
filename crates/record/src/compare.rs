//! Structural comparison
//!
//! Embedded records compare by content, everything else by value. Sets
//! ignore order. Comparison works on materialized entries: two records
//! still backed by raw buffers are equal only if the buffers are.

use docrec_core::{RecordHandle, Result, Value};

use crate::arena::Records;
use crate::context::Context;

impl Records {
    /// Do two records hold the same class and fields
    pub fn has_same_content(&mut self, a: RecordHandle, b: RecordHandle, ctx: &Context<'_>) -> Result<bool> {
        for handle in [a, b] {
            self.materialize(handle, ctx)?;
        }
        self.records_eq(a, b)
    }

    pub(crate) fn records_eq(&self, a: RecordHandle, b: RecordHandle) -> Result<bool> {
        let (ra, rb) = (self.record(a)?, self.record(b)?);
        if a == b {
            return Ok(true);
        }
        if ra.class_name != rb.class_name {
            return Ok(false);
        }
        match (&ra.source, &rb.source) {
            (Some(x), Some(y)) => return Ok(x == y),
            (None, None) => {}
            _ => return Ok(false),
        }
        if ra.store.field_size() != rb.store.field_size() {
            return Ok(false);
        }
        for (name, entry) in ra.store.iter().filter(|(_, e)| e.exists) {
            match rb.store.get(name) {
                Some(other) if other.exists => {
                    if !self.value_eq(&entry.value, &other.value)? {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Deep equality; fails on a stale embedded handle
    pub(crate) fn value_eq(&self, a: &Value, b: &Value) -> Result<bool> {
        match (a, b) {
            (Value::Embedded(x), Value::Embedded(y)) => self.records_eq(*x, *y),
            (Value::List(x), Value::List(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for (i, j) in x.iter().zip(y) {
                    if !self.value_eq(i, j)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Set(x), Value::Set(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for i in x {
                    let mut found = false;
                    for j in y {
                        if self.value_eq(i, j)? {
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Map(x), Value::Map(y)) => {
                if x.len() != y.len() {
                    return Ok(false);
                }
                for (k, i) in x {
                    match y.get(k) {
                        Some(j) if self.value_eq(i, j)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(a == b),
        }
    }
}
