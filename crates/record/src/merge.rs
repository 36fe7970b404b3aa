//! Record merge
//!
//! Copies the fields of one record into another. With `merge_items`,
//! containers present on both sides are merged element-wise instead of
//! replaced; without `update_only`, fields missing from the source are
//! removed from the target.

use docrec_core::{RecordHandle, Result, Value};
use tracing::debug;

use crate::arena::Records;
use crate::context::Context;

impl Records {
    /// Merge `source` into `target`
    pub fn merge(
        &mut self,
        target: RecordHandle,
        source: RecordHandle,
        update_only: bool,
        merge_items: bool,
        ctx: &Context<'_>,
    ) -> Result<()> {
        self.materialize(target, ctx)?;
        let incoming = self.fields(source, ctx)?;

        if self.class_name(target, ctx)?.is_none() {
            if let Some(class) = self.class_name(source, ctx)? {
                self.set_class_name(target, Some(&class), ctx)?;
            }
        }

        for (name, value) in &incoming {
            let current = self.get(target, name, ctx)?;
            if merge_items && self.merge_items(target, source, name, &current, value, ctx)? {
                continue;
            }
            if !self.value_eq(&current, value).unwrap_or(false) || !self.exists(target, name, ctx)? {
                let value = self.adopt(source, value.clone())?;
                self.set(target, name, value, ctx)?;
            }
        }

        if !update_only {
            for name in self.names(target, ctx)? {
                if !incoming.iter().any(|(n, _)| *n == name) {
                    self.remove(target, &name, ctx)?;
                }
            }
        }
        debug!(target = %target, source = %source, fields = incoming.len(), update_only, merge_items, "merged record");
        Ok(())
    }

    /// Element-wise merge of two containers; false if the shapes differ
    fn merge_items(
        &mut self,
        target: RecordHandle,
        source: RecordHandle,
        name: &str,
        current: &Value,
        incoming: &Value,
        ctx: &Context<'_>,
    ) -> Result<bool> {
        match (current, incoming) {
            (Value::Map(_), Value::Map(other)) => {
                let other = match self.adopt(source, Value::Map(other.clone()))? {
                    Value::Map(m) => m,
                    _ => return Ok(false),
                };
                self.edit_field(target, name, ctx, move |t| {
                    for (k, v) in other {
                        t.map_insert(k, v)?;
                    }
                    Ok(())
                })?;
                Ok(true)
            }
            (Value::LinkBag(_), Value::LinkBag(other)) => {
                let other = other.clone();
                self.edit_field(target, name, ctx, move |t| t.bag_merge(&other))
            }
            (Value::List(mine) | Value::Set(mine), Value::List(theirs) | Value::Set(theirs)) => {
                let mut missing = Vec::new();
                for item in theirs {
                    if !mine.iter().any(|m| self.value_eq(m, item).unwrap_or(false)) {
                        missing.push(self.adopt(source, item.clone())?);
                    }
                }
                if !missing.is_empty() {
                    self.edit_field(target, name, ctx, move |t| {
                        for item in missing {
                            t.push(item)?;
                        }
                        Ok(())
                    })?;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Embedded records of `source` are copied before they enter the target
    fn adopt(&mut self, source: RecordHandle, value: Value) -> Result<Value> {
        Ok(match value {
            Value::Embedded(child) => Value::Embedded(self.copy(child)?),
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|i| self.adopt(source, i))
                    .collect::<Result<_>>()?,
            ),
            Value::Set(items) => Value::Set(
                items
                    .into_iter()
                    .map(|i| self.adopt(source, i))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| self.adopt(source, v).map(|v| (k, v)))
                    .collect::<Result<_>>()?,
            ),
            other => other,
        })
    }
}
