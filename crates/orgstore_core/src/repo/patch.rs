//! Typed partial updates.
//!
//! A [`Patch`] records `(column, value)` assignments against one entity's
//! column set, so an update can only name columns that exist.

use super::entity::Column;
use rusqlite::types::Value;

/// Ordered column assignments for `UPDATE ... SET`.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<C: Column> {
    assignments: Vec<(C, Value)>,
}

impl<C: Column> Default for Patch<C> {
    fn default() -> Self {
        Self {
            assignments: Vec::new(),
        }
    }
}

impl<C: Column> Patch<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `column`, replacing an earlier assignment.
    pub fn set(mut self, column: C, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    /// Assigns SQL `NULL` to `column`.
    pub fn set_null(self, column: C) -> Self {
        self.set(column, Value::Null)
    }

    /// In-place form of [`Patch::set`].
    pub fn push(&mut self, column: C, value: impl Into<Value>) {
        let value = value.into();
        match self
            .assignments
            .iter_mut()
            .find(|(existing, _)| *existing == column)
        {
            Some((_, slot)) => *slot = value,
            None => self.assignments.push((column, value)),
        }
    }

    /// Drops the assignment for `column`, if any.
    pub fn without(mut self, column: C) -> Self {
        self.assignments.retain(|(existing, _)| *existing != column);
        self
    }

    pub fn get(&self, column: C) -> Option<&Value> {
        self.assignments
            .iter()
            .find(|(existing, _)| *existing == column)
            .map(|(_, value)| value)
    }

    pub fn touches(&self, column: C) -> bool {
        self.get(column).is_some()
    }

    /// Returns whether a column with SQL name `name` is assigned.
    pub fn touches_name(&self, name: &str) -> bool {
        self.assignments
            .iter()
            .any(|(column, _)| column.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assignments(&self) -> &[(C, Value)] {
        &self.assignments
    }
}
