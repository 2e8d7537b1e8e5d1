//! Hash Index
//!
//! Single-column exact-match index for primary and unique columns:
//! - One entry per distinct column value (1:1, values are unique)
//! - Maps the column value to the owning row's primary key
//! - O(1) expected lookup, no range queries
//!
//! The index holds no lock of its own; the owning table's lock guards it.

use crate::types::Value;
use ahash::AHashMap;

#[derive(Debug, Clone, Default)]
pub struct HashIndex {
    /// Indexed column name
    column: String,

    /// column value -> primary key
    entries: AHashMap<Value, Value>,
}

impl HashIndex {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            entries: AHashMap::new(),
        }
    }

    /// Primary key of the row holding `value`
    pub fn get(&self, value: &Value) -> Option<&Value> {
        self.entries.get(value)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.entries.contains_key(value)
    }

    /// Insert or overwrite the mapping for `value`
    pub fn set(&mut self, value: Value, pk: Value) -> Option<Value> {
        self.entries.insert(value, pk)
    }

    pub fn remove(&mut self, value: &Value) -> Option<Value> {
        self.entries.remove(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}
