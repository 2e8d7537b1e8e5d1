//! Cell values, rows and table schemas

mod table;

pub use table::{ColumnDef, ColumnType, ForeignKeyDef, TableSchema};

use crate::error::{DbError, Result};
use std::cmp::Ordering;
use std::fmt;

/// A single typed cell.
///
/// Only values of the same variant are comparable; see [`Value::compare`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer value
    Integer(i64),

    /// Text string
    Text(String),
}

impl Value {
    /// Declared column type this value belongs to
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::Text(_) => ColumnType::Text,
        }
    }

    /// Total order between values of the same type.
    ///
    /// Integers order numerically, text by code point. Mixing types is a `TypeError`.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
            _ => Err(DbError::TypeError(format!(
                "cannot compare {} with {}",
                self.column_type(),
                other.column_type()
            ))),
        }
    }

    /// SQL equality: a type mismatch is simply "not equal"
    #[inline]
    pub fn sql_eq(&self, other: &Value) -> bool {
        matches!(self.compare(other), Ok(Ordering::Equal))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// A row is positional: one value per column, in schema order
pub type Row = Vec<Value>;
