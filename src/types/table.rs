/// Table metadata and schema definitions
use crate::error::{DbError, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// 64-bit signed integer
    #[serde(rename = "INT")]
    Integer,
    /// UTF-8 text
    #[serde(rename = "TEXT")]
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INT"),
            ColumnType::Text => write!(f, "TEXT"),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Column data type
    #[serde(rename = "type")]
    pub col_type: ColumnType,
    /// Primary key column (at most one per table)
    #[serde(default)]
    pub is_primary: bool,
    /// Unique column (gets its own hash index)
    #[serde(default)]
    pub is_unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            col_type,
            is_primary: false,
            is_unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Primary and unique columns are backed by a hash index
    pub fn is_indexed(&self) -> bool {
        self.is_primary || self.is_unique
    }
}

/// Foreign key metadata: `column` references `referenced_table(referenced_column)`.
///
/// Advisory only; DML does not enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeyDef {
    pub fn new(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Column definitions (ordered)
    pub columns: Vec<ColumnDef>,
    /// Foreign keys declared on this table
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Column name -> position mapping
    column_map: HashMap<String, usize>,
}

impl PartialEq for TableSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.foreign_keys == other.foreign_keys
    }
}

impl TableSchema {
    /// Create a new table schema
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        let mut schema = Self {
            name: name.into(),
            columns,
            foreign_keys: Vec::new(),
            column_map: HashMap::new(),
        };
        schema.rebuild_column_map();
        schema
    }

    pub fn with_foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.get_column_position(name).map(|pos| &self.columns[pos])
    }

    /// Get column position by name
    pub fn get_column_position(&self, name: &str) -> Option<usize> {
        if self.column_map.len() == self.columns.len() {
            return self.column_map.get(name).copied();
        }
        // `columns` edited since the map was built
        self.columns.iter().position(|c| c.name == name)
    }

    /// The primary key column
    pub fn primary_key(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.is_primary)
    }

    pub fn primary_key_position(&self) -> Option<usize> {
        self.columns.iter().position(|c| c.is_primary)
    }

    pub fn get_foreign_key(&self, column: &str) -> Option<&ForeignKeyDef> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Get number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Rebuild column map (call after editing `columns`)
    pub fn rebuild_column_map(&mut self) {
        self.column_map.clear();
        for (pos, col) in self.columns.iter().enumerate() {
            self.column_map.entry(col.name.clone()).or_insert(pos);
        }
    }

    /// Structural checks run before a table is created or loaded:
    /// non-empty, distinct column names, exactly one primary key (not also
    /// flagged unique), foreign keys naming existing columns.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(DbError::ConstraintViolation(format!(
                "table {} must have at least one column",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(DbError::ConstraintViolation(format!(
                    "duplicate column name {} in table {}",
                    col.name, self.name
                )));
            }
        }

        match self.columns.iter().filter(|c| c.is_primary).count() {
            0 => {
                return Err(DbError::ConstraintViolation(format!(
                    "table {} must have a primary key",
                    self.name
                )))
            }
            1 => {
                if let Some(pk) = self.columns.iter().find(|c| c.is_primary && c.is_unique) {
                    return Err(DbError::ConstraintViolation(format!(
                        "primary key column {} in table {} cannot also be UNIQUE",
                        pk.name, self.name
                    )));
                }
            }
            n => {
                return Err(DbError::ConstraintViolation(format!(
                    "table {} declares {} primary keys, expected exactly one",
                    self.name, n
                )))
            }
        }

        for fk in &self.foreign_keys {
            if self.get_column(&fk.column).is_none() {
                return Err(DbError::ColumnNotFound(format!(
                    "foreign key column {} not in table {}",
                    fk.column, self.name
                )));
            }
        }

        Ok(())
    }

    /// Validate a row against this schema (entity shape + domain integrity)
    pub fn validate_row(&self, row: &[Value]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DbError::ConstraintViolation(format!(
                "column count mismatch: expected {}, got {}",
                self.columns.len(),
                row.len()
            )));
        }

        for (col, value) in self.columns.iter().zip(row) {
            if value.column_type() != col.col_type {
                return Err(DbError::ConstraintViolation(format!(
                    "type mismatch for column {}: expected {}, got {}",
                    col.name,
                    col.col_type,
                    value.column_type()
                )));
            }
        }

        Ok(())
    }
}
