//! Engine table management
//!
//! Programmatic DDL, table metadata access and the advisory foreign-key check

use super::core::Engine;
use crate::error::{DbError, Result};
use crate::storage::Table;
use crate::types::{TableSchema, Value};
use std::sync::Arc;

impl Engine {
    /// Create a new table with schema
    ///
    /// Same validation and persistence as `CREATE TABLE`; also the only way to
    /// declare foreign keys.
    ///
    /// # Example
    /// ```ignore
    /// let schema = TableSchema::new("orders", vec![
    ///     ColumnDef::new("id", ColumnType::Integer).primary_key(),
    ///     ColumnDef::new("user_id", ColumnType::Integer),
    /// ])
    /// .with_foreign_key(ForeignKeyDef::new("user_id", "users", "id"));
    ///
    /// engine.create_table(schema)?;
    /// ```
    pub fn create_table(&self, schema: TableSchema) -> Result<Arc<Table>> {
        self.registry.create_table(schema)
    }

    /// Resolve a table (loading it from disk if needed) for read-only metadata access
    pub fn table(&self, name: &str) -> Result<Arc<Table>> {
        self.registry.get_table(name)
    }

    /// Loaded and persisted table names, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.registry.list_tables()
    }

    /// Check that every foreign key of `table` points at an existing parent row
    /// for the candidate row `values`.
    ///
    /// Advisory: `execute` never calls this. A front end may run it before an INSERT.
    pub fn check_foreign_keys(&self, table: &str, values: &[Value]) -> Result<()> {
        let child = self.table(table)?;
        let schema = child.schema();

        for fk in &schema.foreign_keys {
            let pos = schema
                .get_column_position(&fk.column)
                .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", table, fk.column)))?;
            let value = values.get(pos).ok_or_else(|| {
                DbError::ConstraintViolation(format!(
                    "column count mismatch: expected {}, got {}",
                    schema.column_count(),
                    values.len()
                ))
            })?;

            let parent = self.table(&fk.referenced_table).map_err(|e| match e {
                DbError::TableNotFound(_) => DbError::ConstraintViolation(format!(
                    "foreign key {}.{} references missing table {}",
                    table, fk.column, fk.referenced_table
                )),
                other => other,
            })?;

            if !parent_has_value(&parent, &fk.referenced_column, value)? {
                return Err(DbError::ConstraintViolation(format!(
                    "foreign key violation: {}.{} = {} has no match in {}.{}",
                    table, fk.column, value, fk.referenced_table, fk.referenced_column
                )));
            }
        }

        Ok(())
    }
}

fn parent_has_value(parent: &Table, column: &str, value: &Value) -> Result<bool> {
    if parent.has_index(column) {
        return Ok(parent.lookup_row(column, value)?.is_some());
    }

    let pos = parent
        .schema()
        .get_column_position(column)
        .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", parent.name(), column)))?;
    Ok(parent.snapshot().iter().any(|row| row[pos].sql_eq(value)))
}
