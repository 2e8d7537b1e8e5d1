//! In-memory table
//!
//! Owns the row map (primary key -> row) and one [`HashIndex`] per primary/unique
//! column. Rows and indexes sit behind a single reader/writer lock, so every
//! mutation validates and re-synchronizes its indexes atomically: a reader never
//! sees a row without its index entries or an index entry without its row.

use crate::error::{DbError, Result};
use crate::index::HashIndex;
use crate::types::{Row, TableSchema, Value};
use ahash::AHashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::cmp::Ordering;

struct TableState {
    /// primary key -> row
    rows: AHashMap<Value, Row>,
    /// column position -> index, for every primary/unique column
    indexes: AHashMap<usize, HashIndex>,
}

pub struct Table {
    schema: TableSchema,
    pk_position: usize,
    state: RwLock<TableState>,
    /// Serializes saves of this table; never held together with `state`'s write lock
    save_lock: Mutex<()>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.schema.name)
            .field("rows", &self.len())
            .finish()
    }
}

impl Table {
    /// Create an empty table. The schema must pass [`TableSchema::validate`].
    pub fn new(mut schema: TableSchema) -> Result<Self> {
        schema.validate()?;
        schema.rebuild_column_map();

        let pk_position = schema
            .primary_key_position()
            .ok_or_else(|| DbError::ConstraintViolation(format!("table {} has no primary key", schema.name)))?;

        let indexes = schema
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.is_indexed())
            .map(|(pos, col)| (pos, HashIndex::new(col.name.clone())))
            .collect();

        Ok(Self {
            schema,
            pk_position,
            state: RwLock::new(TableState {
                rows: AHashMap::new(),
                indexes,
            }),
            save_lock: Mutex::new(()),
        })
    }

    /// Build a table from previously persisted rows, rebuilding every index.
    ///
    /// Any row that would violate a constraint means the file is not one we wrote.
    pub fn from_rows(schema: TableSchema, rows: Vec<Row>) -> Result<Self> {
        let table = Self::new(schema)?;
        for row in rows {
            table.insert(row).map_err(|e| {
                DbError::Corruption(format!("table {}: {}", table.name(), e))
            })?;
        }
        Ok(table)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn primary_key_position(&self) -> usize {
        self.pk_position
    }

    /// Whether `column` has a hash index (primary or unique)
    pub fn has_index(&self, column: &str) -> bool {
        self.schema
            .get_column(column)
            .map(|c| c.is_indexed())
            .unwrap_or(false)
    }

    /// Insert a new row.
    ///
    /// Fails on column count or type mismatch, on a duplicate primary key, and on a
    /// value already present in any unique column.
    pub fn insert(&self, values: Row) -> Result<()> {
        self.schema.validate_row(&values)?;
        let pk = values[self.pk_position].clone();

        let mut state = self.state.write();

        if state.rows.contains_key(&pk) {
            return Err(DbError::ConstraintViolation(format!(
                "duplicate primary key: {}",
                pk
            )));
        }

        for (pos, index) in state.indexes.iter() {
            if *pos != self.pk_position && index.contains(&values[*pos]) {
                return Err(DbError::ConstraintViolation(format!(
                    "duplicate unique value for column {}: {}",
                    index.column(),
                    values[*pos]
                )));
            }
        }

        for (pos, index) in state.indexes.iter_mut() {
            index.set(values[*pos].clone(), pk.clone());
        }
        state.rows.insert(pk, values);

        Ok(())
    }

    /// Overwrite the row stored under `pk`.
    ///
    /// The primary-key cell must not change. A unique value may stay the same
    /// (no self-conflict) but must not collide with another row.
    pub fn update(&self, pk: &Value, new_values: Row) -> Result<()> {
        self.update_with(pk, move |row| *row = new_values)
    }

    /// Read-modify-write of the row stored under `pk` under a single write lock.
    ///
    /// `apply` edits a copy of the current row; the result goes through the same
    /// checks as [`Table::update`]. On error the stored row is left untouched.
    pub fn update_with<F>(&self, pk: &Value, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Row),
    {
        let mut state = self.state.write();
        let state = &mut *state;

        let old = state
            .rows
            .get(pk)
            .ok_or_else(|| DbError::RowNotFound(format!("no row with primary key {} in {}", pk, self.name())))?;

        let mut new_values = old.clone();
        apply(&mut new_values);
        self.schema.validate_row(&new_values)?;

        if new_values[self.pk_position] != old[self.pk_position] {
            return Err(DbError::ConstraintViolation(
                "updating primary key is not supported".to_string(),
            ));
        }

        for (pos, index) in state.indexes.iter() {
            if *pos == self.pk_position || new_values[*pos] == old[*pos] {
                continue;
            }
            if let Some(owner) = index.get(&new_values[*pos]) {
                if owner != pk {
                    return Err(DbError::ConstraintViolation(format!(
                        "duplicate unique value for column {}: {}",
                        index.column(),
                        new_values[*pos]
                    )));
                }
            }
        }

        for (pos, index) in state.indexes.iter_mut() {
            if *pos == self.pk_position || new_values[*pos] == old[*pos] {
                continue;
            }
            index.remove(&old[*pos]);
            index.set(new_values[*pos].clone(), pk.clone());
        }

        state.rows.insert(pk.clone(), new_values);
        Ok(())
    }

    /// Remove the row stored under `pk` together with all of its index entries
    pub fn delete(&self, pk: &Value) -> Result<Row> {
        let mut state = self.state.write();

        let row = state
            .rows
            .remove(pk)
            .ok_or_else(|| DbError::RowNotFound(format!("no row with primary key {} in {}", pk, self.name())))?;

        for (pos, index) in state.indexes.iter_mut() {
            index.remove(&row[*pos]);
        }

        Ok(row)
    }

    /// Copy of the row stored under `pk`
    pub fn get(&self, pk: &Value) -> Option<Row> {
        self.state.read().rows.get(pk).cloned()
    }

    /// Primary key of the row whose `column` equals `value`
    pub fn index_lookup(&self, column: &str, value: &Value) -> Option<Value> {
        let pos = self.schema.get_column_position(column)?;
        self.state.read().indexes.get(&pos)?.get(value).cloned()
    }

    /// Index lookup followed by the row fetch, under one read lock.
    ///
    /// An index entry pointing at a missing row is tolerated and reported as "no row".
    pub fn lookup_row(&self, column: &str, value: &Value) -> Result<Option<Row>> {
        let pos = self
            .schema
            .get_column_position(column)
            .ok_or_else(|| DbError::ColumnNotFound(format!("{}.{}", self.name(), column)))?;

        let state = self.state.read();
        let index = state.indexes.get(&pos).ok_or_else(|| {
            DbError::PlanError(format!("column {}.{} has no index", self.name(), column))
        })?;

        let Some(pk) = index.get(value) else {
            return Ok(None);
        };

        match state.rows.get(pk) {
            Some(row) => Ok(Some(row.clone())),
            None => {
                tracing::warn!(
                    table = %self.name(),
                    column = %column,
                    pk = %pk,
                    "index entry points to a missing row"
                );
                Ok(None)
            }
        }
    }

    /// All rows with their primary keys, sorted by primary key.
    ///
    /// The read lock is held only while copying; sorting happens after release.
    pub fn snapshot_with_keys(&self) -> Vec<(Value, Row)> {
        let mut entries: Vec<(Value, Row)> = {
            let state = self.state.read();
            state
                .rows
                .iter()
                .map(|(pk, row)| (pk.clone(), row.clone()))
                .collect()
        };
        // every key has the primary key's type, so compare never fails here
        entries.sort_by(|a, b| a.0.compare(&b.0).unwrap_or(Ordering::Equal));
        entries
    }

    /// All rows, sorted by primary key
    pub fn snapshot(&self) -> Vec<Row> {
        self.snapshot_with_keys()
            .into_iter()
            .map(|(_, row)| row)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Held for the duration of one save (snapshot + write + rename)
    pub(crate) fn save_guard(&self) -> MutexGuard<'_, ()> {
        self.save_lock.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, ColumnType};
    use std::sync::Arc;

    fn users() -> Table {
        Table::new(TableSchema::new(
            "users",
            vec![
                ColumnDef::new("id", ColumnType::Integer).primary_key(),
                ColumnDef::new("email", ColumnType::Text).unique(),
                ColumnDef::new("name", ColumnType::Text),
            ],
        ))
        .unwrap()
    }

    fn row(id: i64, email: &str, name: &str) -> Row {
        vec![Value::Integer(id), Value::from(email), Value::from(name)]
    }

    /// Every live row is reachable through each of its indexes, and index sizes match
    fn assert_consistent(table: &Table) {
        let rows = table.snapshot_with_keys();
        for (pk, r) in &rows {
            assert_eq!(table.index_lookup("id", &r[0]).as_ref(), Some(pk));
            assert_eq!(table.index_lookup("email", &r[1]).as_ref(), Some(pk));
        }
        let state = table.state.read();
        for index in state.indexes.values() {
            assert_eq!(index.len(), rows.len());
        }
    }

    #[test]
    fn test_new_requires_primary_key() {
        let schema = TableSchema::new("t", vec![ColumnDef::new("a", ColumnType::Integer)]);
        assert!(matches!(Table::new(schema), Err(DbError::ConstraintViolation(_))));
    }

    #[test]
    fn test_insert_and_get() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&Value::Integer(1)), Some(row(1, "a@x", "Alice")));
        assert!(table.get(&Value::Integer(2)).is_none());
    }

    #[test]
    fn test_duplicate_primary_key_leaves_table_unchanged() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();

        let err = table.insert(row(1, "b@x", "Bob")).unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(table.len(), 1);
        assert!(table.index_lookup("email", &Value::from("b@x")).is_none());
        assert_consistent(&table);
    }

    #[test]
    fn test_duplicate_unique_value() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        let err = table.insert(row(2, "a@x", "Alice2")).unwrap_err();
        assert!(err.to_string().contains("email"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_rejects_shape_and_type() {
        let table = users();
        assert!(table.insert(vec![Value::Integer(1)]).is_err());
        assert!(table
            .insert(vec![Value::from("1"), Value::from("a@x"), Value::from("A")])
            .is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_update_unique_to_own_value_succeeds() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        table.update(&Value::Integer(1), row(1, "a@x", "Alicia")).unwrap();
        assert_eq!(table.get(&Value::Integer(1)).unwrap()[2], Value::from("Alicia"));
        assert_consistent(&table);
    }

    #[test]
    fn test_update_unique_collision() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        table.insert(row(2, "b@x", "Bob")).unwrap();

        let err = table.update(&Value::Integer(2), row(2, "a@x", "Bob")).unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(table.get(&Value::Integer(2)).unwrap()[1], Value::from("b@x"));
        assert_consistent(&table);
    }

    #[test]
    fn test_update_moves_index_entry() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        table.update(&Value::Integer(1), row(1, "new@x", "Alice")).unwrap();

        assert!(table.index_lookup("email", &Value::from("a@x")).is_none());
        assert_eq!(table.index_lookup("email", &Value::from("new@x")), Some(Value::Integer(1)));
        // the freed value can be taken by another row
        table.insert(row(2, "a@x", "Ann")).unwrap();
        assert_consistent(&table);
    }

    #[test]
    fn test_update_rejects_primary_key_change_and_missing_row() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();

        let err = table.update(&Value::Integer(1), row(9, "a@x", "Alice")).unwrap_err();
        assert!(err.to_string().contains("primary key"));

        let err = table.update(&Value::Integer(5), row(5, "z@x", "Zed")).unwrap_err();
        assert!(matches!(err, DbError::RowNotFound(_)));
    }

    #[test]
    fn test_delete_removes_index_entries() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        table.insert(row(2, "b@x", "Bob")).unwrap();

        let removed = table.delete(&Value::Integer(1)).unwrap();
        assert_eq!(removed, row(1, "a@x", "Alice"));
        assert!(table.index_lookup("id", &Value::Integer(1)).is_none());
        assert!(table.index_lookup("email", &Value::from("a@x")).is_none());
        assert!(matches!(table.delete(&Value::Integer(1)), Err(DbError::RowNotFound(_))));
        assert_consistent(&table);
    }

    #[test]
    fn test_snapshot_sorted_by_primary_key() {
        let table = users();
        for id in [5, 1, 9, 3, 7] {
            table.insert(row(id, &format!("{}@x", id), "n")).unwrap();
        }
        let ids: Vec<i64> = table
            .snapshot()
            .iter()
            .map(|r| r[0].as_integer().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn test_lookup_row_tolerates_dangling_entry() {
        let table = users();
        table.insert(row(1, "a@x", "Alice")).unwrap();
        assert!(table.lookup_row("email", &Value::from("a@x")).unwrap().is_some());

        // break invariant on purpose: row gone, index entry left behind
        table.state.write().rows.remove(&Value::Integer(1));
        assert!(table.lookup_row("email", &Value::from("a@x")).unwrap().is_none());
        assert!(matches!(
            table.lookup_row("name", &Value::from("Alice")),
            Err(DbError::PlanError(_))
        ));
    }

    #[test]
    fn test_from_rows_rebuilds_indexes_and_rejects_duplicates() {
        let schema = users().schema().clone();
        let table = Table::from_rows(
            schema.clone(),
            vec![row(2, "b@x", "Bob"), row(1, "a@x", "Alice")],
        )
        .unwrap();
        assert_consistent(&table);

        let err = Table::from_rows(schema, vec![row(1, "a@x", "A"), row(1, "b@x", "B")]).unwrap_err();
        assert!(matches!(err, DbError::Corruption(_)));
    }

    #[test]
    fn test_concurrent_inserts() {
        let table = Arc::new(users());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let id = t * 1000 + i;
                        table.insert(row(id, &format!("{}@x", id), "n")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(table.len(), 400);
        assert_consistent(&table);
    }

    #[test]
    fn test_update_with_failure_keeps_row() {
        let table = users();
        table.insert(row(1, "a@x", "Ann")).unwrap();
        table.insert(row(2, "b@x", "Bob")).unwrap();

        let err = table
            .update_with(&Value::Integer(2), |r| {
                r[1] = Value::from("a@x");
                r[2] = Value::from("Robert");
            })
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(table.get(&Value::Integer(2)), Some(row(2, "b@x", "Bob")));

        let err = table
            .update_with(&Value::Integer(2), |r| r[2] = Value::Integer(7))
            .unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert!(matches!(
            table.update_with(&Value::Integer(9), |_| {}),
            Err(DbError::RowNotFound(_))
        ));
        assert_consistent(&table);
    }

    #[test]
    fn test_concurrent_update_with_on_one_row() {
        let table = Arc::new(Table::new(TableSchema::new(
            "counters",
            vec![
                ColumnDef::new("id", ColumnType::Integer).primary_key(),
                ColumnDef::new("a", ColumnType::Integer),
                ColumnDef::new("b", ColumnType::Integer),
            ],
        ))
        .unwrap());
        let pk = Value::Integer(1);
        table.insert(vec![pk.clone(), Value::Integer(0), Value::Integer(0)]).unwrap();

        let handles: Vec<_> = [1usize, 2]
            .into_iter()
            .map(|pos| {
                let table = Arc::clone(&table);
                let pk = pk.clone();
                std::thread::spawn(move || {
                    for i in 1..=5000 {
                        table
                            .update_with(&pk, |r| r[pos] = Value::Integer(i))
                            .unwrap();
                        // no other writer touches this column
                        assert_eq!(table.get(&pk).unwrap()[pos], Value::Integer(i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(
            table.get(&pk),
            Some(vec![pk.clone(), Value::Integer(5000), Value::Integer(5000)])
        );
    }
}
