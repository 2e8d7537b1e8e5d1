/// Query executor - runs parsed statements against the table registry
use super::ast::*;
use super::evaluator::evaluate;
use crate::cancel::Cancellation;
use crate::catalog::TableRegistry;
use crate::error::{DbError, Result};
use crate::query::{PlanSchema, Planner};
use crate::storage::Table;
use crate::types::{Row, TableSchema, Value};
use std::collections::HashMap;

/// Query result
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// SELECT result
    Select {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },

    /// INSERT/UPDATE/DELETE result
    Modification {
        affected_rows: usize,
        message: String,
    },

    /// CREATE result
    Definition {
        message: String,
    },
}

impl QueryResult {
    fn modification(affected_rows: usize, message: String) -> Self {
        QueryResult::Modification {
            affected_rows,
            message,
        }
    }

    /// Status line for DDL/DML results; `None` for SELECT
    pub fn message(&self) -> Option<&str> {
        match self {
            QueryResult::Select { .. } => None,
            QueryResult::Modification { message, .. } | QueryResult::Definition { message } => {
                Some(message)
            }
        }
    }

    pub fn affected_rows(&self) -> usize {
        match self {
            QueryResult::Modification { affected_rows, .. } => *affected_rows,
            _ => 0,
        }
    }

    /// Get columns and rows from SELECT result
    /// Returns None if not a SELECT result
    pub fn select_rows(&self) -> Option<(&[String], &[Vec<Value>])> {
        match self {
            QueryResult::Select { columns, rows } => Some((columns.as_slice(), rows.as_slice())),
            _ => None,
        }
    }

    /// Get rows as maps (column_name -> value)
    /// Returns empty vec if not a SELECT result
    pub fn rows_as_maps(&self) -> Vec<HashMap<String, Value>> {
        match self {
            QueryResult::Select { columns, rows } => rows
                .iter()
                .map(|row| {
                    columns
                        .iter()
                        .zip(row.iter())
                        .map(|(col, val)| (col.clone(), val.clone()))
                        .collect()
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Get row count for SELECT results
    pub fn row_count(&self) -> usize {
        match self {
            QueryResult::Select { rows, .. } => rows.len(),
            QueryResult::Modification { affected_rows, .. } => *affected_rows,
            _ => 0,
        }
    }
}

pub struct QueryExecutor<'a> {
    registry: &'a TableRegistry,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(registry: &'a TableRegistry) -> Self {
        Self { registry }
    }

    pub fn execute(&self, stmt: Statement, cancel: &Cancellation) -> Result<QueryResult> {
        cancel.check()?;
        match stmt {
            Statement::Select(s) => self.execute_select(s, cancel),
            Statement::Insert(i) => self.execute_insert(i),
            Statement::Update(u) => self.execute_update(u, cancel),
            Statement::Delete(d) => self.execute_delete(d, cancel),
            Statement::CreateTable(c) => self.execute_create_table(c),
        }
    }

    fn execute_create_table(&self, stmt: CreateTableStmt) -> Result<QueryResult> {
        let exists = || QueryResult::Definition {
            message: format!("Table {} already exists", stmt.table),
        };

        if stmt.if_not_exists && self.registry.table_exists(&stmt.table) {
            return Ok(exists());
        }

        let schema = TableSchema::new(stmt.table.clone(), stmt.columns.clone());
        match self.registry.create_table(schema) {
            Ok(_) => Ok(QueryResult::Definition {
                message: format!("Table {} created", stmt.table),
            }),
            Err(DbError::TableExists(_)) if stmt.if_not_exists => Ok(exists()),
            Err(e) => Err(e),
        }
    }

    fn execute_insert(&self, stmt: InsertStmt) -> Result<QueryResult> {
        let table = self.registry.get_table(&stmt.table)?;
        table.insert(stmt.values)?;
        self.registry.save(&table)?;

        Ok(QueryResult::modification(1, "Insert successful".to_string()))
    }

    fn execute_update(&self, stmt: UpdateStmt, cancel: &Cancellation) -> Result<QueryResult> {
        let table = self.registry.get_table(&stmt.table)?;
        let assignments = resolve_assignments(&table, &stmt.assignments)?;
        let apply = |row: &mut Row| {
            for (pos, value) in &assignments {
                row[*pos] = value.clone();
            }
        };

        // single primary-key equality: direct row access
        if let Some(pk) = primary_key_equality(&table, &stmt.where_clause) {
            let affected = match table.update_with(pk, &apply) {
                Ok(()) => 1,
                Err(DbError::RowNotFound(_)) => 0,
                Err(e) => return Err(e),
            };
            self.registry.save(&table)?;
            return Ok(QueryResult::modification(affected, format!("Updated {} rows", affected)));
        }

        let keys = matching_keys(&table, &stmt.where_clause, cancel)?;
        let mut affected = 0;
        let outcome = keys.iter().try_for_each(|pk| {
            cancel.check()?;
            match table.update_with(pk, &apply) {
                Ok(()) => affected += 1,
                // removed since the scan
                Err(DbError::RowNotFound(_)) => {}
                Err(e) => {
                    tracing::warn!(table = %table.name(), pk = %pk, error = %e, "row skipped by UPDATE");
                }
            }
            Ok::<(), DbError>(())
        });

        self.finish_scan_mutation(&table, affected, outcome)?;
        Ok(QueryResult::modification(affected, format!("Updated {} rows", affected)))
    }

    fn execute_delete(&self, stmt: DeleteStmt, cancel: &Cancellation) -> Result<QueryResult> {
        let table = self.registry.get_table(&stmt.table)?;

        if let Some(pk) = primary_key_equality(&table, &stmt.where_clause) {
            let affected = match table.delete(pk) {
                Ok(_) => 1,
                Err(DbError::RowNotFound(_)) => 0,
                Err(e) => return Err(e),
            };
            self.registry.save(&table)?;
            return Ok(QueryResult::modification(affected, format!("Deleted {} rows", affected)));
        }

        let keys = matching_keys(&table, &stmt.where_clause, cancel)?;
        let mut affected = 0;
        let outcome = keys.iter().try_for_each(|pk| {
            cancel.check()?;
            match table.delete(pk) {
                Ok(_) => affected += 1,
                Err(e) => {
                    tracing::warn!(table = %table.name(), pk = %pk, error = %e, "row skipped by DELETE");
                }
            }
            Ok::<(), DbError>(())
        });

        self.finish_scan_mutation(&table, affected, outcome)?;
        Ok(QueryResult::modification(affected, format!("Deleted {} rows", affected)))
    }

    /// Persist after a scan-based mutation. Rows already changed before a
    /// cancellation are still written out, then the cancellation is reported.
    fn finish_scan_mutation(&self, table: &Table, affected: usize, outcome: Result<()>) -> Result<()> {
        match outcome {
            Ok(()) => self.registry.save(table),
            Err(e) => {
                if affected > 0 {
                    self.registry.save(table)?;
                }
                Err(e)
            }
        }
    }

    fn execute_select(&self, stmt: SelectStmt, cancel: &Cancellation) -> Result<QueryResult> {
        let plan = Planner::new(self.registry).plan_select(&stmt)?;
        let rows = plan.execute(cancel)?;
        let schema = plan.schema();

        match stmt.columns {
            SelectColumns::All => Ok(QueryResult::Select {
                columns: schema.column_names(),
                rows,
            }),
            SelectColumns::Named(names) => {
                let positions = names
                    .iter()
                    .map(|name| schema.resolve(name))
                    .collect::<Result<Vec<usize>>>()?;
                let rows = rows
                    .into_iter()
                    .map(|row| positions.iter().map(|&pos| row[pos].clone()).collect())
                    .collect();
                Ok(QueryResult::Select {
                    columns: names,
                    rows,
                })
            }
        }
    }
}

/// SET list as (position, value), checked against the schema before any row is touched
fn resolve_assignments(table: &Table, assignments: &[(String, Value)]) -> Result<Vec<(usize, Value)>> {
    let schema = PlanSchema::from_table(table.schema());
    assignments
        .iter()
        .map(|(column, value)| {
            let pos = schema.resolve(column)?;
            let expected = table.schema().columns[pos].col_type;
            if value.column_type() != expected {
                return Err(DbError::ConstraintViolation(format!(
                    "type mismatch for column {}: expected {}, got {}",
                    column,
                    expected,
                    value.column_type()
                )));
            }
            Ok((pos, value.clone()))
        })
        .collect()
}

/// The primary-key value when `expr` is exactly `pk_column = literal`
fn primary_key_equality<'e>(table: &Table, expr: &'e Expr) -> Option<&'e Value> {
    let (column, value) = expr.as_equality()?;
    let pos = PlanSchema::from_table(table.schema()).resolve(column).ok()?;
    (pos == table.primary_key_position()).then_some(value)
}

/// Primary keys of rows matching `expr`, collected from a snapshot
fn matching_keys(table: &Table, expr: &Expr, cancel: &Cancellation) -> Result<Vec<Value>> {
    let schema = PlanSchema::from_table(table.schema());
    let mut keys = Vec::new();
    for (pk, row) in table.snapshot_with_keys() {
        cancel.check()?;
        if evaluate(expr, &row, &schema) {
            keys.push(pk);
        }
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::sql::lexer::Lexer;
    use crate::sql::parser::Parser;
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, TableRegistry) {
        let dir = tempdir().unwrap();
        let registry = TableRegistry::new(EngineConfig::for_testing(dir.path())).unwrap();
        (dir, registry)
    }

    fn exec(registry: &TableRegistry, sql: &str) -> Result<QueryResult> {
        let stmt = Parser::new(Lexer::new(sql).tokenize()).parse()?;
        QueryExecutor::new(registry).execute(stmt, &Cancellation::new())
    }

    fn seed(registry: &TableRegistry) {
        exec(registry, "CREATE TABLE users (id INT PRIMARY KEY, email TEXT UNIQUE, city TEXT)").unwrap();
        for sql in [
            "INSERT INTO users VALUES (1, 'a@x', 'Oslo')",
            "INSERT INTO users VALUES (2, 'b@x', 'Rome')",
            "INSERT INTO users VALUES (3, 'c@x', 'Oslo')",
        ] {
            exec(registry, sql).unwrap();
        }
    }

    #[test]
    fn test_create_messages() {
        let (_dir, registry) = setup();
        let r = exec(&registry, "CREATE TABLE t (id INT PRIMARY KEY)").unwrap();
        assert_eq!(r.message(), Some("Table t created"));

        assert!(matches!(
            exec(&registry, "CREATE TABLE t (id INT PRIMARY KEY)"),
            Err(DbError::TableExists(_))
        ));
        let r = exec(&registry, "CREATE TABLE IF NOT EXISTS t (other TEXT)").unwrap();
        assert_eq!(r.message(), Some("Table t already exists"));

        assert!(matches!(
            exec(&registry, "CREATE TABLE nopk (a INT)"),
            Err(DbError::ConstraintViolation(_))
        ));
        assert!(exec(&registry, "CREATE TABLE dup (a INT PRIMARY KEY, a TEXT)").is_err());
    }

    #[test]
    fn test_insert_and_select_projection() {
        let (_dir, registry) = setup();
        seed(&registry);

        let r = exec(&registry, "SELECT city, id FROM users WHERE email = 'b@x'").unwrap();
        let (columns, rows) = r.select_rows().unwrap();
        assert_eq!(columns, ["city".to_string(), "id".to_string()]);
        assert_eq!(rows, [vec![Value::from("Rome"), Value::Integer(2)]]);

        let err = exec(&registry, "SELECT nope FROM users").unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(_)));
    }

    #[test]
    fn test_insert_failure_leaves_table_unchanged() {
        let (_dir, registry) = setup();
        seed(&registry);
        let err = exec(&registry, "INSERT INTO users VALUES (4, 'a@x', 'Oslo')").unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));
        assert_eq!(exec(&registry, "SELECT * FROM users").unwrap().row_count(), 3);
        assert!(matches!(
            exec(&registry, "INSERT INTO missing VALUES (1)"),
            Err(DbError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_update_paths() {
        let (_dir, registry) = setup();
        seed(&registry);

        let r = exec(&registry, "UPDATE users SET city = 'Pisa' WHERE id = 2").unwrap();
        assert_eq!(r.message(), Some("Updated 1 rows"));
        let r = exec(&registry, "UPDATE users SET city = 'Pisa' WHERE id = 42").unwrap();
        assert_eq!(r.affected_rows(), 0);

        let r = exec(&registry, "UPDATE users SET city = 'Bergen' WHERE city = 'Oslo'").unwrap();
        assert_eq!(r.affected_rows(), 2);
        let r = exec(&registry, "SELECT id FROM users WHERE city = 'Bergen'").unwrap();
        assert_eq!(r.row_count(), 2);
    }

    #[test]
    fn test_update_validation() {
        let (_dir, registry) = setup();
        seed(&registry);

        assert!(matches!(
            exec(&registry, "UPDATE users SET nope = 'x' WHERE id = 1"),
            Err(DbError::ColumnNotFound(_))
        ));
        assert!(matches!(
            exec(&registry, "UPDATE users SET city = 5 WHERE id = 1"),
            Err(DbError::ConstraintViolation(_))
        ));
        // primary-key fast path reports the constraint error
        assert!(matches!(
            exec(&registry, "UPDATE users SET email = 'b@x' WHERE id = 1"),
            Err(DbError::ConstraintViolation(_))
        ));
        // scan path skips the conflicting row; two Oslo rows cannot share one email
        let r = exec(&registry, "UPDATE users SET email = 'z@x' WHERE city = 'Oslo'").unwrap();
        assert_eq!(r.affected_rows(), 1);
        // setting the primary key to its own value is allowed
        let r = exec(&registry, "UPDATE users SET id = 2 WHERE id = 2").unwrap();
        assert_eq!(r.affected_rows(), 1);
    }

    #[test]
    fn test_delete_paths() {
        let (_dir, registry) = setup();
        seed(&registry);

        let r = exec(&registry, "DELETE FROM users WHERE id = 1").unwrap();
        assert_eq!(r.message(), Some("Deleted 1 rows"));
        let r = exec(&registry, "DELETE FROM users WHERE id = 1").unwrap();
        assert_eq!(r.affected_rows(), 0);

        let r = exec(&registry, "DELETE FROM users WHERE city = 'Oslo' OR city = 'Rome'").unwrap();
        assert_eq!(r.affected_rows(), 2);
        assert_eq!(exec(&registry, "SELECT * FROM users").unwrap().row_count(), 0);
        // freed unique value is reusable
        exec(&registry, "INSERT INTO users VALUES (9, 'a@x', 'Oslo')").unwrap();
    }

    #[test]
    fn test_cancelled_before_start() {
        let (_dir, registry) = setup();
        seed(&registry);
        let cancel = Cancellation::new();
        cancel.cancel();

        let stmt = Parser::new(Lexer::new("DELETE FROM users WHERE city = 'Oslo'").tokenize())
            .parse()
            .unwrap();
        let err = QueryExecutor::new(&registry).execute(stmt, &cancel).unwrap_err();
        assert!(matches!(err, DbError::Cancelled));
        assert_eq!(exec(&registry, "SELECT * FROM users").unwrap().row_count(), 3);
    }

    #[test]
    fn test_cancelled_scan_mutation_keeps_finished_rows() {
        let (_dir, registry) = setup();
        seed(&registry);
        let table = registry.get_table("users").unwrap();
        let executor = QueryExecutor::new(&registry);

        // one row deleted before the signal fired: saved, then Cancelled
        table.delete(&Value::Integer(1)).unwrap();
        let err = executor
            .finish_scan_mutation(&table, 1, Err(DbError::Cancelled))
            .unwrap_err();
        assert!(matches!(err, DbError::Cancelled));
        let on_disk = crate::storage::load_table("users", registry.config()).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert!(on_disk.get(&Value::Integer(1)).is_none());

        // nothing changed: the file is left alone
        table.delete(&Value::Integer(2)).unwrap();
        let err = executor
            .finish_scan_mutation(&table, 0, Err(DbError::Cancelled))
            .unwrap_err();
        assert!(matches!(err, DbError::Cancelled));
        let on_disk = crate::storage::load_table("users", registry.config()).unwrap();
        assert!(on_disk.get(&Value::Integer(2)).is_some());
    }

    #[test]
    fn test_rows_as_maps() {
        let (_dir, registry) = setup();
        seed(&registry);
        let r = exec(&registry, "SELECT * FROM users LIMIT 1").unwrap();
        let maps = r.rows_as_maps();
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0]["email"], Value::from("a@x"));
        assert!(r.message().is_none());
    }
}
