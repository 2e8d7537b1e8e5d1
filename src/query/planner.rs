//! Query planner
//!
//! Access-path choice:
//! - `WHERE col = literal` on a primary/unique column → `IndexScan`
//! - any other predicate → `Scan` with a per-row predicate
//! - `JOIN` → `Join(left access path, Scan(right))`, WHERE pushed below the join
//!   when it only touches the left table, else `Filter` above it
//! - `LIMIT n` wraps the whole tree

use super::executor::{FilterNode, IndexScanNode, JoinNode, LimitNode, PlanNode, ScanNode};
use super::PlanSchema;
use crate::catalog::TableRegistry;
use crate::error::{DbError, Result};
use crate::sql::ast::{Expr, JoinClause, SelectStmt, Statement};
use crate::sql::evaluator::evaluate;
use crate::storage::Table;
use crate::types::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

pub struct Planner<'a> {
    registry: &'a TableRegistry,
}

impl<'a> Planner<'a> {
    pub fn new(registry: &'a TableRegistry) -> Self {
        Self { registry }
    }

    /// Build a plan tree; only SELECT statements are planned
    pub fn create_plan(&self, stmt: &Statement) -> Result<Box<dyn PlanNode>> {
        match stmt {
            Statement::Select(select) => self.plan_select(select),
            _ => Err(DbError::PlanError(
                "only SELECT statements can be planned".to_string(),
            )),
        }
    }

    pub fn plan_select(&self, stmt: &SelectStmt) -> Result<Box<dyn PlanNode>> {
        let left = self.resolve_table(&stmt.from)?;

        let mut plan = match &stmt.join {
            Some(join) => self.plan_join(left, join, stmt.where_clause.as_ref())?,
            None => plan_access(left, stmt.where_clause.as_ref()),
        };

        if let Some(limit) = stmt.limit {
            plan = Box::new(LimitNode::new(plan, limit));
        }

        tracing::debug!(plan = %plan.describe(), "select planned");
        Ok(plan)
    }

    fn plan_join(
        &self,
        left: Arc<Table>,
        join: &JoinClause,
        where_clause: Option<&Expr>,
    ) -> Result<Box<dyn PlanNode>> {
        let right = self.resolve_table(&join.table)?;

        let left_schema = PlanSchema::from_table(left.schema());
        let right_schema = PlanSchema::from_table(right.schema());

        let (left_column, right_column) = assign_join_operands(&left, &right, join)?;
        let left_position = left_schema.resolve(left_column).map_err(|_| {
            DbError::PlanError(format!(
                "join column {} not found in table {}",
                left_column,
                left.name()
            ))
        })?;
        let right_position = right_schema.resolve(right_column).map_err(|_| {
            DbError::PlanError(format!(
                "join column {} not found in table {}",
                right_column,
                right.name()
            ))
        })?;

        let joined = PlanSchema::concat(&left_schema, &right_schema);
        let pushdown = match where_clause {
            Some(expr) => left_only(expr, &joined, left_schema.len())?,
            None => false,
        };

        let left_plan = if pushdown {
            plan_access(left, where_clause)
        } else {
            plan_access(left, None)
        };
        let node: Box<dyn PlanNode> = Box::new(JoinNode::new(
            left_plan,
            Box::new(ScanNode::new(right)),
            left_position,
            right_position,
        ));

        match where_clause {
            Some(expr) if !pushdown => Ok(Box::new(FilterNode::new(node, expr.clone()))),
            _ => Ok(node),
        }
    }

    fn resolve_table(&self, name: &str) -> Result<Arc<Table>> {
        self.registry.get_table(name).map_err(|e| match e {
            DbError::TableNotFound(_) => DbError::PlanError(format!("table {} does not exist", name)),
            other => other,
        })
    }
}

/// Index lookup for a single equality on an indexed column, otherwise a (filtered) scan
fn plan_access(table: Arc<Table>, where_clause: Option<&Expr>) -> Box<dyn PlanNode> {
    let Some(expr) = where_clause else {
        return Box::new(ScanNode::new(table));
    };

    let schema = PlanSchema::from_table(table.schema());

    if let Some((column, value)) = expr.as_equality() {
        if let Ok(pos) = schema.resolve(column) {
            let col = &table.schema().columns[pos];
            if col.is_indexed() {
                tracing::debug!(table = %table.name(), column = %col.name, "using index scan");
                let name = col.name.clone();
                return Box::new(IndexScanNode::new(table, name, Value::clone(value)));
            }
        }
    }

    tracing::debug!(table = %table.name(), predicate = %expr, "using full scan");
    let expr = expr.clone();
    Box::new(ScanNode::new(table).with_predicate(Box::new(move |row: &[Value]| {
        evaluate(&expr, row, &schema)
    })))
}

/// Map `ON a = b` onto (left column, right column).
///
/// Qualified operands go to the table they name; bare operands are positional.
fn assign_join_operands<'j>(
    left: &Table,
    right: &Table,
    join: &'j JoinClause,
) -> Result<(&'j str, &'j str)> {
    let side = |name: &str| -> Option<Side> {
        let (qualifier, _) = name.split_once('.')?;
        match (qualifier == left.name(), qualifier == right.name()) {
            (true, false) => Some(Side::Left),
            (false, true) => Some(Side::Right),
            _ => None,
        }
    };

    let first = join.left_column.as_str();
    let second = join.right_column.as_str();

    match (side(first), side(second)) {
        (Some(a), Some(b)) if a == b => Err(DbError::PlanError(format!(
            "join condition {} = {} refers to one table only",
            first, second
        ))),
        (Some(Side::Right), _) | (None, Some(Side::Left)) => Ok((second, first)),
        _ => Ok((first, second)),
    }
}

/// Whether every column of `expr` resolves to a left-input column of the join.
/// A bare name present on both sides is rejected.
fn left_only(expr: &Expr, joined: &PlanSchema, left_len: usize) -> Result<bool> {
    let mut all_left = true;
    for column in expr.columns() {
        if joined.is_ambiguous(column) {
            return Err(DbError::PlanError(format!("ambiguous column name {}", column)));
        }
        match joined.resolve(column) {
            Ok(pos) if pos < left_len => {}
            _ => all_left = false,
        }
    }
    Ok(all_left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::Cancellation;
    use crate::config::EngineConfig;
    use crate::sql::lexer::Lexer;
    use crate::sql::parser::Parser;
    use crate::types::{ColumnDef, ColumnType, TableSchema};
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, TableRegistry) {
        let dir = tempdir().unwrap();
        let registry = TableRegistry::new(EngineConfig::for_testing(dir.path())).unwrap();

        let users = registry
            .create_table(TableSchema::new(
                "users",
                vec![
                    ColumnDef::new("id", ColumnType::Integer).primary_key(),
                    ColumnDef::new("name", ColumnType::Text).unique(),
                ],
            ))
            .unwrap();
        users.insert(vec![Value::Integer(1), Value::from("Alice")]).unwrap();
        users.insert(vec![Value::Integer(2), Value::from("Bob")]).unwrap();

        let orders = registry
            .create_table(TableSchema::new(
                "orders",
                vec![
                    ColumnDef::new("id", ColumnType::Integer).primary_key(),
                    ColumnDef::new("user_id", ColumnType::Integer),
                    ColumnDef::new("amount", ColumnType::Integer),
                ],
            ))
            .unwrap();
        for (id, user, amount) in [(100, 1, 50), (101, 3, 75)] {
            orders
                .insert(vec![Value::Integer(id), Value::Integer(user), Value::Integer(amount)])
                .unwrap();
        }

        (dir, registry)
    }

    fn plan(registry: &TableRegistry, sql: &str) -> Result<Box<dyn PlanNode>> {
        let stmt = Parser::new(Lexer::new(sql).tokenize()).parse()?;
        Planner::new(registry).create_plan(&stmt)
    }

    fn run(registry: &TableRegistry, sql: &str) -> Vec<Vec<Value>> {
        plan(registry, sql).unwrap().execute(&Cancellation::new()).unwrap()
    }

    #[test]
    fn test_access_path_selection() {
        let (_dir, registry) = setup();
        assert_eq!(
            plan(&registry, "SELECT * FROM users WHERE id = 1").unwrap().describe(),
            "IndexScan(users.id = 1)"
        );
        assert_eq!(
            plan(&registry, "SELECT * FROM users WHERE users.name = 'Bob'").unwrap().describe(),
            "IndexScan(users.name = Bob)"
        );
        assert_eq!(
            plan(&registry, "SELECT * FROM orders WHERE user_id = 1").unwrap().describe(),
            "Scan(orders, filtered)"
        );
        assert_eq!(
            plan(&registry, "SELECT * FROM users WHERE id = 1 OR id = 2").unwrap().describe(),
            "Scan(users, filtered)"
        );
        assert_eq!(
            plan(&registry, "SELECT * FROM users LIMIT 1").unwrap().describe(),
            "Limit(1, Scan(users))"
        );
    }

    #[test]
    fn test_index_and_scan_paths_agree() {
        let (_dir, registry) = setup();
        for id in [1, 2, 3] {
            let via_index = run(&registry, &format!("SELECT * FROM users WHERE id = {}", id));
            let via_scan = run(
                &registry,
                &format!("SELECT * FROM users WHERE id = {} AND id = {}", id, id),
            );
            assert_eq!(via_index, via_scan);
        }
    }

    #[test]
    fn test_join_either_operand_order() {
        let (_dir, registry) = setup();
        let expected = vec![vec![
            Value::Integer(100),
            Value::Integer(1),
            Value::Integer(50),
            Value::Integer(1),
            Value::from("Alice"),
        ]];
        assert_eq!(
            run(&registry, "SELECT * FROM orders JOIN users ON orders.user_id = users.id"),
            expected
        );
        assert_eq!(
            run(&registry, "SELECT * FROM orders JOIN users ON users.id = orders.user_id"),
            expected
        );
        assert_eq!(run(&registry, "SELECT * FROM orders JOIN users ON user_id = id"), expected);
    }

    #[test]
    fn test_join_where_pushdown_and_filter() {
        let (_dir, registry) = setup();
        let pushed = plan(
            &registry,
            "SELECT * FROM users JOIN orders ON users.id = orders.user_id WHERE users.id = 1",
        )
        .unwrap();
        assert_eq!(pushed.describe(), "Join(IndexScan(users.id = 1), Scan(orders))");
        assert_eq!(pushed.execute(&Cancellation::new()).unwrap().len(), 1);

        let filtered = plan(
            &registry,
            "SELECT * FROM users JOIN orders ON users.id = orders.user_id WHERE amount = 50",
        )
        .unwrap();
        assert!(filtered.describe().starts_with("Filter("));
        assert_eq!(filtered.execute(&Cancellation::new()).unwrap().len(), 1);

        let ambiguous = plan(
            &registry,
            "SELECT * FROM users JOIN orders ON users.id = orders.user_id WHERE id = 1",
        );
        assert!(matches!(ambiguous, Err(DbError::PlanError(_))));
    }

    #[test]
    fn test_plan_errors() {
        let (_dir, registry) = setup();
        for sql in [
            "SELECT * FROM missing",
            "SELECT * FROM users JOIN missing ON users.id = missing.id",
            "SELECT * FROM orders JOIN users ON orders.nope = users.id",
            "SELECT * FROM orders JOIN users ON orders.user_id = users.nope",
            "SELECT * FROM orders JOIN users ON orders.id = orders.user_id",
        ] {
            assert!(
                matches!(plan(&registry, sql), Err(DbError::PlanError(_))),
                "expected plan error for {}",
                sql
            );
        }

        let stmt = Parser::new(Lexer::new("DELETE FROM users WHERE id = 1").tokenize())
            .parse()
            .unwrap();
        assert!(matches!(
            Planner::new(&registry).create_plan(&stmt),
            Err(DbError::PlanError(_))
        ));
    }

    #[test]
    fn test_limit_prefix() {
        let (_dir, registry) = setup();
        let all = run(&registry, "SELECT * FROM users");
        for n in 0..4 {
            let limited = run(&registry, &format!("SELECT * FROM users LIMIT {}", n));
            assert_eq!(limited.len(), n.min(all.len()));
            assert_eq!(limited[..], all[..limited.len()]);
        }
    }
}
