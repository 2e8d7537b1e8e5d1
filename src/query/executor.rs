//! Plan nodes
//!
//! Every node materializes its whole output. Scans work on a pk-sorted snapshot
//! taken under the table's read lock, so no lock is held while rows are filtered.

use super::PlanSchema;
use crate::cancel::Cancellation;
use crate::error::Result;
use crate::sql::ast::Expr;
use crate::sql::evaluator::evaluate;
use crate::storage::Table;
use crate::types::{Row, Value};
use std::fmt;
use std::sync::Arc;

/// Per-row filter applied by [`ScanNode`]
pub type Predicate = Box<dyn Fn(&[Value]) -> bool + Send + Sync>;

pub trait PlanNode: Send + Sync {
    fn execute(&self, cancel: &Cancellation) -> Result<Vec<Row>>;

    fn schema(&self) -> &PlanSchema;

    /// One-line rendering of this subtree, e.g. `Limit(2, Scan(users))`
    fn describe(&self) -> String;
}

impl fmt::Debug for dyn PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Full table scan with an optional predicate
pub struct ScanNode {
    table: Arc<Table>,
    schema: PlanSchema,
    predicate: Option<Predicate>,
}

impl ScanNode {
    pub fn new(table: Arc<Table>) -> Self {
        let schema = PlanSchema::from_table(table.schema());
        Self {
            table,
            schema,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

impl PlanNode for ScanNode {
    fn execute(&self, cancel: &Cancellation) -> Result<Vec<Row>> {
        let mut out = Vec::new();
        for row in self.table.snapshot() {
            cancel.check()?;
            if self.predicate.as_ref().map_or(true, |p| p(&row)) {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn schema(&self) -> &PlanSchema {
        &self.schema
    }

    fn describe(&self) -> String {
        match self.predicate {
            Some(_) => format!("Scan({}, filtered)", self.table.name()),
            None => format!("Scan({})", self.table.name()),
        }
    }
}

/// Exact-match lookup through a primary/unique index: zero or one row
pub struct IndexScanNode {
    table: Arc<Table>,
    column: String,
    value: Value,
    schema: PlanSchema,
}

impl IndexScanNode {
    pub fn new(table: Arc<Table>, column: impl Into<String>, value: Value) -> Self {
        let schema = PlanSchema::from_table(table.schema());
        Self {
            table,
            column: column.into(),
            value,
            schema,
        }
    }
}

impl PlanNode for IndexScanNode {
    fn execute(&self, cancel: &Cancellation) -> Result<Vec<Row>> {
        cancel.check()?;
        Ok(self
            .table
            .lookup_row(&self.column, &self.value)?
            .into_iter()
            .collect())
    }

    fn schema(&self) -> &PlanSchema {
        &self.schema
    }

    fn describe(&self) -> String {
        format!("IndexScan({}.{} = {})", self.table.name(), self.column, self.value)
    }
}

/// Nested-loop inner equi-join. Output is `left ++ right`, in left order then right order.
pub struct JoinNode {
    left: Box<dyn PlanNode>,
    right: Box<dyn PlanNode>,
    left_position: usize,
    right_position: usize,
    schema: PlanSchema,
}

impl JoinNode {
    /// `left_position`/`right_position` index into the respective input schemas
    pub fn new(
        left: Box<dyn PlanNode>,
        right: Box<dyn PlanNode>,
        left_position: usize,
        right_position: usize,
    ) -> Self {
        let schema = PlanSchema::concat(left.schema(), right.schema());
        Self {
            left,
            right,
            left_position,
            right_position,
            schema,
        }
    }
}

impl PlanNode for JoinNode {
    fn execute(&self, cancel: &Cancellation) -> Result<Vec<Row>> {
        let left_rows = self.left.execute(cancel)?;
        let right_rows = self.right.execute(cancel)?;

        let mut out = Vec::new();
        for left in &left_rows {
            cancel.check()?;
            let Some(key) = left.get(self.left_position) else {
                continue;
            };
            for right in &right_rows {
                if right.get(self.right_position).is_some_and(|v| key.sql_eq(v)) {
                    let mut joined = Vec::with_capacity(left.len() + right.len());
                    joined.extend_from_slice(left);
                    joined.extend_from_slice(right);
                    out.push(joined);
                }
            }
        }
        Ok(out)
    }

    fn schema(&self) -> &PlanSchema {
        &self.schema
    }

    fn describe(&self) -> String {
        format!("Join({}, {})", self.left.describe(), self.right.describe())
    }
}

/// Predicate over an arbitrary input, resolved against the input's schema
pub struct FilterNode {
    input: Box<dyn PlanNode>,
    predicate: Expr,
}

impl FilterNode {
    pub fn new(input: Box<dyn PlanNode>, predicate: Expr) -> Self {
        Self { input, predicate }
    }
}

impl PlanNode for FilterNode {
    fn execute(&self, cancel: &Cancellation) -> Result<Vec<Row>> {
        let schema = self.input.schema();
        let mut out = Vec::new();
        for row in self.input.execute(cancel)? {
            cancel.check()?;
            if evaluate(&self.predicate, &row, schema) {
                out.push(row);
            }
        }
        Ok(out)
    }

    fn schema(&self) -> &PlanSchema {
        self.input.schema()
    }

    fn describe(&self) -> String {
        format!("Filter({}, {})", self.predicate, self.input.describe())
    }
}

/// First `limit` rows of its input
pub struct LimitNode {
    input: Box<dyn PlanNode>,
    limit: usize,
}

impl LimitNode {
    pub fn new(input: Box<dyn PlanNode>, limit: usize) -> Self {
        Self { input, limit }
    }
}

impl PlanNode for LimitNode {
    fn execute(&self, cancel: &Cancellation) -> Result<Vec<Row>> {
        let mut rows = self.input.execute(cancel)?;
        rows.truncate(self.limit);
        Ok(rows)
    }

    fn schema(&self) -> &PlanSchema {
        self.input.schema()
    }

    fn describe(&self) -> String {
        format!("Limit({}, {})", self.limit, self.input.describe())
    }
}
