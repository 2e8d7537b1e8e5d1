//! Query planning and execution
//!
//! `Planner` turns a SELECT into a tree of [`PlanNode`]s; each node produces its
//! full output (`Vec<Row>`) together with a [`PlanSchema`] describing it.

mod executor;
mod planner;

pub use executor::{FilterNode, IndexScanNode, JoinNode, LimitNode, PlanNode, Predicate, ScanNode};
pub use planner::Planner;

use crate::error::{DbError, Result};
use crate::types::{ColumnType, TableSchema};

/// One output column of a plan node, tagged with the table it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanColumn {
    pub table: String,
    pub name: String,
    pub col_type: ColumnType,
}

impl PlanColumn {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table, self.name)
    }
}

/// Output layout of a plan node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanSchema {
    columns: Vec<PlanColumn>,
}

impl PlanSchema {
    pub fn from_table(schema: &TableSchema) -> Self {
        Self {
            columns: schema
                .columns
                .iter()
                .map(|c| PlanColumn {
                    table: schema.name.clone(),
                    name: c.name.clone(),
                    col_type: c.col_type,
                })
                .collect(),
        }
    }

    /// Left columns followed by right columns
    pub fn concat(left: &PlanSchema, right: &PlanSchema) -> Self {
        Self {
            columns: left.columns.iter().chain(&right.columns).cloned().collect(),
        }
    }

    pub fn columns(&self) -> &[PlanColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether more than one source table contributes columns
    pub fn is_joined(&self) -> bool {
        self.columns
            .first()
            .map(|first| self.columns.iter().any(|c| c.table != first.table))
            .unwrap_or(false)
    }

    /// Header names: bare for a single table, `table.column` for joined output
    pub fn column_names(&self) -> Vec<String> {
        if self.is_joined() {
            self.columns.iter().map(PlanColumn::qualified_name).collect()
        } else {
            self.columns.iter().map(|c| c.name.clone()).collect()
        }
    }

    /// Position of `name` in this layout.
    ///
    /// `table.column` matches exactly that table's column; a bare name must match
    /// exactly one column.
    pub fn resolve(&self, name: &str) -> Result<usize> {
        match self.positions(name).as_slice() {
            [pos] => Ok(*pos),
            [] => Err(DbError::ColumnNotFound(name.to_string())),
            _ => Err(DbError::ColumnNotFound(format!(
                "ambiguous column name {}",
                name
            ))),
        }
    }

    /// A bare name shared by several input tables
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.positions(name).len() > 1
    }

    fn positions(&self, name: &str) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| match name.split_once('.') {
                Some((table, column)) => c.table == table && c.name == column,
                None => c.name == name,
            })
            .map(|(pos, _)| pos)
            .collect()
    }
}
