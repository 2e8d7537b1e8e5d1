/// Abstract Syntax Tree for SQL statements
use crate::types::{ColumnDef, Value};
use std::fmt;

/// Top-level SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    CreateTable(CreateTableStmt),
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub columns: SelectColumns,
    pub from: String,
    pub join: Option<JoinClause>,
    pub where_clause: Option<Expr>,
    /// None means unlimited; `LIMIT 0` is `Some(0)`
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumns {
    /// `*`: every column of the plan output, in order
    All,
    /// Explicit list; names may be qualified (`users.name`)
    Named(Vec<String>),
}

/// `JOIN table ON left_column = right_column` (inner equi-join)
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub left_column: String,
    pub right_column: String,
}

/// INSERT statement (full row, schema order)
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    pub values: Vec<Value>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: String,
    /// column = value, each column at most once
    pub assignments: Vec<(String, Value)>,
    pub where_clause: Expr,
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: String,
    pub where_clause: Expr,
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table: String,
    pub columns: Vec<ColumnDef>,
    pub if_not_exists: bool,
}

/// Boolean predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `column = literal`
    Comparison {
        column: String,
        op: ComparisonOp,
        value: Value,
    },
    /// `left AND right`, `left OR right`
    Infix {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// Higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            LogicalOp::Or => 1,
            LogicalOp::And => 2,
        }
    }
}

impl Expr {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Comparison {
            column: column.into(),
            op: ComparisonOp::Eq,
            value: value.into(),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::Infix {
            left: Box::new(left),
            op: LogicalOp::And,
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Infix {
            left: Box::new(left),
            op: LogicalOp::Or,
            right: Box::new(right),
        }
    }

    /// `Some((column, value))` when the whole predicate is one equality
    pub fn as_equality(&self) -> Option<(&str, &Value)> {
        match self {
            Expr::Comparison {
                column,
                op: ComparisonOp::Eq,
                value,
            } => Some((column.as_str(), value)),
            Expr::Infix { .. } => None,
        }
    }

    /// Every column name referenced, left to right
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Comparison { column, .. } => out.push(column),
            Expr::Infix { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Comparison { column, value, .. } => match value {
                Value::Text(s) => write!(f, "{} = '{}'", column, s),
                Value::Integer(i) => write!(f, "{} = {}", column, i),
            },
            Expr::Infix { left, op, right } => {
                let op = match op {
                    LogicalOp::And => "AND",
                    LogicalOp::Or => "OR",
                };
                write!(f, "({} {} {})", left, op, right)
            }
        }
    }
}
