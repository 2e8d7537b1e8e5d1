/// Predicate evaluation over positional rows
///
/// Unresolvable columns and type mismatches evaluate to `false`; evaluation never fails.
use super::ast::{ComparisonOp, Expr, LogicalOp};
use crate::query::PlanSchema;
use crate::types::Value;

pub fn evaluate(expr: &Expr, row: &[Value], schema: &PlanSchema) -> bool {
    match expr {
        Expr::Comparison { column, op, value } => {
            let Ok(pos) = schema.resolve(column) else {
                return false;
            };
            match (row.get(pos), op) {
                (Some(cell), ComparisonOp::Eq) => cell.sql_eq(value),
                (None, _) => false,
            }
        }
        Expr::Infix { left, op, right } => match op {
            LogicalOp::And => evaluate(left, row, schema) && evaluate(right, row, schema),
            LogicalOp::Or => evaluate(left, row, schema) || evaluate(right, row, schema),
        },
    }
}
