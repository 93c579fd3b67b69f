//! Implicit-AND clause lists taken from explicit AND trees.

use crate::{BoolOp, Expr};

/// Flatten the top-level AND chain of `expr` into a clause list.
///
/// Nested AND nodes are flattened in order; OR and NOT nodes stay opaque.
/// A bare `true` constant yields an empty list.
pub fn make_ands_implicit(expr: &Expr) -> Vec<&Expr> {
    if let Expr::Const(c) = expr
        && c.is_true()
    {
        return Vec::new();
    }

    let mut clauses = Vec::new();
    let mut stack = vec![expr];
    while let Some(node) = stack.pop() {
        match node {
            Expr::Bool(b) if b.op == BoolOp::And => stack.extend(b.args.iter().rev()),
            other => clauses.push(other),
        }
    }
    clauses
}

/// True if any clause of an implicit-AND list is a non-null `false`.
pub fn contains_false_clause(clauses: &[&Expr]) -> bool {
    clauses
        .iter()
        .any(|clause| matches!(clause, Expr::Const(c) if c.is_false()))
}
