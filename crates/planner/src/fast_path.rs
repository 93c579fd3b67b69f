//! Fast-path eligibility for single-shard SELECTs.
//!
//! A query qualifies when it reads exactly one hash-distributed or
//! reference table and, for hash tables, pins the distribution column with a
//! single equality that is ANDed with everything else:
//!
//! ```text
//! SELECT ... FROM dist_table WHERE dist_key = X [AND ...]
//! ```
//!
//! GROUP BY, ORDER BY, window functions and the like are all fine; only the
//! FROM and WHERE clauses matter here.

use std::fmt;

use catalog::{PartitionMethod, TableMetadata, TableMetadataProvider};
use common::{DbResult, TableId};
use expr::{BoolOp, ColumnRef, Expr, OpExpr, contains_false_clause, make_ands_implicit};
use tracing::trace;

use crate::query::{CommandKind, Quals, Query};

/// Reason a query stays on the full planning path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    NotSelect(CommandKind),
    HasCte,
    HasSublinks,
    HasSetOperations,
    HasForUpdate,
    HasTargetSrfs,
    HasRowSecurity,
    RangeTableCount(usize),
    NotARelation,
    PartitionMethod(PartitionMethod),
    MissingQuals,
    FalseClause,
    NoTopLevelEquality,
    DistributionKeyRepeated(usize),
    NoShards,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotSelect(kind) => write!(f, "{kind:?} statement"),
            Rejection::HasCte => f.write_str("query has common table expressions"),
            Rejection::HasSublinks => f.write_str("query has sublinks"),
            Rejection::HasSetOperations => f.write_str("query has set operations"),
            Rejection::HasForUpdate => f.write_str("query has a locking clause"),
            Rejection::HasTargetSrfs => f.write_str("target list returns sets"),
            Rejection::HasRowSecurity => f.write_str("row security applies"),
            Rejection::RangeTableCount(n) => write!(f, "query reads {n} range table entries"),
            Rejection::NotARelation => f.write_str("range table entry is not a plain table"),
            Rejection::PartitionMethod(method) => write!(f, "{method:?} distributed table"),
            Rejection::MissingQuals => f.write_str("distributed table without WHERE clause"),
            Rejection::FalseClause => f.write_str("WHERE clause is constant false"),
            Rejection::NoTopLevelEquality => {
                f.write_str("no top-level equality on the distribution column")
            }
            Rejection::DistributionKeyRepeated(n) => {
                write!(f, "distribution column referenced {n} times")
            }
            Rejection::NoShards => f.write_str("table has no shards"),
        }
    }
}

/// Outcome of [`fast_path_verdict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Eligible { table_id: TableId },
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible { .. })
    }
}

/// Returns true if the query can be routed to a single shard without full
/// planning.
///
/// # Errors
///
/// Only errors from `provider` are returned, unchanged. A query that does
/// not qualify is `Ok(false)`.
pub fn is_fast_path_query<P>(query: &Query, provider: &P) -> DbResult<bool>
where
    P: TableMetadataProvider + ?Sized,
{
    Ok(fast_path_verdict(query, provider)?.is_eligible())
}

/// Like [`is_fast_path_query`], but keeps the table id on success and the
/// reason on rejection.
pub fn fast_path_verdict<P>(query: &Query, provider: &P) -> DbResult<Verdict>
where
    P: TableMetadataProvider + ?Sized,
{
    let table_id = match check_query_shape(query) {
        Ok(table_id) => table_id,
        Err(reason) => return Ok(rejected(query, reason)),
    };
    let metadata = provider.lookup(table_id)?;
    Ok(match check_distribution(query, &metadata) {
        Ok(()) => {
            trace!(query_id = query.query_id, %table_id, "fast-path eligible");
            Verdict::Eligible { table_id }
        }
        Err(reason) => rejected(query, reason),
    })
}

fn rejected(query: &Query, reason: Rejection) -> Verdict {
    trace!(query_id = query.query_id, %reason, "fast-path rejected");
    Verdict::Rejected(reason)
}

/// Checks everything that does not need distribution metadata and returns
/// the single table the query reads.
pub(crate) fn check_query_shape(query: &Query) -> Result<TableId, Rejection> {
    if query.command != CommandKind::Select {
        return Err(Rejection::NotSelect(query.command));
    }
    let flags = &query.flags;
    let disqualifying = [
        (flags.has_cte, Rejection::HasCte),
        (flags.has_sublinks, Rejection::HasSublinks),
        (flags.has_set_operations, Rejection::HasSetOperations),
        (flags.has_for_update, Rejection::HasForUpdate),
        (flags.has_target_srfs, Rejection::HasTargetSrfs),
        (flags.has_row_security, Rejection::HasRowSecurity),
    ];
    if let Some((_, reason)) = disqualifying.into_iter().find(|(set, _)| *set) {
        return Err(reason);
    }

    // Subqueries anywhere in the range table count too.
    let reachable = query.range_table_entries().len();
    if reachable != 1 {
        return Err(Rejection::RangeTableCount(reachable));
    }
    if query.range_table.len() != 1 {
        return Err(Rejection::RangeTableCount(query.range_table.len()));
    }
    query.range_table[0]
        .relation_id()
        .ok_or(Rejection::NotARelation)
}

fn check_distribution(query: &Query, metadata: &TableMetadata) -> Result<(), Rejection> {
    // Range and append tables may have overlapping shards.
    if !matches!(
        metadata.method,
        PartitionMethod::Hash | PartitionMethod::None
    ) {
        return Err(Rejection::PartitionMethod(metadata.method));
    }

    let clauses = query
        .quals
        .as_ref()
        .map(Quals::conjuncts)
        .unwrap_or_default();
    if clauses.is_empty() && metadata.method == PartitionMethod::Hash {
        return Err(Rejection::MissingQuals);
    }

    // WHERE false needs the empty-result handling of the full planner.
    if clauses
        .iter()
        .any(|clause| contains_false_clause(&make_ands_implicit(clause)))
    {
        return Err(Rejection::FalseClause);
    }

    // The clauses are ANDed, so each one is a top-level conjunction root.
    if let Some(key) = metadata.distribution_key() {
        if !clauses
            .iter()
            .any(|clause| column_matches_top_level_conjunction(clause, &key))
        {
            return Err(Rejection::NoTopLevelEquality);
        }
        let references: usize = clauses
            .iter()
            .map(|clause| count_column_occurrences(clause, &key))
            .sum();
        if references != 1 {
            return Err(Rejection::DistributionKeyRepeated(references));
        }
    }

    if metadata.shard_count == 0 {
        return Err(Rejection::NoShards);
    }
    Ok(())
}

/// Returns true if `column` is compared for equality against a
/// pseudo-constant in a clause that is only ANDed with the rest of the tree.
///
/// OR and NOT nodes are not descended into.
pub fn column_matches_top_level_conjunction(node: &Expr, column: &ColumnRef) -> bool {
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        match node {
            Expr::Op(op) => {
                if is_simple_op_expr(op)
                    && op_contains_column(op, column)
                    && op.op.implements_equality()
                {
                    return true;
                }
            }
            Expr::Bool(b) if b.op == BoolOp::And => pending.extend(b.args.iter().rev()),
            Expr::Bool(_) | Expr::Column(_) | Expr::Const(_) | Expr::Param(_) => {}
        }
    }
    false
}

/// Number of references to `column` anywhere in the tree, including OR and
/// NOT branches and operator arguments.
pub fn count_column_occurrences(node: &Expr, column: &ColumnRef) -> usize {
    node.columns().filter(|c| *c == column).count()
}

/// A two-argument, non-volatile call comparing a bare column with a
/// pseudo-constant. A NULL operand pins no shard.
fn is_simple_op_expr(op: &OpExpr) -> bool {
    if op.is_volatile() {
        return false;
    }
    match op.args.as_slice() {
        [Expr::Column(_), Expr::Const(c)] | [Expr::Const(c), Expr::Column(_)] => {
            !c.value.is_null()
        }
        [Expr::Column(_), other] | [other, Expr::Column(_)] => other.is_pseudo_constant(),
        _ => false,
    }
}

fn op_contains_column(op: &OpExpr, column: &ColumnRef) -> bool {
    op.args
        .iter()
        .any(|arg| matches!(arg, Expr::Column(c) if c == column))
}
