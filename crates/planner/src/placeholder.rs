//! Placeholder plan for fast-path queries.
//!
//! The plan is deliberately incomplete: it has the target list and the table
//! but no filter and no children. The router fills in the shard and the
//! predicate before anything is executed.

use std::fmt;

use common::{RangeTableIndex, TableId};
use expr::Expr;
use serde::{Deserialize, Serialize};

use crate::fast_path::check_query_shape;
use crate::query::{CommandKind, Query, RangeTableEntry, TargetEntry};

/// Sequential scan over range-table slot 1 with nothing resolved yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeqScanStub {
    pub node_id: u32,
    pub scan_slot: RangeTableIndex,
    pub target_list: Vec<TargetEntry>,
    /// Always `None` when built; the router attaches the predicate.
    pub filter: Option<Expr>,
}

/// Planned-statement carcass returned for a fast-path query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderPlan {
    pub command: CommandKind,
    pub query_id: u64,
    pub stmt_len: usize,
    /// Copy of the query's range table, used for permission checks.
    pub range_table: Vec<RangeTableEntry>,
    pub relation_ids: Vec<TableId>,
    pub scan: SeqScanStub,
}

/// Build the placeholder plan for a query already found eligible.
///
/// # Panics
///
/// Panics if `query` is not a plain single-relation SELECT over `table_id`.
/// Callers must only pass queries for which
/// [`is_fast_path_query`](crate::is_fast_path_query) returned true.
pub fn build_placeholder(query: &Query, table_id: TableId) -> PlaceholderPlan {
    let shape = check_query_shape(query);
    assert!(
        shape == Ok(table_id),
        "placeholder plan requested for a query that is not a fast-path query on table {table_id}: {shape:?}"
    );

    PlaceholderPlan {
        command: CommandKind::Select,
        query_id: query.query_id,
        stmt_len: query.stmt_len,
        range_table: query.range_table.clone(),
        relation_ids: vec![table_id],
        scan: SeqScanStub {
            node_id: 1,
            scan_slot: RangeTableIndex::FIRST,
            target_list: query.target_list.clone(),
            filter: None,
        },
    }
}

impl fmt::Display for PlaceholderPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self
            .relation_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "SeqScan (placeholder) slot={} tables=[{tables}]",
            self.scan.scan_slot.0
        )?;
        for target in &self.scan.target_list {
            let name = target.name.as_deref().unwrap_or("?column?");
            write!(f, "\n  {}: {name} := {}", target.resno, target.expr)?;
            if target.resjunk {
                f.write_str(" (junk)")?;
            }
        }
        Ok(())
    }
}

/// Pretty-print a placeholder plan for debugging.
pub fn explain_placeholder(plan: &PlaceholderPlan) -> String {
    plan.to_string()
}
