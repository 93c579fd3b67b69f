//! Analysed query handed to the router planner.

use common::{ColumnId, TableId};
use expr::Expr;
use serde::{Deserialize, Serialize};

/// Statement kind of a [`Query`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Select,
    Insert,
    Update,
    Delete,
    Utility,
}

/// Features found by the analyser that rule out simple routing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFlags {
    pub has_cte: bool,
    pub has_sublinks: bool,
    pub has_set_operations: bool,
    pub has_for_update: bool,
    pub has_target_srfs: bool,
    pub has_row_security: bool,
}

/// What a range-table entry reads from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RangeTableKind {
    Relation { table_id: TableId },
    Subquery { query: Box<Query> },
    Join,
    Function { name: String },
    Values,
}

/// One entry of a query's range table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangeTableEntry {
    pub kind: RangeTableKind,
    pub alias: Option<String>,
}

impl RangeTableEntry {
    pub fn relation(table_id: TableId) -> Self {
        Self {
            kind: RangeTableKind::Relation { table_id },
            alias: None,
        }
    }

    pub fn subquery(query: Query) -> Self {
        Self {
            kind: RangeTableKind::Subquery {
                query: Box::new(query),
            },
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Table read by a plain relation entry.
    pub fn relation_id(&self) -> Option<TableId> {
        match self.kind {
            RangeTableKind::Relation { table_id } => Some(table_id),
            _ => None,
        }
    }
}

/// WHERE clause as delivered by the analyser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Quals {
    /// A single predicate tree.
    Tree(Expr),
    /// Clauses that are implicitly ANDed together.
    Implicit(Vec<Expr>),
}

impl Quals {
    /// Top-level clauses, borrowed. A tree is one clause; an implicit list
    /// gives its members. Empty means there is nothing to filter on.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Quals::Tree(expr) => vec![expr],
            Quals::Implicit(clauses) => clauses.iter().collect(),
        }
    }
}

/// Output column of a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub expr: Expr,
    pub name: Option<String>,
    /// One-based output position.
    pub resno: ColumnId,
    /// Helper column that is not returned to the client.
    pub resjunk: bool,
}

impl TargetEntry {
    pub fn new(resno: ColumnId, expr: Expr, name: impl Into<String>) -> Self {
        Self {
            expr,
            name: Some(name.into()),
            resno,
            resjunk: false,
        }
    }
}

/// Analysed statement. The router only reads it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub command: CommandKind,
    pub flags: QueryFlags,
    pub range_table: Vec<RangeTableEntry>,
    pub quals: Option<Quals>,
    pub target_list: Vec<TargetEntry>,
    pub query_id: u64,
    /// Length of the statement text in bytes.
    pub stmt_len: usize,
}

impl Query {
    /// SELECT over the given range table with no flags set.
    pub fn select(
        range_table: Vec<RangeTableEntry>,
        quals: Option<Quals>,
        target_list: Vec<TargetEntry>,
    ) -> Self {
        Self {
            command: CommandKind::Select,
            flags: QueryFlags::default(),
            range_table,
            quals,
            target_list,
            query_id: 0,
            stmt_len: 0,
        }
    }

    /// Every range-table entry reachable from this query, including the
    /// entries of subqueries in the FROM clause.
    pub fn range_table_entries(&self) -> Vec<&RangeTableEntry> {
        let mut entries = Vec::new();
        let mut pending: Vec<&Query> = vec![self];
        while let Some(query) = pending.pop() {
            for entry in &query.range_table {
                entries.push(entry);
                if let RangeTableKind::Subquery { query } = &entry.kind {
                    pending.push(query);
                }
            }
        }
        entries
    }
}
