//! Common test fixtures and predicate builders.

use catalog::{Column, DistributionCatalog, PartitionMethod, TableDistribution};
use common::{ColumnId, RangeTableIndex, TableId};
use expr::{ColumnRef, Expr, Operator};
use planner::{Quals, Query, RangeTableEntry, TargetEntry};
use types::{SqlType, Value};

/// Ordinal of `id` in every sample table.
pub const ID: ColumnId = 0;
/// Ordinal of `tenant_id`, the distribution column of `orders`.
pub const TENANT_ID: ColumnId = 1;
/// Ordinal of `name` in every sample table.
pub const NAME: ColumnId = 2;

/// Catalog with one table per distribution shape.
///
/// | table           | method | distribution column | shards |
/// |-----------------|--------|---------------------|--------|
/// | `orders`        | hash   | `tenant_id`         | 8      |
/// | `countries`     | none   | -                   | 1      |
/// | `events`        | range  | `id`                | 4      |
/// | `logs`          | append | `id`                | 4      |
/// | `pending`       | hash   | `tenant_id`         | 0      |
pub struct SampleCatalog {
    pub catalog: DistributionCatalog,
    pub orders: TableId,
    pub countries: TableId,
    pub events: TableId,
    pub logs: TableId,
    pub pending: TableId,
}

impl SampleCatalog {
    pub fn new() -> Self {
        let mut catalog = DistributionCatalog::new();
        let mut register =
            |name: &str, method: PartitionMethod, dist: Option<&str>, shards: u32| {
                catalog
                    .register_table(
                        TableDistribution::builder()
                            .name(name)
                            .columns(sample_columns())
                            .method(method)
                            .maybe_distribution_column(dist)
                            .shard_count(shards)
                            .build(),
                    )
                    .expect("fixture table registers")
            };
        let orders = register("orders", PartitionMethod::Hash, Some("tenant_id"), 8);
        let countries = register("countries", PartitionMethod::None, None, 1);
        let events = register("events", PartitionMethod::Range, Some("id"), 4);
        let logs = register("logs", PartitionMethod::Append, Some("id"), 4);
        let pending = register("pending", PartitionMethod::Hash, Some("tenant_id"), 0);
        Self {
            catalog,
            orders,
            countries,
            events,
            logs,
            pending,
        }
    }
}

impl Default for SampleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// `(id INT, tenant_id INT, name TEXT)`
pub fn sample_columns() -> Vec<Column> {
    vec![
        Column::new("id", SqlType::Int),
        Column::new("tenant_id", SqlType::Int),
        Column::new("name", SqlType::Text),
    ]
}

/// Reference to a column of the only table in the query.
pub fn column_ref(column: ColumnId) -> ColumnRef {
    ColumnRef::new(RangeTableIndex::FIRST, column)
}

pub fn col(column: ColumnId) -> Expr {
    Expr::Column(column_ref(column))
}

pub fn int(v: i64) -> Expr {
    Expr::literal(Value::Int(v))
}

pub fn boolean(v: bool) -> Expr {
    Expr::literal(Value::Bool(v))
}

/// `column = v`
pub fn eq(column: ColumnId, v: i64) -> Expr {
    Expr::binary(col(column), Operator::Eq, int(v))
}

pub fn and(args: Vec<Expr>) -> Expr {
    Expr::and(args)
}

pub fn or(args: Vec<Expr>) -> Expr {
    Expr::or(args)
}

pub fn not(arg: Expr) -> Expr {
    Expr::not(arg)
}

/// `SELECT id, name` target list.
pub fn default_targets() -> Vec<TargetEntry> {
    vec![
        TargetEntry::new(1, col(ID), "id"),
        TargetEntry::new(2, col(NAME), "name"),
    ]
}

/// `SELECT id, name FROM <table> [WHERE quals]`
pub fn select_from(table_id: TableId, quals: Option<Expr>) -> Query {
    Query::select(
        vec![RangeTableEntry::relation(table_id)],
        quals.map(Quals::Tree),
        default_targets(),
    )
}
