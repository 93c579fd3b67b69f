
use serde::{Deserialize, Serialize};
use std::{fmt, io};
use thiserror::Error;

/// Identifier for a column within a table schema (zero-based ordinal).
/// Examples:
/// - `let id_col: ColumnId = 0; // maps to "id"`
/// - `let tenant_col: ColumnId = 1; // maps to "tenant_id"`
pub type ColumnId = u16;

/// One-based position of an entry in a query's range table.
/// Examples:
/// - `let first = RangeTableIndex(1);`
/// - `let joined = RangeTableIndex(2);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RangeTableIndex(pub u32);

impl RangeTableIndex {
    /// Slot of the single relation in a one-table query.
    pub const FIRST: RangeTableIndex = RangeTableIndex(1);
}

/// Logical identifier for a table registered in the catalog.
/// Examples:
/// - `let users = TableId(7);`
/// - `let orders = TableId(11);`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical error type shared across router subsystems.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("catalog: {0}")]
    Catalog(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime knobs for the router planner.
///
/// # Example
/// ```
/// use common::RouterConfig;
///
/// let config = RouterConfig::builder()
///     .enable_fast_path_router_planner(false)
///     .build();
/// assert!(!config.enable_fast_path_router_planner);
/// assert!(config.log_rejections);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct RouterConfig {
    /// Allows single-shard SELECTs to skip full planning.
    #[builder(default = true)]
    pub enable_fast_path_router_planner: bool,
    /// Emit the reason a query was kept off the fast path at debug level.
    #[builder(default = true)]
    pub log_rejections: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enable_fast_path_router_planner: true,
            log_rejections: true,
        }
    }
}
