//! Fast-path router planner: decides whether a SELECT on a sharded table
//! can skip full planning and go straight to one shard.
//!
//! # Architecture
//!
//! ```text
//! Query + TableMetadataProvider
//!     ↓
//! fast_path_verdict (shape, partition method, WHERE clause)
//!     ↓ eligible
//! build_placeholder
//!     ↓
//! PlaceholderPlan → shard resolution / executor
//! ```
//!
//! # Example
//!
//! ```no_run
//! use catalog::DistributionCatalog;
//! use common::RouterConfig;
//! use planner::{FastPathPlanner, Query};
//!
//! # fn analysed_query() -> Query { unimplemented!() }
//! let catalog = DistributionCatalog::new();
//! let planner = FastPathPlanner::new(RouterConfig::default());
//! let query = analysed_query();
//! if let Some(plan) = planner.plan(&query, &catalog).unwrap() {
//!     println!("{plan}");
//! }
//! ```

#[cfg(test)]
mod tests;

pub mod fast_path;
pub mod placeholder;
pub mod query;

use catalog::TableMetadataProvider;
use common::{DbResult, RouterConfig};
use tracing::debug;

pub use fast_path::{
    Rejection, Verdict, column_matches_top_level_conjunction, count_column_occurrences,
    fast_path_verdict, is_fast_path_query,
};
pub use placeholder::{PlaceholderPlan, SeqScanStub, build_placeholder, explain_placeholder};
pub use query::{
    CommandKind, Query, QueryFlags, Quals, RangeTableEntry, RangeTableKind, TargetEntry,
};

/// Entry point used by the router: classify, then build the placeholder.
#[derive(Clone, Debug, Default)]
pub struct FastPathPlanner {
    config: RouterConfig,
}

impl FastPathPlanner {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Returns the placeholder plan if `query` can take the fast path, or
    /// `None` if it has to go through full planning.
    ///
    /// # Errors
    ///
    /// Propagates metadata lookup failures from `provider`.
    pub fn plan<P>(&self, query: &Query, provider: &P) -> DbResult<Option<PlaceholderPlan>>
    where
        P: TableMetadataProvider + ?Sized,
    {
        if !self.config.enable_fast_path_router_planner {
            debug!(query_id = query.query_id, "fast-path router planner disabled");
            return Ok(None);
        }

        match fast_path_verdict(query, provider)? {
            Verdict::Eligible { table_id } => {
                debug!(query_id = query.query_id, %table_id, "using fast-path router plan");
                Ok(Some(build_placeholder(query, table_id)))
            }
            Verdict::Rejected(reason) => {
                if self.config.log_rejections {
                    debug!(query_id = query.query_id, %reason, "query not eligible for fast path");
                }
                Ok(None)
            }
        }
    }
}
