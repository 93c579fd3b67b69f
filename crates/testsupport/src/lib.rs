//! Test support utilities for the router planner workspace.
//!
//! This crate provides:
//! - A sample distribution catalog with hash, reference, range and append tables
//! - Builders for predicate trees and single-table queries
//! - Property-based generators for predicate trees
//!
//! # Example Usage
//!
//! ```
//! use testsupport::prelude::*;
//!
//! let fixture = SampleCatalog::new();
//! let query = select_from(fixture.orders, Some(and(vec![eq(TENANT_ID, 5), eq(ID, 1)])));
//! assert!(planner::is_fast_path_query(&query, &fixture.catalog).unwrap());
//! ```

pub mod fixtures;
pub mod proptest_generators;

/// Convenient re-exports for common testing patterns.
pub mod prelude {
    pub use crate::fixtures::*;
}
