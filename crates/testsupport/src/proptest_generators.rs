//! Property-based test generators using proptest.
//!
//! Trees are built over the three sample columns so that the distribution
//! column of `orders` shows up in random positions.

use common::ColumnId;
use expr::{Expr, Operator, Volatility};
use planner::QueryFlags;
use proptest::prelude::*;
use types::Value;

use crate::fixtures::{col, int};

/// Strategy for a column ordinal of the sample tables.
pub fn arb_column() -> impl Strategy<Value = ColumnId> {
    0..3u16
}

/// Strategy for comparison operators, biased towards equality.
pub fn arb_comparison() -> impl Strategy<Value = Operator> {
    prop_oneof![
        3 => Just(Operator::Eq),
        1 => Just(Operator::Ne),
        1 => Just(Operator::Lt),
        1 => Just(Operator::Ge),
    ]
}

/// Strategy for leaf predicates: comparisons, constants and function calls.
pub fn arb_leaf() -> impl Strategy<Value = Expr> {
    prop_oneof![
        6 => (arb_column(), arb_comparison(), any::<i64>())
            .prop_map(|(c, op, v)| Expr::binary(col(c), op, int(v))),
        1 => (arb_column(), arb_column())
            .prop_map(|(l, r)| Expr::binary(col(l), Operator::Eq, col(r))),
        1 => arb_column().prop_map(|c| Expr::binary(col(c), Operator::Eq, Expr::param(1))),
        1 => any::<bool>().prop_map(|b| Expr::literal(Value::Bool(b))),
        1 => arb_column()
            .prop_map(|c| Expr::call("is_valid", vec![col(c)], Volatility::Immutable)),
        1 => arb_column().prop_map(|c| {
            Expr::binary(
                col(c),
                Operator::Eq,
                Expr::call("random", vec![], Volatility::Volatile),
            )
        }),
    ]
}

/// Strategy for predicate trees up to a few levels deep.
///
/// # Example
///
/// ```
/// use proptest::strategy::{Strategy, ValueTree};
/// use proptest::test_runner::TestRunner;
/// use testsupport::proptest_generators::arb_predicate;
///
/// let mut runner = TestRunner::default();
/// let tree = arb_predicate().new_tree(&mut runner).unwrap().current();
/// assert!(tree.nodes().count() >= 1);
/// ```
pub fn arb_predicate() -> impl Strategy<Value = Expr> {
    arb_leaf().prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            3 => prop::collection::vec(inner.clone(), 1..4).prop_map(Expr::and),
            1 => prop::collection::vec(inner.clone(), 1..4).prop_map(Expr::or),
            1 => inner.prop_map(Expr::not),
        ]
    })
}

/// Strategy for flag sets with at least one disqualifying flag set.
pub fn arb_disqualifying_flags() -> impl Strategy<Value = QueryFlags> {
    any::<[bool; 6]>()
        .prop_filter("at least one flag", |bits| bits.iter().any(|b| *b))
        .prop_map(|bits| QueryFlags {
            has_cte: bits[0],
            has_sublinks: bits[1],
            has_set_operations: bits[2],
            has_for_update: bits[3],
            has_target_srfs: bits[4],
            has_row_security: bits[5],
        })
}
