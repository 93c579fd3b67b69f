use super::*;
use catalog::{Column, DistributionCatalog, PartitionMethod, TableDistribution, TableMetadata};
use common::{ColumnId, DbError, RangeTableIndex, TableId};
use expr::{Expr, Operator, Volatility};
use pretty_assertions::assert_eq;
use types::{SqlType, Value};

const ID: ColumnId = 0;
const TENANT: ColumnId = 1;
const NAME: ColumnId = 2;

struct Tables {
    catalog: DistributionCatalog,
    orders: TableId,
    countries: TableId,
}

/// `orders` is hash distributed on `tenant_id`, `countries` is a reference
/// table, the rest cover the other distribution shapes.
fn sample_catalog() -> Tables {
    let columns = vec![
        Column::new("id", SqlType::Int),
        Column::new("tenant_id", SqlType::Int),
        Column::new("name", SqlType::Text),
    ];
    let mut catalog = DistributionCatalog::new();
    let mut register = |name: &str, method: PartitionMethod, dist: Option<&str>, shards: u32| {
        catalog
            .register_table(
                TableDistribution::builder()
                    .name(name)
                    .columns(columns.clone())
                    .method(method)
                    .maybe_distribution_column(dist)
                    .shard_count(shards)
                    .build(),
            )
            .unwrap()
    };
    let orders = register("orders", PartitionMethod::Hash, Some("tenant_id"), 8);
    let countries = register("countries", PartitionMethod::None, None, 1);
    register("events", PartitionMethod::Range, Some("id"), 4);
    register("logs", PartitionMethod::Append, Some("id"), 4);
    register("shardless", PartitionMethod::Hash, Some("tenant_id"), 0);
    register("shardless_ref", PartitionMethod::None, None, 0);
    Tables {
        catalog,
        orders,
        countries,
    }
}

fn col(c: ColumnId) -> Expr {
    Expr::column(RangeTableIndex::FIRST, c)
}

fn int(v: i64) -> Expr {
    Expr::literal(Value::Int(v))
}

fn eq(c: ColumnId, v: i64) -> Expr {
    Expr::binary(col(c), Operator::Eq, int(v))
}

fn targets() -> Vec<TargetEntry> {
    vec![
        TargetEntry::new(1, col(ID), "id"),
        TargetEntry::new(2, col(NAME), "name"),
    ]
}

fn select(table_id: TableId, quals: Option<Expr>) -> Query {
    Query::select(
        vec![RangeTableEntry::relation(table_id)],
        quals.map(Quals::Tree),
        targets(),
    )
}

fn verdict(tables: &Tables, query: &Query) -> Verdict {
    fast_path_verdict(query, &tables.catalog).unwrap()
}

fn table(tables: &Tables, name: &str) -> TableId {
    tables.catalog.table(name).unwrap().id
}

#[test]
fn distribution_key_equality_with_other_filters_is_eligible() {
    let t = sample_catalog();
    let query = select(t.orders, Some(Expr::and(vec![eq(TENANT, 5), eq(ID, 1)])));
    assert_eq!(
        verdict(&t, &query),
        Verdict::Eligible {
            table_id: t.orders
        }
    );
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn conjunct_order_does_not_matter() {
    let t = sample_catalog();
    let query = select(t.orders, Some(Expr::and(vec![eq(ID, 1), eq(TENANT, 5)])));
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn constant_may_be_on_either_side() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::binary(int(5), Operator::Eq, col(TENANT))),
    );
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn bind_parameter_pins_the_distribution_key() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::binary(col(TENANT), Operator::Eq, Expr::param(1))),
    );
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn nested_and_chains_stay_top_level() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::and(vec![
            eq(ID, 1),
            Expr::and(vec![Expr::and(vec![eq(TENANT, 5)]), eq(NAME, 2)]),
        ])),
    );
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn implicit_and_lists_are_normalized() {
    let t = sample_catalog();
    let mut query = select(t.orders, None);
    query.quals = Some(Quals::Implicit(vec![eq(ID, 1), eq(TENANT, 5)]));
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn deep_clause_in_implicit_list_is_classified_in_place() {
    let t = sample_catalog();
    let mut deep = eq(ID, 1);
    for _ in 0..100_000 {
        deep = Expr::not(deep);
    }
    let mut query = select(t.orders, None);
    query.quals = Some(Quals::Implicit(vec![deep, eq(TENANT, 5)]));
    assert_eq!(verdict(&t, &query), Verdict::Eligible { table_id: t.orders });

    let Some(Quals::Implicit(mut clauses)) = query.quals.take() else {
        unreachable!()
    };
    // Iterative teardown; the derived Drop would recurse.
    let mut cur = clauses.swap_remove(0);
    while let Expr::Bool(mut b) = cur {
        cur = b.args.pop().unwrap();
    }
}

#[test]
fn conjuncts_borrow_top_level_clauses() {
    let tree = Quals::Tree(Expr::and(vec![eq(ID, 1), eq(TENANT, 5)]));
    assert_eq!(tree.conjuncts().len(), 1);
    let list = Quals::Implicit(vec![eq(ID, 1), eq(TENANT, 5)]);
    assert_eq!(list.conjuncts(), vec![&eq(ID, 1), &eq(TENANT, 5)]);
    assert!(Quals::Implicit(vec![]).conjuncts().is_empty());
}

#[test]
fn disjunction_with_distribution_key_is_rejected() {
    let t = sample_catalog();
    let query = select(t.orders, Some(Expr::or(vec![eq(TENANT, 5), eq(ID, 1)])));
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::NoTopLevelEquality)
    );
}

#[test]
fn repeated_distribution_key_is_rejected() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::and(vec![eq(TENANT, 5), eq(TENANT, 6)])),
    );
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::DistributionKeyRepeated(2))
    );
}

#[test]
fn distribution_key_inside_or_branch_counts_as_repeat() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::and(vec![
            eq(TENANT, 5),
            Expr::or(vec![eq(ID, 1), eq(TENANT, 7)]),
        ])),
    );
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::DistributionKeyRepeated(2))
    );
}

#[test]
fn distribution_key_inside_function_argument_counts_as_repeat() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::and(vec![
            eq(TENANT, 5),
            Expr::call("is_even", vec![col(TENANT)], Volatility::Immutable),
        ])),
    );
    assert!(!is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn negated_equality_is_rejected() {
    let t = sample_catalog();
    let query = select(t.orders, Some(Expr::not(eq(TENANT, 5))));
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::NoTopLevelEquality)
    );
}

#[test]
fn non_equality_operators_do_not_match() {
    let t = sample_catalog();
    for op in [Operator::Lt, Operator::Ne, Operator::Like] {
        let query = select(t.orders, Some(Expr::binary(col(TENANT), op, int(5))));
        assert!(!is_fast_path_query(&query, &t.catalog).unwrap());
    }
}

#[test]
fn non_simple_equalities_do_not_match() {
    let t = sample_catalog();
    let random = Expr::call("random", vec![], Volatility::Volatile);
    let candidates = vec![
        // column = column
        Expr::binary(col(TENANT), Operator::Eq, col(ID)),
        // column = volatile call
        Expr::binary(col(TENANT), Operator::Eq, random),
        // expression over the column
        Expr::binary(
            Expr::binary(col(TENANT), Operator::Add, int(1)),
            Operator::Eq,
            int(6),
        ),
        // volatile equality operator
        Expr::Op(expr::OpExpr {
            op: Operator::Eq,
            args: vec![col(TENANT), int(5)],
            volatility: Volatility::Volatile,
        }),
        // three-argument call
        Expr::Op(expr::OpExpr {
            op: Operator::Eq,
            args: vec![col(TENANT), int(5), int(6)],
            volatility: Volatility::Immutable,
        }),
    ];
    for quals in candidates {
        let query = select(t.orders, Some(quals.clone()));
        assert!(
            !is_fast_path_query(&query, &t.catalog).unwrap(),
            "{quals} should not qualify"
        );
    }
}

#[test]
fn stable_pseudo_constant_is_accepted() {
    let t = sample_catalog();
    let now = Expr::call("now_epoch", vec![], Volatility::Stable);
    let query = select(t.orders, Some(Expr::binary(col(TENANT), Operator::Eq, now)));
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn false_clause_is_rejected_alone_and_in_conjunction() {
    let t = sample_catalog();
    let f = Expr::literal(Value::Bool(false));
    for quals in [f.clone(), Expr::and(vec![eq(TENANT, 5), f.clone()])] {
        let query = select(t.orders, Some(quals));
        assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::FalseClause));
    }

    let mut query = select(t.orders, None);
    query.quals = Some(Quals::Implicit(vec![eq(TENANT, 5), f]));
    assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::FalseClause));
}

#[test]
fn false_clause_on_reference_table_is_rejected() {
    let t = sample_catalog();
    let query = select(t.countries, Some(Expr::literal(Value::Bool(false))));
    assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::FalseClause));
}

#[test]
fn null_distribution_key_value_is_rejected() {
    let t = sample_catalog();
    let null = || Expr::literal(Value::Null);
    for pinned in [
        Expr::binary(col(TENANT), Operator::Eq, null()),
        Expr::binary(null(), Operator::Eq, col(TENANT)),
    ] {
        let query = select(t.orders, Some(Expr::and(vec![eq(ID, 1), pinned])));
        assert_eq!(
            verdict(&t, &query),
            Verdict::Rejected(Rejection::NoTopLevelEquality)
        );
    }
}

#[test]
fn null_constant_is_not_a_false_clause() {
    let t = sample_catalog();
    let query = select(
        t.orders,
        Some(Expr::and(vec![eq(TENANT, 5), Expr::literal(Value::Null)])),
    );
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn reference_table_without_where_is_eligible() {
    let t = sample_catalog();
    let query = select(t.countries, None);
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());

    let with_filter = select(t.countries, Some(eq(NAME, 3)));
    assert!(is_fast_path_query(&with_filter, &t.catalog).unwrap());
}

#[test]
fn tables_without_shards_are_rejected() {
    let t = sample_catalog();
    let query = select(table(&t, "shardless_ref"), None);
    assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::NoShards));

    let query = select(table(&t, "shardless"), Some(eq(TENANT, 5)));
    assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::NoShards));
}

#[test]
fn hash_table_without_where_is_rejected() {
    let t = sample_catalog();
    assert_eq!(
        verdict(&t, &select(t.orders, None)),
        Verdict::Rejected(Rejection::MissingQuals)
    );

    let mut query = select(t.orders, None);
    query.quals = Some(Quals::Implicit(vec![]));
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::MissingQuals)
    );
}

#[test]
fn range_and_append_tables_are_rejected() {
    let t = sample_catalog();
    for (name, method) in [
        ("events", PartitionMethod::Range),
        ("logs", PartitionMethod::Append),
    ] {
        let query = select(table(&t, name), Some(eq(ID, 5)));
        assert_eq!(
            verdict(&t, &query),
            Verdict::Rejected(Rejection::PartitionMethod(method))
        );
    }
}

#[test]
fn disqualifying_flags_reject_regardless_of_predicate() {
    let t = sample_catalog();
    let cases: [(fn(&mut QueryFlags), Rejection); 6] = [
        (|f: &mut QueryFlags| f.has_cte = true, Rejection::HasCte),
        (|f: &mut QueryFlags| f.has_sublinks = true, Rejection::HasSublinks),
        (|f: &mut QueryFlags| f.has_set_operations = true, Rejection::HasSetOperations),
        (|f: &mut QueryFlags| f.has_for_update = true, Rejection::HasForUpdate),
        (|f: &mut QueryFlags| f.has_target_srfs = true, Rejection::HasTargetSrfs),
        (|f: &mut QueryFlags| f.has_row_security = true, Rejection::HasRowSecurity),
    ];
    for (set, reason) in cases {
        let mut query = select(t.orders, Some(eq(TENANT, 5)));
        set(&mut query.flags);
        assert_eq!(verdict(&t, &query), Verdict::Rejected(reason));
    }
}

#[test]
fn only_select_statements_qualify() {
    let t = sample_catalog();
    for kind in [
        CommandKind::Insert,
        CommandKind::Update,
        CommandKind::Delete,
        CommandKind::Utility,
    ] {
        let mut query = select(t.orders, Some(eq(TENANT, 5)));
        query.command = kind;
        assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::NotSelect(kind)));
    }
}

#[test]
fn multiple_tables_are_rejected() {
    let t = sample_catalog();
    let mut query = select(t.orders, Some(eq(TENANT, 5)));
    query.range_table.push(RangeTableEntry::relation(t.countries));
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::RangeTableCount(2))
    );
}

#[test]
fn subquery_in_from_is_rejected() {
    let t = sample_catalog();
    let inner = select(t.orders, Some(eq(TENANT, 5)));
    let query = Query::select(
        vec![RangeTableEntry::subquery(inner).with_alias("o")],
        Some(Quals::Tree(eq(TENANT, 5))),
        targets(),
    );
    assert_eq!(
        verdict(&t, &query),
        Verdict::Rejected(Rejection::RangeTableCount(2))
    );
}

#[test]
fn non_relation_entries_are_rejected() {
    let t = sample_catalog();
    for kind in [
        RangeTableKind::Function {
            name: "generate_series".into(),
        },
        RangeTableKind::Values,
        RangeTableKind::Join,
    ] {
        let query = Query::select(
            vec![RangeTableEntry { kind, alias: None }],
            Some(Quals::Tree(eq(TENANT, 5))),
            targets(),
        );
        assert_eq!(verdict(&t, &query), Verdict::Rejected(Rejection::NotARelation));
    }
}

#[test]
fn distribution_key_in_target_list_is_ignored() {
    let t = sample_catalog();
    let mut query = select(t.orders, Some(eq(TENANT, 5)));
    query
        .target_list
        .push(TargetEntry::new(3, col(TENANT), "tenant_id"));
    assert!(is_fast_path_query(&query, &t.catalog).unwrap());
}

#[test]
fn unknown_table_error_is_propagated() {
    let t = sample_catalog();
    let query = select(TableId(404), Some(eq(TENANT, 5)));
    let err = is_fast_path_query(&query, &t.catalog).unwrap_err();
    assert!(matches!(err, DbError::Catalog(_)));
}

struct FailingProvider;

impl TableMetadataProvider for FailingProvider {
    fn lookup(&self, table_id: TableId) -> common::DbResult<TableMetadata> {
        Err(DbError::Catalog(format!("unknown table id {table_id}")))
    }
}

#[test]
fn metadata_is_not_consulted_for_rejected_shapes() {
    let mut query = select(TableId(1), Some(eq(TENANT, 5)));
    query.flags.has_cte = true;
    assert!(!is_fast_path_query(&query, &FailingProvider).unwrap());
}

#[test]
fn classification_is_repeatable_and_leaves_query_untouched() {
    let t = sample_catalog();
    let query = select(t.orders, Some(Expr::and(vec![eq(ID, 1), eq(TENANT, 5)])));
    let before = query.clone();
    let first = verdict(&t, &query);
    let second = verdict(&t, &query);
    assert_eq!(first, second);
    assert_eq!(query, before);
}

#[test]
fn matcher_and_counter_directly() {
    let key = expr::ColumnRef::new(RangeTableIndex::FIRST, TENANT);
    let tree = Expr::and(vec![
        eq(ID, 1),
        Expr::or(vec![eq(TENANT, 2), Expr::not(eq(TENANT, 3))]),
    ]);
    assert!(!column_matches_top_level_conjunction(&tree, &key));
    assert_eq!(count_column_occurrences(&tree, &key), 2);

    let other_slot = expr::ColumnRef::new(RangeTableIndex(2), TENANT);
    assert_eq!(count_column_occurrences(&tree, &other_slot), 0);
    assert!(!column_matches_top_level_conjunction(&col(TENANT), &key));
}

#[test]
fn placeholder_copies_targets_and_table() {
    let t = sample_catalog();
    let mut query = select(t.orders, Some(eq(TENANT, 5)));
    query.query_id = 77;
    query.stmt_len = 42;

    let plan = build_placeholder(&query, t.orders);

    assert_eq!(plan.command, CommandKind::Select);
    assert_eq!(plan.query_id, 77);
    assert_eq!(plan.stmt_len, 42);
    assert_eq!(plan.relation_ids, vec![t.orders]);
    assert_eq!(plan.range_table, query.range_table);
    assert_eq!(plan.scan.node_id, 1);
    assert_eq!(plan.scan.scan_slot, RangeTableIndex::FIRST);
    assert_eq!(plan.scan.target_list, query.target_list);
    assert_eq!(plan.scan.filter, None);
}

#[test]
fn placeholder_target_list_is_independent() {
    let t = sample_catalog();
    let query = select(t.orders, Some(eq(TENANT, 5)));
    let mut plan = build_placeholder(&query, t.orders);

    plan.scan.target_list[0].name = Some("renamed".into());
    plan.scan.target_list.pop();

    assert_eq!(query.target_list, targets());
}

#[test]
#[should_panic(expected = "not a fast-path query")]
fn placeholder_for_wrong_table_panics() {
    let t = sample_catalog();
    let query = select(t.orders, Some(eq(TENANT, 5)));
    build_placeholder(&query, t.countries);
}

#[test]
#[should_panic(expected = "not a fast-path query")]
fn placeholder_for_multi_table_query_panics() {
    let t = sample_catalog();
    let mut query = select(t.orders, Some(eq(TENANT, 5)));
    query.range_table.push(RangeTableEntry::relation(t.countries));
    build_placeholder(&query, t.orders);
}

#[test]
fn explain_lists_targets() {
    let t = sample_catalog();
    let mut query = select(t.orders, Some(eq(TENANT, 5)));
    query.target_list.push(TargetEntry {
        expr: col(TENANT),
        name: None,
        resno: 3,
        resjunk: true,
    });
    let plan = build_placeholder(&query, t.orders);
    assert_eq!(
        explain_placeholder(&plan),
        "SeqScan (placeholder) slot=1 tables=[1]\n  1: id := r1.c0\n  2: name := r1.c2\n  3: ?column? := r1.c1 (junk)"
    );
}

#[test]
fn planner_returns_plan_for_eligible_query() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
    let t = sample_catalog();
    let planner = FastPathPlanner::default();
    let query = select(t.orders, Some(eq(TENANT, 5)));

    let plan = planner.plan(&query, &t.catalog).unwrap().unwrap();
    assert_eq!(plan.relation_ids, vec![t.orders]);

    let rejected = select(t.orders, Some(Expr::or(vec![eq(TENANT, 5), eq(ID, 1)])));
    assert_eq!(planner.plan(&rejected, &t.catalog).unwrap(), None);
}

#[test]
fn disabled_planner_never_takes_fast_path() {
    let t = sample_catalog();
    let planner = FastPathPlanner::new(
        RouterConfig::builder()
            .enable_fast_path_router_planner(false)
            .build(),
    );
    let query = select(t.orders, Some(eq(TENANT, 5)));
    assert_eq!(planner.plan(&query, &t.catalog).unwrap(), None);
    assert!(!planner.config().enable_fast_path_router_planner);
}

#[test]
fn planner_propagates_lookup_errors() {
    let planner = FastPathPlanner::new(RouterConfig::builder().log_rejections(false).build());
    let query = select(TableId(3), Some(eq(TENANT, 5)));
    let err = planner.plan(&query, &FailingProvider).unwrap_err();
    assert_eq!(format!("{err}"), "catalog: unknown table id 3");
}

#[test]
fn rejection_reasons_read_well() {
    assert_eq!(
        Rejection::DistributionKeyRepeated(2).to_string(),
        "distribution column referenced 2 times"
    );
    assert_eq!(
        Rejection::PartitionMethod(PartitionMethod::Range).to_string(),
        "Range distributed table"
    );
    assert_eq!(Rejection::NotSelect(CommandKind::Delete).to_string(), "Delete statement");
}
