mod setup;

use sema_core::ast::{JoinOperator, RawExpr, RawTableRef, SelectItem};
use sema_core::expr::Expression;
use sema_core::logical::binder::bind_query::bind_select::AnalyzedSelect;
use sema_core::logical::binder::bind_query::{AnalyzedQuery, AnalyzedQueryBody};
use sema_core::logical::binder::table_ref::TableRef;
use sema_error::ErrorKind;
use setup::{aliased, eq, item, new_analyzer, select, test_catalog};

fn select_body(query: &AnalyzedQuery) -> &AnalyzedSelect {
    match &query.body {
        AnalyzedQueryBody::Select(select) => select,
        other => panic!("expected select, got {other:?}"),
    }
}

#[test]
fn missing_tables_reported_together() {
    let mut analyzer = new_analyzer(test_catalog());
    // The ON clause of the last ref references the missing table. That error
    // is dropped in favor of the missing table error.
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["nope"]).with_alias("n"),
            RawTableRef::table(&["t2"])
                .with_join(JoinOperator::Inner, Some(eq(&["n", "a"], &["t2", "a"]))),
        ],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert!(err.is_kind(ErrorKind::MissingObject));
    assert_eq!("Found missing tables. Aborting analysis.", err.get_msg());
    assert_eq!(Some("default.nope".to_string()), err.get_field("tables"));
}

#[test]
fn multiple_missing_tables() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["x"]),
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["db2", "y"]),
        ],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        Some("default.x, db2.y".to_string()),
        err.get_field("tables")
    );
}

#[test]
fn single_missing_table_without_other_errors() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["t9"])]);

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!("Found missing tables. Aborting analysis.", err.get_msg());
    assert_eq!(Some("default.t9".to_string()), err.get_field("tables"));
}

#[test]
fn constant_view_output_nullable_on_left_join() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(vec![aliased(RawExpr::lit(5), "x")], Vec::new());
    let query = select(
        vec![item(&["v", "x"])],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::subquery(view, "v").with_join(
                JoinOperator::LeftOuter,
                Some(eq(&["t1", "a"], &["v", "x"])),
            ),
        ],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    let from = &select_body(&analyzed).from;
    let view = from.inline_views().next().unwrap();
    let view_tuple = view.info.desc().unwrap();

    // Tupleless view body, so the view's own tuple is checked.
    assert_eq!(vec![view_tuple], view.materialized_tuple_ids().unwrap());
    assert_eq!(
        format!("if(TupleIsNull({view_tuple}), NULL, 5)"),
        analyzed.base_tbl_result_exprs[0].to_string()
    );
    assert!(analyzer.is_outer_joined(view_tuple));
}

#[test]
fn column_view_output_unchanged_on_left_join() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(vec![item(&["a"])], vec![RawTableRef::table(&["t2"])]);
    let query = select(
        vec![item(&["v", "a"])],
        vec![
            RawTableRef::table(&["t1"]).with_alias("x"),
            RawTableRef::subquery(view, "v")
                .with_join(JoinOperator::LeftOuter, Some(eq(&["x", "a"], &["v", "a"]))),
        ],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    let base = &analyzed.base_tbl_result_exprs[0];
    assert!(matches!(base, Expression::Column(_)));
    assert!(!base.contains_tuple_is_null());
}

#[test]
fn inner_join_view_not_rewritten() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(vec![aliased(RawExpr::lit(5), "x")], Vec::new());
    let query = select(
        vec![item(&["v", "x"])],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::subquery(view, "v")
                .with_join(JoinOperator::Inner, Some(eq(&["t1", "a"], &["v", "x"]))),
        ],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!("5", analyzed.base_tbl_result_exprs[0].to_string());
}

#[test]
fn right_join_makes_left_view_nullable() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(vec![aliased(RawExpr::lit(1), "one")], Vec::new());
    let query = select(
        vec![item(&["v", "one"])],
        vec![
            RawTableRef::subquery(view, "v"),
            RawTableRef::table(&["t1"]).with_join(
                JoinOperator::RightOuter,
                Some(eq(&["v", "one"], &["t1", "a"])),
            ),
        ],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert!(analyzed.base_tbl_result_exprs[0].contains_tuple_is_null());
}

#[test]
fn view_columns_get_value_transfers() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(vec![item(&["a"])], vec![RawTableRef::table(&["t1"])]);
    let query = select(vec![item(&["v", "a"])], vec![RawTableRef::subquery(view, "v")]);

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    let Expression::Column(view_col) = &analyzed.result_exprs[0] else {
        panic!("expected column");
    };
    let Expression::Column(base_col) = &analyzed.base_tbl_result_exprs[0] else {
        panic!("expected column");
    };

    assert_ne!(view_col.slot, base_col.slot);
    assert!(analyzer.has_value_transfer(view_col.slot, base_col.slot));
    assert_eq!(1, analyzer.aux_predicates().len());
}

#[test]
fn duplicate_view_column_alias() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(
        vec![item(&["a"]), aliased(RawExpr::column(&["b"]), "a")],
        vec![RawTableRef::table(&["t1"])],
    );
    let query = select(vec![SelectItem::Wildcard], vec![RawTableRef::subquery(view, "v")]);

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "duplicated inline view column alias: 'a' in inline view 'v'",
        err.get_msg()
    );
}

#[test]
fn inline_view_requires_alias() {
    let mut analyzer = new_analyzer(test_catalog());
    let view = select(vec![item(&["a"])], vec![RawTableRef::table(&["t1"])]);
    let raw = RawTableRef {
        alias: None,
        ..RawTableRef::subquery(view, "unused")
    };
    let query = select(vec![SelectItem::Wildcard], vec![raw]);

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert!(err.get_msg().starts_with("Inline view requires an alias"));
}

#[test]
fn outer_join_requires_on_clause() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["t2"]).with_join(JoinOperator::LeftOuter, None),
        ],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!("LEFT OUTER JOIN requires an ON clause: t2", err.get_msg());
}

#[test]
fn on_clause_must_be_boolean() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["t2"])
                .with_join(JoinOperator::Inner, Some(RawExpr::column(&["t2", "a"]))),
        ],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "ON clause 't2.a' requires return type 'BOOLEAN'. Actual type is 'INT'.",
        err.get_msg()
    );
}

#[test]
fn duplicate_table_alias() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["t1"]).with_alias("x"),
            RawTableRef::table(&["t2"]).with_alias("x"),
        ],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!("Duplicate table alias: 'x'", err.get_msg());
}

#[test]
fn ambiguous_column() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![item(&["a"])],
        vec![RawTableRef::table(&["t1"]), RawTableRef::table(&["t2"])],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!("Column/field reference is ambiguous: 'a'", err.get_msg());
}

#[test]
fn clone_unanalyzed_reanalyzes() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::Wildcard],
        vec![RawTableRef::table(&["t1"]).with_alias("x")],
    );
    let analyzed = analyzer.analyze_statement(&query).unwrap();
    let from = &select_body(&analyzed).from;
    assert!(from.is_analyzed());
    assert!(matches!(
        from.table_refs().next(),
        Some(TableRef::BaseTable(_))
    ));

    let mut cloned = from.clone_unanalyzed();
    assert!(!cloned.is_analyzed());
    assert_eq!(0, cloned.table_refs().count());

    // Analyzing in a fresh scope registers the alias again.
    let scope = analyzer.new_child_scope(analyzer.root_scope()).unwrap();
    cloned.analyze(&mut analyzer, scope).unwrap();
    assert!(cloned.is_analyzed());
    assert_eq!(1, cloned.table_refs().count());
    assert_eq!(from.to_sql(), cloned.to_sql());
}
