mod setup;

use std::sync::Arc;

use sema_core::arrays::datatype::DataType;
use sema_core::ast::{
    CommonTableExpr, JoinOperator, QueryStmt, RawBoundary, RawExpr, RawOrderBy, RawTableRef,
    RawWindow, RawWindowSpec, SelectItem, SelectStmt,
};
use sema_core::catalog::CatalogTable;
use sema_core::catalog::auth::Authorizer;
use sema_core::config::session::AnalyzerConfig;
use sema_core::descriptor::export::DescriptorTableExport;
use sema_core::expr::Expression;
use sema_core::expr::arith_expr::ArithOperator;
use sema_core::logical::analytic_window::{BoundaryType, WindowType};
use sema_core::logical::binder::bind_query::bind_select::AnalyzedSelect;
use sema_core::logical::binder::bind_query::{AnalyzedQuery, AnalyzedQueryBody};
use sema_core::logical::binder::table_ref::TableRef;
use sema_error::{DbError, ErrorKind, Result};
use setup::{
    aliased, eq, item, new_analyzer, new_analyzer_with_config, select, test_catalog,
};

fn select_body(query: &AnalyzedQuery) -> &AnalyzedSelect {
    match &query.body {
        AnalyzedQueryBody::Select(select) => select,
        other => panic!("expected select, got {other:?}"),
    }
}

fn window_call(name: &str, args: Vec<RawExpr>, spec: RawWindowSpec) -> RawExpr {
    RawExpr::Function {
        name: name.to_string(),
        args,
        over: Some(spec),
    }
}

fn order_by_a() -> Vec<RawOrderBy> {
    vec![RawOrderBy {
        expr: RawExpr::column(&["a"]),
        desc: false,
    }]
}

#[test]
fn union_widens_integer_types() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = QueryStmt::union(
        true,
        select(vec![item(&["a"])], vec![RawTableRef::table(&["t1"])]),
        select(vec![item(&["a"])], vec![RawTableRef::table(&["t3"])]),
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["a"], analyzed.column_labels);
    assert_eq!(DataType::Int64, analyzed.result_exprs[0].datatype().unwrap());

    let AnalyzedQueryBody::SetOp(setop) = &analyzed.body else {
        panic!("expected set operation");
    };
    assert!(setop.all);
    assert!(matches!(setop.left.result_exprs[0], Expression::Cast(_)));
    assert!(matches!(setop.right.result_exprs[0], Expression::Column(_)));
    assert_eq!(vec![setop.union_tuple], analyzed.materialized_tuple_ids);

    let union_tuple = analyzer.desc_tbl().get_tuple(setop.union_tuple).unwrap();
    assert!(union_tuple.is_materialized());
    assert!(union_tuple.has_mem_layout());
    assert_eq!(Some("a"), union_tuple.slots()[0].label());
}

#[test]
fn union_unequal_columns() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = QueryStmt::union(
        false,
        select(vec![item(&["a"]), item(&["b"])], vec![RawTableRef::table(&["t1"])]),
        select(vec![item(&["a"])], vec![RawTableRef::table(&["t2"])]),
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "Operands have unequal number of columns:\n'SELECT a, b FROM t1' has 2 column(s)\n'SELECT a FROM t2' has 1 column(s)",
        err.get_msg()
    );
}

#[test]
fn union_incompatible_types() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = QueryStmt::union(
        false,
        select(vec![item(&["b"])], vec![RawTableRef::table(&["t1"])]),
        select(vec![item(&["a"])], vec![RawTableRef::table(&["t2"])]),
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "Incompatible return types 'STRING' and 'INT' of exprs 'b' and 'a'.",
        err.get_msg()
    );
}

#[test]
fn limit_and_offset() {
    let mut analyzer = new_analyzer(test_catalog());
    let mut stmt = SelectStmt::new(vec![item(&["a"])], vec![RawTableRef::table(&["t1"])]);
    stmt.limit = Some(RawExpr::lit(10));
    stmt.offset = Some(RawExpr::Arith {
        op: ArithOperator::Add,
        left: Box::new(RawExpr::lit(1)),
        right: Box::new(RawExpr::lit(1)),
    });

    let analyzed = analyzer.analyze_statement(&QueryStmt::select(stmt)).unwrap();
    let select = select_body(&analyzed);
    assert_eq!(Some(10), select.limit);
    assert_eq!(Some(2), select.offset);
    assert!(analyzer.has_limit_offset(analyzer.root_scope()).unwrap());
}

#[test]
fn invalid_limits() {
    let cases = [
        (RawExpr::lit(-1i64), "LIMIT must be a non-negative integer: -1"),
        (
            RawExpr::column(&["a"]),
            "LIMIT expression must be a constant expression: a",
        ),
        (
            RawExpr::lit(1.5),
            "LIMIT expression must be an integer type but is 'DOUBLE': 1.5",
        ),
    ];

    for (limit, expected) in cases {
        let mut analyzer = new_analyzer(test_catalog());
        let mut stmt = SelectStmt::new(vec![item(&["a"])], vec![RawTableRef::table(&["t1"])]);
        stmt.limit = Some(limit);
        let err = analyzer
            .analyze_statement(&QueryStmt::select(stmt))
            .unwrap_err();
        assert_eq!(expected, err.get_msg());
    }
}

#[test]
fn star_expansion() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["t2"]).with_alias("y"),
        ],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["a", "b", "a", "c"], analyzed.column_labels);
    assert_eq!("y.c", analyzed.result_exprs[3].to_string());
}

#[test]
fn qualified_star() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::QualifiedWildcard("y".to_string())],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["t2"]).with_alias("y"),
        ],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["a", "c"], analyzed.column_labels);

    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![SelectItem::QualifiedWildcard("z".to_string())],
        vec![RawTableRef::table(&["t1"])],
    );
    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert!(err.is_kind(ErrorKind::MissingObject));
}

#[test]
fn star_requires_from() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(vec![SelectItem::Wildcard], Vec::new());

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "'*' expression in select list requires FROM clause.",
        err.get_msg()
    );
}

#[test]
fn column_labels() {
    let plus_one = RawExpr::Arith {
        op: ArithOperator::Add,
        left: Box::new(RawExpr::column(&["a"])),
        right: Box::new(RawExpr::lit(1)),
    };
    let query = select(
        vec![
            item(&["t1", "a"]),
            SelectItem::Expr {
                expr: plus_one,
                alias: None,
            },
            aliased(RawExpr::column(&["b"]), "B2"),
        ],
        vec![RawTableRef::table(&["t1"])],
    );

    let mut analyzer = new_analyzer(test_catalog());
    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["a", "a + 1", "b2"], analyzed.column_labels);

    let config = AnalyzerConfig {
        use_hive_column_labels: true,
        ..Default::default()
    };
    let mut analyzer = new_analyzer_with_config(test_catalog(), config);
    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["a", "_c1", "b2"], analyzed.column_labels);
}

#[test]
fn with_clause_view() {
    let mut analyzer = new_analyzer(test_catalog());
    let mut stmt = SelectStmt::new(vec![item(&["w", "a"])], vec![RawTableRef::table(&["w"])]);
    stmt.with.push(CommonTableExpr {
        name: "w".to_string(),
        query: select(vec![item(&["a"])], vec![RawTableRef::table(&["t2"])]),
    });

    let analyzed = analyzer.analyze_statement(&QueryStmt::select(stmt)).unwrap();
    let Some(TableRef::View(view)) = select_body(&analyzed).from.table_refs().next() else {
        panic!("expected view");
    };
    assert!(!view.is_catalog_view());
    assert!(view.view.as_ref().unwrap().id.0 >= 1 << 31);
    assert_eq!(vec!["w"], view.aliases());
}

#[test]
fn duplicate_with_clause_view() {
    let mut analyzer = new_analyzer(test_catalog());
    let mut stmt = SelectStmt::new(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["w"])]);
    for _ in 0..2 {
        stmt.with.push(CommonTableExpr {
            name: "w".to_string(),
            query: select(vec![item(&["a"])], vec![RawTableRef::table(&["t2"])]),
        });
    }

    let err = analyzer
        .analyze_statement(&QueryStmt::select(stmt))
        .unwrap_err();
    assert_eq!("Duplicate table alias: 'w'", err.get_msg());
}

#[test]
fn analytic_gets_default_window() {
    let mut analyzer = new_analyzer(test_catalog());
    let spec = RawWindowSpec {
        order_by: order_by_a(),
        ..Default::default()
    };
    let query = select(
        vec![aliased(window_call("sum", vec![RawExpr::column(&["a"])], spec), "s")],
        vec![RawTableRef::table(&["t1"])],
    );

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert!(analyzed.has_analytic);
    let Expression::Window(window) = &analyzed.result_exprs[0] else {
        panic!("expected window expression");
    };
    assert_eq!(DataType::Int64, window.return_type);
    assert_eq!(
        "RANGE BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW",
        window.window.as_ref().unwrap().to_sql()
    );
}

#[test]
fn analytic_offsets_in_wrong_order() {
    let mut analyzer = new_analyzer(test_catalog());
    let spec = RawWindowSpec {
        order_by: order_by_a(),
        window: Some(RawWindow {
            window_type: WindowType::Rows,
            left: RawBoundary::with_offset(BoundaryType::Preceding, RawExpr::lit(5)),
            right: Some(RawBoundary::with_offset(
                BoundaryType::Preceding,
                RawExpr::lit(2),
            )),
        }),
        ..Default::default()
    };
    let query = select(
        vec![aliased(window_call("sum", vec![RawExpr::column(&["a"])], spec), "s")],
        vec![RawTableRef::table(&["t1"])],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "Offset boundaries are in the wrong order: ROWS BETWEEN 5 PRECEDING AND 2 PRECEDING",
        err.get_msg()
    );
}

#[test]
fn ranking_requires_order_by() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![aliased(
            window_call("rank", Vec::new(), RawWindowSpec::default()),
            "r",
        )],
        vec![RawTableRef::table(&["t1"])],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert!(err.get_msg().starts_with("'rank' requires an ORDER BY clause"));
}

#[test]
fn analytic_not_allowed_in_on_clause() {
    let mut analyzer = new_analyzer(test_catalog());
    let spec = RawWindowSpec {
        order_by: order_by_a(),
        ..Default::default()
    };
    let on = RawExpr::Comparison {
        op: sema_core::expr::comparison_expr::ComparisonOperator::Eq,
        left: Box::new(window_call("row_number", Vec::new(), spec)),
        right: Box::new(RawExpr::lit(1i64)),
    };
    let query = select(
        vec![SelectItem::Wildcard],
        vec![
            RawTableRef::table(&["t1"]),
            RawTableRef::table(&["t2"]).with_join(JoinOperator::Inner, Some(on)),
        ],
    );

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert!(
        err.get_msg()
            .starts_with("Analytic expressions are not allowed here")
    );
}

#[test]
fn analytic_view_has_no_aux_predicates() {
    let mut analyzer = new_analyzer(test_catalog());
    let spec = RawWindowSpec {
        order_by: order_by_a(),
        ..Default::default()
    };
    let view = select(
        vec![
            item(&["a"]),
            aliased(window_call("rank", Vec::new(), spec), "r"),
        ],
        vec![RawTableRef::table(&["t1"])],
    );
    let query = select(vec![item(&["v", "r"])], vec![RawTableRef::subquery(view, "v")]);

    analyzer.analyze_statement(&query).unwrap();
    assert!(analyzer.aux_predicates().is_empty());
}

#[derive(Debug)]
struct DenyTable(&'static str);

impl Authorizer for DenyTable {
    fn check_table_access(&self, user: &str, table: &CatalogTable) -> Result<()> {
        if table.name == self.0 {
            return Err(DbError::new(format!(
                "User '{user}' may not read '{}'",
                table.full_name()
            )));
        }
        Ok(())
    }
}

fn catalog_with_view() -> sema_core::catalog::memory::MemoryCatalog {
    let mut catalog = test_catalog();
    catalog
        .create_view(
            "default",
            "v1",
            select(vec![item(&["a"])], vec![RawTableRef::table(&["t1"])]),
        )
        .unwrap();
    catalog
}

#[test]
fn table_access_denied() {
    let config = AnalyzerConfig {
        user: "bob".to_string(),
        ..Default::default()
    };
    let mut analyzer = new_analyzer_with_config(catalog_with_view(), config)
        .with_authorizer(Arc::new(DenyTable("t1")));
    let query = select(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["t1"])]);

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!("User 'bob' may not read 'default.t1'", err.get_msg());
}

#[test]
fn view_body_skips_privilege_checks() {
    let config = AnalyzerConfig {
        user: "bob".to_string(),
        ..Default::default()
    };
    let mut analyzer = new_analyzer_with_config(catalog_with_view(), config)
        .with_authorizer(Arc::new(DenyTable("t1")));
    let query = select(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["v1"])]);

    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["a"], analyzed.column_labels);

    let Some(TableRef::View(view)) = select_body(&analyzed).from.table_refs().next() else {
        panic!("expected view");
    };
    assert!(view.is_catalog_view());
    assert_eq!(vec!["default.v1", "v1"], view.aliases());
}

#[test]
fn explain_view_reports_generic_message() {
    let config = AnalyzerConfig {
        user: "bob".to_string(),
        explain: true,
        ..Default::default()
    };
    let mut analyzer = new_analyzer_with_config(catalog_with_view(), config)
        .with_authorizer(Arc::new(DenyTable("t1")));
    let query = select(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["v1"])]);

    let err = analyzer.analyze_statement(&query).unwrap_err();
    assert_eq!(
        "User 'bob' does not have privileges to EXPLAIN this statement.",
        err.get_msg()
    );
}

fn plus_one_from_t1() -> QueryStmt {
    let plus_one = RawExpr::Arith {
        op: ArithOperator::Add,
        left: Box::new(RawExpr::column(&["a"])),
        right: Box::new(RawExpr::lit(1)),
    };
    select(
        vec![SelectItem::Expr {
            expr: plus_one,
            alias: None,
        }],
        vec![RawTableRef::table(&["t1"])],
    )
}

#[test]
fn catalog_view_uses_hive_labels() {
    let catalog = || {
        let mut catalog = test_catalog();
        catalog
            .create_view("default", "v2", plus_one_from_t1())
            .unwrap();
        catalog
    };

    let mut analyzer = new_analyzer(catalog());
    let query = select(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["v2"])]);
    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["_c0"], analyzed.column_labels);

    let mut analyzer = new_analyzer(catalog());
    let query = select(vec![item(&["v2", "_c0"])], vec![RawTableRef::table(&["v2"])]);
    let analyzed = analyzer.analyze_statement(&query).unwrap();
    assert_eq!(vec!["_c0"], analyzed.column_labels);
}

#[test]
fn with_clause_view_keeps_session_labels() {
    let mut analyzer = new_analyzer(test_catalog());
    let mut stmt = SelectStmt::new(vec![SelectItem::Wildcard], vec![RawTableRef::table(&["w"])]);
    stmt.with.push(CommonTableExpr {
        name: "w".to_string(),
        query: plus_one_from_t1(),
    });

    let analyzed = analyzer.analyze_statement(&QueryStmt::select(stmt)).unwrap();
    assert_eq!(vec!["a + 1"], analyzed.column_labels);
}

#[test]
fn export_descriptor_table() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![item(&["a"]), item(&["b"])],
        vec![RawTableRef::table(&["t1"])],
    );
    analyzer.analyze_statement(&query).unwrap();

    let export = analyzer.desc_tbl().export().unwrap();
    assert_eq!(1, export.tuples.len());
    assert_eq!(2, export.slots.len());

    let tuple = &export.tuples[0];
    assert_eq!(1, tuple.num_null_bytes);
    assert!(tuple.table_id.is_some());
    for slot in &export.slots {
        assert!(slot.is_materialized);
        assert!(slot.byte_offset >= tuple.num_null_bytes as i64);
        assert!(slot.byte_offset as usize + slot.byte_size <= tuple.byte_size);
    }

    let json = serde_json::to_string(&export).unwrap();
    let parsed: DescriptorTableExport = serde_json::from_str(&json).unwrap();
    assert_eq!(export, parsed);
}

#[test]
fn referenced_slots_materialized() {
    let mut analyzer = new_analyzer(test_catalog());
    let query = select(
        vec![item(&["x", "b"])],
        vec![
            RawTableRef::table(&["t1"]).with_alias("x"),
            RawTableRef::table(&["t2"])
                .with_alias("y")
                .with_join(JoinOperator::Inner, Some(eq(&["x", "a"], &["y", "a"]))),
        ],
    );
    analyzer.analyze_statement(&query).unwrap();

    // x.b from the select list, x.a and y.a from the ON clause.
    let materialized = analyzer
        .desc_tbl()
        .iter_tuples()
        .flat_map(|tuple| tuple.materialized_slots())
        .count();
    assert_eq!(3, materialized);
    assert_eq!(1, analyzer.conjuncts().len());
}
