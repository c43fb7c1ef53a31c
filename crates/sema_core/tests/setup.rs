#![allow(dead_code)]

use std::sync::Arc;

use sema_core::arrays::datatype::DataType;
use sema_core::ast::{QueryStmt, RawExpr, RawTableRef, SelectItem, SelectStmt};
use sema_core::catalog::memory::MemoryCatalog;
use sema_core::config::session::AnalyzerConfig;
use sema_core::expr::comparison_expr::ComparisonOperator;
use sema_core::logical::binder::analyzer::Analyzer;

/// Catalog with the following tables in the `default` database:
///
/// - t1(a INT, b STRING, arr ARRAY<INT>)
/// - t2(a INT, c DOUBLE)
/// - t3(a BIGINT)
pub fn test_catalog() -> MemoryCatalog {
    let mut catalog = MemoryCatalog::new("default");
    catalog
        .create_table(
            "default",
            "t1",
            [
                ("a", DataType::Int32),
                ("b", DataType::Utf8),
                ("arr", DataType::list(DataType::Int32)),
            ],
        )
        .unwrap();
    catalog
        .create_table(
            "default",
            "t2",
            [("a", DataType::Int32), ("c", DataType::Float64)],
        )
        .unwrap();
    catalog
        .create_table("default", "t3", [("a", DataType::Int64)])
        .unwrap();
    catalog
}

pub fn new_analyzer(catalog: MemoryCatalog) -> Analyzer {
    new_analyzer_with_config(catalog, AnalyzerConfig::default())
}

pub fn new_analyzer_with_config(catalog: MemoryCatalog, config: AnalyzerConfig) -> Analyzer {
    logutil::init_test();
    Analyzer::new(config, Arc::new(catalog))
}

pub fn item(path: &[&str]) -> SelectItem {
    SelectItem::Expr {
        expr: RawExpr::column(path),
        alias: None,
    }
}

pub fn aliased(expr: RawExpr, alias: &str) -> SelectItem {
    SelectItem::Expr {
        expr,
        alias: Some(alias.to_string()),
    }
}

pub fn select(select_list: Vec<SelectItem>, from: Vec<RawTableRef>) -> QueryStmt {
    QueryStmt::select(SelectStmt::new(select_list, from))
}

pub fn eq(left: &[&str], right: &[&str]) -> RawExpr {
    RawExpr::Comparison {
        op: ComparisonOperator::Eq,
        left: Box::new(RawExpr::column(left)),
        right: Box::new(RawExpr::column(right)),
    }
}
