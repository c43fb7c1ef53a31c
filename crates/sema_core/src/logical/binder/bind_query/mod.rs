pub mod bind_select;
pub mod bind_setop;

use bind_select::{AnalyzedSelect, SelectAnalyzer};
use bind_setop::{AnalyzedSetOp, SetOpAnalyzer};
use sema_error::Result;

use super::analyzer::{Analyzer, ScopeRef};
use crate::ast::QueryStmt;
use crate::descriptor::ids::TupleId;
use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzedQueryBody {
    Select(Box<AnalyzedSelect>),
    SetOp(Box<AnalyzedSetOp>),
}

/// Result of analyzing a query block.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedQuery {
    /// Scope the query was analyzed in.
    pub scope: ScopeRef,
    pub body: AnalyzedQueryBody,
    /// Output column names.
    pub column_labels: Vec<String>,
    pub result_exprs: Vec<Expression>,
    /// Result exprs with inline view columns replaced by the expressions
    /// they're computed from.
    pub base_tbl_result_exprs: Vec<Expression>,
    /// Tuples that physically exist when executing the query.
    pub materialized_tuple_ids: Vec<TupleId>,
    /// If any result expr computes an analytic function.
    pub has_analytic: bool,
}

impl AnalyzedQuery {
    pub fn num_columns(&self) -> usize {
        self.result_exprs.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryAnalyzer {
    pub current: ScopeRef,
}

impl QueryAnalyzer {
    pub fn new(current: ScopeRef) -> Self {
        QueryAnalyzer { current }
    }

    pub fn analyze(&self, analyzer: &mut Analyzer, query: &QueryStmt) -> Result<AnalyzedQuery> {
        match query {
            QueryStmt::Select(select) => SelectAnalyzer::new(self.current).analyze(analyzer, select),
            QueryStmt::Union { all, left, right } => {
                SetOpAnalyzer::new(self.current).analyze(analyzer, *all, left, right)
            }
        }
    }
}
