use std::sync::Arc;

use sema_error::{DbError, Result, ResultExt};
use tracing::{debug, trace};

use super::TableRefInfo;
use crate::arrays::scalar::ScalarValue;
use crate::ast::{QueryStmt, RawTableRef};
use crate::catalog::stats::ColumnStats;
use crate::catalog::{CatalogTable, TableKind, ViewDefinition};
use crate::descriptor::ids::TupleId;
use crate::descriptor::tuple::{InlineViewSchema, TupleSource};
use crate::eval::ConstEvaluator;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::substitution::ExprSubstitutionMap;
use crate::expr::{Expression, if_expr, is_not_null, lit, tuple_is_null};
use crate::logical::binder::analyzer::{Analyzer, ScopeRef};
use crate::logical::binder::bind_query::{AnalyzedQuery, QueryAnalyzer};

#[derive(Debug, Clone, Default, PartialEq)]
struct InlineViewState {
    inner_scope: Option<ScopeRef>,
    query: Option<Box<AnalyzedQuery>>,
    /// View slots to the inner query's result exprs.
    smap: ExprSubstitutionMap,
    /// View slots to the inner query's result exprs resolved down to base
    /// table slots.
    base_tbl_smap: ExprSubstitutionMap,
    materialized_tuple_ids: Vec<TupleId>,
}

/// A subquery in a FROM clause, or a view expanded into one.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineViewRef {
    pub info: TableRefInfo,
    pub query: QueryStmt,
    /// The view this ref expands. None for subqueries.
    pub view: Option<Arc<CatalogTable>>,
    view_state: InlineViewState,
}

impl InlineViewRef {
    pub fn new(raw: RawTableRef, query: QueryStmt, view: Option<Arc<CatalogTable>>) -> Self {
        InlineViewRef {
            info: TableRefInfo::new(raw),
            query,
            view,
            view_state: InlineViewState::default(),
        }
    }

    /// Whether this ref expands a view stored in the catalog.
    pub fn is_catalog_view(&self) -> bool {
        match &self.view {
            Some(view) => !matches!(
                &view.kind,
                TableKind::View(ViewDefinition { local: true, .. })
            ),
            None => false,
        }
    }

    /// Alias the view's columns are qualified with.
    pub fn alias(&self) -> Result<String> {
        match (self.info.explicit_alias(), &self.view) {
            (Some(alias), _) => Ok(alias),
            (None, Some(view)) => Ok(view.name.clone()),
            (None, None) => Err(DbError::internal(format!(
                "Inline view without an alias: {}",
                self.info.raw.table_sql()
            ))),
        }
    }

    pub fn aliases(&self) -> Vec<String> {
        match (self.info.explicit_alias(), &self.view) {
            (Some(alias), _) => vec![alias],
            (None, Some(view)) if self.is_catalog_view() => {
                vec![view.full_name(), view.name.clone()]
            }
            (None, Some(view)) => vec![view.name.clone()],
            (None, None) => Vec::new(),
        }
    }

    /// Scope the view body was analyzed in.
    pub fn inner_scope(&self) -> Option<ScopeRef> {
        self.view_state.inner_scope
    }

    pub fn analyzed_query(&self) -> Option<&AnalyzedQuery> {
        self.view_state.query.as_deref()
    }

    pub fn smap(&self) -> &ExprSubstitutionMap {
        &self.view_state.smap
    }

    pub fn base_tbl_smap(&self) -> &ExprSubstitutionMap {
        &self.view_state.base_tbl_smap
    }

    /// Tuples materialized by the view body, or the view's own tuple if the
    /// body doesn't materialize any.
    pub fn materialized_tuple_ids(&self) -> Result<Vec<TupleId>> {
        self.info.desc()?;
        Ok(self.view_state.materialized_tuple_ids.clone())
    }

    pub(crate) fn analyze(&mut self, analyzer: &mut Analyzer, scope: ScopeRef) -> Result<()> {
        let alias = self.alias()?;
        let inner_scope = analyzer.new_child_scope(scope)?;

        if self.is_catalog_view() {
            // Stored views always expose `_c<i>` for unnamed columns.
            analyzer.set_use_hive_column_labels(inner_scope, true)?;
            if analyzer.config().explain {
                // Don't reveal what the view reads from if the user can't see
                // the view body.
                let msg = format!(
                    "User '{}' does not have privileges to EXPLAIN this statement.",
                    analyzer.config().user
                );
                analyzer.set_auth_error_message(inner_scope, msg)?;
            } else {
                analyzer.set_enable_privilege_checks(inner_scope, false)?;
            }
        }

        let query = QueryAnalyzer::new(inner_scope).analyze(analyzer, &self.query)?;

        let desc = self.create_tuple_descriptor(analyzer, &alias, &query)?;
        analyzer.register_table_ref(scope, desc, &self.aliases())?;
        self.info.set_analyzed_desc(desc, scope);

        let mut materialized_tuple_ids = query.materialized_tuple_ids.clone();
        if materialized_tuple_ids.is_empty() {
            // Tupleless body, e.g. `SELECT 5`. Materialize the view's tuple
            // so there's something to check for NULL on outer joins.
            analyzer.desc_tbl_mut().get_tuple_mut(desc)?.set_materialized(true);
            materialized_tuple_ids.push(desc);
        }

        let mut smap = ExprSubstitutionMap::new();
        let mut base_tbl_smap = ExprSubstitutionMap::new();

        let columns = query
            .column_labels
            .iter()
            .zip(&query.result_exprs)
            .zip(&query.base_tbl_result_exprs);
        for ((label, result), base_tbl_result) in columns {
            let stats = ColumnStats::from_expr(result, analyzer.desc_tbl())?;
            let slot_id = analyzer.register_column_ref(desc, label)?;
            let slot = analyzer.desc_tbl_mut().get_slot_mut(slot_id)?;
            slot.set_stats(stats);
            let datatype = slot.datatype()?.clone();

            let col: Expression = ColumnExpr::new(slot_id, datatype, format!("{alias}.{label}")).into();
            smap.put(col.clone(), result.clone());
            base_tbl_smap.put(col.clone(), base_tbl_result.clone());

            // Equivalences must not be pushed into a view computing analytic
            // functions, that would change the rows seen by the window.
            if !query.has_analytic {
                analyzer.create_aux_equiv_predicate(col, result.clone())?;
            }
        }

        trace!(%alias, %smap, %base_tbl_smap, "analyzed inline view");

        self.view_state = InlineViewState {
            inner_scope: Some(inner_scope),
            query: Some(Box::new(query)),
            smap,
            base_tbl_smap,
            materialized_tuple_ids,
        };

        Ok(())
    }

    /// Register the unmaterialized tuple exposing the view's columns.
    fn create_tuple_descriptor(
        &self,
        analyzer: &mut Analyzer,
        alias: &str,
        query: &AnalyzedQuery,
    ) -> Result<TupleId> {
        let mut columns: Vec<(String, _)> = Vec::with_capacity(query.column_labels.len());
        for (label, expr) in query.column_labels.iter().zip(&query.result_exprs) {
            if columns.iter().any(|(name, _)| name == label) {
                return Err(DbError::new(format!(
                    "duplicated inline view column alias: '{label}' in inline view '{alias}'"
                )));
            }
            columns.push((label.clone(), expr.datatype()?));
        }

        let desc_tbl = analyzer.desc_tbl_mut();
        let desc = desc_tbl.create_tuple_descriptor(format!("inline view {alias}"));
        let tuple = desc_tbl.get_tuple_mut(desc)?;
        tuple.set_materialized(false);
        tuple.set_source(TupleSource::InlineView(InlineViewSchema {
            alias: alias.to_string(),
            view: self.view.clone(),
            columns,
        }));
        tuple.set_alias(alias, self.info.explicit_alias().is_some());

        Ok(desc)
    }

    /// Rewrite both substitution maps so every expression evaluates to NULL
    /// when the view's tuples are NULL.
    ///
    /// Needed when the view is on the nullable side of an outer join.
    /// Expressions that don't already become NULL when all their column
    /// inputs are NULL get wrapped in `if(TupleIsNull(..), NULL, expr)`.
    pub fn make_output_nullable(&mut self, analyzer: &Analyzer) -> Result<()> {
        let evaluator = analyzer.evaluator();
        let tuple_ids = self.view_state.materialized_tuple_ids.clone();
        if tuple_ids.is_empty() {
            return Err(DbError::internal(format!(
                "Inline view made nullable before analysis: {}",
                self.info.raw.table_sql()
            )));
        }

        let InlineViewState {
            smap,
            base_tbl_smap,
            ..
        } = &mut self.view_state;
        make_output_nullable_helper(evaluator.as_ref(), smap, &tuple_ids)?;
        make_output_nullable_helper(evaluator.as_ref(), base_tbl_smap, &tuple_ids)?;

        Ok(())
    }

    pub(crate) fn reset_view(&mut self) {
        self.view_state = InlineViewState::default();
    }
}

fn make_output_nullable_helper(
    evaluator: &dyn ConstEvaluator,
    smap: &mut ExprSubstitutionMap,
    tuple_ids: &[TupleId],
) -> Result<()> {
    let mut null_smap = ExprSubstitutionMap::new();
    for rhs in smap.rhs() {
        for col in rhs.collect_column_refs() {
            let col = Expression::from(col);
            if !null_smap.contains_lhs(&col) {
                null_smap.put(col, lit(ScalarValue::Null).into());
            }
        }
    }

    for rhs in smap.rhs_mut() {
        if !requires_null_wrapping(evaluator, rhs, &null_smap)? {
            continue;
        }
        rhs.replace_with(|expr| {
            let wrapped = if_expr(
                tuple_is_null(tuple_ids.to_vec()),
                lit(ScalarValue::Null),
                expr,
            )?;
            Ok(wrapped.into())
        })?;
        debug!(expr = %rhs, "wrapped nullable inline view output");
    }

    Ok(())
}

/// Check if `expr` may produce a non-NULL value when every column it reads
/// is NULL.
fn requires_null_wrapping(
    evaluator: &dyn ConstEvaluator,
    expr: &Expression,
    null_smap: &ExprSubstitutionMap,
) -> Result<bool> {
    // Already wrapped.
    if expr.contains_tuple_is_null() {
        return Ok(true);
    }

    let substituted = expr.substitute(null_smap)?;
    if !substituted.is_constant() {
        // Analytic output, can't be folded.
        return Ok(true);
    }

    let pred = Expression::from(is_not_null(substituted));
    evaluator
        .eval_predicate(&pred)
        .context_fn(|| format!("Failed to evaluate predicate: {pred}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::descriptor::ids::SlotId;
    use crate::eval::ExprEvaluator;
    use crate::expr::arith_expr::{ArithExpr, ArithOperator};
    use crate::expr::column;

    fn col(slot: usize) -> Expression {
        column(SlotId(slot), DataType::Int32, format!("c{slot}")).into()
    }

    fn smap_with(rhs: Vec<Expression>) -> ExprSubstitutionMap {
        let mut smap = ExprSubstitutionMap::new();
        for (idx, expr) in rhs.into_iter().enumerate() {
            smap.put(col(100 + idx), expr);
        }
        smap
    }

    #[test]
    fn constant_gets_wrapped() {
        let mut smap = smap_with(vec![lit(5).into()]);
        make_output_nullable_helper(&ExprEvaluator, &mut smap, &[TupleId(3)]).unwrap();
        assert_eq!("if(TupleIsNull(t3), NULL, 5)", smap.rhs()[0].to_string());
    }

    #[test]
    fn column_not_wrapped() {
        let arith = ArithExpr::try_new(ArithOperator::Add, col(0), lit(1).into()).unwrap();
        let mut smap = smap_with(vec![col(0), arith.into()]);
        let before = smap.clone();
        make_output_nullable_helper(&ExprEvaluator, &mut smap, &[TupleId(0)]).unwrap();
        assert_eq!(before, smap);
    }

    #[test]
    fn already_wrapped_requires_wrapping() {
        let wrapped: Expression = if_expr(tuple_is_null(vec![TupleId(1)]), lit(ScalarValue::Null), col(0))
            .unwrap()
            .into();
        let null_smap = ExprSubstitutionMap::new();
        assert!(requires_null_wrapping(&ExprEvaluator, &wrapped, &null_smap).unwrap());
    }
}
