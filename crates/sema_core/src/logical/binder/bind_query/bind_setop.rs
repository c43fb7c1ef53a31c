use sema_error::{DbError, Result};
use tracing::debug;

use super::{AnalyzedQuery, AnalyzedQueryBody, QueryAnalyzer};
use crate::arrays::datatype::DataType;
use crate::ast::QueryStmt;
use crate::descriptor::ids::{SlotId, TupleId};
use crate::expr::column_expr::ColumnExpr;
use crate::expr::{Expression, cast};
use crate::logical::binder::analyzer::{Analyzer, ScopeRef};

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedSetOp {
    pub all: bool,
    pub left: AnalyzedQuery,
    pub left_scope: ScopeRef,
    pub right: AnalyzedQuery,
    pub right_scope: ScopeRef,
    /// Tuple holding the output rows of the union.
    pub union_tuple: TupleId,
}

#[derive(Debug, Clone, Copy)]
pub struct SetOpAnalyzer {
    pub current: ScopeRef,
}

impl SetOpAnalyzer {
    pub fn new(current: ScopeRef) -> Self {
        SetOpAnalyzer { current }
    }

    /// Analyze `left UNION [ALL] right`.
    ///
    /// Each operand is analyzed in its own child scope. Operand columns are
    /// cast to a common type if the operands' result tuples aren't
    /// compatible.
    pub fn analyze(
        &self,
        analyzer: &mut Analyzer,
        all: bool,
        left: &QueryStmt,
        right: &QueryStmt,
    ) -> Result<AnalyzedQuery> {
        let left_scope = analyzer.new_child_scope(self.current)?;
        let mut left_query = QueryAnalyzer::new(left_scope).analyze(analyzer, left)?;

        let right_scope = analyzer.new_child_scope(self.current)?;
        let mut right_query = QueryAnalyzer::new(right_scope).analyze(analyzer, right)?;

        if left_query.num_columns() != right_query.num_columns() {
            return Err(DbError::new(format!(
                "Operands have unequal number of columns:\n'{left}' has {} column(s)\n'{right}' has {} column(s)",
                left_query.num_columns(),
                right_query.num_columns(),
            )));
        }

        let left_tuple = create_result_tuple(analyzer, "union left operand", &left_query)?;
        let right_tuple = create_result_tuple(analyzer, "union right operand", &right_query)?;
        let compatible = analyzer
            .desc_tbl()
            .get_tuple(left_tuple)?
            .is_compatible(analyzer.desc_tbl().get_tuple(right_tuple)?);

        let output_types = if compatible {
            left_query
                .result_exprs
                .iter()
                .map(|expr| expr.datatype())
                .collect::<Result<Vec<_>>>()?
        } else {
            let output_types = common_types(&left_query, &right_query)?;
            debug!(?output_types, "casting union operands");
            cast_results(&mut left_query, &output_types)?;
            cast_results(&mut right_query, &output_types)?;
            output_types
        };

        // Operand results are read when producing union rows.
        for query in [&left_query, &right_query] {
            let slots: Vec<SlotId> = query
                .base_tbl_result_exprs
                .iter()
                .flat_map(|expr| expr.collect_column_refs())
                .map(|col| col.slot)
                .collect();
            analyzer.desc_tbl_mut().mark_slots_materialized(slots)?;
        }

        let union_tuple = analyzer.desc_tbl_mut().create_tuple_descriptor("union");
        let mut result_exprs = Vec::with_capacity(output_types.len());
        for (label, datatype) in left_query.column_labels.iter().zip(&output_types) {
            let slot_id = analyzer.desc_tbl_mut().add_slot(union_tuple)?;
            let slot = analyzer.desc_tbl_mut().get_slot_mut(slot_id)?;
            slot.set_datatype(datatype.clone());
            slot.set_label(label);
            result_exprs.push(Expression::from(ColumnExpr::new(
                slot_id,
                datatype.clone(),
                label.clone(),
            )));
        }

        Ok(AnalyzedQuery {
            scope: self.current,
            column_labels: left_query.column_labels.clone(),
            base_tbl_result_exprs: result_exprs.clone(),
            result_exprs,
            materialized_tuple_ids: vec![union_tuple],
            has_analytic: left_query.has_analytic || right_query.has_analytic,
            body: AnalyzedQueryBody::SetOp(Box::new(AnalyzedSetOp {
                all,
                left: left_query,
                left_scope,
                right: right_query,
                right_scope,
                union_tuple,
            })),
        })
    }
}

/// Register an unmaterialized tuple typed like the query's results.
fn create_result_tuple(
    analyzer: &mut Analyzer,
    name: &str,
    query: &AnalyzedQuery,
) -> Result<TupleId> {
    let desc_tbl = analyzer.desc_tbl_mut();
    let tuple = desc_tbl.create_tuple_descriptor(name);
    desc_tbl.get_tuple_mut(tuple)?.set_materialized(false);
    for expr in &query.result_exprs {
        let slot = desc_tbl.add_slot(tuple)?;
        desc_tbl.get_slot_mut(slot)?.set_datatype(expr.datatype()?);
    }
    Ok(tuple)
}

fn common_types(left: &AnalyzedQuery, right: &AnalyzedQuery) -> Result<Vec<DataType>> {
    left.result_exprs
        .iter()
        .zip(&right.result_exprs)
        .map(|(l, r)| {
            let (l_type, r_type) = (l.datatype()?, r.datatype()?);
            l_type.common_numeric_type(&r_type).ok_or_else(|| {
                DbError::new(format!(
                    "Incompatible return types '{l_type}' and '{r_type}' of exprs '{l}' and '{r}'."
                ))
            })
        })
        .collect()
}

fn cast_results(query: &mut AnalyzedQuery, types: &[DataType]) -> Result<()> {
    for exprs in [&mut query.result_exprs, &mut query.base_tbl_result_exprs] {
        for (expr, datatype) in exprs.iter_mut().zip(types) {
            if &expr.datatype()? == datatype {
                continue;
            }
            expr.replace_with(|e| Ok(cast(e, datatype.clone())?.into()))?;
        }
    }
    Ok(())
}
