use sema_error::{DbError, Result, ResultExt};
use tracing::trace;

use super::{AnalyzedQuery, AnalyzedQueryBody};
use crate::arrays::datatype::DataType;
use crate::ast::{RawExpr, SelectItem, SelectStmt};
use crate::descriptor::ids::TupleId;
use crate::expr::Expression;
use crate::expr::column_expr::ColumnExpr;
use crate::logical::binder::analyzer::{Analyzer, ScopeRef};
use crate::logical::binder::expr_binder::ExprBinder;
use crate::logical::binder::from_clause::FromClause;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedSelect {
    pub from: FromClause,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SelectAnalyzer {
    pub current: ScopeRef,
}

impl SelectAnalyzer {
    pub fn new(current: ScopeRef) -> Self {
        SelectAnalyzer { current }
    }

    pub fn analyze(&self, analyzer: &mut Analyzer, select: &SelectStmt) -> Result<AnalyzedQuery> {
        for cte in &select.with {
            analyzer.register_local_view(self.current, &cte.name, cte.query.clone())?;
        }

        let mut from = FromClause::new(select.from.iter().cloned());
        from.analyze(analyzer, self.current)?;

        let use_hive_labels = analyzer.use_hive_column_labels(self.current)?;
        let binder = ExprBinder::for_select_list(self.current);

        let mut column_labels = Vec::with_capacity(select.select_list.len());
        let mut result_exprs = Vec::with_capacity(select.select_list.len());

        for item in &select.select_list {
            match item {
                SelectItem::Wildcard => {
                    if from.is_empty() {
                        return Err(DbError::new(
                            "'*' expression in select list requires FROM clause.",
                        ));
                    }
                    let tuples = from
                        .table_refs()
                        .map(|table_ref| table_ref.desc())
                        .collect::<Result<Vec<_>>>()?;
                    for tuple in tuples {
                        expand_star(analyzer, tuple, &mut column_labels, &mut result_exprs)?;
                    }
                }
                SelectItem::QualifiedWildcard(alias) => {
                    let tuple = match analyzer.lookup_alias(self.current, &alias.to_lowercase())? {
                        Some((scope, tuple)) if scope == self.current => tuple,
                        _ => {
                            return Err(DbError::missing(format!(
                                "Could not resolve star expression: '{alias}.*'"
                            )));
                        }
                    };
                    expand_star(analyzer, tuple, &mut column_labels, &mut result_exprs)?;
                }
                SelectItem::Expr { expr, alias } => {
                    let bound = binder.bind(analyzer, expr)?;
                    let label = match (alias, expr) {
                        (Some(alias), _) => alias.to_lowercase(),
                        (None, RawExpr::Column(path)) => path
                            .last()
                            .map(|p| p.to_lowercase())
                            .unwrap_or_default(),
                        (None, _) if use_hive_labels => format!("_c{}", result_exprs.len()),
                        (None, _) => expr.to_string().to_lowercase(),
                    };
                    column_labels.push(label);
                    result_exprs.push(bound);
                }
            }
        }

        let has_analytic = result_exprs.iter().any(|expr| expr.contains_window());

        let mut base_tbl_result_exprs = result_exprs.clone();
        for view in from.inline_views() {
            base_tbl_result_exprs = base_tbl_result_exprs
                .iter()
                .map(|expr| expr.substitute(view.base_tbl_smap()))
                .collect::<Result<Vec<_>>>()?;
        }

        let materialized_tuple_ids = from.materialized_tuple_ids()?;

        let limit = self.bind_limit_expr(analyzer, select.limit.as_ref(), "LIMIT")?;
        let offset = self.bind_limit_expr(analyzer, select.offset.as_ref(), "OFFSET")?;
        if limit.is_some() || offset.is_some() {
            analyzer.set_has_limit_offset(self.current, true)?;
        }

        trace!(scope = %self.current, ?column_labels, "analyzed select");

        Ok(AnalyzedQuery {
            scope: self.current,
            body: AnalyzedQueryBody::Select(Box::new(AnalyzedSelect {
                from,
                limit,
                offset,
            })),
            column_labels,
            result_exprs,
            base_tbl_result_exprs,
            materialized_tuple_ids,
            has_analytic,
        })
    }

    /// Bind and evaluate a LIMIT or OFFSET expression.
    fn bind_limit_expr(
        &self,
        analyzer: &mut Analyzer,
        expr: Option<&RawExpr>,
        clause: &str,
    ) -> Result<Option<u64>> {
        let Some(raw) = expr else {
            return Ok(None);
        };

        let bound = ExprBinder::new(self.current).bind(analyzer, raw)?;
        if !bound.is_constant() {
            return Err(DbError::new(format!(
                "{clause} expression must be a constant expression: {raw}"
            )));
        }
        let datatype = bound.datatype()?;
        if !datatype.is_integer() {
            return Err(DbError::new(format!(
                "{clause} expression must be an integer type but is '{datatype}': {raw}"
            )));
        }

        let value = analyzer
            .evaluator()
            .eval_constant_numeric(&bound)
            .context_fn(|| format!("Failed to evaluate {clause} expression: {raw}"))?;
        if value < 0.0 {
            return Err(DbError::new(format!(
                "{clause} must be a non-negative integer: {raw}"
            )));
        }

        Ok(Some(value as u64))
    }
}

/// Append a column ref for every scalar column of a tuple.
fn expand_star(
    analyzer: &mut Analyzer,
    tuple: TupleId,
    labels: &mut Vec<String>,
    exprs: &mut Vec<Expression>,
) -> Result<()> {
    let (alias, columns) = {
        let desc = analyzer.desc_tbl().get_tuple(tuple)?;
        let source = desc
            .source()
            .ok_or_else(|| DbError::internal(format!("Tuple {tuple} has no columns to expand")))?;
        let columns: Vec<String> = source
            .iter_columns()
            .filter(|col| !col.datatype.is_collection() && !matches!(col.datatype, DataType::Struct(_)))
            .map(|col| col.name.to_string())
            .collect();
        (desc.alias().unwrap_or_default().to_string(), columns)
    };

    for name in columns {
        let slot = analyzer.register_column_ref(tuple, &name)?;
        let datatype = analyzer.desc_tbl().get_slot(slot)?.datatype()?.clone();
        exprs.push(ColumnExpr::new(slot, datatype, format!("{alias}.{name}")).into());
        labels.push(name);
    }

    Ok(())
}
