use sema_error::{DbError, Result};

use super::analyzer::{Analyzer, ScopeRef};
use crate::ast::{RawBoundary, RawExpr, RawWindowSpec};
use crate::expr::Expression;
use crate::expr::arith_expr::ArithExpr;
use crate::expr::case_expr::{CaseExpr, WhenThen};
use crate::expr::cast_expr::CastExpr;
use crate::expr::comparison_expr::ComparisonExpr;
use crate::expr::conjunction_expr::ConjunctionExpr;
use crate::expr::is_null_expr::IsNullExpr;
use crate::expr::lit;
use crate::expr::scalar_function_expr::{ScalarFunction, ScalarFunctionExpr};
use crate::expr::window_expr::{OrderByExpr, WindowExpr, WindowFunction};
use crate::logical::analytic_window::{AnalyticWindow, Boundary};

/// Binds raw expressions against the tables visible from a scope.
#[derive(Debug, Clone, Copy)]
pub struct ExprBinder {
    pub current: ScopeRef,
    /// Whether analytic functions may appear in the bound expression.
    allow_windows: bool,
}

impl ExprBinder {
    pub fn new(current: ScopeRef) -> Self {
        ExprBinder {
            current,
            allow_windows: false,
        }
    }

    /// Binder for select list expressions, which may contain analytic
    /// functions.
    pub fn for_select_list(current: ScopeRef) -> Self {
        ExprBinder {
            current,
            allow_windows: true,
        }
    }

    pub fn bind(&self, analyzer: &mut Analyzer, expr: &RawExpr) -> Result<Expression> {
        self.bind_inner(analyzer, expr, false)
    }

    fn bind_inner(
        &self,
        analyzer: &mut Analyzer,
        expr: &RawExpr,
        in_window: bool,
    ) -> Result<Expression> {
        Ok(match expr {
            RawExpr::Column(path) => analyzer.resolve_column(self.current, path)?.into(),
            RawExpr::Literal(v) => lit(v.clone()).into(),
            RawExpr::Arith { op, left, right } => {
                let left = self.bind_inner(analyzer, left, in_window)?;
                let right = self.bind_inner(analyzer, right, in_window)?;
                ArithExpr::try_new(*op, left, right)?.into()
            }
            RawExpr::Comparison { op, left, right } => {
                let left = self.bind_inner(analyzer, left, in_window)?;
                let right = self.bind_inner(analyzer, right, in_window)?;
                ComparisonExpr::try_new(*op, left, right)?.into()
            }
            RawExpr::Conjunction { op, exprs } => {
                let exprs = self.bind_all(analyzer, exprs, in_window)?;
                ConjunctionExpr::try_new(*op, exprs)?.into()
            }
            RawExpr::Case { cases, else_expr } => {
                let cases = cases
                    .iter()
                    .map(|(when, then)| {
                        Ok(WhenThen {
                            when: self.bind_inner(analyzer, when, in_window)?,
                            then: self.bind_inner(analyzer, then, in_window)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let else_expr = match else_expr {
                    Some(else_expr) => Some(Box::new(self.bind_inner(analyzer, else_expr, in_window)?)),
                    None => None,
                };
                CaseExpr::try_new(cases, else_expr)?.into()
            }
            RawExpr::IsNull { expr, negated } => IsNullExpr {
                input: Box::new(self.bind_inner(analyzer, expr, in_window)?),
                negated: *negated,
            }
            .into(),
            RawExpr::Cast { expr: input, to } => {
                let input = self.bind_inner(analyzer, input, in_window)?;
                CastExpr::try_new(input, to.clone())?.into()
            }
            RawExpr::Function {
                name,
                args,
                over: None,
            } => {
                let lower = name.to_lowercase();
                if let Some(function) = ScalarFunction::from_name(&lower) {
                    let inputs = self.bind_all(analyzer, args, in_window)?;
                    ScalarFunctionExpr::try_new(function, inputs)?.into()
                } else if WindowFunction::from_name(&lower).is_some() {
                    return Err(DbError::new(format!(
                        "Analytic function '{lower}' requires an OVER clause: {expr}"
                    )));
                } else {
                    return Err(DbError::new(format!("Unknown function: '{name}'")));
                }
            }
            RawExpr::Function {
                name,
                args,
                over: Some(spec),
            } => self.bind_window(analyzer, expr, name, args, spec, in_window)?,
        })
    }

    fn bind_all(
        &self,
        analyzer: &mut Analyzer,
        exprs: &[RawExpr],
        in_window: bool,
    ) -> Result<Vec<Expression>> {
        exprs
            .iter()
            .map(|expr| self.bind_inner(analyzer, expr, in_window))
            .collect()
    }

    fn bind_window(
        &self,
        analyzer: &mut Analyzer,
        raw: &RawExpr,
        name: &str,
        args: &[RawExpr],
        spec: &RawWindowSpec,
        in_window: bool,
    ) -> Result<Expression> {
        if !self.allow_windows {
            return Err(DbError::new(format!(
                "Analytic expressions are not allowed here: {raw}"
            )));
        }
        if in_window {
            return Err(DbError::new(format!(
                "Nested analytic expressions are not allowed: {raw}"
            )));
        }

        let lower = name.to_lowercase();
        let function = WindowFunction::from_name(&lower)
            .ok_or_else(|| DbError::new(format!("Unknown analytic function: '{name}'")))?;

        let inputs = self.bind_all(analyzer, args, true)?;
        let partition_by = self.bind_all(analyzer, &spec.partition_by, true)?;
        let order_by = spec
            .order_by
            .iter()
            .map(|order_by| {
                Ok(OrderByExpr {
                    expr: self.bind_inner(analyzer, &order_by.expr, true)?,
                    desc: order_by.desc,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let input_types = inputs
            .iter()
            .map(|input| input.datatype())
            .collect::<Result<Vec<_>>>()?;
        let return_type = function.return_type(&input_types)?;

        if !function.allows_window_clause() && order_by.is_empty() {
            return Err(DbError::new(format!(
                "'{lower}' requires an ORDER BY clause: {raw}"
            )));
        }

        let window = match &spec.window {
            Some(raw_window) => {
                if !function.allows_window_clause() {
                    return Err(DbError::new(format!(
                        "Windowing clause not allowed with '{lower}': {raw}"
                    )));
                }
                if order_by.is_empty() {
                    return Err(DbError::new(format!(
                        "Windowing clause requires ORDER BY clause: {raw}"
                    )));
                }
                let left = self.bind_boundary(analyzer, &raw_window.left)?;
                let right = match &raw_window.right {
                    Some(right) => Some(self.bind_boundary(analyzer, right)?),
                    None => None,
                };
                let mut window = AnalyticWindow::new(raw_window.window_type, left, right);
                window.analyze(analyzer.evaluator().as_ref())?;
                Some(Box::new(window))
            }
            None if function.allows_window_clause() && !order_by.is_empty() => {
                let mut window = AnalyticWindow::default_window();
                window.analyze(analyzer.evaluator().as_ref())?;
                Some(Box::new(window))
            }
            None => None,
        };

        Ok(WindowExpr {
            function,
            inputs,
            partition_by,
            order_by,
            window,
            return_type,
        }
        .into())
    }

    fn bind_boundary(&self, analyzer: &mut Analyzer, boundary: &RawBoundary) -> Result<Boundary> {
        let offset = match &boundary.offset {
            Some(offset) => Some(self.bind_inner(analyzer, offset, true)?),
            None => None,
        };
        Boundary::try_new(boundary.boundary_type, offset)
    }
}
