//! Bound expressions.

pub mod arith_expr;
pub mod case_expr;
pub mod cast_expr;
pub mod column_expr;
pub mod comparison_expr;
pub mod conjunction_expr;
pub mod is_null_expr;
pub mod literal_expr;
pub mod scalar_function_expr;
pub mod substitution;
pub mod tuple_is_null_expr;
pub mod window_expr;

use std::fmt;

use arith_expr::ArithExpr;
use case_expr::CaseExpr;
use cast_expr::CastExpr;
use column_expr::ColumnExpr;
use comparison_expr::ComparisonExpr;
use conjunction_expr::ConjunctionExpr;
use is_null_expr::IsNullExpr;
use literal_expr::LiteralExpr;
use scalar_function_expr::{ScalarFunction, ScalarFunctionExpr};
use sema_error::Result;
use substitution::ExprSubstitutionMap;
use tuple_is_null_expr::TupleIsNullExpr;
use window_expr::WindowExpr;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::descriptor::ids::{SlotId, TupleId};

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LiteralExpr),
    Column(ColumnExpr),
    Arith(ArithExpr),
    Comparison(ComparisonExpr),
    Conjunction(ConjunctionExpr),
    Case(CaseExpr),
    IsNull(IsNullExpr),
    Cast(CastExpr),
    ScalarFunction(ScalarFunctionExpr),
    TupleIsNull(TupleIsNullExpr),
    Window(WindowExpr),
}

impl Expression {
    pub fn datatype(&self) -> Result<DataType> {
        Ok(match self {
            Self::Literal(expr) => expr.literal.datatype(),
            Self::Column(expr) => expr.datatype.clone(),
            Self::Arith(expr) => expr.return_type.clone(),
            Self::Comparison(_) | Self::Conjunction(_) | Self::IsNull(_) => DataType::Boolean,
            Self::Case(expr) => expr.datatype.clone(),
            Self::Cast(expr) => expr.to.clone(),
            Self::ScalarFunction(expr) => expr.return_type.clone(),
            Self::TupleIsNull(_) => DataType::Boolean,
            Self::Window(expr) => expr.return_type.clone(),
        })
    }

    pub fn for_each_child<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&Expression) -> Result<()>,
    {
        match self {
            Self::Literal(_) | Self::Column(_) | Self::TupleIsNull(_) => (),
            Self::Arith(expr) => {
                func(&expr.left)?;
                func(&expr.right)?;
            }
            Self::Comparison(expr) => {
                func(&expr.left)?;
                func(&expr.right)?;
            }
            Self::Conjunction(expr) => {
                for child in &expr.expressions {
                    func(child)?;
                }
            }
            Self::Case(expr) => {
                for case in &expr.cases {
                    func(&case.when)?;
                    func(&case.then)?;
                }
                if let Some(else_expr) = &expr.else_expr {
                    func(else_expr)?;
                }
            }
            Self::IsNull(expr) => func(&expr.input)?,
            Self::Cast(expr) => func(&expr.expr)?,
            Self::ScalarFunction(expr) => {
                for input in &expr.inputs {
                    func(input)?;
                }
            }
            Self::Window(expr) => {
                for input in &expr.inputs {
                    func(input)?;
                }
                for partition in &expr.partition_by {
                    func(partition)?;
                }
                for order in &expr.order_by {
                    func(&order.expr)?;
                }
            }
        }
        Ok(())
    }

    pub fn for_each_child_mut<F>(&mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&mut Expression) -> Result<()>,
    {
        match self {
            Self::Literal(_) | Self::Column(_) | Self::TupleIsNull(_) => (),
            Self::Arith(expr) => {
                func(&mut expr.left)?;
                func(&mut expr.right)?;
            }
            Self::Comparison(expr) => {
                func(&mut expr.left)?;
                func(&mut expr.right)?;
            }
            Self::Conjunction(expr) => {
                for child in &mut expr.expressions {
                    func(child)?;
                }
            }
            Self::Case(expr) => {
                for case in &mut expr.cases {
                    func(&mut case.when)?;
                    func(&mut case.then)?;
                }
                if let Some(else_expr) = &mut expr.else_expr {
                    func(else_expr)?;
                }
            }
            Self::IsNull(expr) => func(&mut expr.input)?,
            Self::Cast(expr) => func(&mut expr.expr)?,
            Self::ScalarFunction(expr) => {
                for input in &mut expr.inputs {
                    func(input)?;
                }
            }
            Self::Window(expr) => {
                for input in &mut expr.inputs {
                    func(input)?;
                }
                for partition in &mut expr.partition_by {
                    func(partition)?;
                }
                for order in &mut expr.order_by {
                    func(&mut order.expr)?;
                }
            }
        }
        Ok(())
    }

    /// Replace this expression with the output of `f`.
    pub fn replace_with<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(Expression) -> Result<Expression>,
    {
        let expr = std::mem::replace(self, lit(ScalarValue::Null).into());
        *self = f(expr)?;
        Ok(())
    }

    /// Whether this expression can be evaluated without any input rows.
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Literal(_) => true,
            Self::Column(_) | Self::TupleIsNull(_) | Self::Window(_) => false,
            other => {
                let mut constant = true;
                // Visitor is infallible.
                let _ = other.for_each_child(&mut |child| {
                    constant &= child.is_constant();
                    Ok(())
                });
                constant
            }
        }
    }

    /// Check if this expression or any of its subexpressions satisfy `pred`.
    pub fn contains<F>(&self, pred: &F) -> bool
    where
        F: Fn(&Expression) -> bool,
    {
        if pred(self) {
            return true;
        }
        let mut found = false;
        let _ = self.for_each_child(&mut |child| {
            found = found || child.contains(pred);
            Ok(())
        });
        found
    }

    pub fn contains_window(&self) -> bool {
        self.contains(&|expr| matches!(expr, Expression::Window(_)))
    }

    pub fn contains_tuple_is_null(&self) -> bool {
        self.contains(&|expr| matches!(expr, Expression::TupleIsNull(_)))
    }

    /// Distinct column references in this expression, in order of first
    /// appearance.
    pub fn collect_column_refs(&self) -> Vec<ColumnExpr> {
        let mut cols = Vec::new();
        self.collect_column_refs_inner(&mut cols);
        cols
    }

    fn collect_column_refs_inner(&self, cols: &mut Vec<ColumnExpr>) {
        if let Self::Column(col) = self {
            if !cols.iter().any(|c| c.slot == col.slot) {
                cols.push(col.clone());
            }
            return;
        }
        let _ = self.for_each_child(&mut |child| {
            child.collect_column_refs_inner(cols);
            Ok(())
        });
    }

    /// Return a copy of this expression with every subexpression found in
    /// `smap` replaced by its rhs. Replacements are not substituted again.
    pub fn substitute(&self, smap: &ExprSubstitutionMap) -> Result<Expression> {
        let mut expr = self.clone();
        expr.substitute_in_place(smap)?;
        Ok(expr)
    }

    fn substitute_in_place(&mut self, smap: &ExprSubstitutionMap) -> Result<()> {
        if let Some(rhs) = smap.get(self) {
            *self = rhs.clone();
            return Ok(());
        }
        self.for_each_child_mut(&mut |child| child.substitute_in_place(smap))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(expr) => write!(f, "{expr}"),
            Self::Column(expr) => write!(f, "{expr}"),
            Self::Arith(expr) => write!(f, "{expr}"),
            Self::Comparison(expr) => write!(f, "{expr}"),
            Self::Conjunction(expr) => write!(f, "{expr}"),
            Self::Case(expr) => write!(f, "{expr}"),
            Self::IsNull(expr) => write!(f, "{expr}"),
            Self::Cast(expr) => write!(f, "{expr}"),
            Self::ScalarFunction(expr) => write!(f, "{expr}"),
            Self::TupleIsNull(expr) => write!(f, "{expr}"),
            Self::Window(expr) => write!(f, "{expr}"),
        }
    }
}

macro_rules! impl_from_expr {
    ($($variant:ident($typ:ty)),* $(,)?) => {
        $(
            impl From<$typ> for Expression {
                fn from(value: $typ) -> Self {
                    Expression::$variant(value)
                }
            }
        )*
    };
}

impl_from_expr!(
    Literal(LiteralExpr),
    Column(ColumnExpr),
    Arith(ArithExpr),
    Comparison(ComparisonExpr),
    Conjunction(ConjunctionExpr),
    Case(CaseExpr),
    IsNull(IsNullExpr),
    Cast(CastExpr),
    ScalarFunction(ScalarFunctionExpr),
    TupleIsNull(TupleIsNullExpr),
    Window(WindowExpr),
);

pub fn lit(scalar: impl Into<ScalarValue>) -> LiteralExpr {
    LiteralExpr {
        literal: scalar.into(),
    }
}

pub fn column(slot: SlotId, datatype: DataType, label: impl Into<String>) -> ColumnExpr {
    ColumnExpr::new(slot, datatype, label)
}

pub fn is_null(expr: impl Into<Expression>) -> IsNullExpr {
    IsNullExpr {
        input: Box::new(expr.into()),
        negated: false,
    }
}

pub fn is_not_null(expr: impl Into<Expression>) -> IsNullExpr {
    IsNullExpr {
        input: Box::new(expr.into()),
        negated: true,
    }
}

pub fn cast(expr: impl Into<Expression>, to: DataType) -> Result<CastExpr> {
    CastExpr::try_new(expr.into(), to)
}

pub fn tuple_is_null(tuple_ids: Vec<TupleId>) -> TupleIsNullExpr {
    TupleIsNullExpr { tuple_ids }
}

/// `if(cond, then, else)`
pub fn if_expr(
    cond: impl Into<Expression>,
    then: impl Into<Expression>,
    els: impl Into<Expression>,
) -> Result<ScalarFunctionExpr> {
    ScalarFunctionExpr::try_new(ScalarFunction::If, vec![cond.into(), then.into(), els.into()])
}

#[cfg(test)]
mod tests {
    use super::arith_expr::ArithOperator;
    use super::*;

    fn col(slot: usize) -> Expression {
        column(SlotId(slot), DataType::Int32, format!("c{slot}")).into()
    }

    #[test]
    fn constant_detection() {
        let e: Expression = ArithExpr::try_new(ArithOperator::Add, lit(1).into(), lit(2).into())
            .unwrap()
            .into();
        assert!(e.is_constant());

        let e: Expression = ArithExpr::try_new(ArithOperator::Add, lit(1).into(), col(0))
            .unwrap()
            .into();
        assert!(!e.is_constant());
    }

    #[test]
    fn substitute_columns() {
        let e: Expression = ArithExpr::try_new(ArithOperator::Mul, col(0), col(1))
            .unwrap()
            .into();
        let mut smap = ExprSubstitutionMap::new();
        smap.put(col(0), lit(10).into());

        let out = e.substitute(&smap).unwrap();
        assert_eq!("10 * c1", out.to_string());
        // Original untouched.
        assert_eq!("c0 * c1", e.to_string());
    }

    #[test]
    fn substitute_does_not_recurse_into_replacement() {
        let mut smap = ExprSubstitutionMap::new();
        let replacement: Expression = is_null(col(0)).into();
        smap.put(col(0), replacement.clone());

        let out = col(0).substitute(&smap).unwrap();
        assert_eq!(replacement, out);
    }

    #[test]
    fn collect_distinct_columns() {
        let e: Expression = ArithExpr::try_new(
            ArithOperator::Add,
            col(3),
            ArithExpr::try_new(ArithOperator::Sub, col(1), col(3))
                .unwrap()
                .into(),
        )
        .unwrap()
        .into();

        let slots: Vec<_> = e.collect_column_refs().iter().map(|c| c.slot).collect();
        assert_eq!(vec![SlotId(3), SlotId(1)], slots);
    }

    #[test]
    fn if_expr_type() {
        let e = if_expr(
            tuple_is_null(vec![TupleId(0)]),
            lit(ScalarValue::Null),
            lit(5i64),
        )
        .unwrap();
        assert_eq!(DataType::Int64, e.return_type);
        assert_eq!("if(TupleIsNull(t0), NULL, 5)", e.to_string());
    }

    #[test]
    fn window_with_offset_boundary() {
        use crate::logical::analytic_window::{AnalyticWindow, Boundary, WindowType};
        use window_expr::{OrderByExpr, WindowFunction};

        let window = AnalyticWindow::new(
            WindowType::Rows,
            Boundary::preceding(lit(2i64)),
            Some(Boundary::current_row()),
        );
        let e: Expression = Expression::Window(WindowExpr {
            function: WindowFunction::Sum,
            inputs: vec![col(0)],
            partition_by: Vec::new(),
            order_by: vec![OrderByExpr {
                expr: col(1),
                desc: false,
            }],
            window: Some(Box::new(window)),
            return_type: DataType::Int64,
        });
        assert_eq!(
            "sum(c0) OVER (ORDER BY c1 ROWS BETWEEN 2 PRECEDING AND CURRENT ROW)",
            e.to_string()
        );
        assert_eq!(e, e.clone());
    }

    #[test]
    fn replace_with_wraps() {
        let mut e = col(0);
        e.replace_with(|e| Ok(is_not_null(e).into())).unwrap();
        assert_eq!("c0 IS NOT NULL", e.to_string());
    }
}
