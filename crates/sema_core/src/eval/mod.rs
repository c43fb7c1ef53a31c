//! Evaluation of constant expressions during analysis.

use std::cmp::Ordering;
use std::fmt::Debug;

use sema_error::{DbError, Result};

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::expr::arith_expr::ArithOperator;
use crate::expr::comparison_expr::ComparisonOperator;
use crate::expr::conjunction_expr::ConjunctionOperator;
use crate::expr::scalar_function_expr::ScalarFunction;
use crate::expr::Expression;

/// Evaluates constant expressions at analysis time.
pub trait ConstEvaluator: Debug + Sync + Send {
    /// Evaluate a constant expression to a number.
    fn eval_constant_numeric(&self, expr: &Expression) -> Result<f64>;

    /// Evaluate a constant predicate. NULL evaluates to false.
    fn eval_predicate(&self, expr: &Expression) -> Result<bool>;
}

/// Default evaluator walking the expression tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExprEvaluator;

impl ConstEvaluator for ExprEvaluator {
    fn eval_constant_numeric(&self, expr: &Expression) -> Result<f64> {
        match self.eval(expr)? {
            ScalarValue::Null => Err(DbError::evaluation(format!(
                "Expression evaluated to NULL: {expr}"
            ))),
            other => other.try_as_f64().map_err(|e| {
                DbError::evaluation(format!("Expression is not numeric: {expr}"))
                    .with_source(Box::new(e))
            }),
        }
    }

    fn eval_predicate(&self, expr: &Expression) -> Result<bool> {
        match self.eval(expr)? {
            ScalarValue::Null => Ok(false),
            ScalarValue::Boolean(b) => Ok(b),
            other => Err(DbError::evaluation(format!(
                "Predicate evaluated to non-boolean value {other}: {expr}"
            ))),
        }
    }
}

impl ExprEvaluator {
    /// Evaluate an expression that doesn't reference any rows.
    pub fn eval(&self, expr: &Expression) -> Result<ScalarValue> {
        match expr {
            Expression::Literal(lit) => Ok(lit.literal.clone()),
            Expression::Column(col) => Err(DbError::evaluation(format!(
                "Cannot evaluate column reference '{col}' as a constant"
            ))),
            Expression::TupleIsNull(_) | Expression::Window(_) => Err(DbError::evaluation(
                format!("Cannot evaluate '{expr}' at analysis time"),
            )),
            Expression::Arith(arith) => {
                let left = self.eval(&arith.left)?;
                let right = self.eval(&arith.right)?;
                eval_arith(arith.op, &left, &right, &arith.return_type)
            }
            Expression::Comparison(cmp) => {
                let left = self.eval(&cmp.left)?;
                let right = self.eval(&cmp.right)?;
                eval_comparison(cmp.op, &left, &right)
            }
            Expression::Conjunction(conj) => {
                // Three-valued logic: a definite result short-circuits, NULL
                // is remembered.
                let (short_circuit, default) = match conj.op {
                    ConjunctionOperator::And => (false, true),
                    ConjunctionOperator::Or => (true, false),
                };
                let mut saw_null = false;
                for child in &conj.expressions {
                    let v = self.eval(child)?;
                    if v.is_null() {
                        saw_null = true;
                        continue;
                    }
                    if v.try_as_bool()? == short_circuit {
                        return Ok(ScalarValue::Boolean(short_circuit));
                    }
                }
                if saw_null {
                    Ok(ScalarValue::Null)
                } else {
                    Ok(ScalarValue::Boolean(default))
                }
            }
            Expression::Case(case) => {
                for when_then in &case.cases {
                    if self.eval(&when_then.when)? == ScalarValue::Boolean(true) {
                        return self.eval(&when_then.then);
                    }
                }
                match &case.else_expr {
                    Some(else_expr) => self.eval(else_expr),
                    None => Ok(ScalarValue::Null),
                }
            }
            Expression::IsNull(is_null) => {
                let v = self.eval(&is_null.input)?;
                Ok(ScalarValue::Boolean(v.is_null() != is_null.negated))
            }
            Expression::Cast(cast) => {
                let v = self.eval(&cast.expr)?;
                eval_cast(v, &cast.to)
            }
            Expression::ScalarFunction(func) => {
                let inputs = func
                    .inputs
                    .iter()
                    .map(|input| self.eval(input))
                    .collect::<Result<Vec<_>>>()?;
                eval_function(func.function, inputs)
            }
        }
    }
}

fn eval_arith(
    op: ArithOperator,
    left: &ScalarValue,
    right: &ScalarValue,
    return_type: &DataType,
) -> Result<ScalarValue> {
    if left.is_null() || right.is_null() {
        return Ok(ScalarValue::Null);
    }

    if return_type.is_integer() {
        let (l, r) = (left.try_as_i64()?, right.try_as_i64()?);
        let v = match op {
            ArithOperator::Add => l.checked_add(r),
            ArithOperator::Sub => l.checked_sub(r),
            ArithOperator::Mul => l.checked_mul(r),
            ArithOperator::Div | ArithOperator::Mod if r == 0 => return Ok(ScalarValue::Null),
            ArithOperator::Div => l.checked_div(r),
            ArithOperator::Mod => l.checked_rem(r),
        };
        let v = v.ok_or_else(|| {
            DbError::evaluation(format!("Arithmetic overflow evaluating {l} {op} {r}"))
        })?;
        return cast_int(v, return_type);
    }

    let (l, r) = (left.try_as_f64()?, right.try_as_f64()?);
    let v = match op {
        ArithOperator::Add => l + r,
        ArithOperator::Sub => l - r,
        ArithOperator::Mul => l * r,
        ArithOperator::Div | ArithOperator::Mod if r == 0.0 => return Ok(ScalarValue::Null),
        ArithOperator::Div => l / r,
        ArithOperator::Mod => l % r,
    };
    Ok(match return_type {
        DataType::Float32 => ScalarValue::Float32(v as f32),
        _ => ScalarValue::Float64(v),
    })
}

fn cast_int(v: i64, to: &DataType) -> Result<ScalarValue> {
    let overflow = || DbError::evaluation(format!("Value {v} out of range for {to}"));
    Ok(match to {
        DataType::Int8 => ScalarValue::Int8(i8::try_from(v).map_err(|_| overflow())?),
        DataType::Int16 => ScalarValue::Int16(i16::try_from(v).map_err(|_| overflow())?),
        DataType::Int32 => ScalarValue::Int32(i32::try_from(v).map_err(|_| overflow())?),
        _ => ScalarValue::Int64(v),
    })
}

fn eval_comparison(
    op: ComparisonOperator,
    left: &ScalarValue,
    right: &ScalarValue,
) -> Result<ScalarValue> {
    if left.is_null() || right.is_null() {
        return Ok(ScalarValue::Null);
    }

    let ord = match (left, right) {
        (ScalarValue::Utf8(l), ScalarValue::Utf8(r)) => Some(l.cmp(r)),
        (ScalarValue::Boolean(l), ScalarValue::Boolean(r)) => Some(l.cmp(r)),
        (l, r) => match (l.try_as_i64(), r.try_as_i64()) {
            (Ok(l), Ok(r)) => Some(l.cmp(&r)),
            _ => l.try_as_f64()?.partial_cmp(&r.try_as_f64()?),
        },
    };
    let Some(ord) = ord else {
        // NaN
        return Ok(ScalarValue::Boolean(op == ComparisonOperator::NotEq));
    };

    let v = match op {
        ComparisonOperator::Eq => ord == Ordering::Equal,
        ComparisonOperator::NotEq => ord != Ordering::Equal,
        ComparisonOperator::Lt => ord == Ordering::Less,
        ComparisonOperator::LtEq => ord != Ordering::Greater,
        ComparisonOperator::Gt => ord == Ordering::Greater,
        ComparisonOperator::GtEq => ord != Ordering::Less,
    };
    Ok(ScalarValue::Boolean(v))
}

fn eval_cast(v: ScalarValue, to: &DataType) -> Result<ScalarValue> {
    if v.is_null() {
        return Ok(ScalarValue::Null);
    }
    let invalid = |v: &ScalarValue| DbError::evaluation(format!("Cannot cast {v} to {to}"));

    match to {
        DataType::Boolean => match &v {
            ScalarValue::Boolean(_) => Ok(v),
            ScalarValue::Utf8(s) => match s.to_lowercase().as_str() {
                "true" => Ok(ScalarValue::Boolean(true)),
                "false" => Ok(ScalarValue::Boolean(false)),
                _ => Err(invalid(&v)),
            },
            other => Ok(ScalarValue::Boolean(other.try_as_f64()? != 0.0)),
        },
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let i = match &v {
                ScalarValue::Boolean(b) => *b as i64,
                ScalarValue::Utf8(s) => s.trim().parse::<i64>().map_err(|_| invalid(&v))?,
                ScalarValue::Float32(_) | ScalarValue::Float64(_) => {
                    let f = v.try_as_f64()?.trunc();
                    if f < i64::MIN as f64 || f > i64::MAX as f64 || f.is_nan() {
                        return Err(invalid(&v));
                    }
                    f as i64
                }
                other => other.try_as_i64()?,
            };
            cast_int(i, to)
        }
        DataType::Float32 | DataType::Float64 => {
            let f = match &v {
                ScalarValue::Boolean(b) => *b as i64 as f64,
                ScalarValue::Utf8(s) => s.trim().parse::<f64>().map_err(|_| invalid(&v))?,
                other => other.try_as_f64()?,
            };
            Ok(if matches!(to, DataType::Float32) {
                ScalarValue::Float32(f as f32)
            } else {
                ScalarValue::Float64(f)
            })
        }
        DataType::Utf8 | DataType::Varchar(_) | DataType::Char(_) => Ok(ScalarValue::Utf8(
            match v {
                ScalarValue::Utf8(s) => s,
                other => other.to_string(),
            },
        )),
        _ => Err(DbError::evaluation(format!(
            "Cannot evaluate cast to {to} at analysis time"
        ))),
    }
}

fn eval_function(function: ScalarFunction, mut inputs: Vec<ScalarValue>) -> Result<ScalarValue> {
    let arg_err = || DbError::internal(format!("Wrong number of arguments for '{}'", function.name()));

    match function {
        ScalarFunction::If => {
            if inputs.len() != 3 {
                return Err(arg_err());
            }
            let els = inputs.pop().ok_or_else(arg_err)?;
            let then = inputs.pop().ok_or_else(arg_err)?;
            if inputs[0] == ScalarValue::Boolean(true) {
                Ok(then)
            } else {
                Ok(els)
            }
        }
        ScalarFunction::Coalesce => Ok(inputs
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or(ScalarValue::Null)),
        ScalarFunction::IfNull => {
            let mut iter = inputs.into_iter();
            let (a, b) = (iter.next().ok_or_else(arg_err)?, iter.next().ok_or_else(arg_err)?);
            Ok(if a.is_null() { b } else { a })
        }
        ScalarFunction::NullIf => {
            let mut iter = inputs.into_iter();
            let (a, b) = (iter.next().ok_or_else(arg_err)?, iter.next().ok_or_else(arg_err)?);
            let equal = eval_comparison(ComparisonOperator::Eq, &a, &b)?;
            Ok(if equal == ScalarValue::Boolean(true) {
                ScalarValue::Null
            } else {
                a
            })
        }
        ScalarFunction::Concat => {
            let mut out = String::new();
            for v in inputs {
                match v {
                    ScalarValue::Null => return Ok(ScalarValue::Null),
                    ScalarValue::Utf8(s) => out.push_str(&s),
                    other => out.push_str(&other.to_string()),
                }
            }
            Ok(ScalarValue::Utf8(out))
        }
        ScalarFunction::Upper | ScalarFunction::Lower | ScalarFunction::Length => {
            let v = inputs.pop().ok_or_else(arg_err)?;
            if v.is_null() {
                return Ok(ScalarValue::Null);
            }
            let s = v.try_as_str()?;
            Ok(match function {
                ScalarFunction::Upper => ScalarValue::Utf8(s.to_uppercase()),
                ScalarFunction::Lower => ScalarValue::Utf8(s.to_lowercase()),
                _ => ScalarValue::Int32(s.chars().count() as i32),
            })
        }
        ScalarFunction::Abs => {
            let v = inputs.pop().ok_or_else(arg_err)?;
            Ok(match v {
                ScalarValue::Int8(v) => ScalarValue::Int8(v.wrapping_abs()),
                ScalarValue::Int16(v) => ScalarValue::Int16(v.wrapping_abs()),
                ScalarValue::Int32(v) => ScalarValue::Int32(v.wrapping_abs()),
                ScalarValue::Int64(v) => ScalarValue::Int64(v.wrapping_abs()),
                ScalarValue::Float32(v) => ScalarValue::Float32(v.abs()),
                ScalarValue::Float64(v) => ScalarValue::Float64(v.abs()),
                other => other,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ids::{SlotId, TupleId};
    use crate::expr::arith_expr::ArithExpr;
    use crate::expr::case_expr::{CaseExpr, WhenThen};
    use crate::expr::comparison_expr::ComparisonExpr;
    use crate::expr::{self, column, is_not_null, is_null, lit};

    #[test]
    fn numeric_arith() {
        let e: Expression = ArithExpr::try_new(ArithOperator::Add, lit(2).into(), lit(3).into())
            .unwrap()
            .into();
        assert_eq!(5.0, ExprEvaluator.eval_constant_numeric(&e).unwrap());
    }

    #[test]
    fn division_by_zero_is_null() {
        let e: Expression = ArithExpr::try_new(ArithOperator::Div, lit(2).into(), lit(0).into())
            .unwrap()
            .into();
        assert_eq!(ScalarValue::Null, ExprEvaluator.eval(&e).unwrap());
        assert!(ExprEvaluator.eval_constant_numeric(&e).is_err());
    }

    #[test]
    fn null_literal_is_not_not_null() {
        let e: Expression = is_not_null(lit(ScalarValue::Null)).into();
        assert!(!ExprEvaluator.eval_predicate(&e).unwrap());

        let e: Expression = is_not_null(lit(5)).into();
        assert!(ExprEvaluator.eval_predicate(&e).unwrap());
    }

    #[test]
    fn case_on_null() {
        // CASE WHEN NULL IS NULL THEN 1 ELSE 2 END
        let e: Expression = CaseExpr::try_new(
            vec![WhenThen {
                when: is_null(lit(ScalarValue::Null)).into(),
                then: lit(1).into(),
            }],
            Some(Box::new(lit(2).into())),
        )
        .unwrap()
        .into();
        assert_eq!(ScalarValue::Int32(1), ExprEvaluator.eval(&e).unwrap());
    }

    #[test]
    fn comparison_three_valued() {
        let e: Expression = ComparisonExpr::try_new(
            ComparisonOperator::Eq,
            lit(ScalarValue::Null).into(),
            lit(1).into(),
        )
        .unwrap()
        .into();
        assert_eq!(ScalarValue::Null, ExprEvaluator.eval(&e).unwrap());
        assert!(!ExprEvaluator.eval_predicate(&e).unwrap());
    }

    #[test]
    fn coalesce_and_cast() {
        let e: Expression = crate::expr::scalar_function_expr::ScalarFunctionExpr::try_new(
            ScalarFunction::Coalesce,
            vec![lit(ScalarValue::Null).into(), lit("a").into()],
        )
        .unwrap()
        .into();
        assert_eq!(ScalarValue::from("a"), ExprEvaluator.eval(&e).unwrap());

        let e: Expression = expr::cast(lit("42"), DataType::Int32).unwrap().into();
        assert_eq!(ScalarValue::Int32(42), ExprEvaluator.eval(&e).unwrap());
    }

    #[test]
    fn non_constant_errors() {
        let e: Expression = column(SlotId(0), DataType::Int32, "a").into();
        let err = ExprEvaluator.eval(&e).unwrap_err();
        assert!(err.is_kind(sema_error::ErrorKind::Evaluation));

        let e: Expression = expr::tuple_is_null(vec![TupleId(0)]).into();
        assert!(ExprEvaluator.eval_predicate(&e).is_err());
    }
}
