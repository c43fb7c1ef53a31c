use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOperator {
    Add,
    Sub,
    Div,
    Mul,
    Mod,
}

impl fmt::Display for ArithOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Div => write!(f, "/"),
            Self::Mul => write!(f, "*"),
            Self::Mod => write!(f, "%"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArithExpr {
    pub op: ArithOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub return_type: DataType,
}

impl ArithExpr {
    /// Create a new arithmetic expression, inferring the return type from the
    /// inputs.
    ///
    /// Division always produces a DOUBLE.
    pub fn try_new(op: ArithOperator, left: Expression, right: Expression) -> Result<Self> {
        let left_type = left.datatype()?;
        let right_type = right.datatype()?;

        let numeric = |t: &DataType| t.is_numeric() || t.is_null();
        if !numeric(&left_type) || !numeric(&right_type) {
            return Err(DbError::new(format!(
                "Arithmetic operation requires numeric operands: {left} {op} {right}"
            )));
        }

        let return_type = match op {
            ArithOperator::Div => DataType::Float64,
            _ => left_type.common_numeric_type(&right_type).ok_or_else(|| {
                DbError::new(format!(
                    "Incompatible operand types {left_type} and {right_type}: {left} {op} {right}"
                ))
            })?,
        };
        // NULL + NULL
        let return_type = if return_type.is_null() {
            DataType::Int64
        } else {
            return_type
        };

        Ok(ArithExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            return_type,
        })
    }
}

impl fmt::Display for ArithExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}
