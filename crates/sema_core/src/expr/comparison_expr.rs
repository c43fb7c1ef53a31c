use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOperator {
    /// Operator to use if the sides were swapped.
    pub fn flip(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::NotEq => Self::NotEq,
            Self::Lt => Self::Gt,
            Self::LtEq => Self::GtEq,
            Self::Gt => Self::Lt,
            Self::GtEq => Self::LtEq,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExpr {
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub op: ComparisonOperator,
}

impl ComparisonExpr {
    pub fn try_new(op: ComparisonOperator, left: Expression, right: Expression) -> Result<Self> {
        let left_type = left.datatype()?;
        let right_type = right.datatype()?;

        let comparable = left_type == right_type
            || left_type.is_null()
            || right_type.is_null()
            || left_type.common_numeric_type(&right_type).is_some();
        if !comparable {
            return Err(DbError::new(format!(
                "Cannot compare {left_type} and {right_type}: {left} {op} {right}"
            )));
        }

        Ok(ComparisonExpr {
            left: Box::new(left),
            right: Box::new(right),
            op,
        })
    }
}

impl fmt::Display for ComparisonExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}
