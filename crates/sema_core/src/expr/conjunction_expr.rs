use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConjunctionOperator {
    And,
    Or,
}

impl fmt::Display for ConjunctionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConjunctionExpr {
    pub op: ConjunctionOperator,
    pub expressions: Vec<Expression>,
}

impl ConjunctionExpr {
    pub fn try_new(op: ConjunctionOperator, expressions: Vec<Expression>) -> Result<Self> {
        for expr in &expressions {
            let datatype = expr.datatype()?;
            if !datatype.is_boolean() && !datatype.is_null() {
                return Err(DbError::new(format!(
                    "Operand of {op} must be BOOLEAN, got {datatype}: {expr}"
                )));
            }
        }
        Ok(ConjunctionExpr { op, expressions })
    }
}

impl fmt::Display for ConjunctionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, expr) in self.expressions.iter().enumerate() {
            if idx > 0 {
                write!(f, " {} ", self.op)?;
            }
            write!(f, "({expr})")?;
        }
        Ok(())
    }
}
