use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr {
    pub to: DataType,
    pub expr: Box<Expression>,
}

impl CastExpr {
    /// Create a new cast, erroring if there's no cast between the types.
    pub fn try_new(expr: Expression, to: DataType) -> Result<Self> {
        let from = expr.datatype()?;
        if !can_cast(&from, &to) {
            return Err(DbError::new(format!(
                "Invalid type cast of {expr} from {from} to {to}"
            )));
        }
        Ok(CastExpr {
            to,
            expr: Box::new(expr),
        })
    }
}

fn can_cast(from: &DataType, to: &DataType) -> bool {
    if from == to || from.is_null() {
        return true;
    }
    let scalar = |t: &DataType| !t.is_collection() && !matches!(t, DataType::Struct(_));
    scalar(from) && scalar(to)
}

impl fmt::Display for CastExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAST({} AS {})", self.expr, self.to)
    }
}
