use std::fmt;

use sema_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;

#[derive(Debug, Clone, PartialEq)]
pub struct WhenThen {
    pub when: Expression,
    pub then: Expression,
}

impl fmt::Display for WhenThen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WHEN {} THEN {}", self.when, self.then)
    }
}

/// Searched CASE expression. A missing ELSE produces NULL.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub cases: Vec<WhenThen>,
    pub else_expr: Option<Box<Expression>>,
    pub datatype: DataType,
}

impl CaseExpr {
    pub fn try_new(cases: Vec<WhenThen>, else_expr: Option<Box<Expression>>) -> Result<Self> {
        let mut datatype = DataType::Null;
        for case in &cases {
            let when_type = case.when.datatype()?;
            if !when_type.is_boolean() && !when_type.is_null() {
                return Err(DbError::new(format!(
                    "CASE WHEN condition must be BOOLEAN, got {when_type}: {}",
                    case.when
                )));
            }
        }

        let results = cases
            .iter()
            .map(|c| &c.then)
            .chain(else_expr.as_deref());
        for result in results {
            let result_type = result.datatype()?;
            datatype = datatype.common_numeric_type(&result_type).ok_or_else(|| {
                DbError::new(format!(
                    "Case expression produces two different types: {datatype} and {result_type}"
                ))
            })?;
        }

        Ok(CaseExpr {
            cases,
            else_expr,
            datatype,
        })
    }
}

impl fmt::Display for CaseExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CASE ")?;
        for case in &self.cases {
            write!(f, "{case} ")?;
        }
        if let Some(else_expr) = &self.else_expr {
            write!(f, "ELSE {else_expr} ")?;
        }
        write!(f, "END")
    }
}
