use std::fmt;

use super::Expression;

/// `expr IS NULL`, or `expr IS NOT NULL` when negated.
#[derive(Debug, Clone, PartialEq)]
pub struct IsNullExpr {
    pub input: Box<Expression>,
    pub negated: bool,
}

impl fmt::Display for IsNullExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{} IS NOT NULL", self.input)
        } else {
            write!(f, "{} IS NULL", self.input)
        }
    }
}
